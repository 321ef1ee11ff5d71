//! Mapper 0: NROM.
//!
//! No banking hardware at all. 16 KiB PRG images are mirrored across the
//! whole `$8000-$FFFF` window; 32 KiB images map linearly. CHR is a fixed
//! 8 KiB of ROM, or RAM when the cartridge ships none. Mirroring is soldered
//! on the board.

use crate::cartridge::{Cartridge, PRG_RAM_SIZE};
use crate::mapper::{Mapper, Mirroring};

/// NROM board (mapper 0).
#[derive(Debug, Clone)]
pub struct Nrom {
    prg_rom: Vec<u8>,
    chr: Vec<u8>,
    chr_is_ram: bool,
    prg_ram: Vec<u8>,
    mirroring: Mirroring,
    has_battery: bool,
}

impl Nrom {
    /// Build the board from a validated cartridge.
    #[must_use]
    pub fn new(cart: &Cartridge) -> Self {
        let (chr, chr_is_ram) = cart.chr_image();
        Self {
            prg_rom: cart.prg_rom.clone(),
            chr,
            chr_is_ram,
            prg_ram: vec![0; PRG_RAM_SIZE],
            mirroring: cart.mirroring,
            has_battery: cart.has_battery,
        }
    }
}

impl Mapper for Nrom {
    fn read_prg(&mut self, addr: u16) -> u8 {
        match addr {
            0x6000..=0x7FFF => self.prg_ram[usize::from(addr - 0x6000)],
            // A 16 KiB image sees the offset modulo its length, which
            // produces the two-mirror layout; 32 KiB maps straight through.
            0x8000..=0xFFFF => {
                let offset = usize::from(addr - 0x8000) % self.prg_rom.len();
                self.prg_rom[offset]
            }
            _ => 0,
        }
    }

    fn write_prg(&mut self, addr: u16, val: u8) {
        if let 0x6000..=0x7FFF = addr {
            self.prg_ram[usize::from(addr - 0x6000)] = val;
        }
    }

    fn peek_chr(&self, addr: u16) -> u8 {
        self.chr[usize::from(addr & 0x1FFF) % self.chr.len()]
    }

    fn write_chr(&mut self, addr: u16, val: u8) {
        if self.chr_is_ram {
            let offset = usize::from(addr & 0x1FFF) % self.chr.len();
            self.chr[offset] = val;
        }
    }

    fn mirroring(&self) -> Mirroring {
        self.mirroring
    }

    fn reset(&mut self) {}

    fn has_battery(&self) -> bool {
        self.has_battery
    }

    fn battery_ram(&self) -> Option<&[u8]> {
        self.has_battery.then_some(self.prg_ram.as_slice())
    }

    fn load_battery_ram(&mut self, data: &[u8]) {
        let len = data.len().min(self.prg_ram.len());
        self.prg_ram[..len].copy_from_slice(&data[..len]);
    }
}
