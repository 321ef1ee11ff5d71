//! Mapper 2: UxROM.
//!
//! Discrete-logic PRG banking: any write to `$8000-$FFFF` selects the 16 KiB
//! bank visible at `$8000-$BFFF` (modulo the bank count); the last bank is
//! hard-wired at `$C000-$FFFF`. CHR is unbanked, usually RAM. Mirroring is
//! fixed by the board.

use crate::cartridge::{Cartridge, PRG_RAM_SIZE, PRG_UNIT};
use crate::mapper::{Mapper, Mirroring};

/// UxROM board (mapper 2).
#[derive(Debug, Clone)]
pub struct Uxrom {
    prg_rom: Vec<u8>,
    chr: Vec<u8>,
    chr_is_ram: bool,
    prg_ram: Vec<u8>,
    mirroring: Mirroring,
    prg_bank: usize,
    prg_banks: usize,
    has_battery: bool,
}

impl Uxrom {
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
            prg_bank: 0,
            prg_banks: cart.prg_banks(),
            has_battery: cart.has_battery,
        }
    }
}

impl Mapper for Uxrom {
    fn read_prg(&mut self, addr: u16) -> u8 {
        match addr {
            0x6000..=0x7FFF => self.prg_ram[usize::from(addr - 0x6000)],
            0x8000..=0xBFFF => {
                self.prg_rom[self.prg_bank * PRG_UNIT + usize::from(addr & 0x3FFF)]
            }
            0xC000..=0xFFFF => {
                let last = self.prg_banks - 1;
                self.prg_rom[last * PRG_UNIT + usize::from(addr & 0x3FFF)]
            }
            _ => 0,
        }
    }

    fn write_prg(&mut self, addr: u16, val: u8) {
        match addr {
            0x6000..=0x7FFF => self.prg_ram[usize::from(addr - 0x6000)] = val,
            0x8000..=0xFFFF => {
                self.prg_bank = usize::from(val) % self.prg_banks;
                log::debug!("UxROM PRG bank -> {}", self.prg_bank);
            }
            _ => {}
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

    fn reset(&mut self) {
        self.prg_bank = 0;
    }

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
