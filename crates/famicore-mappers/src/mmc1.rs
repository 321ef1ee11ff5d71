//! Mapper 1: MMC1.
//!
//! All configuration goes through a 5-bit serial shift register: bit 0 of
//! each `$8000-$FFFF` write is shifted in LSB-first, and the fifth write
//! commits the assembled value to one of four internal registers selected by
//! address bits 14-13. A write with bit 7 set aborts the sequence and forces
//! the PRG banking mode back to fix-last.
//!
//! Registers:
//! - `$8000-$9FFF`: control (mirroring, PRG mode, CHR mode)
//! - `$A000-$BFFF`: CHR bank 0
//! - `$C000-$DFFF`: CHR bank 1
//! - `$E000-$FFFF`: PRG bank + PRG-RAM disable

use crate::cartridge::{Cartridge, PRG_RAM_SIZE, PRG_UNIT};
use crate::mapper::{Mapper, Mirroring};

const CHR_BANK: usize = 4 * 1024;

/// PRG-ROM banking mode (control register bits 3-2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum PrgMode {
    /// Modes 0/1: switch 32 KiB at `$8000`, bank number's low bit ignored.
    Switch32K,
    /// Mode 2: first bank fixed at `$8000`, 16 KiB switch at `$C000`.
    FixFirst,
    /// Mode 3: 16 KiB switch at `$8000`, last bank fixed at `$C000`.
    #[default]
    FixLast,
}

/// CHR banking mode (control register bit 4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum ChrMode {
    /// One 8 KiB bank (CHR bank 0 with its low bit cleared).
    #[default]
    Switch8K,
    /// Two independent 4 KiB banks.
    Switch4K,
}

/// MMC1 board (mapper 1).
#[derive(Debug, Clone)]
pub struct Mmc1 {
    prg_rom: Vec<u8>,
    chr: Vec<u8>,
    chr_is_ram: bool,
    prg_ram: Vec<u8>,
    prg_banks: usize,

    // Serial interface
    shift_reg: u8,
    shift_count: u8,

    // Committed register state
    mirroring: Mirroring,
    prg_mode: PrgMode,
    chr_mode: ChrMode,
    chr_bank_0: u8,
    chr_bank_1: u8,
    prg_bank: u8,
    prg_ram_enabled: bool,

    has_battery: bool,
}

impl Mmc1 {
    /// Build the board from a validated cartridge.
    #[must_use]
    pub fn new(cart: &Cartridge) -> Self {
        let (chr, chr_is_ram) = cart.chr_image();
        Self {
            prg_rom: cart.prg_rom.clone(),
            chr,
            chr_is_ram,
            prg_ram: vec![0; PRG_RAM_SIZE],
            prg_banks: cart.prg_banks(),
            shift_reg: 0,
            shift_count: 0,
            mirroring: cart.mirroring,
            prg_mode: PrgMode::FixLast,
            chr_mode: ChrMode::Switch8K,
            chr_bank_0: 0,
            chr_bank_1: 0,
            prg_bank: 0,
            prg_ram_enabled: true,
            has_battery: cart.has_battery,
        }
    }

    /// Shift one serial bit in; commit on the fifth.
    fn write_serial(&mut self, addr: u16, val: u8) {
        if val & 0x80 != 0 {
            // Abort the sequence; hardware also forces fix-last PRG mode.
            self.shift_reg = 0;
            self.shift_count = 0;
            self.prg_mode = PrgMode::FixLast;
            return;
        }

        self.shift_reg |= (val & 1) << self.shift_count;
        self.shift_count += 1;

        if self.shift_count == 5 {
            let value = self.shift_reg;
            self.shift_reg = 0;
            self.shift_count = 0;
            match (addr >> 13) & 0x03 {
                0 => self.write_control(value),
                1 => self.chr_bank_0 = value,
                2 => self.chr_bank_1 = value,
                3 => {
                    self.prg_bank = value & 0x0F;
                    self.prg_ram_enabled = value & 0x10 == 0;
                }
                _ => unreachable!(),
            }
            log::debug!("MMC1 commit {value:#04x} to register {}", (addr >> 13) & 3);
        }
    }

    fn write_control(&mut self, val: u8) {
        // One-screen modes collapse onto H/V; the CIRAM layer only models
        // the two-bank arrangements.
        self.mirroring = match val & 0x03 {
            0 | 3 => Mirroring::Horizontal,
            1 | 2 => Mirroring::Vertical,
            _ => unreachable!(),
        };

        self.prg_mode = match (val >> 2) & 0x03 {
            0 | 1 => PrgMode::Switch32K,
            2 => PrgMode::FixFirst,
            3 => PrgMode::FixLast,
            _ => unreachable!(),
        };

        self.chr_mode = if val & 0x10 == 0 {
            ChrMode::Switch8K
        } else {
            ChrMode::Switch4K
        };
    }

    fn prg_index(&self, addr: u16) -> usize {
        let bank = match self.prg_mode {
            PrgMode::Switch32K => {
                let base = usize::from(self.prg_bank & 0x0E);
                if addr < 0xC000 { base } else { base + 1 }
            }
            PrgMode::FixFirst => {
                if addr < 0xC000 {
                    0
                } else {
                    usize::from(self.prg_bank)
                }
            }
            PrgMode::FixLast => {
                if addr < 0xC000 {
                    usize::from(self.prg_bank)
                } else {
                    self.prg_banks - 1
                }
            }
        };

        (bank % self.prg_banks) * PRG_UNIT + usize::from(addr & 0x3FFF)
    }

    fn chr_index(&self, addr: u16) -> usize {
        let addr = usize::from(addr & 0x1FFF);
        let banks = (self.chr.len() / CHR_BANK).max(1);

        let (bank, offset) = match self.chr_mode {
            ChrMode::Switch8K => (usize::from(self.chr_bank_0 & 0x1E), addr & 0x1FFF),
            ChrMode::Switch4K => {
                let reg = if addr < 0x1000 {
                    self.chr_bank_0
                } else {
                    self.chr_bank_1
                };
                (usize::from(reg), addr & 0x0FFF)
            }
        };

        ((bank % banks) * CHR_BANK + offset) % self.chr.len()
    }
}

impl Mapper for Mmc1 {
    fn read_prg(&mut self, addr: u16) -> u8 {
        match addr {
            0x6000..=0x7FFF => {
                if self.prg_ram_enabled {
                    self.prg_ram[usize::from(addr - 0x6000)]
                } else {
                    0
                }
            }
            0x8000..=0xFFFF => self.prg_rom[self.prg_index(addr)],
            _ => 0,
        }
    }

    fn write_prg(&mut self, addr: u16, val: u8) {
        match addr {
            0x6000..=0x7FFF => {
                if self.prg_ram_enabled {
                    self.prg_ram[usize::from(addr - 0x6000)] = val;
                }
            }
            0x8000..=0xFFFF => self.write_serial(addr, val),
            _ => {}
        }
    }

    fn peek_chr(&self, addr: u16) -> u8 {
        self.chr[self.chr_index(addr)]
    }

    fn write_chr(&mut self, addr: u16, val: u8) {
        if self.chr_is_ram {
            let offset = self.chr_index(addr);
            self.chr[offset] = val;
        }
    }

    fn mirroring(&self) -> Mirroring {
        self.mirroring
    }

    fn reset(&mut self) {
        self.shift_reg = 0;
        self.shift_count = 0;
        self.prg_mode = PrgMode::FixLast;
        self.chr_mode = ChrMode::Switch8K;
        self.chr_bank_0 = 0;
        self.chr_bank_1 = 0;
        self.prg_bank = 0;
        self.prg_ram_enabled = true;
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
