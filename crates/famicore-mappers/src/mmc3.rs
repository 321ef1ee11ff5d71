//! Mapper 4: MMC3.
//!
//! Eight bank registers (R0-R7) selected through a bank-select/bank-data
//! register pair, PRG mapped as four 8 KiB windows, CHR as a 2+2+1+1+1+1 KiB
//! arrangement that can be flipped across the pattern tables, runtime
//! mirroring control, and the scanline IRQ counter clocked by rising edges
//! of PPU address line 12.
//!
//! Registers (address bit 0 selects within each pair):
//! - `$8000`/`$8001`: bank select / bank data
//! - `$A000`/`$A001`: mirroring / PRG-RAM enable+protect
//! - `$C000`/`$C001`: IRQ latch / IRQ reload
//! - `$E000`/`$E001`: IRQ disable+acknowledge / IRQ enable

use crate::cartridge::{Cartridge, PRG_RAM_SIZE};
use crate::mapper::{Mapper, Mirroring};

const PRG_WINDOW: usize = 8 * 1024;
const CHR_SLOT: usize = 1024;

/// Accesses with A12 low required before a rising edge qualifies.
const A12_LOW_RUN: u8 = 8;
/// Accesses a qualifying edge suppresses further edges for.
const A12_COOLDOWN: u8 = 8;

/// MMC3 board (mapper 4).
#[derive(Debug, Clone)]
pub struct Mmc3 {
    prg_rom: Vec<u8>,
    chr: Vec<u8>,
    chr_is_ram: bool,
    prg_ram: Vec<u8>,
    /// PRG-ROM size in 8 KiB windows.
    prg_banks: usize,

    // Bank select register
    /// Which of R0-R7 the next `$8001` write updates.
    bank_select: u8,
    /// PRG mode: false = R6 at `$8000`, true = R6 at `$C000`.
    prg_mode: bool,
    /// CHR mode: false = 2 KiB banks low, true = 2 KiB banks high.
    chr_inversion: bool,
    /// Bank registers R0-R7.
    regs: [u8; 8],

    mirroring: Mirroring,
    prg_ram_enabled: bool,
    prg_ram_protect: bool,

    // IRQ counter
    irq_latch: u8,
    irq_counter: u8,
    irq_reload: bool,
    irq_enabled: bool,
    irq_pending: bool,

    // A12 edge filter
    a12_last: bool,
    a12_low_run: u8,
    a12_cooldown: u8,

    has_battery: bool,
}

impl Mmc3 {
    /// Build the board from a validated cartridge.
    #[must_use]
    pub fn new(cart: &Cartridge) -> Self {
        let (chr, chr_is_ram) = cart.chr_image();
        Self {
            prg_rom: cart.prg_rom.clone(),
            prg_banks: cart.prg_rom.len() / PRG_WINDOW,
            chr,
            chr_is_ram,
            prg_ram: vec![0; PRG_RAM_SIZE],
            bank_select: 0,
            prg_mode: false,
            chr_inversion: false,
            // Power-on bank layout: sequential CHR, first two PRG windows.
            regs: [0, 2, 4, 5, 6, 7, 0, 1],
            mirroring: cart.mirroring,
            prg_ram_enabled: true,
            prg_ram_protect: false,
            irq_latch: 0,
            irq_counter: 0,
            irq_reload: false,
            irq_enabled: false,
            irq_pending: false,
            a12_last: false,
            a12_low_run: 0,
            a12_cooldown: 0,
            has_battery: cart.has_battery,
        }
    }

    fn prg_index(&self, addr: u16) -> usize {
        let second_last = self.prg_banks.saturating_sub(2);
        let last = self.prg_banks - 1;

        let bank = match addr & 0x6000 {
            // $8000-$9FFF
            0x0000 => {
                if self.prg_mode {
                    second_last
                } else {
                    usize::from(self.regs[6])
                }
            }
            // $A000-$BFFF
            0x2000 => usize::from(self.regs[7]),
            // $C000-$DFFF
            0x4000 => {
                if self.prg_mode {
                    usize::from(self.regs[6])
                } else {
                    second_last
                }
            }
            // $E000-$FFFF
            _ => last,
        };

        (bank % self.prg_banks) * PRG_WINDOW + usize::from(addr & 0x1FFF)
    }

    fn chr_index(&self, addr: u16) -> usize {
        let addr = addr & 0x1FFF;
        // The 2 KiB banks sit in the half selected by the inversion bit;
        // the four 1 KiB banks fill the other half.
        let in_2k_half = (addr >= 0x1000) == self.chr_inversion;

        let (bank, offset) = if in_2k_half {
            let reg = if addr & 0x0800 == 0 {
                self.regs[0]
            } else {
                self.regs[1]
            };
            (usize::from(reg & 0xFE), usize::from(addr & 0x07FF))
        } else {
            let slot = usize::from((addr >> 10) & 0x03);
            (usize::from(self.regs[2 + slot]), usize::from(addr & 0x03FF))
        };

        (bank * CHR_SLOT + offset) % self.chr.len()
    }

    /// One tick of the scanline counter, on a qualifying A12 rising edge.
    fn clock_irq(&mut self) {
        if self.irq_counter == 0 || self.irq_reload {
            self.irq_counter = self.irq_latch;
            self.irq_reload = false;
        } else {
            self.irq_counter -= 1;
        }

        if self.irq_counter == 0 && self.irq_enabled {
            self.irq_pending = true;
            log::trace!("MMC3 IRQ asserted");
        }
    }

    /// Observe A12 on a pattern-table access and clock the counter on a
    /// filtered rising edge: the line must have sat low for a sustained run
    /// and no post-edge cooldown may be active.
    fn tap_a12(&mut self, addr: u16) {
        let high = addr & 0x1000 != 0;
        if high {
            if !self.a12_last && self.a12_low_run >= A12_LOW_RUN && self.a12_cooldown == 0 {
                self.clock_irq();
                self.a12_cooldown = A12_COOLDOWN;
            }
            self.a12_low_run = 0;
        } else {
            self.a12_low_run = self.a12_low_run.saturating_add(1);
            self.a12_cooldown = self.a12_cooldown.saturating_sub(1);
        }
        self.a12_last = high;
    }

    fn write_register(&mut self, addr: u16, val: u8) {
        match (addr & 0x6000, addr & 1) {
            // $8000: bank select
            (0x0000, 0) => {
                self.bank_select = val & 0x07;
                self.prg_mode = val & 0x40 != 0;
                self.chr_inversion = val & 0x80 != 0;
            }
            // $8001: bank data
            (0x0000, 1) => {
                let masked = if self.bank_select >= 6 {
                    val & 0x3F
                } else {
                    val
                };
                self.regs[usize::from(self.bank_select)] = masked;
                log::debug!("MMC3 R{} -> {masked:#04x}", self.bank_select);
            }
            // $A000: mirroring
            (0x2000, 0) => {
                self.mirroring = if val & 1 == 0 {
                    Mirroring::Vertical
                } else {
                    Mirroring::Horizontal
                };
            }
            // $A001: PRG-RAM enable/protect
            (0x2000, 1) => {
                self.prg_ram_enabled = val & 0x80 != 0;
                self.prg_ram_protect = val & 0x40 != 0;
            }
            // $C000: IRQ latch
            (0x4000, 0) => self.irq_latch = val,
            // $C001: IRQ reload
            (0x4000, 1) => {
                self.irq_counter = 0;
                self.irq_reload = true;
            }
            // $E000: IRQ disable + acknowledge
            (0x6000, 0) => {
                self.irq_enabled = false;
                self.irq_pending = false;
                log::trace!("MMC3 IRQ disabled");
            }
            // $E001: IRQ enable
            (0x6000, 1) => self.irq_enabled = true,
            _ => unreachable!(),
        }
    }
}

impl Mapper for Mmc3 {
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
                if self.prg_ram_enabled && !self.prg_ram_protect {
                    self.prg_ram[usize::from(addr - 0x6000)] = val;
                }
            }
            0x8000..=0xFFFF => self.write_register(addr, val),
            _ => {}
        }
    }

    fn peek_chr(&self, addr: u16) -> u8 {
        self.chr[self.chr_index(addr)]
    }

    fn read_chr(&mut self, addr: u16) -> u8 {
        self.tap_a12(addr);
        self.chr[self.chr_index(addr)]
    }

    fn write_chr(&mut self, addr: u16, val: u8) {
        self.tap_a12(addr);
        if self.chr_is_ram {
            let offset = self.chr_index(addr);
            self.chr[offset] = val;
        }
    }

    fn mirroring(&self) -> Mirroring {
        self.mirroring
    }

    fn irq_pending(&self) -> bool {
        self.irq_pending
    }

    fn irq_acknowledge(&mut self) {
        self.irq_pending = false;
    }

    fn a12_rising(&mut self) {
        // Synthesised per-scanline edge from the coarse renderer. The scanline
        // gap guarantees the low-run requirement, so it bypasses the filter.
        self.clock_irq();
        self.a12_last = true;
        self.a12_low_run = 0;
        self.a12_cooldown = A12_COOLDOWN;
    }

    fn reset(&mut self) {
        self.bank_select = 0;
        self.prg_mode = false;
        self.chr_inversion = false;
        self.regs = [0, 2, 4, 5, 6, 7, 0, 1];
        self.prg_ram_enabled = true;
        self.prg_ram_protect = false;
        self.irq_latch = 0;
        self.irq_counter = 0;
        self.irq_reload = false;
        self.irq_enabled = false;
        self.irq_pending = false;
        self.a12_last = false;
        self.a12_low_run = 0;
        self.a12_cooldown = 0;
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
