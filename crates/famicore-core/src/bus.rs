//! The CPU-side system bus.
//!
//! Routes every CPU access across internal RAM, the PPU registers, the OAM
//! DMA trigger, the controller ports, and the cartridge. Owns the single
//! mapper instance both the CPU (register writes) and the PPU (pattern
//! fetches, A12 taps) reach, and the two controller latches.

use famicore_cpu::Bus;
use famicore_mappers::{Mapper, MapperKind, Mirroring};
use famicore_ppu::{Ppu, PpuBus};

use crate::input::{Button, Controller};

/// Adapter giving the PPU its narrow view of the mapper. Built fresh for
/// each access; never stored.
struct ChrBus<'a> {
    mapper: &'a mut MapperKind,
}

/// The PPU crate keeps its own copy of the mirroring enum so it does not
/// depend on the mapper crate; the bus converts at the seam.
fn convert_mirroring(mirroring: Mirroring) -> famicore_ppu::Mirroring {
    match mirroring {
        Mirroring::Horizontal => famicore_ppu::Mirroring::Horizontal,
        Mirroring::Vertical => famicore_ppu::Mirroring::Vertical,
        Mirroring::FourScreen => famicore_ppu::Mirroring::FourScreen,
    }
}

impl PpuBus for ChrBus<'_> {
    fn chr_read(&mut self, addr: u16) -> u8 {
        self.mapper.read_chr(addr)
    }

    fn chr_peek(&mut self, addr: u16) -> u8 {
        self.mapper.peek_chr(addr)
    }

    fn chr_write(&mut self, addr: u16, value: u8) {
        self.mapper.write_chr(addr, value);
    }

    fn mirroring(&self) -> famicore_ppu::Mirroring {
        convert_mirroring(self.mapper.mirroring())
    }

    fn a12_rising(&mut self) {
        self.mapper.a12_rising();
    }
}

/// NES system bus.
#[derive(Debug)]
pub struct NesBus {
    /// 2 KiB internal RAM, mirrored across `$0000-$1FFF`.
    pub ram: [u8; 2048],
    /// Picture processing unit.
    pub ppu: Ppu,
    /// Cartridge board.
    pub mapper: MapperKind,
    controllers: [Controller; 2],
    /// Stall cycles recorded by a `$4014` write, folded into the current
    /// instruction's cost by the driver.
    dma_cycles: u16,
    /// CPU cycle count, for DMA parity.
    cpu_cycles: u64,
}

impl NesBus {
    /// A bus wired to the given cartridge board.
    #[must_use]
    pub fn new(mapper: MapperKind) -> Self {
        Self {
            ram: [0; 2048],
            ppu: Ppu::new(),
            mapper,
            controllers: [Controller::new(), Controller::new()],
            dma_cycles: 0,
            cpu_cycles: 0,
        }
    }

    /// Reset PPU, mapper, and bus latches. RAM contents survive, as they
    /// do across a console reset.
    pub fn reset(&mut self) {
        self.mapper.reset();
        self.ppu.reset();
        self.controllers[0].reset();
        self.controllers[1].reset();
        self.dma_cycles = 0;
        self.cpu_cycles = 0;
    }

    /// Advance the PPU by one dot. Returns true on frame completion.
    pub fn step_ppu_dot(&mut self) -> bool {
        let mut chr = ChrBus {
            mapper: &mut self.mapper,
        };
        self.ppu.step(&mut chr)
    }

    /// Stall cycles from a `$4014` write during the last instruction, if
    /// any. Reading takes them.
    pub fn take_dma_cycles(&mut self) -> u16 {
        core::mem::take(&mut self.dma_cycles)
    }

    /// Fold executed CPU cycles into the parity counter.
    pub fn add_cpu_cycles(&mut self, cycles: u32) {
        self.cpu_cycles += u64::from(cycles);
    }

    /// Level of the mapper's IRQ line.
    #[must_use]
    pub fn mapper_irq(&self) -> bool {
        self.mapper.irq_pending()
    }

    /// Host input entry point.
    pub fn set_button(&mut self, pad: usize, button: Button, pressed: bool) {
        self.controllers[pad & 1].set_button(button, pressed);
    }

    /// `$4014` write: copy one CPU page into OAM and record the stall.
    fn oam_dma(&mut self, page: u8) {
        let base = u16::from(page) << 8;
        let mut buffer = [0u8; 256];
        for (i, byte) in buffer.iter_mut().enumerate() {
            *byte = self.dma_read(base.wrapping_add(i as u16));
        }
        self.ppu.oam_dma(&buffer);
        // 513 cycles, or 514 when triggered on an odd CPU cycle.
        self.dma_cycles = if self.cpu_cycles % 2 == 1 { 514 } else { 513 };
    }

    /// DMA source read: plain memory only, no register side effects.
    fn dma_read(&mut self, addr: u16) -> u8 {
        match addr {
            0x0000..=0x1FFF => self.ram[usize::from(addr & 0x07FF)],
            0x4020..=0xFFFF => self.mapper.read_prg(addr),
            _ => 0,
        }
    }
}

impl Bus for NesBus {
    fn read(&mut self, addr: u16) -> u8 {
        match addr {
            0x0000..=0x1FFF => self.ram[usize::from(addr & 0x07FF)],
            0x2000..=0x3FFF => {
                let mut chr = ChrBus {
                    mapper: &mut self.mapper,
                };
                self.ppu.read_register(addr, &mut chr)
            }
            0x4016 => self.controllers[0].read(),
            0x4017 => self.controllers[1].read(),
            // APU registers and the DMA trigger are write-side only.
            0x4000..=0x401F => 0,
            0x4020..=0xFFFF => self.mapper.read_prg(addr),
        }
    }

    fn write(&mut self, addr: u16, value: u8) {
        match addr {
            0x0000..=0x1FFF => self.ram[usize::from(addr & 0x07FF)] = value,
            0x2000..=0x3FFF => {
                let mut chr = ChrBus {
                    mapper: &mut self.mapper,
                };
                self.ppu.write_register(addr, value, &mut chr);
            }
            0x4014 => self.oam_dma(value),
            0x4016 => {
                // One strobe line feeds both ports.
                self.controllers[0].write_strobe(value);
                self.controllers[1].write_strobe(value);
            }
            // APU register space is a no-op in this core.
            0x4000..=0x401F => {}
            0x4020..=0xFFFF => self.mapper.write_prg(addr, value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use famicore_mappers::Cartridge;
    use proptest::prelude::*;

    fn test_bus() -> NesBus {
        let cart = Cartridge::new(
            0,
            Mirroring::Vertical,
            false,
            vec![0; 32 * 1024],
            vec![0; 8 * 1024],
        )
        .unwrap();
        NesBus::new(MapperKind::new(&cart).unwrap())
    }

    #[test]
    fn test_ram_mirroring() {
        let mut bus = test_bus();
        bus.write(0x0000, 0x42);
        assert_eq!(bus.read(0x0800), 0x42);
        assert_eq!(bus.read(0x1000), 0x42);
        assert_eq!(bus.read(0x1800), 0x42);

        bus.write(0x1234, 0xAB);
        assert_eq!(bus.read(0x0234), 0xAB);
    }

    #[test]
    fn test_controller_round_trip() {
        let mut bus = test_bus();
        bus.set_button(0, Button::A, true);
        bus.set_button(0, Button::Start, true);
        bus.write(0x4016, 1);
        bus.write(0x4016, 0);

        let bits: Vec<u8> = (0..8).map(|_| bus.read(0x4016)).collect();
        assert_eq!(bits, vec![1, 0, 0, 1, 0, 0, 0, 0]);
        // Port 2 latched nothing pressed.
        assert_eq!(bus.read(0x4017), 0);
    }

    #[test]
    fn test_oam_dma_copies_a_page() {
        let mut bus = test_bus();
        for i in 0..256u16 {
            bus.write(0x0200 + i, i as u8);
        }
        bus.write(0x4014, 0x02);
        assert!(matches!(bus.take_dma_cycles(), 513 | 514));
        assert_eq!(bus.take_dma_cycles(), 0); // taken exactly once

        for i in 0..=255u8 {
            bus.write(0x2003, i);
            assert_eq!(bus.read(0x2004), i);
        }
    }

    #[test]
    fn test_dma_parity_costs_one_extra() {
        let mut bus = test_bus();
        bus.add_cpu_cycles(3);
        bus.write(0x4014, 0x00);
        assert_eq!(bus.take_dma_cycles(), 514);

        bus.add_cpu_cycles(1);
        bus.write(0x4014, 0x00);
        assert_eq!(bus.take_dma_cycles(), 513);
    }

    #[test]
    fn test_apu_space_reads_zero() {
        let mut bus = test_bus();
        for addr in [0x4000, 0x4008, 0x4013, 0x4014, 0x4015, 0x4018, 0x401F] {
            bus.write(addr, 0xFF);
            assert_eq!(bus.read(addr), 0);
        }
    }

    #[test]
    fn test_cartridge_space_reaches_mapper() {
        let cart = Cartridge::new(
            0,
            Mirroring::Vertical,
            false,
            {
                let mut prg = vec![0; 32 * 1024];
                prg[0] = 0x60;
                prg
            },
            vec![0; 8 * 1024],
        )
        .unwrap();
        let mut bus = NesBus::new(MapperKind::new(&cart).unwrap());
        assert_eq!(bus.read(0x8000), 0x60);

        bus.write(0x6000, 0x42);
        assert_eq!(bus.read(0x6000), 0x42);
    }

    #[test]
    fn test_ppu_register_mirroring_through_bus() {
        let mut bus = test_bus();
        bus.write(0x2003, 0x05);
        bus.write(0x3FFC, 0x99); // $2004 mirror
        bus.write(0x2003, 0x05);
        assert_eq!(bus.read(0x2EFC), 0x99); // $2004 mirror again
    }

    proptest! {
        /// RAM write then read through any mirror sees the same byte.
        #[test]
        fn prop_ram_mirror_round_trip(addr in 0u16..0x2000, value in any::<u8>()) {
            let mut bus = test_bus();
            bus.write(addr, value);
            prop_assert_eq!(bus.read(addr & 0x07FF), value);
            prop_assert_eq!(bus.read(addr), value);
        }
    }
}
