//! The console driver: one CPU instruction per step, three PPU dots per
//! CPU cycle, interrupts sampled in between.

use famicore_cpu::{Cpu, CpuError};
use famicore_mappers::{Cartridge, CartridgeError, Mapper, MapperKind};
use famicore_ppu::Ppu;

use crate::bus::NesBus;
use crate::input::Button;

/// Fatal emulation failures, surfaced synchronously from [`Console::step`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EmuError {
    /// The cartridge failed validation at power-on.
    #[error("invalid cartridge: {0}")]
    Cartridge(#[from] CartridgeError),

    /// The CPU halted on a jam or unimplemented opcode.
    #[error("CPU halt: {0}")]
    CpuHalt(#[from] CpuError),
}

/// Outcome of one driver step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepResult {
    /// CPU cycles consumed, interrupt entry and DMA stalls included.
    pub cycles: u32,
    /// True when the PPU wrapped from scanline 260 back to the pre-render
    /// line during this step.
    pub frame_complete: bool,
}

/// A powered-on NES: CPU plus the bus that owns everything else.
#[derive(Debug)]
pub struct Console {
    cpu: Cpu,
    bus: NesBus,
}

impl Console {
    /// Power on with a cartridge: build the board, wire the bus, and run
    /// the reset sequence in hardware order (mapper, PPU, CPU).
    ///
    /// # Errors
    ///
    /// [`EmuError::Cartridge`] when the mapper id is unsupported or the
    /// PRG/CHR images are malformed.
    pub fn new(cart: &Cartridge) -> Result<Self, EmuError> {
        let mapper = MapperKind::new(cart)?;
        log::info!(
            "power-on: mapper {} ({}), {} KiB PRG",
            mapper.id(),
            mapper.name(),
            cart.prg_rom.len() / 1024
        );
        let mut console = Self {
            cpu: Cpu::new(),
            bus: NesBus::new(mapper),
        };
        console.reset();
        Ok(console)
    }

    /// Console reset: reinitialise mapper, PPU, and CPU without
    /// reconstructing anything. RAM and cartridge memories survive.
    pub fn reset(&mut self) {
        self.bus.reset();
        self.cpu.reset(&mut self.bus);
    }

    /// Run one CPU instruction and advance the PPU by exactly three dots
    /// per consumed cycle. Pending interrupts are delivered first: NMI by
    /// edge (acknowledged on delivery), mapper IRQ by level, gated by the
    /// CPU's interrupt-disable flag.
    ///
    /// # Errors
    ///
    /// [`EmuError::CpuHalt`] once the CPU fetches a jam or unimplemented
    /// opcode; the error repeats on every later call until [`Console::reset`].
    pub fn step(&mut self) -> Result<StepResult, EmuError> {
        let mut cycles: u32 = 0;

        if self.bus.ppu.nmi_line() {
            self.bus.ppu.acknowledge_nmi();
            cycles += u32::from(self.cpu.nmi(&mut self.bus));
        } else if self.bus.mapper_irq() {
            // Stays asserted until the program acknowledges it at the
            // mapper, so an I-flag-suppressed IRQ retries next step.
            cycles += u32::from(self.cpu.irq(&mut self.bus));
        }

        cycles += u32::from(self.cpu.step(&mut self.bus)?);
        cycles += u32::from(self.bus.take_dma_cycles());
        self.bus.add_cpu_cycles(cycles);

        let mut frame_complete = false;
        for _ in 0..cycles * 3 {
            if self.bus.step_ppu_dot() {
                frame_complete = true;
            }
        }

        Ok(StepResult {
            cycles,
            frame_complete,
        })
    }

    /// Step until the current frame completes.
    ///
    /// # Errors
    ///
    /// Propagates [`EmuError::CpuHalt`] from [`Console::step`].
    pub fn frame(&mut self) -> Result<(), EmuError> {
        loop {
            if self.step()?.frame_complete {
                return Ok(());
            }
        }
    }

    /// The finished frame: 256x240 palette indices (0-63).
    #[must_use]
    pub fn framebuffer(&self) -> &[u8] {
        self.bus.ppu.frame_buffer()
    }

    /// Host input entry point. `pad` is 0 or 1.
    pub fn set_button(&mut self, pad: usize, button: Button, pressed: bool) {
        self.bus.set_button(pad, button, pressed);
    }

    /// Whether the cartridge persists its PRG-RAM.
    #[must_use]
    pub fn has_battery(&self) -> bool {
        self.bus.mapper.has_battery()
    }

    /// Battery-backed PRG-RAM for saving, when present.
    #[must_use]
    pub fn battery_ram(&self) -> Option<&[u8]> {
        self.bus.mapper.battery_ram()
    }

    /// Restore previously saved PRG-RAM.
    pub fn load_battery_ram(&mut self, data: &[u8]) {
        self.bus.mapper.load_battery_ram(data);
    }

    /// CPU registers, for debugging and tests.
    #[must_use]
    pub fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    /// PPU state, for debugging and tests.
    #[must_use]
    pub fn ppu(&self) -> &Ppu {
        &self.bus.ppu
    }

    /// The system bus, for debugging and tests.
    #[must_use]
    pub fn bus(&self) -> &NesBus {
        &self.bus
    }

    /// Mutable bus access, for test harnesses that poke hardware directly.
    pub fn bus_mut(&mut self) -> &mut NesBus {
        &mut self.bus
    }
}
