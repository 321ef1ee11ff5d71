//! NES emulation core: CPU, PPU, and mapper integration.
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │                    Console                       │
//! │  ┌────────────────────────────────────────────┐  │
//! │  │                  NesBus                    │  │
//! │  │  ┌─────┐  ┌─────┐  ┌────────┐  ┌────────┐  │  │
//! │  │  │ RAM │  │ PPU │  │ Mapper │  │ Input  │  │  │
//! │  │  │ 2KB │  │     │  │        │  │        │  │  │
//! │  │  └─────┘  └─────┘  └────────┘  └────────┘  │  │
//! │  └────────────────────────────────────────────┘  │
//! │                       ▲                          │
//! │                  ┌────┴────┐                     │
//! │                  │   CPU   │                     │
//! │                  └─────────┘                     │
//! └──────────────────────────────────────────────────┘
//! ```
//!
//! The driver loop executes one CPU instruction, advances the PPU by three
//! dots per consumed cycle, and samples the interrupt lines in between: NMI
//! from the PPU (edge, acknowledged on delivery), IRQ from the mapper
//! (level, gated by the CPU's I flag).
//!
//! # Usage
//!
//! ```
//! use famicore_core::{Button, Cartridge, Console, Mirroring};
//!
//! let mut prg = vec![0xEA; 32 * 1024]; // endless NOPs
//! prg[0x7FFC] = 0x00; // reset vector -> $8000
//! prg[0x7FFD] = 0x80;
//! let cart = Cartridge::new(0, Mirroring::Vertical, false, prg, vec![0; 8192])
//!     .expect("well-formed cartridge");
//!
//! let mut console = Console::new(&cart).expect("supported mapper");
//! console.set_button(0, Button::Start, true);
//! console.frame().expect("no CPU halt");
//! let _pixels: &[u8] = console.framebuffer();
//! ```

mod bus;
mod console;
mod input;

pub use bus::NesBus;
pub use console::{Console, EmuError, StepResult};
pub use input::{Button, Controller};

// The cartridge-facing surface, re-exported for drivers.
pub use famicore_cpu::{Cpu, CpuError};
pub use famicore_mappers::{Cartridge, CartridgeError, Mapper, MapperKind, Mirroring};
pub use famicore_ppu::{FRAME_HEIGHT, FRAME_SIZE, FRAME_WIDTH, Ppu};
