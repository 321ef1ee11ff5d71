//! NES cartridge mapper implementations.
//!
//! Mappers own the cartridge memories (PRG-ROM, CHR-ROM/RAM, optional
//! battery-backed PRG-RAM), re-bank them under program control, report
//! nametable mirroring, and (for MMC3) derive a scanline IRQ from PPU
//! address-line activity.
//!
//! # Supported boards
//!
//! | Mapper | Name  | Banking |
//! |--------|-------|---------|
//! | 0      | NROM  | none |
//! | 1      | MMC1  | serial shift register, 16/32 KiB PRG, 4/8 KiB CHR |
//! | 2      | UxROM | 16 KiB PRG select, last bank fixed |
//! | 4      | MMC3  | 8 KiB PRG windows, 1/2 KiB CHR slots, scanline IRQ |
//!
//! # Example
//!
//! ```
//! use famicore_mappers::{Cartridge, Mapper, MapperKind, Mirroring};
//!
//! let cart = Cartridge::new(
//!     0,
//!     Mirroring::Vertical,
//!     false,
//!     vec![0; 32 * 1024],
//!     vec![0; 8 * 1024],
//! )
//! .expect("well-formed cartridge");
//! let mut mapper = MapperKind::new(&cart).expect("supported mapper");
//!
//! let opcode = mapper.read_prg(0x8000);
//! let tile = mapper.read_chr(0x0000);
//! # let _ = (opcode, tile);
//! ```

mod cartridge;
mod mapper;
mod mmc1;
mod mmc3;
mod nrom;
mod uxrom;

pub use cartridge::{CHR_UNIT, Cartridge, CartridgeError, PRG_RAM_SIZE, PRG_UNIT};
pub use mapper::{Mapper, MapperKind, Mirroring};
pub use mmc1::Mmc1;
pub use mmc3::Mmc3;
pub use nrom::Nrom;
pub use uxrom::Uxrom;

/// Mapper ids this crate implements.
pub const SUPPORTED_MAPPERS: [u16; 4] = [0, 1, 2, 4];

/// Check whether a mapper id is in the supported set.
#[must_use]
pub fn is_supported(mapper_id: u16) -> bool {
    SUPPORTED_MAPPERS.contains(&mapper_id)
}
