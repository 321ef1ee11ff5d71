//! Mapper trait and the variant-tagged dispatch type.
//!
//! Every cartridge board resolves CPU accesses to `$6000-$FFFF` and PPU
//! accesses to the pattern tables (`$0000-$1FFF`), reports its nametable
//! mirroring, and may drive the CPU's IRQ line. The mapper set is closed, so
//! dispatch goes through [`MapperKind`], an enum over the four boards, rather
//! than a boxed trait object.

use crate::cartridge::{Cartridge, CartridgeError};
use crate::mmc1::Mmc1;
use crate::mmc3::Mmc3;
use crate::nrom::Nrom;
use crate::uxrom::Uxrom;

/// Nametable mirroring mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mirroring {
    /// Horizontal mirroring: tables {0,1} alias CIRAM bank 0, {2,3} bank 1.
    #[default]
    Horizontal,
    /// Vertical mirroring: tables {0,2} alias CIRAM bank 0, {1,3} bank 1.
    Vertical,
    /// Four-screen (cartridge VRAM); resolved as vertical at the CIRAM layer.
    FourScreen,
}

/// Cartridge board interface.
///
/// `read_chr` takes `&mut self` on purpose: MMC3 observes address line 12 on
/// every pattern-table access to clock its scanline counter, so even a read
/// mutates board state.
pub trait Mapper {
    /// Read from CPU cartridge space (`$4020-$FFFF`; boards decode
    /// `$6000-$7FFF` PRG-RAM and `$8000-$FFFF` PRG-ROM).
    fn read_prg(&mut self, addr: u16) -> u8;

    /// Write to CPU cartridge space. `$8000-$FFFF` hits board registers;
    /// `$6000-$7FFF` hits PRG-RAM when present and writable.
    fn write_prg(&mut self, addr: u16, val: u8);

    /// Read a pattern-table byte (`$0000-$1FFF`) without touching any
    /// address-line observation state. The renderer uses this path; its
    /// address activity is represented by the synthesised [`Mapper::a12_rising`]
    /// edge instead.
    fn peek_chr(&self, addr: u16) -> u8;

    /// Read from the PPU pattern tables (`$0000-$1FFF`) as a live bus
    /// access. MMC3 overrides this to observe A12 before returning the byte.
    fn read_chr(&mut self, addr: u16) -> u8 {
        self.peek_chr(addr)
    }

    /// Write to the PPU pattern tables. Ignored for CHR-ROM.
    fn write_chr(&mut self, addr: u16, val: u8);

    /// Current nametable mirroring.
    fn mirroring(&self) -> Mirroring;

    /// Level state of the board's IRQ line. Stays asserted until
    /// acknowledged by the program (MMC3: a `$E000` write).
    fn irq_pending(&self) -> bool {
        false
    }

    /// Clear the IRQ line.
    fn irq_acknowledge(&mut self) {}

    /// Synthesised A12 rising edge, delivered once per visible scanline by
    /// the PPU while background rendering is enabled.
    fn a12_rising(&mut self) {}

    /// Return the board to its power-on register state. ROM, CHR-RAM, and
    /// PRG-RAM contents are preserved.
    fn reset(&mut self);

    /// Whether PRG-RAM is battery backed.
    fn has_battery(&self) -> bool {
        false
    }

    /// Battery-backed PRG-RAM, for persisting.
    fn battery_ram(&self) -> Option<&[u8]> {
        None
    }

    /// Restore previously persisted PRG-RAM.
    fn load_battery_ram(&mut self, _data: &[u8]) {}
}

/// The closed set of supported boards.
#[derive(Debug, Clone)]
pub enum MapperKind {
    /// Mapper 0.
    Nrom(Nrom),
    /// Mapper 1.
    Mmc1(Mmc1),
    /// Mapper 2.
    Uxrom(Uxrom),
    /// Mapper 4.
    Mmc3(Mmc3),
}

macro_rules! dispatch {
    ($self:ident, $m:ident => $body:expr) => {
        match $self {
            MapperKind::Nrom($m) => $body,
            MapperKind::Mmc1($m) => $body,
            MapperKind::Uxrom($m) => $body,
            MapperKind::Mmc3($m) => $body,
        }
    };
}

impl MapperKind {
    /// Build the board for a validated cartridge.
    ///
    /// # Errors
    ///
    /// Returns [`CartridgeError::UnsupportedMapper`] for ids outside
    /// {0, 1, 2, 4}.
    pub fn new(cart: &Cartridge) -> Result<Self, CartridgeError> {
        match cart.mapper_id {
            0 => Ok(Self::Nrom(Nrom::new(cart))),
            1 => Ok(Self::Mmc1(Mmc1::new(cart))),
            2 => Ok(Self::Uxrom(Uxrom::new(cart))),
            4 => Ok(Self::Mmc3(Mmc3::new(cart))),
            id => Err(CartridgeError::UnsupportedMapper(id)),
        }
    }

    /// The board's iNES mapper id.
    #[must_use]
    pub fn id(&self) -> u16 {
        match self {
            Self::Nrom(_) => 0,
            Self::Mmc1(_) => 1,
            Self::Uxrom(_) => 2,
            Self::Mmc3(_) => 4,
        }
    }

    /// The board's conventional name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Nrom(_) => "NROM",
            Self::Mmc1(_) => "MMC1",
            Self::Uxrom(_) => "UxROM",
            Self::Mmc3(_) => "MMC3",
        }
    }
}

impl Mapper for MapperKind {
    fn read_prg(&mut self, addr: u16) -> u8 {
        dispatch!(self, m => m.read_prg(addr))
    }

    fn write_prg(&mut self, addr: u16, val: u8) {
        dispatch!(self, m => m.write_prg(addr, val));
    }

    fn peek_chr(&self, addr: u16) -> u8 {
        dispatch!(self, m => m.peek_chr(addr))
    }

    fn read_chr(&mut self, addr: u16) -> u8 {
        dispatch!(self, m => m.read_chr(addr))
    }

    fn write_chr(&mut self, addr: u16, val: u8) {
        dispatch!(self, m => m.write_chr(addr, val));
    }

    fn mirroring(&self) -> Mirroring {
        dispatch!(self, m => m.mirroring())
    }

    fn irq_pending(&self) -> bool {
        dispatch!(self, m => m.irq_pending())
    }

    fn irq_acknowledge(&mut self) {
        dispatch!(self, m => m.irq_acknowledge());
    }

    fn a12_rising(&mut self) {
        dispatch!(self, m => m.a12_rising());
    }

    fn reset(&mut self) {
        dispatch!(self, m => m.reset());
    }

    fn has_battery(&self) -> bool {
        dispatch!(self, m => m.has_battery())
    }

    fn battery_ram(&self) -> Option<&[u8]> {
        dispatch!(self, m => m.battery_ram())
    }

    fn load_battery_ram(&mut self, data: &[u8]) {
        dispatch!(self, m => m.load_battery_ram(data));
    }
}
