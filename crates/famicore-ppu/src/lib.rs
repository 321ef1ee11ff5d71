//! Ricoh 2C02 PPU emulation.
//!
//! The PPU owns the console-internal video memories (2 KiB CIRAM, palette
//! RAM, OAM), exposes the eight CPU-visible registers, tracks the loopy
//! scroll state, and produces a 256x240 framebuffer of NES palette indices.
//! Pattern-table storage lives on the cartridge, so every pattern access
//! (and the nametable mirroring decision) goes through the narrow [`PpuBus`]
//! capability the system bus implements over the mapper.
//!
//! Timing is dot-granular (VBlank entry, flag clears, and scroll copies land
//! on their hardware dots) while pixel output is produced one whole scanline
//! at a time; see [`Ppu`] for the trade-off.

mod oam;
mod ppu;
mod registers;
mod render;
mod scroll;
mod vram;

pub use oam::Oam;
pub use ppu::{FRAME_HEIGHT, FRAME_SIZE, FRAME_WIDTH, Ppu};
pub use registers::{PpuCtrl, PpuMask, PpuStatus};
pub use scroll::Scroll;
pub use vram::{Mirroring, Vram};

/// The mapper-side capabilities the PPU needs, resolved per access by the
/// system bus. Never stored on the PPU; always passed by reference into the
/// call that needs it.
pub trait PpuBus {
    /// Live pattern-table read (`$0000-$1FFF`), as seen by the PPUDATA
    /// path. Boards that watch address lines observe this access.
    fn chr_read(&mut self, addr: u16) -> u8;

    /// Pattern-table read for the scanline renderer. Does not count as
    /// address-line activity; the synthesised [`PpuBus::a12_rising`] edge
    /// represents that instead.
    fn chr_peek(&mut self, addr: u16) -> u8;

    /// Pattern-table write (CHR-RAM boards).
    fn chr_write(&mut self, addr: u16, value: u8);

    /// Current nametable mirroring.
    fn mirroring(&self) -> Mirroring;

    /// Synthesised A12 rising edge, delivered once per visible scanline
    /// while background rendering is enabled.
    fn a12_rising(&mut self) {}
}
