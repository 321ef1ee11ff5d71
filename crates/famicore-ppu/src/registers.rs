//! The externally visible PPU registers: PPUCTRL, PPUMASK, PPUSTATUS.

use bitflags::bitflags;

bitflags! {
    /// PPUCTRL (`$2000`), write only.
    ///
    /// ```text
    /// 7  bit  0
    /// VPHB SINN
    /// |||| ||++- base nametable (written into t bits 10-11)
    /// |||| |+--- VRAM increment per PPUDATA access (0: +1, 1: +32)
    /// |||| +---- sprite pattern table for 8x8 sprites (0: $0000, 1: $1000)
    /// |||+------ background pattern table (0: $0000, 1: $1000)
    /// ||+------- sprite size (0: 8x8, 1: 8x16)
    /// |+-------- master/slave (unused)
    /// +--------- NMI at the start of vertical blank
    /// ```
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct PpuCtrl: u8 {
        /// Base nametable, X bit.
        const NAMETABLE_X = 1 << 0;
        /// Base nametable, Y bit.
        const NAMETABLE_Y = 1 << 1;
        /// VRAM address increment select.
        const VRAM_INCREMENT = 1 << 2;
        /// Sprite pattern table select (8x8 mode only).
        const SPRITE_TABLE = 1 << 3;
        /// Background pattern table select.
        const BG_TABLE = 1 << 4;
        /// 8x16 sprite mode.
        const SPRITE_SIZE = 1 << 5;
        /// Master/slave select, unused on the NES.
        const MASTER_SLAVE = 1 << 6;
        /// NMI enable.
        const NMI_ENABLE = 1 << 7;
    }
}

impl PpuCtrl {
    /// VRAM address step for PPUDATA accesses: 1 or 32.
    #[inline]
    #[must_use]
    pub fn vram_increment(self) -> u16 {
        if self.contains(Self::VRAM_INCREMENT) { 32 } else { 1 }
    }

    /// Background pattern table base: `$0000` or `$1000`.
    #[inline]
    #[must_use]
    pub fn bg_table_addr(self) -> u16 {
        if self.contains(Self::BG_TABLE) { 0x1000 } else { 0x0000 }
    }

    /// Sprite pattern table base for 8x8 sprites: `$0000` or `$1000`.
    #[inline]
    #[must_use]
    pub fn sprite_table_addr(self) -> u16 {
        if self.contains(Self::SPRITE_TABLE) {
            0x1000
        } else {
            0x0000
        }
    }

    /// Sprite height in pixels: 8 or 16.
    #[inline]
    #[must_use]
    pub fn sprite_height(self) -> u16 {
        if self.contains(Self::SPRITE_SIZE) { 16 } else { 8 }
    }

    /// Whether an NMI should be raised at the start of vertical blank.
    #[inline]
    #[must_use]
    pub fn nmi_enabled(self) -> bool {
        self.contains(Self::NMI_ENABLE)
    }
}

bitflags! {
    /// PPUMASK (`$2001`), write only.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct PpuMask: u8 {
        /// Greyscale output.
        const GREYSCALE = 1 << 0;
        /// Show background in the leftmost 8 pixels.
        const SHOW_BG_LEFT = 1 << 1;
        /// Show sprites in the leftmost 8 pixels.
        const SHOW_SPRITES_LEFT = 1 << 2;
        /// Background rendering enable.
        const SHOW_BG = 1 << 3;
        /// Sprite rendering enable.
        const SHOW_SPRITES = 1 << 4;
        /// Emphasize red.
        const EMPHASIZE_RED = 1 << 5;
        /// Emphasize green.
        const EMPHASIZE_GREEN = 1 << 6;
        /// Emphasize blue.
        const EMPHASIZE_BLUE = 1 << 7;
    }
}

impl PpuMask {
    /// Background or sprite rendering is on.
    #[inline]
    #[must_use]
    pub fn rendering_enabled(self) -> bool {
        self.intersects(Self::SHOW_BG | Self::SHOW_SPRITES)
    }

    /// Background rendering is on.
    #[inline]
    #[must_use]
    pub fn show_background(self) -> bool {
        self.contains(Self::SHOW_BG)
    }

    /// Sprite rendering is on.
    #[inline]
    #[must_use]
    pub fn show_sprites(self) -> bool {
        self.contains(Self::SHOW_SPRITES)
    }

    /// Background visible in the left 8-pixel column.
    #[inline]
    #[must_use]
    pub fn show_bg_left(self) -> bool {
        self.contains(Self::SHOW_BG_LEFT)
    }

    /// Sprites visible in the left 8-pixel column.
    #[inline]
    #[must_use]
    pub fn show_sprites_left(self) -> bool {
        self.contains(Self::SHOW_SPRITES_LEFT)
    }
}

bitflags! {
    /// PPUSTATUS (`$2002`), read only. The low five bits read as zero.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct PpuStatus: u8 {
        /// More than eight sprites fell on one scanline.
        const SPRITE_OVERFLOW = 1 << 5;
        /// Sprite 0 overlapped an opaque background pixel.
        const SPRITE_ZERO_HIT = 1 << 6;
        /// In vertical blank.
        const VBLANK = 1 << 7;
    }
}

impl PpuStatus {
    /// In the vertical blanking period.
    #[inline]
    #[must_use]
    pub fn in_vblank(self) -> bool {
        self.contains(Self::VBLANK)
    }
}
