//! Scanline rendering: background walk, sprite overlay, composition.
//!
//! A whole visible scanline is produced in one pass. The background walks
//! the loopy cursor across up to 33 tile fetches honouring fine X; sprites
//! are overlaid from OAM with flips, 8x16 mode, and priority; composition
//! applies left-edge clipping and detects sprite-0 hits.

use crate::PpuBus;
use crate::oam::{SPRITE_BYTES, SPRITE_COUNT};
use crate::ppu::{FRAME_WIDTH, Ppu};
use crate::registers::PpuStatus;
use crate::scroll::Scroll;

/// Hardware renders at most eight sprites per scanline.
const SPRITES_PER_LINE: usize = 8;

/// One fetched background tile row.
struct BgTile {
    lo: u8,
    hi: u8,
    palette: u8,
}

impl Ppu {
    /// Render visible scanline `line` into the framebuffer.
    pub(crate) fn render_scanline(&mut self, line: usize, bus: &mut impl PpuBus) {
        let backdrop = self.vram.palette_entry(0);

        if !self.mask.rendering_enabled() {
            let start = line * FRAME_WIDTH;
            self.framebuffer[start..start + FRAME_WIDTH].fill(backdrop);
            return;
        }

        let row = &mut [0u8; FRAME_WIDTH];

        let mut bg_pattern = [0u8; FRAME_WIDTH];
        let mut bg_color = [backdrop; FRAME_WIDTH];
        if self.mask.show_background() {
            self.render_background(bus, &mut bg_pattern, &mut bg_color);
        }

        let mut sp_pattern = [0u8; FRAME_WIDTH];
        let mut sp_color = [0u8; FRAME_WIDTH];
        let mut sp_behind = [false; FRAME_WIDTH];
        let mut sp_zero = [false; FRAME_WIDTH];
        if self.mask.show_sprites() {
            self.render_sprites(
                line,
                bus,
                &mut sp_pattern,
                &mut sp_color,
                &mut sp_behind,
                &mut sp_zero,
            );
        }

        for x in 0..FRAME_WIDTH {
            let bg = if x < 8 && !self.mask.show_bg_left() {
                0
            } else {
                bg_pattern[x]
            };
            let sp = if x < 8 && !self.mask.show_sprites_left() {
                0
            } else {
                sp_pattern[x]
            };

            // Both layers opaque at sprite 0's pixel; hardware never
            // reports a hit at x = 255.
            if sp != 0 && bg != 0 && sp_zero[x] && x != 255 {
                self.status.insert(PpuStatus::SPRITE_ZERO_HIT);
            }

            row[x] = match (bg, sp) {
                (0, 0) => backdrop,
                (0, _) => sp_color[x],
                (_, 0) => bg_color[x],
                _ => {
                    if sp_behind[x] {
                        bg_color[x]
                    } else {
                        sp_color[x]
                    }
                }
            };
        }

        let start = line * FRAME_WIDTH;
        self.framebuffer[start..start + FRAME_WIDTH].copy_from_slice(row);
    }

    /// Walk the loopy cursor across the scanline, sampling pattern bits.
    fn render_background(
        &mut self,
        bus: &mut impl PpuBus,
        pattern_out: &mut [u8; FRAME_WIDTH],
        color_out: &mut [u8; FRAME_WIDTH],
    ) {
        // Walk a copy: hardware mutates v the same way, but the horizontal
        // restore at the start of the next line undoes everything this walk
        // changes, and the vertical step is applied by the caller.
        let mut cursor = self.scroll;
        let fine_x = usize::from(cursor.fine_x());
        let mut tile = self.fetch_bg_tile(cursor, bus);

        for x in 0..FRAME_WIDTH {
            let col = (x + fine_x) & 0x07;
            let bit = 7 - col;
            let pattern = (((tile.hi >> bit) & 1) << 1) | ((tile.lo >> bit) & 1);
            if pattern != 0 {
                pattern_out[x] = pattern;
                color_out[x] = self.vram.palette_entry((tile.palette << 2) | pattern);
            }
            if col == 7 && x + 1 < FRAME_WIDTH {
                cursor.increment_x();
                tile = self.fetch_bg_tile(cursor, bus);
            }
        }
    }

    /// Fetch the tile row the cursor points at: nametable byte, attribute
    /// quadrant, and the two pattern planes.
    fn fetch_bg_tile(&self, cursor: Scroll, bus: &mut impl PpuBus) -> BgTile {
        let mirroring = bus.mirroring();
        let tile_index = self.vram.read(cursor.nametable_addr(), mirroring);
        let attr = self.vram.read(cursor.attribute_addr(), mirroring);
        // Attribute byte covers a 4x4 tile area; two bits per 2x2 quadrant.
        let shift = ((cursor.coarse_y() & 0x02) << 1) | (cursor.coarse_x() & 0x02);
        let palette = (attr >> shift) & 0x03;

        let addr = self.ctrl.bg_table_addr()
            + u16::from(tile_index) * 16
            + u16::from(cursor.fine_y());
        BgTile {
            lo: bus.chr_peek(addr),
            hi: bus.chr_peek(addr + 8),
            palette,
        }
    }

    /// Overlay up to eight OAM sprites onto the scanline buffers. Lower
    /// OAM index wins overlaps.
    #[allow(clippy::too_many_arguments)]
    fn render_sprites(
        &mut self,
        line: usize,
        bus: &mut impl PpuBus,
        pattern_out: &mut [u8; FRAME_WIDTH],
        color_out: &mut [u8; FRAME_WIDTH],
        behind_out: &mut [bool; FRAME_WIDTH],
        zero_out: &mut [bool; FRAME_WIDTH],
    ) {
        let oam = *self.oam.entries();
        let height = usize::from(self.ctrl.sprite_height());
        let mut on_line = 0usize;

        for index in 0..SPRITE_COUNT {
            let entry = &oam[index * SPRITE_BYTES..(index + 1) * SPRITE_BYTES];
            let (oam_y, tile, attr, sprite_x) = (entry[0], entry[1], entry[2], entry[3]);

            // Sprites appear one line below their OAM Y; Y >= 240 parks
            // the sprite off screen.
            if oam_y >= 240 {
                continue;
            }
            let top = usize::from(oam_y) + 1;
            if line < top || line >= top + height {
                continue;
            }

            on_line += 1;
            if on_line > SPRITES_PER_LINE {
                self.status.insert(PpuStatus::SPRITE_OVERFLOW);
                break;
            }

            let mut row = line - top;
            if attr & 0x80 != 0 {
                row = height - 1 - row;
            }

            let (base, tile_index) = if height == 16 {
                // In 8x16 mode the tile's low bit picks the pattern table
                // and the even/odd pair covers top/bottom halves.
                let base = if tile & 1 == 0 { 0x0000 } else { 0x1000 };
                let mut index = tile & 0xFE;
                if row >= 8 {
                    index |= 1;
                    row -= 8;
                }
                (base, index)
            } else {
                (self.ctrl.sprite_table_addr(), tile)
            };

            let addr = base + u16::from(tile_index) * 16 + row as u16;
            let lo = bus.chr_peek(addr);
            let hi = bus.chr_peek(addr + 8);

            for px in 0..8usize {
                let x = usize::from(sprite_x) + px;
                if x >= FRAME_WIDTH {
                    break;
                }
                if pattern_out[x] != 0 {
                    continue;
                }
                let bit = if attr & 0x40 != 0 { px } else { 7 - px };
                let pattern = (((hi >> bit) & 1) << 1) | ((lo >> bit) & 1);
                if pattern == 0 {
                    continue;
                }
                pattern_out[x] = pattern;
                color_out[x] = self
                    .vram
                    .palette_entry(0x10 | ((attr & 0x03) << 2) | pattern);
                behind_out[x] = attr & 0x20 != 0;
                zero_out[x] = index == 0;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vram::Mirroring;

    struct TestBus {
        chr: Vec<u8>,
        mirroring: Mirroring,
    }

    impl TestBus {
        fn new() -> Self {
            Self {
                chr: vec![0; 0x2000],
                mirroring: Mirroring::Horizontal,
            }
        }

        /// Make every row of `tile` solid pattern value 1 (low plane).
        fn solid_tile(&mut self, base: u16, tile: u8) {
            let start = usize::from(base) + usize::from(tile) * 16;
            for row in 0..8 {
                self.chr[start + row] = 0xFF;
            }
        }
    }

    impl PpuBus for TestBus {
        fn chr_read(&mut self, addr: u16) -> u8 {
            self.chr[usize::from(addr & 0x1FFF)]
        }

        fn chr_peek(&mut self, addr: u16) -> u8 {
            self.chr[usize::from(addr & 0x1FFF)]
        }

        fn chr_write(&mut self, addr: u16, value: u8) {
            self.chr[usize::from(addr & 0x1FFF)] = value;
        }

        fn mirroring(&self) -> Mirroring {
            self.mirroring
        }
    }

    fn write_vram(ppu: &mut Ppu, bus: &mut TestBus, addr: u16, value: u8) {
        ppu.write_register(0x2006, (addr >> 8) as u8, bus);
        ppu.write_register(0x2006, (addr & 0xFF) as u8, bus);
        ppu.write_register(0x2007, value, bus);
    }

    /// Palette setup: backdrop $21, BG palette 0 color 1 = $16, sprite
    /// palette 0 color 1 = $2A.
    fn setup_palettes(ppu: &mut Ppu, bus: &mut TestBus) {
        write_vram(ppu, bus, 0x3F00, 0x21);
        write_vram(ppu, bus, 0x3F01, 0x16);
        write_vram(ppu, bus, 0x3F11, 0x2A);
    }

    #[test]
    fn test_rendering_disabled_fills_backdrop() {
        let mut ppu = Ppu::new();
        let mut bus = TestBus::new();
        setup_palettes(&mut ppu, &mut bus);
        ppu.render_scanline(7, &mut bus);
        assert!(ppu.frame_buffer()[7 * FRAME_WIDTH..8 * FRAME_WIDTH]
            .iter()
            .all(|&c| c == 0x21));
    }

    #[test]
    fn test_background_tile_pixels() {
        let mut ppu = Ppu::new();
        let mut bus = TestBus::new();
        setup_palettes(&mut ppu, &mut bus);
        bus.solid_tile(0x0000, 1);
        // Tile (2, 0) of nametable 0 is tile index 1; everything else 0.
        write_vram(&mut ppu, &mut bus, 0x2002, 0x01);
        // Pointing v back at the nametable origin for the render walk.
        ppu.write_register(0x2006, 0x20, &mut bus);
        ppu.write_register(0x2006, 0x00, &mut bus);
        ppu.write_register(0x2001, 0x0A, &mut bus); // BG on, left column on

        ppu.render_scanline(0, &mut bus);
        let row = &ppu.frame_buffer()[0..FRAME_WIDTH];
        // Tile 2 covers pixels 16-23.
        assert!(row[0..16].iter().all(|&c| c == 0x21));
        assert!(row[16..24].iter().all(|&c| c == 0x16));
        assert!(row[24..].iter().all(|&c| c == 0x21));
    }

    #[test]
    fn test_fine_x_shifts_background() {
        let mut ppu = Ppu::new();
        let mut bus = TestBus::new();
        setup_palettes(&mut ppu, &mut bus);
        bus.solid_tile(0x0000, 1);
        write_vram(&mut ppu, &mut bus, 0x2002, 0x01);
        // Fine X = 3 via PPUSCROLL first write; coarse X stays 0.
        ppu.read_register(0x2002, &mut bus);
        ppu.write_register(0x2005, 0x03, &mut bus);
        ppu.write_register(0x2005, 0x00, &mut bus);
        ppu.write_register(0x2006, 0x20, &mut bus);
        ppu.write_register(0x2006, 0x00, &mut bus);
        ppu.write_register(0x2001, 0x0A, &mut bus);

        ppu.render_scanline(0, &mut bus);
        let row = &ppu.frame_buffer()[0..FRAME_WIDTH];
        // The scene shifts left by three pixels.
        assert!(row[13..21].iter().all(|&c| c == 0x16));
        assert_eq!(row[12], 0x21);
        assert_eq!(row[21], 0x21);
    }

    #[test]
    fn test_sprite_overlays_background() {
        let mut ppu = Ppu::new();
        let mut bus = TestBus::new();
        setup_palettes(&mut ppu, &mut bus);
        bus.solid_tile(0x0000, 2);
        // Sprite 3 at (100, line 50): OAM Y is one less than screen Y.
        ppu.write_register(0x2003, 12, &mut bus);
        for byte in [49, 2, 0x00, 100] {
            ppu.write_register(0x2004, byte, &mut bus);
        }
        ppu.write_register(0x2001, 0x1E, &mut bus); // BG + sprites, no clip

        ppu.render_scanline(50, &mut bus);
        let row = &ppu.frame_buffer()[50 * FRAME_WIDTH..51 * FRAME_WIDTH];
        assert!(row[100..108].iter().all(|&c| c == 0x2A));
        assert_eq!(row[99], 0x21);
        assert_eq!(row[108], 0x21);
    }

    #[test]
    fn test_sprite_behind_background() {
        let mut ppu = Ppu::new();
        let mut bus = TestBus::new();
        setup_palettes(&mut ppu, &mut bus);
        bus.solid_tile(0x0000, 1);
        bus.solid_tile(0x0000, 2);
        // Opaque BG everywhere on row 0 of nametable 0.
        for col in 0..32 {
            write_vram(&mut ppu, &mut bus, 0x2000 + col, 0x01);
        }
        // Priority-behind sprite at (40, line 4).
        ppu.write_register(0x2003, 0, &mut bus);
        for byte in [3, 2, 0x20, 40] {
            ppu.write_register(0x2004, byte, &mut bus);
        }
        ppu.write_register(0x2006, 0x20, &mut bus);
        ppu.write_register(0x2006, 0x00, &mut bus);
        ppu.write_register(0x2001, 0x1E, &mut bus);

        ppu.render_scanline(4, &mut bus);
        let row = &ppu.frame_buffer()[4 * FRAME_WIDTH..5 * FRAME_WIDTH];
        // BG wins where both are opaque.
        assert!(row[40..48].iter().all(|&c| c == 0x16));
        // The behind-sprite still sets the sprite-0 hit flag.
        assert!(ppu.status().contains(PpuStatus::SPRITE_ZERO_HIT));
    }

    #[test]
    fn test_sprite_zero_hit_requires_overlap_and_no_clip() {
        let mut ppu = Ppu::new();
        let mut bus = TestBus::new();
        setup_palettes(&mut ppu, &mut bus);
        bus.solid_tile(0x0000, 1);
        // Opaque BG across tiles (0,0) and (1,0).
        write_vram(&mut ppu, &mut bus, 0x2000, 0x01);
        write_vram(&mut ppu, &mut bus, 0x2001, 0x01);
        // Sprite 0 at (2, line 3), straddling the left column.
        ppu.write_register(0x2003, 0, &mut bus);
        for byte in [2, 1, 0x00, 2] {
            ppu.write_register(0x2004, byte, &mut bus);
        }
        ppu.write_register(0x2006, 0x20, &mut bus);
        ppu.write_register(0x2006, 0x00, &mut bus);

        // Left clipping on: overlap happens only in the clipped columns
        // for x < 8, but the sprite spans 2..10, so 8..10 still hits.
        ppu.write_register(0x2001, 0x18, &mut bus);
        ppu.render_scanline(3, &mut bus);
        assert!(ppu.status().contains(PpuStatus::SPRITE_ZERO_HIT));
    }

    #[test]
    fn test_sprite_zero_hit_suppressed_by_left_clip() {
        let mut ppu = Ppu::new();
        let mut bus = TestBus::new();
        setup_palettes(&mut ppu, &mut bus);
        bus.solid_tile(0x0000, 1);
        write_vram(&mut ppu, &mut bus, 0x2000, 0x01);
        // Sprite 0 entirely inside the left 8 pixels.
        ppu.write_register(0x2003, 0, &mut bus);
        for byte in [2, 1, 0x00, 0] {
            ppu.write_register(0x2004, byte, &mut bus);
        }
        ppu.write_register(0x2006, 0x20, &mut bus);
        ppu.write_register(0x2006, 0x00, &mut bus);

        ppu.write_register(0x2001, 0x18, &mut bus); // clip both layers
        ppu.render_scanline(3, &mut bus);
        assert!(!ppu.status().contains(PpuStatus::SPRITE_ZERO_HIT));
    }

    #[test]
    fn test_vertical_flip() {
        let mut ppu = Ppu::new();
        let mut bus = TestBus::new();
        setup_palettes(&mut ppu, &mut bus);
        // Tile 5: only row 0 is opaque.
        bus.chr[5 * 16] = 0xFF;
        // Vertically flipped sprite at (60, lines 21-28): the opaque row
        // lands on the bottom line.
        ppu.write_register(0x2003, 0, &mut bus);
        for byte in [20, 5, 0x80, 60] {
            ppu.write_register(0x2004, byte, &mut bus);
        }
        ppu.write_register(0x2001, 0x1E, &mut bus);

        ppu.render_scanline(21, &mut bus);
        let top = &ppu.frame_buffer()[21 * FRAME_WIDTH..22 * FRAME_WIDTH];
        assert!(top[60..68].iter().all(|&c| c == 0x21));

        ppu.render_scanline(28, &mut bus);
        let bottom = &ppu.frame_buffer()[28 * FRAME_WIDTH..29 * FRAME_WIDTH];
        assert!(bottom[60..68].iter().all(|&c| c == 0x2A));
    }

    #[test]
    fn test_horizontal_flip() {
        let mut ppu = Ppu::new();
        let mut bus = TestBus::new();
        setup_palettes(&mut ppu, &mut bus);
        // Tile 6: only the leftmost column opaque.
        for row in 0..8 {
            bus.chr[6 * 16 + row] = 0x80;
        }
        ppu.write_register(0x2003, 0, &mut bus);
        for byte in [9, 6, 0x40, 30] {
            ppu.write_register(0x2004, byte, &mut bus);
        }
        ppu.write_register(0x2001, 0x1E, &mut bus);

        ppu.render_scanline(10, &mut bus);
        let row = &ppu.frame_buffer()[10 * FRAME_WIDTH..11 * FRAME_WIDTH];
        // Flipped: the opaque column is on the right edge of the sprite.
        assert_eq!(row[30], 0x21);
        assert_eq!(row[37], 0x2A);
    }

    #[test]
    fn test_8x16_sprite_halves() {
        let mut ppu = Ppu::new();
        let mut bus = TestBus::new();
        setup_palettes(&mut ppu, &mut bus);
        // Tiles 2 and 3 in pattern table 0; tile 3's rows all opaque.
        bus.solid_tile(0x0000, 3);
        ppu.write_register(0x2000, 0x20, &mut bus); // 8x16 mode
        // Sprite with tile byte 2 (even: pair 2/3, table $0000).
        ppu.write_register(0x2003, 0, &mut bus);
        for byte in [99, 2, 0x00, 80] {
            ppu.write_register(0x2004, byte, &mut bus);
        }
        ppu.write_register(0x2001, 0x1E, &mut bus);

        // Top half (tile 2) is transparent.
        ppu.render_scanline(104, &mut bus);
        let top = &ppu.frame_buffer()[104 * FRAME_WIDTH..105 * FRAME_WIDTH];
        assert!(top[80..88].iter().all(|&c| c == 0x21));

        // Bottom half (tile 3) is opaque.
        ppu.render_scanline(112, &mut bus);
        let bottom = &ppu.frame_buffer()[112 * FRAME_WIDTH..113 * FRAME_WIDTH];
        assert!(bottom[80..88].iter().all(|&c| c == 0x2A));
    }

    #[test]
    fn test_sprite_overflow_on_ninth_sprite() {
        let mut ppu = Ppu::new();
        let mut bus = TestBus::new();
        setup_palettes(&mut ppu, &mut bus);
        bus.solid_tile(0x0000, 1);
        ppu.write_register(0x2003, 0, &mut bus);
        for i in 0..9u8 {
            for byte in [30, 1, 0x00, i * 16] {
                ppu.write_register(0x2004, byte, &mut bus);
            }
        }
        ppu.write_register(0x2001, 0x16, &mut bus); // sprites on, no left clip

        ppu.render_scanline(35, &mut bus);
        assert!(ppu.status().contains(PpuStatus::SPRITE_OVERFLOW));
        let row = &ppu.frame_buffer()[35 * FRAME_WIDTH..36 * FRAME_WIDTH];
        // First eight sprites drawn, the ninth dropped.
        assert!(row[0..8].iter().all(|&c| c == 0x2A));
        assert!(row[112..120].iter().all(|&c| c == 0x2A));
        assert!(row[128..136].iter().all(|&c| c == 0x21));
    }
}
