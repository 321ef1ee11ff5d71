//! Decoded cartridge input.
//!
//! ROM file parsing (iNES/NES 2.0 headers) happens outside this crate; what
//! arrives here is the already-decoded header plus the PRG and CHR images.
//! [`Cartridge::new`] validates the slice geometry so every mapper can assume
//! well-formed bank counts.

use crate::mapper::Mirroring;

/// Size of one PRG-ROM bank unit (16 KiB).
pub const PRG_UNIT: usize = 16 * 1024;
/// Size of one CHR image unit (8 KiB).
pub const CHR_UNIT: usize = 8 * 1024;
/// Size of the work/battery RAM window at `$6000-$7FFF`.
pub const PRG_RAM_SIZE: usize = 8 * 1024;

/// Errors raised while validating a cartridge at power-on.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CartridgeError {
    /// The mapper id is outside the supported set {0, 1, 2, 4}.
    #[error("unsupported mapper id {0}")]
    UnsupportedMapper(u16),

    /// PRG-ROM is empty or not a whole number of 16 KiB banks.
    #[error("truncated PRG-ROM: {0} bytes is not a non-zero multiple of 16 KiB")]
    TruncatedPrg(usize),

    /// CHR-ROM is not a whole number of 8 KiB units.
    #[error("truncated CHR-ROM: {0} bytes is not a multiple of 8 KiB")]
    TruncatedChr(usize),
}

/// A decoded cartridge: header fields plus raw PRG/CHR images.
///
/// An empty `chr_rom` requests 8 KiB of CHR-RAM from the mapper.
#[derive(Debug, Clone)]
pub struct Cartridge {
    /// iNES mapper id.
    pub mapper_id: u16,
    /// Nametable mirroring wired by the cartridge.
    pub mirroring: Mirroring,
    /// Whether PRG-RAM is battery backed.
    pub has_battery: bool,
    /// PRG-ROM image (multiple of 16 KiB).
    pub prg_rom: Vec<u8>,
    /// CHR-ROM image (multiple of 8 KiB), or empty for CHR-RAM.
    pub chr_rom: Vec<u8>,
}

impl Cartridge {
    /// Validate the decoded header and images.
    ///
    /// # Errors
    ///
    /// Returns [`CartridgeError::TruncatedPrg`] or
    /// [`CartridgeError::TruncatedChr`] when the image lengths are not whole
    /// bank multiples. The mapper id is checked later, by
    /// [`crate::MapperKind::new`].
    pub fn new(
        mapper_id: u16,
        mirroring: Mirroring,
        has_battery: bool,
        prg_rom: Vec<u8>,
        chr_rom: Vec<u8>,
    ) -> Result<Self, CartridgeError> {
        if prg_rom.is_empty() || prg_rom.len() % PRG_UNIT != 0 {
            return Err(CartridgeError::TruncatedPrg(prg_rom.len()));
        }
        if chr_rom.len() % CHR_UNIT != 0 {
            return Err(CartridgeError::TruncatedChr(chr_rom.len()));
        }

        Ok(Self {
            mapper_id,
            mirroring,
            has_battery,
            prg_rom,
            chr_rom,
        })
    }

    /// Number of 16 KiB PRG-ROM banks.
    #[must_use]
    pub fn prg_banks(&self) -> usize {
        self.prg_rom.len() / PRG_UNIT
    }

    /// True if the cartridge carries no CHR-ROM and wants CHR-RAM instead.
    #[must_use]
    pub fn wants_chr_ram(&self) -> bool {
        self.chr_rom.is_empty()
    }

    /// The CHR image to hand to a mapper: the ROM copy, or a zeroed 8 KiB
    /// RAM when the cartridge requests CHR-RAM.
    pub(crate) fn chr_image(&self) -> (Vec<u8>, bool) {
        if self.wants_chr_ram() {
            (vec![0; CHR_UNIT], true)
        } else {
            (self.chr_rom.clone(), false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_cartridge() {
        let cart = Cartridge::new(
            0,
            Mirroring::Vertical,
            false,
            vec![0; 32 * 1024],
            vec![0; 8 * 1024],
        )
        .unwrap();
        assert_eq!(cart.prg_banks(), 2);
        assert!(!cart.wants_chr_ram());
    }

    #[test]
    fn test_empty_chr_requests_ram() {
        let cart =
            Cartridge::new(2, Mirroring::Horizontal, false, vec![0; 64 * 1024], Vec::new()).unwrap();
        assert!(cart.wants_chr_ram());
        let (chr, is_ram) = cart.chr_image();
        assert!(is_ram);
        assert_eq!(chr.len(), CHR_UNIT);
    }

    #[test]
    fn test_truncated_prg_rejected() {
        let err = Cartridge::new(0, Mirroring::Vertical, false, vec![0; 1000], Vec::new())
            .unwrap_err();
        assert_eq!(err, CartridgeError::TruncatedPrg(1000));

        let err =
            Cartridge::new(0, Mirroring::Vertical, false, Vec::new(), Vec::new()).unwrap_err();
        assert_eq!(err, CartridgeError::TruncatedPrg(0));
    }

    #[test]
    fn test_truncated_chr_rejected() {
        let err = Cartridge::new(0, Mirroring::Vertical, false, vec![0; PRG_UNIT], vec![0; 100])
            .unwrap_err();
        assert_eq!(err, CartridgeError::TruncatedChr(100));
    }
}
