//! The per-variant fingerprint value.

use super::hex::{derive_bucket16, hi_lo_to_hex64, join_u64, split_hex64_to_hi_lo, split_u64};
use serde::{Deserialize, Serialize};

/// pHash + dHash of one geometry variant of one frame
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint {
    pub phash_hi: u32,
    pub phash_lo: u32,
    pub dhash_hi: u32,
    pub dhash_lo: u32,
    /// Top 16 bits of `phash_hi`
    pub bucket16: u16,
    /// Which crop variant produced this fingerprint ("base", "left", ...)
    pub variant_tag: String,
}

impl Fingerprint {
    /// Build a fingerprint from full 64-bit hashes
    pub fn from_hashes(phash: u64, dhash: u64, variant_tag: impl Into<String>) -> Self {
        let (phash_hi, phash_lo) = split_u64(phash);
        let (dhash_hi, dhash_lo) = split_u64(dhash);
        Self {
            phash_hi,
            phash_lo,
            dhash_hi,
            dhash_lo,
            bucket16: derive_bucket16(phash_hi),
            variant_tag: variant_tag.into(),
        }
    }

    /// Build a fingerprint from two 16-digit hex strings
    pub fn from_hex(phash: &str, dhash: &str, variant_tag: impl Into<String>) -> Option<Self> {
        let (phash_hi, phash_lo) = split_hex64_to_hi_lo(phash)?;
        let (dhash_hi, dhash_lo) = split_hex64_to_hi_lo(dhash)?;
        Some(Self::from_hashes(
            join_u64(phash_hi, phash_lo),
            join_u64(dhash_hi, dhash_lo),
            variant_tag,
        ))
    }

    /// Validate a loosely-typed fingerprint coming across a serialization
    /// boundary. Every field must be present, finite, integral and in range.
    pub fn from_raw(raw: &RawFingerprint) -> Option<Self> {
        Some(Self {
            phash_hi: as_u32(raw.phash_hi?)?,
            phash_lo: as_u32(raw.phash_lo?)?,
            dhash_hi: as_u32(raw.dhash_hi?)?,
            dhash_lo: as_u32(raw.dhash_lo?)?,
            bucket16: u16::try_from(as_u32(raw.bucket16?)?).ok()?,
            variant_tag: raw.variant_tag.clone().unwrap_or_else(|| "base".to_string()),
        })
    }

    pub fn phash(&self) -> u64 {
        join_u64(self.phash_hi, self.phash_lo)
    }

    pub fn dhash(&self) -> u64 {
        join_u64(self.dhash_hi, self.dhash_lo)
    }

    pub fn phash_hex(&self) -> String {
        hi_lo_to_hex64(self.phash_hi, self.phash_lo)
    }

    pub fn dhash_hex(&self) -> String {
        hi_lo_to_hex64(self.dhash_hi, self.dhash_lo)
    }
}

/// A fingerprint as it arrives from an untyped caller (JSON bridge, FFI).
/// Any field may be missing or non-finite.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawFingerprint {
    pub phash_hi: Option<f64>,
    pub phash_lo: Option<f64>,
    pub dhash_hi: Option<f64>,
    pub dhash_lo: Option<f64>,
    pub bucket16: Option<f64>,
    pub variant_tag: Option<String>,
}

impl From<&Fingerprint> for RawFingerprint {
    fn from(fingerprint: &Fingerprint) -> Self {
        Self {
            phash_hi: Some(fingerprint.phash_hi as f64),
            phash_lo: Some(fingerprint.phash_lo as f64),
            dhash_hi: Some(fingerprint.dhash_hi as f64),
            dhash_lo: Some(fingerprint.dhash_lo as f64),
            bucket16: Some(fingerprint.bucket16 as f64),
            variant_tag: Some(fingerprint.variant_tag.clone()),
        }
    }
}

fn as_u32(value: f64) -> Option<u32> {
    if !value.is_finite() || value.fract() != 0.0 || value < 0.0 || value > u32::MAX as f64 {
        return None;
    }
    Some(value as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bucket_derives_from_phash() {
        let fp = Fingerprint::from_hashes(0x1234_5678_9ABC_DEF0, 0, "base");
        assert_eq!(fp.bucket16, 0x1234);
        assert_eq!(fp.phash_hex(), "123456789abcdef0");
    }

    #[test]
    fn from_hex_round_trips() {
        let fp = Fingerprint::from_hex("00ff00ff00ff00ff", "ffffffff00000000", "tight").unwrap();
        assert_eq!(fp.phash(), 0x00ff_00ff_00ff_00ff);
        assert_eq!(fp.dhash_hex(), "ffffffff00000000");
        assert_eq!(fp.variant_tag, "tight");
    }

    #[test]
    fn raw_with_nan_is_rejected() {
        let fp = Fingerprint::from_hashes(42, 43, "base");
        let mut raw = RawFingerprint::from(&fp);
        assert_eq!(Fingerprint::from_raw(&raw), Some(fp));

        raw.dhash_lo = Some(f64::NAN);
        assert_eq!(Fingerprint::from_raw(&raw), None);
    }

    #[test]
    fn raw_with_missing_field_is_rejected() {
        let raw = RawFingerprint {
            phash_hi: Some(1.0),
            phash_lo: Some(2.0),
            dhash_hi: None,
            dhash_lo: Some(3.0),
            bucket16: Some(0.0),
            variant_tag: None,
        };
        assert_eq!(Fingerprint::from_raw(&raw), None);
    }

    #[test]
    fn raw_out_of_range_is_rejected() {
        let raw = RawFingerprint {
            phash_hi: Some(1.0),
            phash_lo: Some(2.0),
            dhash_hi: Some(3.0),
            dhash_lo: Some(4.0),
            bucket16: Some(70_000.0),
            variant_tag: None,
        };
        assert_eq!(Fingerprint::from_raw(&raw), None);
    }
}
