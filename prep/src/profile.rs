//! Per-model pixel normalization constants.
use serde::{Deserialize, Serialize};

use crate::errors::{PrepError, PrepResult};

/// How raw 8-bit intensities are mapped before mean/std normalization.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelRange {
    /// Keep the 0..=255 byte value.
    Raw,
    /// Divide by 255 first, mapping to 0..=1.
    Scaled,
}

impl PixelRange {
    #[inline]
    pub fn map(self, value: u8) -> f32 {
        match self {
            PixelRange::Raw => value as f32,
            PixelRange::Scaled => value as f32 / 255.0,
        }
    }

    #[inline]
    pub fn unmap(self, value: f32) -> f32 {
        match self {
            PixelRange::Raw => value,
            PixelRange::Scaled => value * 255.0,
        }
    }
}

/// Mean and standard deviation per channel, in R, G, B order.
///
/// A channel value `v` becomes `(range.map(v) - mean[c]) / std[c]`. Nothing
/// is clamped: depending on the constants the result may be far outside 0..1.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct NormalizationProfile {
    pub mean: [f32; 3],
    pub std: [f32; 3],
    pub range: PixelRange,
}

impl NormalizationProfile {
    pub fn new(mean: [f32; 3], std: [f32; 3], range: PixelRange) -> NormalizationProfile {
        NormalizationProfile { mean, std, range }
    }

    /// Raw bytes, unchanged.
    pub fn identity() -> NormalizationProfile {
        NormalizationProfile::new([0.0; 3], [1.0; 3], PixelRange::Raw)
    }

    /// Bytes scaled to 0..1, nothing else.
    pub fn unit() -> NormalizationProfile {
        NormalizationProfile::new([0.0; 3], [1.0; 3], PixelRange::Scaled)
    }

    /// ImageNet statistics, as used by the torchvision-trained classifiers.
    pub fn imagenet() -> NormalizationProfile {
        NormalizationProfile::new(
            [0.485, 0.456, 0.406],
            [0.229, 0.224, 0.225],
            PixelRange::Scaled,
        )
    }

    /// Detectron pixel means subtracted from raw bytes.
    pub fn caffe2_means() -> NormalizationProfile {
        NormalizationProfile::new([102.9801, 115.9465, 122.7717], [1.0; 3], PixelRange::Raw)
    }

    pub fn validate(&self) -> PrepResult<()> {
        for c in 0..3 {
            if !self.mean[c].is_finite() {
                return Err(PrepError::InvalidProfile(format!(
                    "mean of channel {c} is {}",
                    self.mean[c]
                )));
            }
            if !self.std[c].is_finite() || self.std[c] == 0.0 {
                return Err(PrepError::InvalidProfile(format!(
                    "std of channel {c} is {}",
                    self.std[c]
                )));
            }
        }
        Ok(())
    }

    #[inline]
    pub fn normalize(&self, channel: usize, value: u8) -> f32 {
        (self.range.map(value) - self.mean[channel]) / self.std[channel]
    }

    /// Inverse of [`normalize`](Self::normalize), back to the 0..=255 scale.
    /// The result is not rounded.
    #[inline]
    pub fn denormalize(&self, channel: usize, value: f32) -> f32 {
        self.range.unmap(value * self.std[channel] + self.mean[channel])
    }
}

impl Default for NormalizationProfile {
    fn default() -> NormalizationProfile {
        NormalizationProfile::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn identity_keeps_bytes() {
        let p = NormalizationProfile::identity();
        for v in [0u8, 1, 127, 254, 255] {
            for c in 0..3 {
                assert_eq!(p.normalize(c, v), v as f32);
            }
        }
    }

    #[test]
    fn imagenet_is_applied_per_channel() {
        let p = NormalizationProfile::imagenet();
        assert_abs_diff_eq!(p.normalize(0, 255), (1.0 - 0.485) / 0.229, epsilon = 1e-6);
        assert_abs_diff_eq!(p.normalize(1, 0), -0.456 / 0.224, epsilon = 1e-6);
        assert_abs_diff_eq!(p.normalize(2, 0), -0.406 / 0.225, epsilon = 1e-6);
    }

    #[test]
    fn caffe2_means_go_negative() {
        let p = NormalizationProfile::caffe2_means();
        assert_abs_diff_eq!(p.normalize(0, 0), -102.9801, epsilon = 1e-4);
        assert_abs_diff_eq!(p.normalize(2, 255), 255.0 - 122.7717, epsilon = 1e-4);
    }

    #[test]
    fn denormalize_inverts_normalize() {
        for p in [
            NormalizationProfile::imagenet(),
            NormalizationProfile::caffe2_means(),
            NormalizationProfile::unit(),
        ] {
            for v in 0..=255u8 {
                for c in 0..3 {
                    assert_abs_diff_eq!(p.denormalize(c, p.normalize(c, v)), v as f32, epsilon = 1e-3);
                }
            }
        }
    }

    #[test]
    fn zero_std_is_rejected() {
        let p = NormalizationProfile::new([0.0; 3], [1.0, 0.0, 1.0], PixelRange::Raw);
        assert!(matches!(p.validate(), Err(PrepError::InvalidProfile(_))));
        let p = NormalizationProfile::new([f32::NAN, 0.0, 0.0], [1.0; 3], PixelRange::Raw);
        assert!(p.validate().is_err());
        assert!(NormalizationProfile::imagenet().validate().is_ok());
    }

    #[test]
    fn serde_names() {
        let json = serde_json::to_string(&NormalizationProfile::unit()).unwrap();
        assert_eq!(json, r#"{"mean":[0.0,0.0,0.0],"std":[1.0,1.0,1.0],"range":"scaled"}"#);
        let back: NormalizationProfile = serde_json::from_str(&json).unwrap();
        assert_eq!(back, NormalizationProfile::unit());
    }
}
