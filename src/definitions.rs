use serde::{Deserialize, Serialize};

/// The default fraction of per-sample agreement two miniatures need to be considered similar.
/// A value of 1.0 only pairs identical miniatures; 0.0 pairs everything.
pub const DEFAULT_SIMILARITY_PERCENT: f64 = 0.90;

/// The default comparator radius. Two pixels are close when their channel distance is at
/// most this value, so 0 only groups identical pixels.
///
/// Recommended range: 0-30.
pub const DEFAULT_PIXEL_DISTANCE_RADIUS: u32 = 6;

/// The default minimum size of a pixel group. Groups with fewer members are discarded by
/// [`crate::GroupComputer::compute_groups`]. 0 keeps everything.
pub const DEFAULT_GROUP_MIN_SIZE: usize = 0;

/// The default maximum difference in pixel group count between two miniatures that are
/// still worth comparing.
pub const DEFAULT_MAX_GROUP_COUNT_DELTA: usize = 40;

/// Side length of the miniatures the app builds from thumbnails.
pub const MINIATURE_SIZE: u32 = 32;

/// Number of candidate pairs scored between two progress reports / cancellation checks.
pub const SCORE_BATCH_SIZE: usize = 256;

/// Number of classifier scan iterations between two progress reports.
pub const PROGRESS_INTERVAL: usize = 1000;

/// Above this many miniatures the candidate map switches from an n*n bitmap to a hash set of pairs.
pub const DENSE_CANDIDATE_LIMIT: usize = 16_384;

//largest value a sum of three absolute channel differences can take.
pub(crate) const MAX_PIXEL_DISTANCE: u32 = 3 * u8::MAX as u32;

/// The intensity window (in sample units) outside of which two miniatures cannot reach
/// `similarity_percent` under the default scorer.
///
/// Intensities are floored means, so the window is rounded up to stay sound.
#[must_use]
pub fn gray_dec(similarity_percent: f64) -> u32 {
    let raw = f64::from(u8::MAX) * (1.0 - similarity_percent.clamp(0.0, 1.0));
    //guard against 255 * (1 - 0.9) landing a hair above an integer.
    (raw - 1e-9).ceil().max(0.0) as u32
}

/// Pre-processing applied to pixel data before the comparator measures distances.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    Serialize,
    Deserialize,
    enum_utils::FromStr,
)]
#[serde(rename_all = "lowercase")]
pub enum Normalizer {
    /// Compare raw pixels.
    #[default]
    None,
    /// Compare the 3x3 box mean of each pixel, which suppresses sensor noise and jpeg artifacts.
    Smooth,
    /// Compare the channel mean of each pixel, so only brightness matters.
    Gray,
}

impl Normalizer {
    /// The numeric id of the normalizer, as stored by the persistence layer.
    #[must_use]
    pub const fn id(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Smooth => 1,
            Self::Gray => 2,
        }
    }
}

impl TryFrom<u8> for Normalizer {
    type Error = crate::Error;

    fn try_from(id: u8) -> Result<Self, Self::Error> {
        match id {
            0 => Ok(Self::None),
            1 => Ok(Self::Smooth),
            2 => Ok(Self::Gray),
            other => Err(crate::Error::UnknownNormalizer(other)),
        }
    }
}

/// How the comparator folds three channel differences into one distance.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    Serialize,
    Deserialize,
    enum_utils::FromStr,
)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    /// Sum of absolute channel differences.
    #[default]
    Manhattan,
    /// Largest absolute channel difference.
    Chebyshev,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_gray_dec_default() {
        assert_eq!(gray_dec(0.9), 26);
        assert_eq!(gray_dec(1.0), 0);
        assert_eq!(gray_dec(0.0), 255);
    }

    #[test]
    fn test_gray_dec_shrinks_as_threshold_grows() {
        let mut prev = u32::MAX;
        for pct in 0..=100 {
            let dec = gray_dec(f64::from(pct) / 100.0);
            assert!(dec <= prev);
            prev = dec;
        }
    }

    #[test]
    fn test_normalizer_ids() {
        for normalizer in [Normalizer::None, Normalizer::Smooth, Normalizer::Gray] {
            assert_eq!(Normalizer::try_from(normalizer.id()), Ok(normalizer));
        }
        assert_eq!(
            Normalizer::try_from(7),
            Err(crate::Error::UnknownNormalizer(7))
        );
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("Smooth".parse::<Normalizer>(), Ok(Normalizer::Smooth));
        assert_eq!("Chebyshev".parse::<DistanceMetric>(), Ok(DistanceMetric::Chebyshev));
        assert!("Blur".parse::<Normalizer>().is_err());
    }
}
