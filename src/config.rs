use serde::{Deserialize, Serialize};

use crate::definitions::{
    gray_dec, DistanceMetric, Normalizer, DEFAULT_GROUP_MIN_SIZE, DEFAULT_MAX_GROUP_COUNT_DELTA,
    DEFAULT_PIXEL_DISTANCE_RADIUS, DEFAULT_SIMILARITY_PERCENT, MAX_PIXEL_DISTANCE,
};
use crate::{GroupComputer, PixelComparator, SimResult};

/// Options for segmenting miniatures and deciding which of them are similar.
///
/// Missing fields take their defaults when deserialized, so a config file only needs to
/// name the options it changes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimilarityConfig {
    /// Pixel groups with fewer members are discarded before counting groups.
    pub group_min_size: usize,

    /// Two pixels are close when their channel distance is at most this value.
    /// Larger values merge more pixels into each group.
    ///
    /// Recommended range: 0-30. Must not exceed 765.
    pub pixel_distance_radius: u32,

    /// Pre-processing applied before measuring pixel distances.
    pub normalizer: Normalizer,

    /// How channel differences are folded into a pixel distance.
    pub metric: DistanceMetric,

    /// Fraction of per-sample agreement (0.0..=1.0) two miniatures need to be similar.
    pub similarity_percent: f64,

    /// Miniatures whose group counts differ by more than this are never compared.
    pub max_group_count_delta: usize,
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            group_min_size: DEFAULT_GROUP_MIN_SIZE,
            pixel_distance_radius: DEFAULT_PIXEL_DISTANCE_RADIUS,
            normalizer: Normalizer::default(),
            metric: DistanceMetric::default(),
            similarity_percent: DEFAULT_SIMILARITY_PERCENT,
            max_group_count_delta: DEFAULT_MAX_GROUP_COUNT_DELTA,
        }
    }
}

impl SimilarityConfig {
    /// Check that every option is inside its legal range.
    /// # Errors
    /// Returns [`crate::Error::InvalidConfig`] naming the first offending option.
    pub fn validate(&self) -> SimResult<()> {
        use crate::Error::InvalidConfig;

        if !(0.0..=1.0).contains(&self.similarity_percent) {
            return Err(InvalidConfig(format!(
                "similarity_percent must be between 0 and 1, got {}",
                self.similarity_percent
            )));
        }

        if self.pixel_distance_radius > MAX_PIXEL_DISTANCE {
            return Err(InvalidConfig(format!(
                "pixel_distance_radius must be at most {MAX_PIXEL_DISTANCE}, got {}",
                self.pixel_distance_radius
            )));
        }

        Ok(())
    }

    /// The intensity window derived from `similarity_percent`. See [`crate::gray_dec`].
    #[must_use]
    pub fn gray_dec(&self) -> u32 {
        gray_dec(self.similarity_percent)
    }

    #[must_use]
    pub fn comparator(&self) -> PixelComparator {
        PixelComparator::new(self.pixel_distance_radius, self.normalizer, self.metric)
    }

    #[must_use]
    pub fn group_computer(&self) -> GroupComputer {
        GroupComputer::new(self.group_min_size, self.comparator())
    }
}

#[cfg(test)]
mod test {
    use super::SimilarityConfig;
    use crate::{Error, Normalizer};

    #[test]
    fn test_default_is_valid() {
        assert_eq!(SimilarityConfig::default().validate(), Ok(()));
    }

    #[test]
    fn test_threshold_out_of_range() {
        for bad in [-0.1, 1.5, f64::NAN] {
            let cfg = SimilarityConfig {
                similarity_percent: bad,
                ..SimilarityConfig::default()
            };
            assert!(matches!(cfg.validate(), Err(Error::InvalidConfig(_))));
        }
    }

    #[test]
    fn test_range_limits_are_accepted() {
        for (similarity_percent, max_group_count_delta) in [(0.0, 0), (1.0, 0), (0.0, usize::MAX)] {
            let cfg = SimilarityConfig {
                similarity_percent,
                max_group_count_delta,
                ..SimilarityConfig::default()
            };
            assert_eq!(cfg.validate(), Ok(()));
        }
    }

    #[test]
    fn test_radius_out_of_range() {
        let cfg = SimilarityConfig {
            pixel_distance_radius: 766,
            ..SimilarityConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_partial_json() {
        let cfg: SimilarityConfig =
            serde_json::from_str(r#"{"pixel_distance_radius": 12, "normalizer": "smooth"}"#)
                .unwrap();
        assert_eq!(cfg.pixel_distance_radius, 12);
        assert_eq!(cfg.normalizer, Normalizer::Smooth);
        assert_eq!(cfg.similarity_percent, 0.9);
    }

    #[test]
    fn test_negative_min_size_rejected() {
        let res = serde_json::from_str::<SimilarityConfig>(r#"{"group_min_size": -1}"#);
        assert!(res.is_err());
    }
}
