use crate::{Miniature, SimResult};

/// Scores how alike two miniatures are, from 0.0 (nothing in common) to 1.0 (identical).
///
/// Implementations must be symmetric. Closures of the right shape implement this trait,
/// which is handy for plugging in a batched or native backend.
pub trait SimilarityScorer: Sync {
    /// # Errors
    /// Returns [`crate::Error::Scorer`] if the backend could not produce a score.
    fn similarity(&self, a: &Miniature, b: &Miniature) -> SimResult<f64>;
}

impl<F> SimilarityScorer for F
where
    F: Fn(&Miniature, &Miniature) -> SimResult<f64> + Sync,
{
    fn similarity(&self, a: &Miniature, b: &Miniature) -> SimResult<f64> {
        self(a, b)
    }
}

/// The mean per-sample agreement of two miniatures: `1 - sum(|a - b|) / (255 * samples)`.
///
/// Miniatures of different dimensions score 0.0.
///
/// Since the difference of two means never exceeds the mean absolute difference, two
/// miniatures scoring at least `p` have global intensities within [`crate::gray_dec`]`(p)`
/// of each other. The similarity search relies on this to prune its comparisons.
#[derive(Debug, Clone, Copy, Default)]
pub struct PixelAgreementScorer;

impl SimilarityScorer for PixelAgreementScorer {
    fn similarity(&self, a: &Miniature, b: &Miniature) -> SimResult<f64> {
        if a.dimensions() != b.dimensions() {
            return Ok(0.0);
        }

        let total_diff = a
            .samples()
            .iter()
            .zip(b.samples())
            .map(|(x, y)| u64::from(x.abs_diff(*y)))
            .sum::<u64>();
        let max_diff = f64::from(u8::MAX) * a.samples().len() as f64;

        Ok(1.0 - total_diff as f64 / max_diff)
    }
}

#[cfg(test)]
mod test {
    use rand::prelude::*;

    use super::{PixelAgreementScorer, SimilarityScorer};
    use crate::{gray_dec, Error, Miniature};

    #[test]
    fn test_extremes() {
        let black = Miniature::uniform(4, 4, [0, 0, 0]);
        let white = Miniature::uniform(4, 4, [255, 255, 255]);
        assert_eq!(PixelAgreementScorer.similarity(&black, &black), Ok(1.0));
        assert_eq!(PixelAgreementScorer.similarity(&black, &white), Ok(0.0));
    }

    #[test]
    fn test_mismatched_dimensions() {
        let a = Miniature::uniform(4, 4, [0, 0, 0]);
        let b = Miniature::uniform(2, 8, [0, 0, 0]);
        assert_eq!(PixelAgreementScorer.similarity(&a, &b), Ok(0.0));
    }

    #[test]
    fn test_closure_scorer() {
        let a = Miniature::uniform(1, 1, [0, 0, 0]);
        let failing = |_: &Miniature, _: &Miniature| -> Result<f64, Error> {
            Err(Error::Scorer("offline".to_string()))
        };
        assert!(failing.similarity(&a, &a).is_err());
    }

    #[test]
    fn test_intensity_bound() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..200 {
            let a = Miniature::random_miniature(8, 8, 0, 255, &mut rng);
            let distance = rng.gen_range(0..=8 * 8 * 3 * 40);
            let b = a.with_sample_distance(distance, &mut rng);

            let score = PixelAgreementScorer.similarity(&a, &b).unwrap();
            let gray_diff = a.global_intensity().abs_diff(b.global_intensity());
            assert!(gray_diff <= gray_dec(score));
        }
    }
}
