use bitvec::prelude::*;
use log::warn;
use rayon::prelude::*;

use crate::{
    Error, Graph, Miniature, MiniatureSignature, PixelComparator, PixelGroup, RawImage,
    SimilarityConfig,
};

/// The result of segmenting a batch of images. Images that could not be segmented are
/// reported in `failures` and do not affect the other images.
#[derive(Debug, Clone)]
pub struct BatchGroups<K> {
    pub groups: Vec<(K, Vec<PixelGroup>)>,
    pub failures: Vec<(K, Error)>,
}

/// Splits miniatures into [`PixelGroup`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GroupComputer {
    group_min_size: usize,
    comparator: PixelComparator,
}

impl Default for GroupComputer {
    fn default() -> Self {
        SimilarityConfig::default().group_computer()
    }
}

impl GroupComputer {
    #[must_use]
    pub const fn new(group_min_size: usize, comparator: PixelComparator) -> Self {
        Self {
            group_min_size,
            comparator,
        }
    }

    #[must_use]
    pub const fn group_min_size(&self) -> usize {
        self.group_min_size
    }

    #[must_use]
    pub const fn comparator(&self) -> &PixelComparator {
        &self.comparator
    }

    /// Partition every pixel of the miniature into groups of connected, close pixels.
    ///
    /// Pixels are scanned in raster order. On the first row each pixel is linked to its left
    /// neighbour; on later rows to the pixel above, the pixel to the left and the pixel
    /// above-left, whenever the comparator judges the pair close. There is no above-right
    /// link, so two pixels that only touch through an above-right diagonal stay apart unless
    /// some other path of close pixels joins them.
    ///
    /// Group ids follow the smallest member index. Colours are computed from the original
    /// pixels even when a normalizer is configured.
    #[must_use]
    pub fn group_pixels(&self, mini: &Miniature) -> Vec<PixelGroup> {
        let (width, height) = mini.dimensions();
        let nb_pixels = mini.len();
        let mut graph = self.connect_close_pixels(mini);

        let mut assigned = bitvec![0; nb_pixels];
        let mut ret = vec![];
        for idx in 0..nb_pixels {
            if assigned[idx] {
                continue;
            }

            //pixels that were never linked to a neighbour are groups of their own.
            let members = graph.pop_component(idx).unwrap_or_else(|| vec![idx]);
            for &member in &members {
                assigned.set(member, true);
            }

            let color = self.comparator.common_color(mini, &members);
            ret.push(PixelGroup::new(ret.len(), color, members, width, height));
        }

        debug_assert!(graph.is_empty());
        ret
    }

    fn connect_close_pixels(&self, mini: &Miniature) -> Graph {
        let (width, height) = (mini.width() as usize, mini.height() as usize);
        let data = self.comparator.normalize_data(mini);
        let close = |a: usize, b: usize| self.comparator.pixels_are_close(&data, a, b);

        let mut graph = Graph::with_capacity(width * height);

        for x in 1..width {
            if close(x, x - 1) {
                graph.connect(x, x - 1);
            }
        }

        for y in 1..height {
            let row = y * width;
            let above = row - width;

            if close(row, above) {
                graph.connect(row, above);
            }

            for x in 1..width {
                let idx = row + x;
                #[rustfmt::skip]
                let neighbours = [
                    above + x,     //above
                    idx - 1,       //left
                    above + x - 1, //above-left
                ];
                for neighbour in neighbours {
                    if close(idx, neighbour) {
                        graph.connect(idx, neighbour);
                    }
                }
            }
        }

        graph
    }

    /// As [`GroupComputer::group_pixels`], but discard groups smaller than the minimum group size.
    #[must_use]
    pub fn compute_groups(&self, mini: &Miniature) -> Vec<PixelGroup> {
        let mut groups = self.group_pixels(mini);
        groups.retain(|group| group.len() >= self.group_min_size);
        groups
    }

    /// The bucketing signature used by the similarity search.
    #[must_use]
    pub fn signature(&self, mini: &Miniature) -> MiniatureSignature {
        MiniatureSignature {
            gray: mini.global_intensity(),
            nb_groups: self.compute_groups(mini).len(),
        }
    }

    /// Run [`GroupComputer::compute_groups`] over many images in parallel.
    ///
    /// Results keep the input order. An image that cannot be turned into a [`Miniature`] is
    /// moved to `failures` without affecting any other image.
    pub fn batch_compute_groups<K>(&self, images: Vec<(K, RawImage)>) -> BatchGroups<K>
    where
        K: Send + std::fmt::Debug,
    {
        let results = images
            .into_par_iter()
            .map(|(key, raw)| {
                let res = Miniature::try_from(raw).map(|mini| self.compute_groups(&mini));
                (key, res)
            })
            .collect::<Vec<_>>();

        let mut ret = BatchGroups {
            groups: Vec::with_capacity(results.len()),
            failures: vec![],
        };
        for (key, res) in results {
            match res {
                Ok(groups) => ret.groups.push((key, groups)),
                Err(e) => {
                    warn!("Failed to segment {key:?}: {e}");
                    ret.failures.push((key, e));
                }
            }
        }

        ret
    }
}
