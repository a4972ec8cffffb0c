use serde::{Deserialize, Serialize};

/// The bounding rectangle of a [`PixelGroup`], inclusive of its edge pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// A maximal set of spatially connected pixels of one miniature that the comparator judged
/// mutually close.
///
/// Groups are created by [`crate::GroupComputer`] and never modified afterwards. Within one
/// miniature the groups partition the pixels.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PixelGroup {
    id: usize,
    color: [f64; 3],
    members: Vec<usize>,
    image_width: u32,
    image_height: u32,
}

impl PixelGroup {
    pub(crate) fn new(
        id: usize,
        color: [f64; 3],
        members: Vec<usize>,
        image_width: u32,
        image_height: u32,
    ) -> Self {
        debug_assert!(!members.is_empty());
        debug_assert!(members.windows(2).all(|w| w[0] < w[1]));
        Self {
            id,
            color,
            members,
            image_width,
            image_height,
        }
    }

    /// The extraction order of this group within its miniature. Ids are only meaningful within
    /// a single segmentation run.
    #[must_use]
    pub const fn id(&self) -> usize {
        self.id
    }

    /// The representative colour, rounded to 8-bit channels.
    #[must_use]
    pub fn color(&self) -> [u8; 3] {
        self.color.map(|c| c.round().clamp(0.0, 255.0) as u8)
    }

    /// The representative colour before rounding.
    #[must_use]
    pub const fn mean_color(&self) -> [f64; 3] {
        self.color
    }

    /// Flat pixel indices (`y * width + x`) of the members, ascending.
    #[must_use]
    pub fn members(&self) -> &[usize] {
        &self.members
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    #[must_use]
    pub fn contains(&self, index: usize) -> bool {
        self.members.binary_search(&index).is_ok()
    }

    #[must_use]
    pub const fn image_dimensions(&self) -> (u32, u32) {
        (self.image_width, self.image_height)
    }

    /// The (x, y) coordinates of every member.
    pub fn coordinates(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        let width = self.image_width as usize;
        self.members
            .iter()
            .map(move |&idx| ((idx % width) as u32, (idx / width) as u32))
    }

    #[must_use]
    pub fn rect(&self) -> GroupRect {
        let (mut min_x, mut min_y) = (u32::MAX, u32::MAX);
        let (mut max_x, mut max_y) = (0, 0);
        for (x, y) in self.coordinates() {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }

        GroupRect {
            x: min_x,
            y: min_y,
            width: max_x - min_x + 1,
            height: max_y - min_y + 1,
        }
    }

    /// Mean member position.
    #[must_use]
    pub fn center(&self) -> (f64, f64) {
        let n = self.len() as f64;
        let (sx, sy) = self
            .coordinates()
            .fold((0.0, 0.0), |(sx, sy), (x, y)| (sx + f64::from(x), sy + f64::from(y)));
        (sx / n, sy / n)
    }

    /// Least-squares fit `y = slope * x + intercept` over the member coordinates.
    /// Returns `None` when every member shares the same x, as the slope is then undefined.
    #[must_use]
    pub fn linear_regression(&self) -> Option<(f64, f64)> {
        let (mean_x, mean_y) = self.center();
        let (mut sxx, mut sxy) = (0.0, 0.0);
        for (x, y) in self.coordinates() {
            let dx = f64::from(x) - mean_x;
            sxx += dx * dx;
            sxy += dx * (f64::from(y) - mean_y);
        }

        if sxx == 0.0 {
            return None;
        }

        let slope = sxy / sxx;
        Some((slope, mean_y - slope * mean_x))
    }

    /// The compact storage form of a group: `[r, g, b, x, y, w, h, n]`.
    #[must_use]
    pub fn compact(&self) -> [u32; 8] {
        let [r, g, b] = self.color();
        let rect = self.rect();
        [
            u32::from(r),
            u32::from(g),
            u32::from(b),
            rect.x,
            rect.y,
            rect.width,
            rect.height,
            self.len() as u32,
        ]
    }
}

#[cfg(test)]
mod test {
    use super::{GroupRect, PixelGroup};

    //an L shape in a 4x3 image:
    // . X . .
    // . X . .
    // . X X X
    fn l_shape() -> PixelGroup {
        PixelGroup::new(0, [10.4, 20.5, 30.6], vec![1, 5, 9, 10, 11], 4, 3)
    }

    #[test]
    fn test_rect() {
        assert_eq!(
            l_shape().rect(),
            GroupRect {
                x: 1,
                y: 0,
                width: 3,
                height: 3
            }
        );
    }

    #[test]
    fn test_center() {
        let (cx, cy) = l_shape().center();
        assert!((cx - 1.6).abs() < 1e-9);
        assert!((cy - 1.4).abs() < 1e-9);
    }

    #[test]
    fn test_compact() {
        assert_eq!(l_shape().compact(), [10, 21, 31, 1, 0, 3, 3, 5]);
    }

    #[test]
    fn test_linear_regression() {
        //a diagonal line y = x
        let diag = PixelGroup::new(0, [0.0; 3], vec![0, 4, 8], 3, 3);
        let (slope, intercept) = diag.linear_regression().unwrap();
        assert!((slope - 1.0).abs() < 1e-9);
        assert!(intercept.abs() < 1e-9);

        //a vertical line has no slope
        let vert = PixelGroup::new(0, [0.0; 3], vec![1, 4, 7], 3, 3);
        assert_eq!(vert.linear_regression(), None);
    }

    #[test]
    fn test_contains() {
        let group = l_shape();
        assert!(group.contains(9));
        assert!(!group.contains(8));
    }
}
