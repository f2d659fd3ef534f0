use serde::{Deserialize, Serialize};

/// Smallest width/height a stored rect may have, in unit coordinates.
pub const MIN_RECT_SIZE: f64 = 0.01;

/// Rectangle in unit coordinates (0–1), origin at the bottom-left of the page.
///
/// This is the coordinate space emitted by the OCR collaborator. Every
/// detection, label box and manual placement is stored in it; conversion to
/// drawing space happens only in `render::transform`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NormalizedRect {
    pub x: f64,
    pub y: f64,
    #[serde(alias = "w")]
    pub width: f64,
    #[serde(alias = "h")]
    pub height: f64,
}

impl NormalizedRect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn min_x(&self) -> f64 {
        self.x
    }

    pub fn max_x(&self) -> f64 {
        self.x + self.width
    }

    pub fn min_y(&self) -> f64 {
        self.y
    }

    pub fn max_y(&self) -> f64 {
        self.y + self.height
    }

    pub fn mid_x(&self) -> f64 {
        self.x + self.width / 2.0
    }

    pub fn mid_y(&self) -> f64 {
        self.y + self.height / 2.0
    }

    pub fn area(&self) -> f64 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    /// True when the rect has no usable extent (zero/negative/NaN size).
    pub fn is_degenerate(&self) -> bool {
        !(self.width.is_finite() && self.height.is_finite())
            || self.width <= 0.0
            || self.height <= 0.0
    }

    /// Smallest rect containing both `self` and `other`.
    pub fn union(&self, other: &NormalizedRect) -> NormalizedRect {
        let min_x = self.min_x().min(other.min_x());
        let min_y = self.min_y().min(other.min_y());
        let max_x = self.max_x().max(other.max_x());
        let max_y = self.max_y().max(other.max_y());
        NormalizedRect::new(min_x, min_y, max_x - min_x, max_y - min_y)
    }

    /// Union of every rect in the iterator, `None` when it is empty.
    pub fn union_all<'a, I>(rects: I) -> Option<NormalizedRect>
    where
        I: IntoIterator<Item = &'a NormalizedRect>,
    {
        rects
            .into_iter()
            .fold(None, |acc: Option<NormalizedRect>, r| match acc {
                Some(u) => Some(u.union(r)),
                None => Some(*r),
            })
    }

    /// Horizontal sub-range of this rect, expressed as fractions of its width.
    ///
    /// Used to estimate where a character span sits inside an OCR line box.
    pub fn horizontal_slice(&self, start_frac: f64, end_frac: f64) -> NormalizedRect {
        let start = finite_or(start_frac, 0.0).clamp(0.0, 1.0);
        let end = finite_or(end_frac, 1.0).clamp(start, 1.0);
        NormalizedRect::new(
            self.x + self.width * start,
            self.y,
            self.width * (end - start),
            self.height,
        )
    }

    /// Clamp into the unit square with a minimum size of [`MIN_RECT_SIZE`].
    ///
    /// Non-finite inputs collapse to the origin / minimum size. The result
    /// never has a coordinate outside `[0, 1]` or a dimension below the minimum.
    pub fn clamped(&self) -> NormalizedRect {
        let width = finite_or(self.width, MIN_RECT_SIZE).clamp(MIN_RECT_SIZE, 1.0);
        let height = finite_or(self.height, MIN_RECT_SIZE).clamp(MIN_RECT_SIZE, 1.0);
        let x = finite_or(self.x, 0.0).clamp(0.0, 1.0 - width);
        let y = finite_or(self.y, 0.0).clamp(0.0, 1.0 - height);
        NormalizedRect::new(x, y, width, height)
    }

    /// True when every edge lies inside the unit square and the size meets the minimum.
    pub fn is_within_unit_square(&self) -> bool {
        self.x >= 0.0
            && self.y >= 0.0
            && self.max_x() <= 1.0 + 1e-9
            && self.max_y() <= 1.0 + 1e-9
            && self.width >= MIN_RECT_SIZE
            && self.height >= MIN_RECT_SIZE
    }
}

fn finite_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edges_and_centres() {
        let r = NormalizedRect::new(0.1, 0.2, 0.3, 0.4);
        assert!((r.max_x() - 0.4).abs() < 1e-9);
        assert!((r.max_y() - 0.6).abs() < 1e-9);
        assert!((r.mid_x() - 0.25).abs() < 1e-9);
        assert!((r.mid_y() - 0.4).abs() < 1e-9);
    }

    #[test]
    fn union_covers_both() {
        let a = NormalizedRect::new(0.1, 0.1, 0.1, 0.1);
        let b = NormalizedRect::new(0.5, 0.3, 0.1, 0.2);
        let u = a.union(&b);
        assert!((u.x - 0.1).abs() < 1e-9);
        assert!((u.y - 0.1).abs() < 1e-9);
        assert!((u.max_x() - 0.6).abs() < 1e-9);
        assert!((u.max_y() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn union_all_of_nothing_is_none() {
        assert!(NormalizedRect::union_all(std::iter::empty()).is_none());
    }

    #[test]
    fn clamped_pulls_box_back_inside() {
        let r = NormalizedRect::new(0.95, -0.2, 0.3, 0.001).clamped();
        assert!(r.is_within_unit_square());
        assert!((r.width - 0.3).abs() < 1e-9);
        assert!((r.height - MIN_RECT_SIZE).abs() < 1e-9);
        assert!((r.x - 0.7).abs() < 1e-9);
        assert_eq!(r.y, 0.0);
    }

    #[test]
    fn clamped_handles_nan_and_huge_values() {
        let r = NormalizedRect::new(f64::NAN, f64::INFINITY, 5.0, f64::NAN).clamped();
        assert!(r.is_within_unit_square());
        assert_eq!(r.width, 1.0);
        assert_eq!(r.x, 0.0);
    }

    #[test]
    fn degenerate_detection() {
        assert!(NormalizedRect::new(0.1, 0.1, 0.0, 0.1).is_degenerate());
        assert!(NormalizedRect::new(0.1, 0.1, 0.1, f64::NAN).is_degenerate());
        assert!(!NormalizedRect::new(0.1, 0.1, 0.1, 0.1).is_degenerate());
    }

    #[test]
    fn horizontal_slice_stays_inside_parent() {
        let line = NormalizedRect::new(0.2, 0.5, 0.4, 0.02);
        let right_half = line.horizontal_slice(0.5, 1.0);
        assert!((right_half.x - 0.4).abs() < 1e-9);
        assert!((right_half.width - 0.2).abs() < 1e-9);
        assert_eq!(right_half.y, line.y);
    }
}
