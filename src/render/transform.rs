//! Coordinate transforms between detection space and drawing space.
//!
//! Detection space is the unit square with its origin at the bottom-left.
//! Drawing space is pixels with the origin at the top-left, so every
//! placement goes through `out_y = (1 − y − h) × page_height`.

use serde::{Deserialize, Serialize};

use crate::models::NormalizedRect;

/// Pixel dimensions of a page or display container. Never below 1×1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSize {
    pub width: f64,
    pub height: f64,
}

impl PageSize {
    /// Degenerate sizes (zero, negative, NaN) clamp to one pixel.
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width: at_least_one(width),
            height: at_least_one(height),
        }
    }

    pub fn from_dimensions((width, height): (u32, u32)) -> Self {
        Self::new(f64::from(width), f64::from(height))
    }

    pub fn aspect_ratio(&self) -> f64 {
        self.width / self.height
    }
}

fn at_least_one(value: f64) -> f64 {
    if value.is_finite() && value >= 1.0 {
        value
    } else {
        1.0
    }
}

/// Rectangle in drawing space: pixels, origin top-left.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl PixelRect {
    pub const MINIMAL: PixelRect = PixelRect {
        x: 0.0,
        y: 0.0,
        width: 1.0,
        height: 1.0,
    };

    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn is_degenerate(&self) -> bool {
        !(self.width.is_finite() && self.height.is_finite()) || self.width <= 0.0 || self.height <= 0.0
    }

    /// Largest rect with `aspect` (width / height) centred inside `self`.
    pub fn fit_aspect(&self, aspect: f64) -> PixelRect {
        if self.is_degenerate() || !aspect.is_finite() || aspect <= 0.0 {
            return PixelRect::MINIMAL;
        }
        let (width, height) = if self.width / self.height > aspect {
            (self.height * aspect, self.height)
        } else {
            (self.width, self.width / aspect)
        };
        PixelRect::new(
            self.x + (self.width - width) / 2.0,
            self.y + (self.height - height) / 2.0,
            width,
            height,
        )
    }
}

/// Normalized (bottom-left) → page pixels (top-left).
pub fn to_output(rect: &NormalizedRect, page: PageSize) -> PixelRect {
    PixelRect::new(
        rect.x * page.width,
        (1.0 - rect.y - rect.height) * page.height,
        rect.width * page.width,
        rect.height * page.height,
    )
}

/// Page pixels (top-left) → normalized (bottom-left). Inverse of [`to_output`].
pub fn to_normalized(rect: &PixelRect, page: PageSize) -> NormalizedRect {
    let height = rect.height / page.height;
    NormalizedRect::new(
        rect.x / page.width,
        1.0 - rect.y / page.height - height,
        rect.width / page.width,
        height,
    )
}

/// Where a page of `content` size is displayed inside `container` when
/// scaled to fit with its aspect ratio preserved and centred.
pub fn aspect_fit(content: PageSize, container: PageSize) -> PixelRect {
    PixelRect::new(0.0, 0.0, container.width, container.height).fit_aspect(content.aspect_ratio())
}

/// Normalized rect → container pixels, for a page displayed aspect-fit.
pub fn to_container(rect: &NormalizedRect, content: PageSize, container: PageSize) -> PixelRect {
    let frame = aspect_fit(content, container);
    let local = to_output(rect, PageSize::new(frame.width, frame.height));
    PixelRect::new(frame.x + local.x, frame.y + local.y, local.width, local.height)
}

/// Container pixels → normalized rect. Inverse of [`to_container`].
pub fn from_container(rect: &PixelRect, content: PageSize, container: PageSize) -> NormalizedRect {
    let frame = aspect_fit(content, container);
    let local = PixelRect::new(rect.x - frame.x, rect.y - frame.y, rect.width, rect.height);
    to_normalized(&local, PageSize::new(frame.width, frame.height))
}
