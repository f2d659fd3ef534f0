//! Render planning: decide where every value, mark and signature goes.
//!
//! The plan is pure geometry in drawing space so it can be inspected and
//! tested without touching pixels; [`super::raster`] executes it.

use serde::Serialize;

use super::transform::{to_output, PageSize, PixelRect};
use crate::config::RenderConfig;
use crate::models::{CheckboxGroup, Field, FieldType, NormalizedRect};

/// One drawing instruction in page pixels (top-left origin).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum DrawOp {
    Text { text: String, rect: PixelRect, font_px: f32 },
    CheckMark { rect: PixelRect },
    Signature { rect: PixelRect },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderPlan {
    pub page: PageSize,
    pub ops: Vec<DrawOp>,
}

impl RenderPlan {
    pub fn text_ops(&self) -> impl Iterator<Item = &DrawOp> {
        self.ops.iter().filter(|op| matches!(op, DrawOp::Text { .. }))
    }

    pub fn has_signature(&self) -> bool {
        self.ops.iter().any(|op| matches!(op, DrawOp::Signature { .. }))
    }
}

/// How the signature should be placed, if the session has one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignaturePlacement {
    /// Image width / height.
    pub aspect: f64,
    /// Manual normalized position; `None` means default placement.
    pub position: Option<NormalizedRect>,
}

/// Plan the drawing for one page.
pub fn layout(
    fields: &[Field],
    groups: &[CheckboxGroup],
    signature: Option<SignaturePlacement>,
    page: PageSize,
    page_index: usize,
    config: &RenderConfig,
) -> RenderPlan {
    let mut ops = Vec::new();

    for field in fields.iter().filter(|f| f.page_index == page_index) {
        match field.field_type {
            FieldType::Text | FieldType::Date => {
                if !field.is_filled() {
                    continue;
                }
                let area = field
                    .adjusted_value_box
                    .unwrap_or_else(|| default_value_box(field, config));
                let rect = to_output(&area, page);
                ops.push(DrawOp::Text {
                    text: field.value.trim().to_string(),
                    font_px: font_px_for(&rect, config),
                    rect,
                });
            }
            FieldType::Checkbox => {
                if field.is_checked == Some(true) {
                    if let Some(area) = field.adjusted_value_box.or(field.value_box) {
                        ops.push(DrawOp::CheckMark {
                            rect: to_output(&area, page),
                        });
                    }
                }
            }
            // Signature fields anchor the signature image below.
            FieldType::Signature => {}
        }
    }

    for group in groups.iter().filter(|g| g.page_index == page_index) {
        for option in group.checked_options() {
            ops.push(DrawOp::CheckMark {
                rect: to_output(&option.bounding_box, page),
            });
        }
    }

    if let Some(placement) = signature {
        if let Some(area) = signature_area(fields, placement, page_index, config) {
            let rect = to_output(&area, page).fit_aspect(placement.aspect);
            ops.push(DrawOp::Signature { rect });
        }
    }

    tracing::debug!(page = page_index, ops = ops.len(), "Render plan built");
    RenderPlan { page, ops }
}

/// Short standalone captions take their value underneath; everything else
/// to the right.
pub fn default_value_box(field: &Field, config: &RenderConfig) -> NormalizedRect {
    let label = &field.label_box;
    let short_caption =
        field.label.trim().chars().count() < config.short_caption_len && !field.label.contains(':');

    let rect = if short_caption {
        NormalizedRect::new(
            label.x,
            label.y - config.value_gap - label.height,
            config.default_value_width.min(1.0 - label.x),
            label.height,
        )
    } else {
        let x = label.max_x() + config.value_gap;
        NormalizedRect::new(x, label.y, config.default_value_width.min(1.0 - x), label.height)
    };
    rect.clamped()
}

fn font_px_for(rect: &PixelRect, config: &RenderConfig) -> f32 {
    let min = if config.min_font_px.is_finite() && config.min_font_px > 0.0 {
        config.min_font_px
    } else {
        1.0
    };
    // An inverted or NaN maximum collapses onto the minimum.
    let max = if config.max_font_px.is_finite() {
        config.max_font_px.max(min)
    } else {
        min
    };
    let px = (rect.height * 0.8) as f32;
    if px.is_finite() {
        px.clamp(min, max)
    } else {
        min
    }
}

/// Normalized area the signature is fitted into: manual position, else
/// beside the designated signature field, else the fallback corner.
/// Without a signature field, default placement lives on the first page.
fn signature_area(
    fields: &[Field],
    placement: SignaturePlacement,
    page_index: usize,
    config: &RenderConfig,
) -> Option<NormalizedRect> {
    let anchor = fields.iter().find(|f| f.field_type == FieldType::Signature);
    let target_page = anchor.map_or(0, |f| f.page_index);
    if target_page != page_index {
        return None;
    }

    if let Some(position) = placement.position {
        return Some(position.clamped());
    }
    if let Some(field) = anchor {
        let label = &field.label_box;
        let x = label.max_x() + config.value_gap;
        return Some(
            NormalizedRect::new(x, label.y, config.signature_width, label.height * 3.0).clamped(),
        );
    }
    let [x, y, width, height] = config.signature_fallback;
    Some(NormalizedRect::new(x, y, width, height).clamped())
}
