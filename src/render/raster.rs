//! Executes a [`RenderPlan`] onto a copy of the page image.

use std::path::Path;

use ab_glyph::FontVec;
use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgba, RgbaImage};
use imageproc::drawing::{draw_line_segment_mut, draw_text_mut};

use super::layout::{DrawOp, RenderPlan};
use super::transform::PixelRect;
use super::SignatureData;

const FONT_PATHS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Helvetica.ttc",
    "/System/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// Load a TrueType font: the explicit path first, then common system paths.
pub fn load_font(preferred: Option<&Path>) -> Option<FontVec> {
    if let Some(path) = preferred {
        match std::fs::read(path).map(FontVec::try_from_vec) {
            Ok(Ok(font)) => return Some(font),
            Ok(Err(e)) => tracing::warn!(path = %path.display(), error = %e, "Invalid font file"),
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "Cannot read font file"),
        }
    }

    FONT_PATHS.iter().find_map(|path| {
        std::fs::read(path)
            .ok()
            .and_then(|data| FontVec::try_from_vec(data).ok())
    })
}

/// Compose the plan onto the page. The output has the page's dimensions.
///
/// Without a font, text ops are skipped; marks and the signature still draw.
pub fn render_page(
    page: &DynamicImage,
    plan: &RenderPlan,
    signature: Option<&SignatureData>,
    font: Option<&FontVec>,
    ink: Rgba<u8>,
) -> RgbaImage {
    let mut output = page.to_rgba8();
    let mut skipped_text = 0usize;

    for op in &plan.ops {
        match op {
            DrawOp::Text { text, rect, font_px } => match font {
                Some(font) => {
                    let x = rect.x.round() as i32;
                    // Vertically centre the glyph run in the value box.
                    let y = (rect.y + (rect.height - f64::from(*font_px)) / 2.0).round() as i32;
                    draw_text_mut(&mut output, ink, x, y, *font_px, font, text);
                }
                None => skipped_text += 1,
            },
            DrawOp::CheckMark { rect } => draw_check_mark(&mut output, rect, ink),
            DrawOp::Signature { rect } => {
                if let Some(signature) = signature {
                    draw_signature(&mut output, rect, signature);
                }
            }
        }
    }

    if skipped_text > 0 {
        tracing::warn!(skipped = skipped_text, "No font available, text values not drawn");
    }
    output
}

/// A tick centred on the box, stroke width scaled with the box.
fn draw_check_mark(output: &mut RgbaImage, rect: &PixelRect, ink: Rgba<u8>) {
    let size = rect.width.min(rect.height).max(6.0) as f32;
    let (cx, cy) = rect.center();
    let (cx, cy) = (cx as f32, cy as f32);

    let start = (cx - size * 0.4, cy);
    let elbow = (cx - size * 0.1, cy + size * 0.35);
    let end = (cx + size * 0.45, cy - size * 0.4);

    let stroke = (size / 8.0).ceil().max(1.0) as i32;
    for dx in 0..stroke {
        for dy in 0..stroke {
            let (ox, oy) = (dx as f32, dy as f32);
            draw_line_segment_mut(output, (start.0 + ox, start.1 + oy), (elbow.0 + ox, elbow.1 + oy), ink);
            draw_line_segment_mut(output, (elbow.0 + ox, elbow.1 + oy), (end.0 + ox, end.1 + oy), ink);
        }
    }
}

fn draw_signature(output: &mut RgbaImage, rect: &PixelRect, signature: &SignatureData) {
    let width = rect.width.round().max(1.0) as u32;
    let height = rect.height.round().max(1.0) as u32;
    let scaled = imageops::resize(&signature.image().to_rgba8(), width, height, FilterType::Triangle);
    imageops::overlay(output, &scaled, rect.x.round() as i64, rect.y.round() as i64);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::transform::PageSize;

    const INK: Rgba<u8> = Rgba([20, 40, 160, 255]);

    fn blank(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255])))
    }

    fn inked_pixels(img: &RgbaImage) -> usize {
        img.pixels().filter(|p| **p == INK).count()
    }

    #[test]
    fn output_keeps_page_dimensions() {
        let plan = RenderPlan {
            page: PageSize::new(200.0, 100.0),
            ops: vec![],
        };
        let out = render_page(&blank(200, 100), &plan, None, None, INK);
        assert_eq!(out.dimensions(), (200, 100));
        assert_eq!(inked_pixels(&out), 0);
    }

    #[test]
    fn check_mark_draws_without_font() {
        let plan = RenderPlan {
            page: PageSize::new(100.0, 100.0),
            ops: vec![
                DrawOp::Text {
                    text: "Jane".into(),
                    rect: PixelRect::new(10.0, 10.0, 50.0, 12.0),
                    font_px: 10.0,
                },
                DrawOp::CheckMark {
                    rect: PixelRect::new(40.0, 40.0, 20.0, 20.0),
                },
            ],
        };
        let out = render_page(&blank(100, 100), &plan, None, None, INK);
        assert!(inked_pixels(&out) > 0);
        // the text box stays blank
        for y in 10..22 {
            for x in 10..38 {
                assert_ne!(*out.get_pixel(x, y), INK);
            }
        }
    }

    #[test]
    fn signature_is_composited_inside_its_rect() {
        let signature = crate::render::tests::sample_signature(20, 10);
        let plan = RenderPlan {
            page: PageSize::new(100.0, 100.0),
            ops: vec![DrawOp::Signature {
                rect: PixelRect::new(50.0, 80.0, 40.0, 20.0),
            }],
        };
        let out = render_page(&blank(100, 100), &plan, Some(&signature), None, INK);
        assert_eq!(*out.get_pixel(70, 90), Rgba([0, 0, 0, 255]));
        assert_eq!(*out.get_pixel(10, 10), Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn missing_font_file_falls_back_quietly() {
        let dir = tempfile::tempdir().unwrap();
        let bogus = dir.path().join("not-a-font.ttf");
        std::fs::write(&bogus, b"nope").unwrap();
        let missing = dir.path().join("absent.ttf");

        // A bad preferred font falls through to the system list.
        let system = load_font(None).is_some();
        assert_eq!(load_font(Some(&bogus)).is_some(), system);
        assert_eq!(load_font(Some(&missing)).is_some(), system);
    }
}
