//! Spatial value association.
//!
//! For each label, every other OCR line on the same page is scored by how
//! likely it is to be the label's filled-in answer: text just to the right
//! on the same line, or text directly below and horizontally aligned.

use std::collections::BTreeSet;

use crate::config::SpatialConfig;
use crate::models::{Field, NormalizedRect, RecognizedLine};

/// Affinity of `candidate` as the value of `label`; `0.0` when neither
/// same-line-right nor below-aligned applies.
pub fn spatial_score(
    label: &NormalizedRect,
    candidate: &NormalizedRect,
    config: &SpatialConfig,
) -> f64 {
    if label.is_degenerate() || candidate.is_degenerate() {
        return 0.0;
    }
    same_line_right(label, candidate, config).max(below_aligned(label, candidate, config))
}

fn same_line_right(
    label: &NormalizedRect,
    candidate: &NormalizedRect,
    config: &SpatialConfig,
) -> f64 {
    let band = config.same_line_height_factor * label.height;
    let vertical_distance = (candidate.mid_y() - label.mid_y()).abs();
    if vertical_distance >= band {
        return 0.0;
    }
    let gap = candidate.min_x() - label.max_x();
    if gap <= 0.0 || gap >= config.max_right_gap {
        return 0.0;
    }
    (1.0 - gap / config.max_right_gap)
        * (1.0 - 0.5 * vertical_distance / band)
        * config.same_line_weight
}

fn below_aligned(
    label: &NormalizedRect,
    candidate: &NormalizedRect,
    config: &SpatialConfig,
) -> f64 {
    if candidate.max_y() >= label.min_y() {
        return 0.0;
    }
    let span = config.below_width_factor * label.width;
    let horizontal_distance = (candidate.mid_x() - label.mid_x()).abs();
    if horizontal_distance >= span {
        return 0.0;
    }
    let gap = label.min_y() - candidate.max_y();
    if gap >= config.max_below_gap {
        return 0.0;
    }
    (1.0 - gap / config.max_below_gap)
        * (1.0 - 0.5 * horizontal_distance / span)
        * config.below_weight
}

/// Attach the best-scoring value candidate to every field.
///
/// Lines listed in `label_lines` never act as values. A field whose label
/// line carried an inline value keeps it when no candidate scores above zero.
pub fn associate_values(
    fields: &mut [Field],
    lines: &[RecognizedLine],
    label_lines: &BTreeSet<usize>,
    config: &SpatialConfig,
) {
    let candidates: Vec<&RecognizedLine> = lines
        .iter()
        .enumerate()
        .filter(|(index, _)| !label_lines.contains(index))
        .map(|(_, line)| line)
        .filter(|line| {
            line.confidence >= config.min_candidate_confidence
                && line.trimmed().chars().count() >= config.min_candidate_len
        })
        .collect();

    let mut associated = 0usize;
    for field in fields.iter_mut() {
        let best = candidates
            .iter()
            .filter(|line| line.page_index == field.page_index)
            .map(|line| (spatial_score(&field.label_box, &line.bounding_box, config), *line))
            .filter(|(score, _)| *score > 0.0)
            // First candidate wins ties.
            .fold(None::<(f64, &RecognizedLine)>, |best, (score, line)| match best {
                Some((best_score, _)) if best_score >= score => best,
                _ => Some((score, line)),
            });

        if let Some((score, line)) = best {
            tracing::trace!(label = %field.label, value = %line.text, score, "Spatial value candidate");
            field.detected_value = Some(line.trimmed().to_string());
            field.value_box = Some(line.bounding_box);
            associated += 1;
        }
    }

    tracing::debug!(fields = fields.len(), associated, "Spatial association complete");
}
