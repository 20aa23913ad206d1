//! Geometry normalization for extracted text boxes.
//!
//! Boxes only grow or move inward; text is never touched.

use super::{Align, Canvas, TextLayoutElement, POINTS_PER_UNIT};

/// Layouts with at most this many elements are treated as cover slides
pub const COVER_MAX_ELEMENTS: usize = 3;

const LARGE_FONT_POINTS: f64 = 30.0;
const LARGE_FONT_MIN_WIDTH: f64 = 2.0;
const MIN_WIDTH: f64 = 1.2;
const LINE_HEIGHT_FACTOR: f64 = 1.4;
const HEIGHT_PADDING: f64 = 0.1;

pub fn refine_layout(mut elements: Vec<TextLayoutElement>, canvas: &Canvas) -> Vec<TextLayoutElement> {
    if elements.is_empty() {
        return elements;
    }

    if elements.len() <= COVER_MAX_ELEMENTS {
        for element in &mut elements {
            element.x = canvas.margin;
            element.w = canvas.width - 2.0 * canvas.margin;
            if !matches!(element.align, Some(Align::L) | Some(Align::R)) {
                element.align = Some(Align::Ctr);
            }
            clamp_axis(&mut element.y, &mut element.h, canvas.height, canvas.margin);
        }
        return elements;
    }

    for element in &mut elements {
        let min_w = if element.font_size >= LARGE_FONT_POINTS {
            LARGE_FONT_MIN_WIDTH
        } else {
            MIN_WIDTH
        };
        if element.w < min_w {
            element.w = min_w;
        }

        let min_h = minimum_height(element);
        if element.h < min_h {
            element.h = min_h;
        }

        clamp_axis(&mut element.x, &mut element.w, canvas.width, canvas.margin);
        clamp_axis(&mut element.y, &mut element.h, canvas.height, canvas.margin);
    }
    elements
}

/// `(font_size / 72) × lines × 1.4 + 0.1`
pub fn minimum_height(element: &TextLayoutElement) -> f64 {
    (element.font_size / POINTS_PER_UNIT) * element.line_count() as f64 * LINE_HEIGHT_FACTOR
        + HEIGHT_PADDING
}

fn clamp_axis(origin: &mut f64, size: &mut f64, extent: f64, margin: f64) {
    if *origin < 0.0 {
        *origin = margin;
    }
    // Origin past the far margin: pull the box back inside
    if *origin > extent - margin {
        *origin = (extent - margin - *size).max(margin);
    }
    if *origin + *size > extent {
        *size = (extent - *origin - margin).max(0.0);
    }
}
