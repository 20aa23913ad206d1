//! Text layout model
//!
//! Text boxes positioned on a fixed logical canvas (13.333 × 7.5 units, 72
//! points per unit). Elements come either from vision extraction of a rendered
//! image or from the caller; both paths go through the same lenient ingestion
//! so missing or null geometry becomes zero and a missing font size becomes
//! 18 pt.

pub mod extract;
pub mod refine;

pub use extract::{extract_text_layout, extraction_instruction, parse_layout_response};
pub use refine::refine_layout;

use serde::{Deserialize, Deserializer, Serialize};

pub const DEFAULT_CANVAS_WIDTH: f64 = 13.333;
pub const DEFAULT_CANVAS_HEIGHT: f64 = 7.5;
pub const DEFAULT_CANVAS_MARGIN: f64 = 0.3;
pub const POINTS_PER_UNIT: f64 = 72.0;
pub const DEFAULT_FONT_SIZE: f64 = 18.0;

/// Logical canvas the layout coordinates live in
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Canvas {
    pub width: f64,
    pub height: f64,
    pub margin: f64,
}

impl Default for Canvas {
    fn default() -> Self {
        Self {
            width: DEFAULT_CANVAS_WIDTH,
            height: DEFAULT_CANVAS_HEIGHT,
            margin: DEFAULT_CANVAS_MARGIN,
        }
    }
}

impl Canvas {
    pub fn contains(&self, element: &TextLayoutElement) -> bool {
        element.x >= 0.0
            && element.y >= 0.0
            && element.x + element.w <= self.width
            && element.y + element.h <= self.height
    }
}

/// Horizontal alignment tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    Ctr,
    L,
    R,
    Just,
}

impl Align {
    fn parse(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "ctr" | "center" | "centre" => Some(Align::Ctr),
            "l" | "left" => Some(Align::L),
            "r" | "right" => Some(Align::R),
            "just" | "justify" => Some(Align::Just),
            _ => None,
        }
    }
}

/// One positioned text box
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextLayoutElement {
    pub text: String,
    #[serde(default, deserialize_with = "number_or_zero")]
    pub x: f64,
    #[serde(default, deserialize_with = "number_or_zero")]
    pub y: f64,
    #[serde(default, deserialize_with = "number_or_zero")]
    pub w: f64,
    #[serde(default, deserialize_with = "number_or_zero")]
    pub h: f64,
    #[serde(default = "default_font_size", deserialize_with = "font_size_or_default")]
    pub font_size: f64,
    #[serde(default, deserialize_with = "hex_color", skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, deserialize_with = "flag_or_false")]
    pub bold: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_face: Option<String>,
    #[serde(default, deserialize_with = "lenient_align", skip_serializing_if = "Option::is_none")]
    pub align: Option<Align>,
}

impl TextLayoutElement {
    pub fn new(text: impl Into<String>, x: f64, y: f64, w: f64, h: f64) -> Self {
        Self {
            text: text.into(),
            x,
            y,
            w,
            h,
            font_size: DEFAULT_FONT_SIZE,
            color: None,
            bold: false,
            font_face: None,
            align: None,
        }
    }

    pub fn with_font_size(mut self, font_size: f64) -> Self {
        self.font_size = font_size;
        self
    }

    pub fn with_align(mut self, align: Align) -> Self {
        self.align = Some(align);
        self
    }

    pub fn line_count(&self) -> usize {
        self.text.split('\n').count()
    }
}

fn default_font_size() -> f64 {
    DEFAULT_FONT_SIZE
}

fn number_or_zero<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(0.0))
}

fn font_size_or_default<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(Option::<f64>::deserialize(deserializer)?
        .filter(|size| *size > 0.0)
        .unwrap_or(DEFAULT_FONT_SIZE))
}

fn flag_or_false<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(false))
}

fn hex_color<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?
        .map(|c| c.trim().trim_start_matches('#').to_ascii_uppercase())
        .filter(|c| !c.is_empty()))
}

fn lenient_align<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Align>, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?
        .as_deref()
        .and_then(Align::parse))
}
