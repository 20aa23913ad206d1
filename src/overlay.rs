//! Overlay records attached to a slide: text boxes, multi-run text boxes and
//! tables. Shapes are resolved into tagged variants once, at ingestion.

use crate::layout::{Align, TextLayoutElement};
use serde::{Deserialize, Serialize};

/// A text overlay: a single-style box, or a box of differently styled runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TextOverlay {
    Runs(RunsOverlay),
    Simple(TextLayoutElement),
}

impl From<TextLayoutElement> for TextOverlay {
    fn from(element: TextLayoutElement) -> Self {
        TextOverlay::Simple(element)
    }
}

impl TextOverlay {
    /// Concatenated visible text
    pub fn text(&self) -> String {
        match self {
            TextOverlay::Simple(element) => element.text.clone(),
            TextOverlay::Runs(runs) => runs.runs.iter().map(|r| r.text.as_str()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunsOverlay {
    pub runs: Vec<TextRun>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub w: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub h: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_face: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub align: Option<Align>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextRun {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bold: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub italic: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub break_line: Option<bool>,
}

/// A table cell: bare text, or text with per-cell styling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TableCell {
    Plain(String),
    Styled(StyledCell),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyledCell {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bold: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub align: Option<Align>,
}

impl TableCell {
    pub fn text(&self) -> &str {
        match self {
            TableCell::Plain(text) => text,
            TableCell::Styled(cell) => &cell.text,
        }
    }
}

const HEADER_FILL: &str = "2D1B69";
const HEADER_COLOR: &str = "FFFFFF";
const BODY_COLOR: &str = "333333";
const ALT_FILL: &str = "F5F0FC";
const TABLE_FONT: &str = "Arial";
const TABLE_FONT_SIZE: f64 = 14.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    pub rows: Vec<Vec<TableCell>>,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub w: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_face: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header_fill: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt_fill: Option<String>,
}

/// Effective style of one cell once table defaults are applied
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CellStyle {
    pub font_face: String,
    pub font_size: f64,
    pub color: String,
    pub bold: bool,
    pub fill: Option<String>,
    pub align: Align,
}

impl Table {
    /// Row 0 is the header; even body rows get the alternate fill unless the
    /// cell carries its own.
    pub fn cell_style(&self, row: usize, col: usize) -> Option<CellStyle> {
        let cell = self.rows.get(row)?.get(col)?;
        let styled = match cell {
            TableCell::Styled(styled) => Some(styled),
            TableCell::Plain(_) => None,
        };
        let body_color = self.color.clone().unwrap_or_else(|| BODY_COLOR.to_string());
        let alt_fill = (row % 2 == 0)
            .then(|| self.alt_fill.clone().unwrap_or_else(|| ALT_FILL.to_string()));

        let (color, bold, fill) = if row == 0 {
            (
                self.header_color.clone().unwrap_or_else(|| HEADER_COLOR.to_string()),
                true,
                Some(self.header_fill.clone().unwrap_or_else(|| HEADER_FILL.to_string())),
            )
        } else {
            (
                styled.and_then(|s| s.color.clone()).unwrap_or(body_color),
                styled.and_then(|s| s.bold).unwrap_or(false),
                styled.and_then(|s| s.fill.clone()).or(alt_fill),
            )
        };

        Some(CellStyle {
            font_face: self.font_face.clone().unwrap_or_else(|| TABLE_FONT.to_string()),
            font_size: styled
                .and_then(|s| s.font_size)
                .or(self.font_size)
                .unwrap_or(TABLE_FONT_SIZE),
            color,
            bold,
            fill,
            align: styled.and_then(|s| s.align).unwrap_or(Align::Ctr),
        })
    }
}
