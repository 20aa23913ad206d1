//! Vision layout extraction: instruction contract and response parsing.

use super::{refine_layout, Canvas, TextLayoutElement};
use crate::error::EngineError;
use crate::provider::{LayoutProvider, MediaPayload};
use serde_json::Value;
use std::path::Path;
use tracing::debug;

/// Instruction sent alongside the reference image
pub fn extraction_instruction(canvas: &Canvas, style_hint: Option<&str>) -> String {
    let style_context = style_hint
        .filter(|hint| !hint.trim().is_empty())
        .map(|hint| {
            format!(
                "\n\nSTYLE CONTEXT (use these for accurate color/font mapping):\n{}",
                hint
            )
        })
        .unwrap_or_default();

    format!(
        r#"You are a slide layout engineer. Analyze this image and extract text positions for native text box overlay.

CANVAS: {w}" wide x {h}" tall (origin at top-left).

For EVERY visible text element, return a JSON object with:
- "text": exact text content (preserve original language)
- "x": left edge of the text box, including padding from the containing card/region
- "y": top edge of the text box
- "w": width of the text box; match the containing card/column width, NOT the tight text bounding box
- "h": height of the text box
- "fontSize": font size in POINTS, not pixels. Typical sizes: title 36-44pt, subtitle 18-22pt, body 14-18pt, KPI numbers 32-40pt, small labels 12-14pt
- "color": hex RGB WITHOUT a leading # ; distinguish titles, accents and labels carefully
- "bold": true only if clearly bold
- "fontFace": best matching font name
- "align": "ctr" if centered in its container, "l" for left, "r" for right

RULES:
1. Box width matches the CONTAINER (card, column, slide width), not the text extent
2. Font sizes are points. A big title is 36-44pt, NOT 60-80pt
3. Group multi-line text of one visual block into ONE entry with newlines
4. Skip page numbers and decorative watermarks{style}
Return ONLY a JSON array. No markdown, no explanation."#,
        w = canvas.width,
        h = canvas.height,
        style = style_context,
    )
}

/// Parse a raw provider answer into layout elements.
///
/// The answer must be a JSON array (optionally wrapped in a code fence).
pub fn parse_layout_response(raw: &str) -> Result<Vec<TextLayoutElement>, EngineError> {
    let body = strip_code_fence(raw);
    let value: Value = serde_json::from_str(body).map_err(|e| {
        EngineError::LayoutExtractionFailed(format!("Response is not valid JSON: {}", e))
    })?;
    let Value::Array(items) = value else {
        return Err(EngineError::LayoutExtractionFailed(
            "Response is not a JSON array".to_string(),
        ));
    };
    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            serde_json::from_value(item).map_err(|e| {
                EngineError::LayoutExtractionFailed(format!("Entry {} is malformed: {}", i, e))
            })
        })
        .collect()
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Single extraction attempt: read the image, ask the provider, parse, refine
pub async fn extract_text_layout(
    provider: &dyn LayoutProvider,
    image_path: &Path,
    canvas: &Canvas,
    style_hint: Option<&str>,
    model: Option<&str>,
) -> Result<Vec<TextLayoutElement>, EngineError> {
    let image = MediaPayload::load_image(image_path).await?;
    let instruction = extraction_instruction(canvas, style_hint);
    let raw = provider.analyze(&image, &instruction, model).await?;
    debug!(
        image = %image_path.display(),
        provider = provider.provider_name(),
        response_len = raw.len(),
        "Layout response received"
    );
    let elements = parse_layout_response(&raw)?;
    Ok(refine_layout(elements, canvas))
}
