//! TOML style sheets
//!
//! A style file maps variant tags to prompt prefixes:
//!
//! ```toml
//! [meta]
//! name = "xkcd"
//!
//! [variants]
//! default = "normal"
//!
//! [variants.normal]
//! prompt = "Stick figures, hand-drawn lines..."
//!
//! [variants.panel]
//! prompt = "..."
//! ```

use crate::error::EngineError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

pub const DEFAULT_VARIANT: &str = "normal";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleMeta {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleSheet {
    pub meta: Option<StyleMeta>,
    pub variants: BTreeMap<String, String>,
    pub default_variant: String,
}

#[derive(Debug, Deserialize)]
struct StyleFile {
    meta: Option<StyleMeta>,
    #[serde(default)]
    variants: toml::Table,
}

impl StyleSheet {
    pub fn parse(content: &str, path: &Path) -> Result<Self, EngineError> {
        let file: StyleFile = toml::from_str(content).map_err(|e| EngineError::InvalidStyle {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let mut default_variant = DEFAULT_VARIANT.to_string();
        let mut variants = BTreeMap::new();
        for (tag, value) in file.variants {
            match value {
                toml::Value::String(name) if tag == "default" => default_variant = name,
                toml::Value::Table(table) => match table.get("prompt") {
                    Some(toml::Value::String(prompt)) => {
                        variants.insert(tag, prompt.clone());
                    }
                    _ => warn!(path = %path.display(), variant = %tag, "Skipping variant without a string prompt"),
                },
                _ => warn!(path = %path.display(), variant = %tag, "Skipping variant that is not a table"),
            }
        }

        Ok(Self {
            meta: file.meta,
            variants,
            default_variant,
        })
    }

    pub fn load(path: &Path) -> Result<Self, EngineError> {
        if !path.is_file() {
            return Err(EngineError::StyleNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        let sheet = Self::parse(&content, path)?;
        debug!(path = %path.display(), variants = sheet.variants.len(), "Loaded style");
        Ok(sheet)
    }

    /// The tag's prompt, else the default variant's, else empty
    pub fn prompt_for(&self, tag: &str) -> &str {
        self.variants
            .get(tag)
            .or_else(|| self.variants.get(&self.default_variant))
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn has_variant(&self, tag: &str) -> bool {
        self.variants.contains_key(tag)
    }
}

/// `<dir>/<name>.toml`, which must exist
pub fn style_path(dir: &Path, name: &str) -> Result<PathBuf, EngineError> {
    let path = dir.join(format!("{}.toml", name));
    if path.is_file() {
        Ok(path)
    } else {
        Err(EngineError::StyleNotFound(path))
    }
}

/// Styles of one directory, keyed by file stem
#[derive(Debug, Clone, Default)]
pub struct StyleCatalog {
    styles: BTreeMap<String, StyleSheet>,
}

impl StyleCatalog {
    pub fn load_dir(dir: &Path) -> Result<Self, EngineError> {
        if !dir.is_dir() {
            return Err(EngineError::StyleNotFound(dir.to_path_buf()));
        }
        let mut styles = BTreeMap::new();
        for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable style entry");
                    continue;
                }
            };
            let path = entry.path();
            if !entry.file_type().is_file() || path.extension().and_then(|e| e.to_str()) != Some("toml") {
                continue;
            }
            let Some(stem) = path.file_stem().map(|s| s.to_string_lossy().to_string()) else {
                continue;
            };
            styles.insert(stem, StyleSheet::load(path)?);
        }
        Ok(Self { styles })
    }

    pub fn get(&self, name: &str) -> Option<&StyleSheet> {
        self.styles.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.styles.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.styles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }
}

/// `prefix` + blank line + `prompt`
pub fn styled_prompt(prefix: &str, prompt: &str) -> String {
    format!("{}\n\n{}", prefix, prompt)
}
