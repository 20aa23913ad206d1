//! Layered configuration loading.
//!
//! Precedence, lowest first: built-in defaults, global file, workspace
//! `config/config.toml`, workspace `config/{MOFA_ENV}.toml`, then
//! `MOFA__...` environment variables.

use super::merge::merge_policy;
use super::sources::{environment, global_file, workspace_file};
use super::MofaConfig;
use crate::error::EngineError;
use config::File;
use std::path::Path;
use tracing::debug;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load the full layered configuration for `workspace_root`
    pub fn load(workspace_root: &Path) -> Result<MofaConfig, EngineError> {
        let builder = merge_policy::builder_with_defaults()?;
        let builder = global_file::add_to_builder(builder)?;
        let builder = workspace_file::add_to_builder(builder, workspace_root)?;
        let builder = environment::add_to_builder(builder);

        let config: MofaConfig = builder.build()?.try_deserialize()?;
        debug!(workspace = %workspace_root.display(), "Configuration loaded");
        Ok(config)
    }

    /// Load one explicit file over the defaults, with env overrides on top
    pub fn load_from_file(path: &Path) -> Result<MofaConfig, EngineError> {
        if !path.is_file() {
            return Err(EngineError::ConfigError(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }
        let builder = merge_policy::builder_with_defaults()?
            .add_source(File::from(path.to_path_buf()).required(true));
        let builder = environment::add_to_builder(builder);
        Ok(builder.build()?.try_deserialize()?)
    }

    /// Load and validate, joining validation errors into one message
    pub fn load_validated(
        workspace_root: &Path,
        explicit: Option<&Path>,
    ) -> Result<MofaConfig, EngineError> {
        let config = match explicit {
            Some(path) => Self::load_from_file(path)?,
            None => Self::load(workspace_root)?,
        };
        config.validate().map_err(|errors| {
            EngineError::ConfigError(
                errors
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("; "),
            )
        })?;
        Ok(config)
    }
}
