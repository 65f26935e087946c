//! Site configuration management for `pagebuilder.toml`.
//!
//! # Sections
//!
//! | Section     | Purpose                                          |
//! |-------------|--------------------------------------------------|
//! | `[build]`   | Source roots, output root, extension, markers    |
//! | `[serve]`   | Preview server (port, interface, watch)          |
//! | `[data]`    | Shared data visible to every page                |
//!
//! # Example
//!
//! ```toml
//! [build]
//! pages = "pages"
//! output = "dist"
//! data_start = "<!-- YAML:\n"
//! data_end = "-->\n"
//!
//! [serve]
//! port = 5000
//!
//! [data]
//! site_name = "My Site"
//! ```

mod build;
pub mod defaults;
mod error;
mod serve;

pub use build::MetadataPolicy;

use build::BuildConfig;
use error::ConfigError;
use serve::ServeConfig;

use crate::cli::{Cli, Commands};
use crate::compiler::Context;
use anyhow::{Result, bail};
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

// ============================================================================
// Root Configuration
// ============================================================================

/// Root configuration structure representing pagebuilder.toml
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct SiteConfig {
    /// Absolute path to the config file (set after loading)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Build settings
    #[serde(default)]
    pub build: BuildConfig,

    /// Preview server settings
    #[serde(default)]
    pub serve: ServeConfig,

    /// Shared data merged at lowest precedence into every page context
    #[serde(default)]
    pub data: Context,
}

impl SiteConfig {
    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self> {
        let config: SiteConfig = toml::from_str(content).map_err(ConfigError::from)?;
        Ok(config)
    }

    /// Load configuration from file path
    pub fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;
        Self::from_str(&content)
    }

    /// Get the root directory path
    pub fn get_root(&self) -> &Path {
        self.build.root.as_deref().unwrap_or(Path::new("./"))
    }

    /// Set the root directory path
    pub fn set_root(&mut self, path: &Path) {
        self.build.root = Some(path.to_path_buf())
    }

    /// Shared data for page contexts.
    pub fn shared_data(&self) -> Context {
        self.data.clone()
    }

    /// Update configuration with CLI arguments
    pub fn update_with_cli(&mut self, cli: &Cli) {
        let root = cli
            .root
            .clone()
            .unwrap_or_else(|| self.get_root().to_owned());

        Self::update_option(&mut self.build.pages, cli.pages.as_ref());
        Self::update_option(&mut self.build.templates, cli.templates.as_ref());
        Self::update_option(&mut self.build.assets, cli.assets.as_ref());
        Self::update_option(&mut self.build.output, cli.output.as_ref());
        Self::update_option(&mut self.build.extension, cli.ext.as_ref());

        self.update_path_with_root(&root, &cli.config);

        match &cli.command {
            Commands::Build { strict } => {
                self.build.strict |= *strict;
            }
            Commands::Serve {
                interface,
                port,
                watch,
            } => {
                Self::update_option(&mut self.serve.interface, interface.as_ref());
                Self::update_option(&mut self.serve.port, port.as_ref());
                Self::update_option(&mut self.serve.watch, watch.as_ref());
            }
        }
    }

    /// Update config option if CLI value is provided
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    /// Resolve all paths against the root directory and normalize to absolute paths
    pub fn update_path_with_root(&mut self, root: &Path, config_name: &Path) {
        let root = normalize_path(root);
        self.set_root(&root);

        self.config_path = normalize_path(&root.join(config_name));
        self.build.pages = normalize_path(&root.join(&self.build.pages));
        self.build.templates = normalize_path(&root.join(&self.build.templates));
        self.build.assets = normalize_path(&root.join(&self.build.assets));
        self.build.output = normalize_path(&root.join(&self.build.output));
    }

    /// Validate configuration before building
    pub fn validate(&self) -> Result<()> {
        let build = &self.build;

        if !build.extension.starts_with('.') || build.extension.len() < 2 {
            bail!(ConfigError::Validation(format!(
                "[build.extension] must start with '.', got `{}`",
                build.extension
            )));
        }

        if build.data_start.is_empty() || build.data_end.is_empty() {
            bail!(ConfigError::Validation(
                "[build.data_start] and [build.data_end] must not be empty".into()
            ));
        }

        self.serve.listen_ip()?;

        if !build.pages.is_dir() {
            bail!(ConfigError::Validation(format!(
                "[build.pages] not found: {}",
                build.pages.display()
            )));
        }

        // The output root is wiped on every full build and written during watch,
        // so it must not overlap any source root.
        for (field, source) in [
            ("pages", &build.pages),
            ("templates", &build.templates),
            ("assets", &build.assets),
        ] {
            if source.starts_with(&build.output) || build.output.starts_with(source) {
                bail!(ConfigError::Validation(format!(
                    "[build.output] overlaps [build.{field}]: {}",
                    build.output.display()
                )));
            }
        }

        Ok(())
    }
}

/// Normalize a path to absolute, using canonicalize if the path exists
pub fn normalize_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| {
        // A file that no longer exists (deleted or moved away): canonicalize
        // its parent so it still compares equal to canonical roots.
        if let (Some(parent), Some(name)) = (path.parent(), path.file_name())
            && let Ok(parent) = parent.canonicalize()
        {
            return parent.join(name);
        }
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()
                .map(|cwd| cwd.join(path))
                .unwrap_or_else(|_| path.to_path_buf())
        }
    })
}

// ============================================================================
// Tests
// ============================================================================
