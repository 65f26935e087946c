//! `[build]` section configuration.
//!
//! Contains source/output roots, the page extension and front matter markers.

use super::defaults;
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ============================================================================
// Enums
// ============================================================================

/// What to do with a front matter block that cannot be used as metadata.
///
/// Covers undecodable YAML, a decoded value that is not a mapping,
/// and a start marker without a matching end marker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetadataPolicy {
    /// Warn and continue with empty metadata (default).
    #[default]
    Lenient,
    /// Refuse to load the file.
    Strict,
}

// ============================================================================
// Main BuildConfig
// ============================================================================

/// `[build]` section in pagebuilder.toml - build pipeline configuration.
///
/// # Example
/// ```toml
/// [build]
/// pages = "pages"          # Page sources
/// templates = "templates"  # Layout templates
/// assets = "assets"        # Copied verbatim into the output root
/// output = "dist"
/// extension = ".html"
/// data_start = "<!-- YAML:\n"
/// data_end = "-->\n"
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    /// Project root directory (usually set via CLI `--root`).
    #[serde(default = "defaults::build::root")]
    #[educe(Default = defaults::build::root())]
    pub root: Option<PathBuf>,

    /// Page source directory.
    #[serde(default = "defaults::build::pages")]
    #[educe(Default = defaults::build::pages())]
    pub pages: PathBuf,

    /// Template directory. Templates are addressed by file name without extension.
    #[serde(default = "defaults::build::templates")]
    #[educe(Default = defaults::build::templates())]
    pub templates: PathBuf,

    /// Static assets directory. Skipped when it does not exist.
    #[serde(default = "defaults::build::assets")]
    #[educe(Default = defaults::build::assets())]
    pub assets: PathBuf,

    /// Build output directory. Cleared on every full build.
    #[serde(default = "defaults::build::output")]
    #[educe(Default = defaults::build::output())]
    pub output: PathBuf,

    /// Suffix shared by pages and templates, including the dot.
    #[serde(default = "defaults::build::extension")]
    #[educe(Default = defaults::build::extension())]
    pub extension: String,

    /// Line that opens a front matter block at the very start of a file.
    #[serde(default = "defaults::build::data_start")]
    #[educe(Default = defaults::build::data_start())]
    pub data_start: String,

    /// Text that closes the front matter block.
    #[serde(default = "defaults::build::data_end")]
    #[educe(Default = defaults::build::data_end())]
    pub data_end: String,

    /// Handling of unusable front matter.
    #[serde(default = "defaults::build::metadata")]
    #[educe(Default = defaults::build::metadata())]
    pub metadata: MetadataPolicy,

    /// Fail the full build if any page could not be rendered.
    #[serde(default = "defaults::r#false")]
    #[educe(Default = false)]
    pub strict: bool,
}

impl BuildConfig {
    /// Whether asset mirroring is enabled for this build.
    pub fn has_assets(&self) -> bool {
        self.assets.is_dir()
    }
}

#[cfg(test)]
mod tests {
    use super::super::SiteConfig;
    use super::*;

    #[test]
    fn test_build_config_defaults() {
        let config: SiteConfig = toml::from_str("").unwrap();

        assert_eq!(config.build.pages, PathBuf::from("pages"));
        assert_eq!(config.build.templates, PathBuf::from("templates"));
        assert_eq!(config.build.assets, PathBuf::from("assets"));
        assert_eq!(config.build.output, PathBuf::from("dist"));
        assert_eq!(config.build.extension, ".html");
        assert_eq!(config.build.data_start, "---\n");
        assert_eq!(config.build.data_end, "---\n");
        assert_eq!(config.build.metadata, MetadataPolicy::Lenient);
        assert!(!config.build.strict);
    }

    #[test]
    fn test_build_config_custom_markers() {
        let config = r#"
            [build]
            data_start = "<!-- YAML:\n"
            data_end = "-->\n"
            metadata = "strict"
        "#;
        let config: SiteConfig = toml::from_str(config).unwrap();

        assert_eq!(config.build.data_start, "<!-- YAML:\n");
        assert_eq!(config.build.data_end, "-->\n");
        assert_eq!(config.build.metadata, MetadataPolicy::Strict);
    }

    #[test]
    fn test_invalid_metadata_policy() {
        let config = r#"
            [build]
            metadata = "sometimes"
        "#;
        let result: Result<SiteConfig, _> = toml::from_str(config);
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_field_rejection() {
        let config = r#"
            [build]
            minify = true
        "#;
        let result: Result<SiteConfig, _> = toml::from_str(config);
        assert!(result.is_err());
    }
}
