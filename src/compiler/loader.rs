//! Source file loading: front matter splitting and metadata decoding.
//!
//! A file may start with a front matter block:
//!
//! ```text
//! ---
//! title: Home
//! template: base
//! ---
//! <h1>{{ title }}</h1>
//! ```
//!
//! The text strictly between the start and end markers is decoded as YAML
//! and must be a mapping. Everything after the end marker is content.
//! Files that do not begin with the start marker have no metadata.

use super::{BuildError, Context};
use crate::config::{MetadataPolicy, SiteConfig};
use crate::log;
use serde_json::Value;
use std::{
    borrow::Cow,
    fs,
    path::{Path, PathBuf},
};

/// A loaded page or template.
///
/// Replaced wholesale whenever its source changes; never mutated in place.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub content: String,
    pub metadata: Context,
    /// Source path relative to its root; the registry key for pages.
    pub identity: PathBuf,
    /// File name without the configured extension; the registry key for templates.
    pub name: String,
}

/// Templates share the page shape, keyed by name instead of path.
pub type Template = Document;

impl Document {
    /// The `template` metadata key as a template name, if present and truthy.
    ///
    /// Numbers and `true` name the template by their text (`template: 404`
    /// looks up `404`). Non-empty sequences and mappings never match a
    /// template name, so resolving them reports a missing template.
    pub fn parent_template(&self) -> Option<Cow<'_, str>> {
        match self.metadata.get("template")? {
            Value::Null | Value::Bool(false) => None,
            Value::String(name) if name.is_empty() => None,
            Value::String(name) => Some(Cow::Borrowed(name)),
            Value::Number(n) if n.as_f64() == Some(0.0) => None,
            Value::Array(items) if items.is_empty() => None,
            Value::Object(map) if map.is_empty() => None,
            other => Some(Cow::Owned(other.to_string())),
        }
    }
}

/// Reads source files using the configured extension and front matter markers.
#[derive(Debug, Clone)]
pub struct Loader {
    extension: String,
    data_start: String,
    data_end: String,
    policy: MetadataPolicy,
}

impl Loader {
    pub fn new(config: &SiteConfig) -> Self {
        Self {
            extension: config.build.extension.clone(),
            data_start: config.build.data_start.clone(),
            data_end: config.build.data_end.clone(),
            policy: config.build.metadata,
        }
    }

    /// Whether `path` names a source file (has the configured extension).
    pub fn accepts(&self, path: &Path) -> bool {
        self.name_of(path).is_some()
    }

    /// Base name of `path` with the configured extension removed.
    pub fn name_of(&self, path: &Path) -> Option<String> {
        let file_name = path.file_name()?.to_str()?;
        file_name
            .strip_suffix(&self.extension)
            .filter(|stem| !stem.is_empty())
            .map(str::to_owned)
    }

    /// Load `path`, identified relative to `root`.
    pub fn load(&self, path: &Path, root: &Path) -> Result<Document, BuildError> {
        let identity = path.strip_prefix(root).unwrap_or(path).to_path_buf();
        let raw = fs::read_to_string(path).map_err(|e| BuildError::io(path, e))?;
        self.parse(&raw, identity)
    }

    /// Split and decode already-read text.
    pub fn parse(&self, raw: &str, identity: PathBuf) -> Result<Document, BuildError> {
        let name = self
            .name_of(&identity)
            .unwrap_or_else(|| identity.display().to_string());

        let (metadata, content) = match self.split(raw) {
            Split::Plain => (Context::new(), raw),
            Split::Unterminated => {
                let metadata = self.reject(&identity, "front matter has no end marker")?;
                (metadata, raw)
            }
            Split::Block { data, content } => {
                let metadata = match decode(data) {
                    Ok(metadata) => metadata,
                    Err(reason) => self.reject(&identity, &reason)?,
                };
                (metadata, content)
            }
        };

        Ok(Document {
            content: content.to_owned(),
            metadata,
            identity,
            name,
        })
    }

    fn split<'a>(&self, raw: &'a str) -> Split<'a> {
        let Some(rest) = raw.strip_prefix(&self.data_start) else {
            return Split::Plain;
        };
        match rest.find(&self.data_end) {
            Some(end) => Split::Block {
                data: &rest[..end],
                content: &rest[end + self.data_end.len()..],
            },
            None => Split::Unterminated,
        }
    }

    /// Apply the metadata policy to an unusable block.
    fn reject(&self, identity: &Path, reason: &str) -> Result<Context, BuildError> {
        match self.policy {
            MetadataPolicy::Lenient => {
                log!("warn"; "{}: {reason}; using empty metadata", identity.display());
                Ok(Context::new())
            }
            MetadataPolicy::Strict => Err(BuildError::Load {
                path: identity.to_path_buf(),
                reason: reason.to_owned(),
            }),
        }
    }
}

enum Split<'a> {
    Plain,
    Unterminated,
    Block { data: &'a str, content: &'a str },
}

/// Decode a YAML block into a mapping. A blank block is an empty mapping.
fn decode(data: &str) -> Result<Context, String> {
    if data.trim().is_empty() {
        return Ok(Context::new());
    }
    match serde_yaml::from_str::<Value>(data) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(format!("front matter is not a mapping: {other}")),
        Err(e) => Err(format!("invalid front matter: {e}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn loader(policy: MetadataPolicy) -> Loader {
        let mut config = SiteConfig::default();
        config.build.metadata = policy;
        Loader::new(&config)
    }

    fn parse(policy: MetadataPolicy, raw: &str) -> Result<Document, BuildError> {
        loader(policy).parse(raw, PathBuf::from("blog/post.html"))
    }

    #[test]
    fn test_no_front_matter() {
        let doc = parse(MetadataPolicy::Lenient, "<p>hi</p>\n").unwrap();
        assert!(doc.metadata.is_empty());
        assert_eq!(doc.content, "<p>hi</p>\n");
        assert_eq!(doc.name, "post");
        assert_eq!(doc.identity, PathBuf::from("blog/post.html"));
    }

    #[test]
    fn test_front_matter_split() {
        let doc = parse(
            MetadataPolicy::Strict,
            "---\ntitle: Hello\ntemplate: base\ntags: [a, b]\n---\n<p>{{ title }}</p>\n",
        )
        .unwrap();
        assert_eq!(doc.metadata["title"], json!("Hello"));
        assert_eq!(doc.metadata["tags"], json!(["a", "b"]));
        assert_eq!(doc.parent_template().as_deref(), Some("base"));
        assert_eq!(doc.content, "<p>{{ title }}</p>\n");
    }

    #[test]
    fn test_marker_not_at_start_is_content() {
        let raw = "\n---\ntitle: x\n---\nbody";
        let doc = parse(MetadataPolicy::Strict, raw).unwrap();
        assert!(doc.metadata.is_empty());
        assert_eq!(doc.content, raw);
    }

    #[test]
    fn test_custom_markers() {
        let mut config = SiteConfig::default();
        config.build.data_start = "<!-- YAML:\n".into();
        config.build.data_end = "-->\n".into();
        let doc = Loader::new(&config)
            .parse("<!-- YAML:\ntitle: Hi\n-->\nbody", PathBuf::from("index.html"))
            .unwrap();
        assert_eq!(doc.metadata["title"], json!("Hi"));
        assert_eq!(doc.content, "body");
        assert_eq!(doc.name, "index");
    }

    #[test]
    fn test_empty_block_is_empty_mapping() {
        let doc = parse(MetadataPolicy::Strict, "---\n---\nbody").unwrap();
        assert!(doc.metadata.is_empty());
        assert_eq!(doc.content, "body");
    }

    #[test]
    fn test_lenient_non_mapping_degrades() {
        let doc = parse(MetadataPolicy::Lenient, "---\n- a\n- b\n---\nbody").unwrap();
        assert!(doc.metadata.is_empty());
        assert_eq!(doc.content, "body");
    }

    #[test]
    fn test_lenient_invalid_yaml_degrades() {
        let doc = parse(MetadataPolicy::Lenient, "---\ntitle: [unclosed\n---\nbody").unwrap();
        assert!(doc.metadata.is_empty());
        assert_eq!(doc.content, "body");
    }

    #[test]
    fn test_lenient_unterminated_keeps_whole_text() {
        let raw = "---\ntitle: x\nbody";
        let doc = parse(MetadataPolicy::Lenient, raw).unwrap();
        assert!(doc.metadata.is_empty());
        assert_eq!(doc.content, raw);
    }

    #[test]
    fn test_strict_rejects_non_mapping() {
        let err = parse(MetadataPolicy::Strict, "---\njust a string\n---\nbody").unwrap_err();
        assert!(matches!(err, BuildError::Load { .. }));
        assert!(err.to_string().contains("not a mapping"));
    }

    #[test]
    fn test_strict_rejects_invalid_yaml() {
        let err = parse(MetadataPolicy::Strict, "---\ntitle: [unclosed\n---\nbody").unwrap_err();
        assert!(matches!(err, BuildError::Load { .. }));
    }

    #[test]
    fn test_strict_rejects_unterminated() {
        let err = parse(MetadataPolicy::Strict, "---\ntitle: x\nbody").unwrap_err();
        assert!(err.to_string().contains("no end marker"));
    }

    #[test]
    fn test_parent_template_falsy() {
        for value in ["''", "null", "false", "0", "0.0", "[]", "{}"] {
            let doc = parse(MetadataPolicy::Strict, &format!("---\ntemplate: {value}\n---\n")).unwrap();
            assert_eq!(doc.parent_template(), None, "template: {value}");
        }
    }

    #[test]
    fn test_parent_template_scalars_by_text() {
        let name = |value: &str| {
            parse(MetadataPolicy::Strict, &format!("---\ntemplate: {value}\n---\n"))
                .unwrap()
                .parent_template()
                .map(Cow::into_owned)
        };
        assert_eq!(name("404"), Some("404".into()));
        assert_eq!(name("true"), Some("true".into()));
        assert_eq!(name("'404'"), Some("404".into()));
        assert_eq!(name("[base]"), Some(r#"["base"]"#.into()));
    }

    #[test]
    fn test_name_of_and_accepts() {
        let loader = loader(MetadataPolicy::Lenient);
        assert_eq!(loader.name_of(Path::new("a/b/c.html")), Some("c".into()));
        assert!(loader.accepts(Path::new("index.html")));
        assert!(!loader.accepts(Path::new("style.css")));
        assert!(!loader.accepts(Path::new(".html")));
    }

    #[test]
    fn test_load_from_disk() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("docs");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("guide.html"), "---\ntitle: Guide\n---\ntext").unwrap();

        let doc = loader(MetadataPolicy::Lenient)
            .load(&nested.join("guide.html"), dir.path())
            .unwrap();
        assert_eq!(doc.identity, PathBuf::from("docs/guide.html"));
        assert_eq!(doc.name, "guide");
        assert_eq!(doc.metadata["title"], json!("Guide"));
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let err = loader(MetadataPolicy::Lenient)
            .load(&dir.path().join("nope.html"), dir.path())
            .unwrap_err();
        assert!(matches!(err, BuildError::Io { .. }));
    }
}
