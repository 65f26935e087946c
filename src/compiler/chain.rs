//! Template chain resolution.
//!
//! A page names its layout with `template: <name>` in its front matter; that
//! template may name its own, and so on. The chain is resolved once per load
//! into an ordered list of names, nearest ancestor first.

use super::{BuildError, Document, Template};
use rustc_hash::{FxHashMap, FxHashSet};

/// Template registry keyed by template name.
pub type Templates = FxHashMap<String, Template>;

/// Ancestor template names of a document, nearest first. Never contains a repeat.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateChain(Vec<String>);

impl TemplateChain {
    pub fn names(&self) -> &[String] {
        &self.0
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|n| n == name)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

/// Resolve the template chain of `doc`.
pub fn resolve(doc: &Document, templates: &Templates) -> Result<TemplateChain, BuildError> {
    resolve_tracked(doc, templates).1
}

/// Resolve the template chain of `doc`, also reporting every template name
/// the walk referenced.
///
/// On failure the referenced names still include the missing or repeated
/// name, so dependency tracking can re-resolve the page once that template
/// changes.
pub fn resolve_tracked(
    doc: &Document,
    templates: &Templates,
) -> (Vec<String>, Result<TemplateChain, BuildError>) {
    let mut chain: Vec<String> = Vec::new();
    let mut visited: FxHashSet<String> = FxHashSet::default();
    let mut current = doc;

    while let Some(name) = current.parent_template() {
        let name = name.as_ref();
        if !visited.insert(name.to_owned()) {
            let mut cycle = chain.clone();
            cycle.push(name.to_owned());
            return (chain, Err(BuildError::CyclicTemplate { chain: cycle }));
        }

        let Some(template) = templates.get(name) else {
            chain.push(name.to_owned());
            let err = BuildError::MissingTemplate {
                name: name.to_owned(),
                page: doc.identity.clone(),
            };
            return (chain, Err(err));
        };

        chain.push(name.to_owned());
        current = template;
    }

    (chain.clone(), Ok(TemplateChain(chain)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::Context;
    use serde_json::json;
    use std::path::PathBuf;

    fn doc(name: &str, parent: Option<&str>) -> Document {
        let mut metadata = Context::new();
        if let Some(parent) = parent {
            metadata.insert("template".into(), json!(parent));
        }
        Document {
            content: String::new(),
            metadata,
            identity: PathBuf::from(format!("{name}.html")),
            name: name.into(),
        }
    }

    fn registry(entries: &[(&str, Option<&str>)]) -> Templates {
        entries
            .iter()
            .map(|(name, parent)| (name.to_string(), doc(name, *parent)))
            .collect()
    }

    #[test]
    fn test_no_template_key() {
        let chain = resolve(&doc("page", None), &Templates::default()).unwrap();
        assert!(chain.is_empty());
    }

    #[test]
    fn test_nearest_first() {
        let templates = registry(&[("post", Some("base")), ("base", None)]);
        let chain = resolve(&doc("page", Some("post")), &templates).unwrap();
        assert_eq!(chain.names(), ["post", "base"]);
        assert!(chain.contains("base"));
        assert!(!chain.contains("page"));
    }

    #[test]
    fn test_missing_template() {
        let templates = registry(&[("post", Some("base"))]);
        let (referenced, result) = resolve_tracked(&doc("page", Some("post")), &templates);

        match result.unwrap_err() {
            BuildError::MissingTemplate { name, page } => {
                assert_eq!(name, "base");
                assert_eq!(page, PathBuf::from("page.html"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(referenced, ["post", "base"]);
    }

    #[test]
    fn test_cycle_detected() {
        let templates = registry(&[("A", Some("B")), ("B", Some("A"))]);
        let (referenced, result) = resolve_tracked(&doc("page", Some("A")), &templates);

        match result.unwrap_err() {
            BuildError::CyclicTemplate { chain } => assert_eq!(chain, ["A", "B", "A"]),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(referenced, ["A", "B"]);
    }

    #[test]
    fn test_numeric_template_name() {
        let templates = registry(&[("404", None)]);
        let mut page = doc("missing", None);
        page.metadata.insert("template".into(), json!(404));

        let chain = resolve(&page, &templates).unwrap();
        assert_eq!(chain.names(), ["404"]);
    }

    #[test]
    fn test_structured_template_value_is_missing() {
        let templates = registry(&[("base", None)]);
        let mut page = doc("page", None);
        page.metadata.insert("template".into(), json!(["base"]));

        let err = resolve(&page, &templates).unwrap_err();
        assert!(matches!(err, BuildError::MissingTemplate { .. }));
    }

    #[test]
    fn test_self_reference_is_cycle() {
        let templates = registry(&[("loop", Some("loop"))]);
        let err = resolve(&doc("page", Some("loop")), &templates).unwrap_err();
        assert!(matches!(err, BuildError::CyclicTemplate { .. }));
    }
}
