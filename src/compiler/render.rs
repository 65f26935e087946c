//! Bottom-up rendering through a template chain.
//!
//! ```text
//! context = shared ∪ page.metadata          (page wins)
//! slot    = engine(page.content, context)
//! for template in chain (nearest first):
//!     context = template.metadata ∪ context (context wins)
//!     slot    = engine(template.content, context)
//! result  = slot
//! ```

use super::{BuildError, Context, Document, TemplateChain, Templates};
use minijinja::Environment;
use serde_json::Value;

/// Reserved context key holding the most recently rendered fragment.
pub const SLOT: &str = "slot";

pub type EngineError = Box<dyn std::error::Error + Send + Sync>;

/// Renders template text against a context.
///
/// Any `Fn(&str, &Context) -> Result<String, EngineError>` closure is an engine,
/// which is how callers override the default render function.
pub trait Engine: Send + Sync {
    fn render(&self, source: &str, context: &Context) -> Result<String, EngineError>;
}

impl<F> Engine for F
where
    F: Fn(&str, &Context) -> Result<String, EngineError> + Send + Sync,
{
    fn render(&self, source: &str, context: &Context) -> Result<String, EngineError> {
        self(source, context)
    }
}

/// Default engine: Jinja syntax via minijinja, no auto-escaping.
pub struct MiniJinjaEngine {
    env: Environment<'static>,
}

impl MiniJinjaEngine {
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.set_keep_trailing_newline(true);
        Self { env }
    }
}

impl Default for MiniJinjaEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for MiniJinjaEngine {
    fn render(&self, source: &str, context: &Context) -> Result<String, EngineError> {
        let ctx = minijinja::Value::from_serialize(context);
        Ok(self.env.render_str(source, ctx)?)
    }
}

/// Render `doc` through its resolved `chain`.
pub fn render(
    doc: &Document,
    chain: &TemplateChain,
    templates: &Templates,
    shared: &Context,
    engine: &dyn Engine,
) -> Result<String, BuildError> {
    let mut context = shared.clone();
    context.extend(doc.metadata.clone());

    let mut slot = run(engine, &doc.content, &context, &doc.name)?;

    for name in chain.iter() {
        let template = templates
            .get(name)
            .ok_or_else(|| BuildError::MissingTemplate {
                name: name.to_owned(),
                page: doc.identity.clone(),
            })?;

        context.insert(SLOT.into(), Value::String(slot));
        for (key, value) in &template.metadata {
            context
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }

        slot = run(engine, &template.content, &context, name)?;
    }

    Ok(slot)
}

fn run(engine: &dyn Engine, source: &str, context: &Context, name: &str) -> Result<String, BuildError> {
    engine.render(source, context).map_err(|source| BuildError::Render {
        name: name.to_owned(),
        source: source.into(),
    })
}
