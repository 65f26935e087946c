//! Site building orchestration.
//!
//! [`Site`] owns the configuration, the render engine and the [`BuildState`]
//! (page registry, template registry, dependency index). The full build and
//! the incremental dispatcher both mutate the state only through `Site`.
//!
//! # Full build
//!
//! ```text
//! build()
//!     │
//!     ├── clear output root
//!     ├── load templates ──► registry (by name)
//!     ├── load pages ──► resolve chain, output path, dependency index
//!     ├── render + write pages (parallel)
//!     └── copy assets ──► output root (mirrored)
//! ```

use crate::{
    compiler::{
        BuildError, Context, DependencyIndex, Document, Engine, Loader, MiniJinjaEngine,
        TemplateChain, Templates, asset_output_path, collect_all_files, output_path,
        output_rival, render, resolve_tracked,
    },
    config::SiteConfig,
    log,
};
use anyhow::{Context as _, Result, bail};
use rayon::prelude::*;
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

/// A registered page.
#[derive(Debug, Clone)]
pub struct Page {
    pub doc: Document,
    /// Resolved chain, or the reason it could not be resolved.
    pub chain: Result<TemplateChain, BuildError>,
    pub output: PathBuf,
}

/// Registries shared by the full build and the incremental dispatcher.
#[derive(Debug, Default)]
pub struct BuildState {
    /// Keyed by source path relative to the pages root.
    pub pages: BTreeMap<PathBuf, Page>,
    pub templates: Templates,
    pub deps: DependencyIndex,
}

impl BuildState {
    pub fn clear(&mut self) {
        self.pages.clear();
        self.templates.clear();
        self.deps.clear();
    }
}

/// Outcome of a full build.
#[derive(Debug, Default)]
pub struct BuildReport {
    pub written: usize,
    pub assets: usize,
    pub failed: Vec<(PathBuf, BuildError)>,
}

pub struct Site {
    config: SiteConfig,
    loader: Loader,
    engine: Box<dyn Engine>,
    shared: Context,
    state: BuildState,
}

impl Site {
    /// A site rendered with the default minijinja engine.
    pub fn new(config: SiteConfig) -> Self {
        Self::with_engine(config, MiniJinjaEngine::new())
    }

    /// A site rendered with a custom engine.
    pub fn with_engine(config: SiteConfig, engine: impl Engine + 'static) -> Self {
        Self {
            loader: Loader::new(&config),
            shared: config.shared_data(),
            engine: Box::new(engine),
            state: BuildState::default(),
            config,
        }
    }

    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    pub fn loader(&self) -> &Loader {
        &self.loader
    }

    pub fn state(&self) -> &BuildState {
        &self.state
    }

    // ========================================================================
    // Full build
    // ========================================================================

    /// Rebuild everything from scratch.
    ///
    /// Failing pages are logged and skipped; with `build.strict` the build
    /// then fails. Errors clearing the output root or copying assets are fatal.
    pub fn build(&mut self) -> Result<BuildReport> {
        let output = self.config.build.output.clone();

        if output.exists() {
            fs::remove_dir_all(&output).with_context(|| {
                format!("Failed to clear output directory: {}", output.display())
            })?;
        }
        fs::create_dir_all(&output)
            .with_context(|| format!("Failed to create output directory: {}", output.display()))?;

        self.state.clear();
        let mut report = BuildReport::default();

        for path in self.source_files(&self.config.build.templates) {
            if let Err(e) = self.load_template(&path) {
                log!("error"; "{e}");
                report.failed.push((path, e));
            }
        }

        for path in self.source_files(&self.config.build.pages) {
            if let Err(e) = self.load_page(&path) {
                log!("error"; "{e}");
                report.failed.push((path, e));
            }
        }

        let results: Vec<_> = self
            .state
            .pages
            .par_iter()
            .map(|(identity, _)| (identity.clone(), self.write_page(identity)))
            .collect();

        for (identity, result) in results {
            match result {
                Ok(_) => report.written += 1,
                Err(e) => {
                    log!("error"; "{}: {e}", identity.display());
                    report.failed.push((identity, e));
                }
            }
        }

        report.assets = self.copy_assets()?;

        log!("build"; "{} pages, {} assets", report.written, report.assets);
        if !report.failed.is_empty() {
            log!("warn"; "{} files failed", report.failed.len());
            if self.config.build.strict {
                bail!("Build failed: {} files could not be built", report.failed.len());
            }
        }

        Ok(report)
    }

    /// Source files under `root` carrying the configured extension.
    fn source_files(&self, root: &Path) -> Vec<PathBuf> {
        collect_all_files(root)
            .into_iter()
            .filter(|p| self.loader.accepts(p))
            .collect()
    }

    /// Mirror the assets root into the output root.
    fn copy_assets(&self) -> Result<usize> {
        let build = &self.config.build;
        if !build.has_assets() {
            return Ok(0);
        }

        let files = collect_all_files(&build.assets);
        for path in &files {
            self.copy_asset(path)
                .with_context(|| format!("Failed to copy asset: {}", path.display()))?;
        }
        Ok(files.len())
    }

    // ========================================================================
    // Registry operations
    // ========================================================================

    /// Load (or reload) a template file into the registry. Returns its name.
    pub fn load_template(&mut self, path: &Path) -> Result<String, BuildError> {
        let template = self.loader.load(path, &self.config.build.templates)?;
        let name = template.name.clone();

        if let Some(existing) = self.state.templates.get(&name)
            && existing.identity != template.identity
        {
            log!("warn"; "template `{name}` redefined by {}", template.identity.display());
        }

        self.state.templates.insert(name.clone(), template);
        Ok(name)
    }

    /// Remove the template defined by `path`. Returns its name if it was registered.
    pub fn remove_template(&mut self, path: &Path) -> Option<String> {
        let identity = path.strip_prefix(&self.config.build.templates).ok()?;
        let name = self.loader.name_of(identity)?;

        match self.state.templates.get(&name) {
            Some(template) if template.identity == identity => {
                self.state.templates.remove(&name);
                Some(name)
            }
            _ => None,
        }
    }

    /// Load (or reload) a page file, resolving its chain and output path.
    /// Returns the page identity.
    ///
    /// A page whose output file already belongs to another registered page
    /// is rejected and stays unregistered.
    pub fn load_page(&mut self, path: &Path) -> Result<PathBuf, BuildError> {
        let doc = self.loader.load(path, &self.config.build.pages)?;
        let identity = doc.identity.clone();
        let output = output_path(&self.config.build.output, &identity, &doc.name);

        if let Some(owner) = self.output_rival(&identity, &doc.name)
            && self.state.pages.contains_key(&owner)
        {
            return Err(BuildError::OutputConflict {
                page: identity,
                owner,
                output,
            });
        }

        let (referenced, chain) = resolve_tracked(&doc, &self.state.templates);
        self.state.deps.record(&identity, &referenced);
        self.state
            .pages
            .insert(identity.clone(), Page { doc, chain, output });

        Ok(identity)
    }

    /// Re-resolve the chain of an already registered page.
    pub fn refresh_chain(&mut self, identity: &Path) {
        let Some(page) = self.state.pages.get_mut(identity) else {
            return;
        };
        let (referenced, chain) = resolve_tracked(&page.doc, &self.state.templates);
        page.chain = chain;
        self.state.deps.record(identity, &referenced);
    }

    /// Remove a page from every registry. Returns it if it was registered.
    pub fn remove_page(&mut self, identity: &Path) -> Option<Page> {
        self.state.deps.remove_page(identity);
        self.state.pages.remove(identity)
    }

    /// The other page identity that would render to the same output.
    pub fn output_rival(&self, identity: &Path, name: &str) -> Option<PathBuf> {
        output_rival(identity, name, &self.config.build.extension)
    }

    /// Page identity for an absolute path under the pages root.
    pub fn page_identity(&self, path: &Path) -> Option<PathBuf> {
        path.strip_prefix(&self.config.build.pages)
            .ok()
            .map(Path::to_path_buf)
    }

    // ========================================================================
    // Rendering and output
    // ========================================================================

    /// Render a registered page through its chain.
    pub fn render_page(&self, identity: &Path) -> Result<String, BuildError> {
        let page = self.state.pages.get(identity).ok_or_else(|| {
            BuildError::io(
                identity,
                std::io::Error::new(std::io::ErrorKind::NotFound, "page is not registered"),
            )
        })?;
        let chain = page.chain.as_ref().map_err(Clone::clone)?;

        render(
            &page.doc,
            chain,
            &self.state.templates,
            &self.shared,
            self.engine.as_ref(),
        )
    }

    /// Render a page and write it to its output path. Returns the output path.
    pub fn write_page(&self, identity: &Path) -> Result<PathBuf, BuildError> {
        let html = self.render_page(identity)?;
        let output = &self.state.pages[identity].output;

        if let Some(parent) = output.parent() {
            fs::create_dir_all(parent).map_err(|e| BuildError::io(parent, e))?;
        }
        fs::write(output, html).map_err(|e| BuildError::io(output, e))?;

        log!("page"; "saved: {}", self.display_output(output));
        Ok(output.clone())
    }

    /// Copy one asset file to its mirrored output path. Returns the destination.
    pub fn copy_asset(&self, path: &Path) -> Result<PathBuf, BuildError> {
        let build = &self.config.build;
        let dest = asset_output_path(&build.output, &build.assets, path).ok_or_else(|| {
            BuildError::io(
                path,
                std::io::Error::new(std::io::ErrorKind::InvalidInput, "not under assets root"),
            )
        })?;

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|e| BuildError::io(parent, e))?;
        }
        fs::copy(path, &dest).map_err(|e| BuildError::io(path, e))?;

        crate::debug!("asset"; "copied: {}", self.display_output(&dest));
        Ok(dest)
    }

    /// Output path relative to the output root, for logs.
    pub fn display_output(&self, path: &Path) -> String {
        path.strip_prefix(&self.config.build.output)
            .unwrap_or(path)
            .display()
            .to_string()
    }
}
