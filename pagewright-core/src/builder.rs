use std::path::{Path, PathBuf};

use log::info;

use crate::config::BuildConfig;
use crate::renderer::{PageRenderer, RenderReport};
use crate::shared::load_shared;
use crate::template::{TemplateError, TemplateRegistry};

/// Failures that stop a build before any page is processed.
#[derive(Debug)]
pub enum BuildError {
    TemplateError(TemplateError),
    DataDir(PathBuf, std::io::Error),
}

impl From<TemplateError> for BuildError {
    fn from(err: TemplateError) -> Self {
        BuildError::TemplateError(err)
    }
}

impl std::fmt::Display for BuildError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BuildError::TemplateError(e) => write!(f, "Can't load templates: {}", e),
            BuildError::DataDir(p, e) => {
                write!(f, "Data path {} is not accessible: {}", p.display(), e)
            }
        }
    }
}

impl std::error::Error for BuildError {}

/// Loads templates and shared context, then renders every page file.
pub fn build_pages(config: &BuildConfig) -> Result<RenderReport, BuildError> {
    info!("Loading templates from {}", config.templates);
    let templates = TemplateRegistry::load(&config.templates, &config.template_extension)?;
    info!("{} templates loaded", templates.len());

    let shared = load_shared(&config.shared);

    let renderer = PageRenderer::new(&templates, &shared, Path::new(&config.output));
    renderer.render_dir(&config.data)
}
