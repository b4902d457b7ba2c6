use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use log::info;
use tera::{Context, Tera};
use walkdir::WalkDir;

#[derive(Debug)]
pub enum TemplateError {
    TeraError(tera::Error),
    IoError(PathBuf, std::io::Error),
    WalkError(walkdir::Error),
}

impl From<tera::Error> for TemplateError {
    fn from(err: tera::Error) -> Self {
        TemplateError::TeraError(err)
    }
}

impl From<walkdir::Error> for TemplateError {
    fn from(err: walkdir::Error) -> Self {
        TemplateError::WalkError(err)
    }
}

impl std::fmt::Display for TemplateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TemplateError::TeraError(e) => {
                // Tera keeps the useful detail in the source chain
                write!(f, "Template error: {}", e)?;
                let mut source = std::error::Error::source(e);
                while let Some(cause) = source {
                    write!(f, ": {}", cause)?;
                    source = std::error::Error::source(cause);
                }
                Ok(())
            }
            TemplateError::IoError(p, e) => write!(f, "IO error reading {}: {}", p.display(), e),
            TemplateError::WalkError(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for TemplateError {}

/// Every template found under the template root, compiled into one Tera
/// instance so templates can include and extend each other by name.
pub struct TemplateRegistry {
    tera: Tera,
    names: BTreeSet<String>,
}

impl std::fmt::Debug for TemplateRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateRegistry")
            .field("names", &self.names)
            .finish()
    }
}

impl TemplateRegistry {
    /// Loads every `*.{extension}` file below `root`.
    ///
    /// Fails if the root cannot be walked, any file cannot be read, or any
    /// template fails to parse. Nothing is registered in that case.
    pub fn load<P: AsRef<Path>>(root: P, extension: &str) -> Result<Self, TemplateError> {
        let root = root.as_ref();
        let mut sources = Vec::new();

        for entry in WalkDir::new(root).follow_links(true).sort_by_file_name() {
            let entry = entry?;
            let path = entry.path();
            if !entry.file_type().is_file()
                || path.extension().map(|ext| ext != extension).unwrap_or(true)
            {
                continue;
            }

            let content = std::fs::read_to_string(path)
                .map_err(|e| TemplateError::IoError(path.to_path_buf(), e))?;
            sources.push((template_name(root, path), content));
        }

        Self::from_sources(sources)
    }

    /// Builds a registry from `(name, source)` pairs.
    pub fn from_sources<I, N, C>(sources: I) -> Result<Self, TemplateError>
    where
        I: IntoIterator<Item = (N, C)>,
        N: AsRef<str>,
        C: AsRef<str>,
    {
        let sources: Vec<(N, C)> = sources.into_iter().collect();
        let names: BTreeSet<String> = sources
            .iter()
            .map(|(name, _)| name.as_ref().to_string())
            .collect();

        let mut tera = Tera::default();
        tera.autoescape_on(vec![]);
        // Batch registration so `extends` can resolve regardless of load order
        tera.add_raw_templates(sources)?;

        for name in &names {
            info!("Template {} loaded", name);
        }

        Ok(Self { tera, names })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Renders the named template against `context`.
    pub fn render(&self, name: &str, context: &Context) -> Result<String, TemplateError> {
        Ok(self.tera.render(name, context)?)
    }
}

/// Name under which `path` is registered: its path relative to `root`,
/// with `/` separators and the final extension removed.
pub fn template_name(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path).with_extension("");
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
