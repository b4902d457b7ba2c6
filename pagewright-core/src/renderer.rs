use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

use log::{error, info, warn};
use serde_json::Value;
use tera::Context;
use walkdir::WalkDir;

use crate::builder::BuildError;
use crate::data::{DataError, DataMap, load_file};
use crate::template::{TemplateError, TemplateRegistry};

/// Reserved key describing how a data file is rendered.
pub const PAGE_KEY: &str = "_page";
/// Reserved key the shared context is injected under.
pub const SHARED_KEY: &str = "_shared";

/// Why a data file produced no output.
#[derive(Debug)]
pub enum SkipReason {
    Unreadable(DataError),
    MissingPage,
    MissingTemplate,
    EmptyOutput,
    OutsideOutput(String),
    CreateDir(PathBuf, std::io::Error),
    UnknownTemplate(String),
    Render(String, TemplateError),
    Write(PathBuf, std::io::Error),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::Unreadable(e) => write!(f, "{}", e),
            SkipReason::MissingPage => write!(f, "no {} mapping", PAGE_KEY),
            SkipReason::MissingTemplate => write!(f, "{}.template is not defined", PAGE_KEY),
            SkipReason::EmptyOutput => write!(f, "{}.output is empty", PAGE_KEY),
            SkipReason::OutsideOutput(output) => {
                write!(f, "{}.output {} leaves the output directory", PAGE_KEY, output)
            }
            SkipReason::CreateDir(p, e) => {
                write!(f, "Error creating directories for {}: {}", p.display(), e)
            }
            SkipReason::UnknownTemplate(name) => write!(f, "Template {} is not found", name),
            SkipReason::Render(name, e) => write!(f, "Error executing template {}: {}", name, e),
            SkipReason::Write(p, e) => write!(f, "Error writing file {}: {}", p.display(), e),
        }
    }
}

impl std::error::Error for SkipReason {}

#[derive(Debug)]
pub struct SkippedPage {
    pub source: PathBuf,
    pub reason: SkipReason,
}

/// What happened to every file seen during a walk.
#[derive(Debug, Default)]
pub struct RenderReport {
    pub rendered: Vec<PathBuf>,
    pub skipped: Vec<SkippedPage>,
    /// Destinations written more than once; only the last write survives.
    pub overwritten: Vec<PathBuf>,
}

impl RenderReport {
    pub fn summary(&self) -> String {
        format!(
            "{} rendered, {} skipped, {} overwritten",
            self.rendered.len(),
            self.skipped.len(),
            self.overwritten.len()
        )
    }
}

pub struct PageRenderer<'a> {
    templates: &'a TemplateRegistry,
    shared: &'a DataMap,
    output_dir: PathBuf,
}

impl<'a> PageRenderer<'a> {
    pub fn new<P: AsRef<Path>>(
        templates: &'a TemplateRegistry,
        shared: &'a DataMap,
        output_dir: P,
    ) -> Self {
        Self {
            templates,
            shared,
            output_dir: output_dir.as_ref().to_path_buf(),
        }
    }

    /// Renders every page file below `data_dir`, depth first in file-name
    /// order. Only an inaccessible `data_dir` is an error; per-file problems
    /// end up in the report.
    pub fn render_dir<P: AsRef<Path>>(&self, data_dir: P) -> Result<RenderReport, BuildError> {
        let data_dir = data_dir.as_ref();
        if let Err(e) = std::fs::read_dir(data_dir) {
            return Err(BuildError::DataDir(data_dir.to_path_buf(), e));
        }
        info!("Navigating data directory: {}", data_dir.display());

        let mut report = RenderReport::default();
        let mut written = HashSet::new();

        for entry in WalkDir::new(data_dir).follow_links(true).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };

            if entry.file_type().is_dir() {
                info!("Working with {} directory", entry.path().display());
                continue;
            }

            let source = entry.into_path();
            match self.render_file(&source) {
                Ok(destination) => {
                    if !written.insert(destination.clone()) {
                        warn!(
                            "{} overwrote earlier output {}",
                            source.display(),
                            destination.display()
                        );
                        report.overwritten.push(destination.clone());
                    }
                    report.rendered.push(destination);
                }
                Err(reason) => {
                    match reason {
                        SkipReason::UnknownTemplate(_)
                        | SkipReason::Render(..)
                        | SkipReason::Write(..) => {
                            error!("Skipping {}: {}", source.display(), reason)
                        }
                        _ => warn!("Skipping {}: {}", source.display(), reason),
                    }
                    report.skipped.push(SkippedPage { source, reason });
                }
            }
        }

        Ok(report)
    }

    /// Renders one data file and returns where the output was written.
    pub fn render_file(&self, source: &Path) -> Result<PathBuf, SkipReason> {
        info!("Rendering file {}", source.display());
        let data = load_file(source).map_err(SkipReason::Unreadable)?;

        let Some(Value::Object(page)) = data.get(PAGE_KEY) else {
            return Err(SkipReason::MissingPage);
        };
        let Some(Value::String(template_name)) = page.get("template") else {
            return Err(SkipReason::MissingTemplate);
        };
        let template_name = template_name.clone();

        let declared = match page.get("output") {
            Some(Value::String(output)) => Some(output.clone()),
            _ => {
                info!("File {} output is not defined", source.display());
                None
            }
        };
        let destination = output_destination(&self.output_dir, source, declared.as_deref())?;

        if let Some(parent) = destination.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| SkipReason::CreateDir(destination.clone(), e))?;
        }

        if !self.templates.contains(&template_name) {
            return Err(SkipReason::UnknownTemplate(template_name));
        }

        // Inserted after the page data so a file's own `_shared` key is replaced
        let mut context = match Context::from_value(Value::Object(data)) {
            Ok(context) => context,
            Err(e) => return Err(SkipReason::Render(template_name, e.into())),
        };
        context.insert(SHARED_KEY, self.shared);
        let rendered = self
            .templates
            .render(&template_name, &context)
            .map_err(|e| SkipReason::Render(template_name, e))?;

        info!("Writing output {}", destination.display());
        std::fs::write(&destination, rendered)
            .map_err(|e| SkipReason::Write(destination.clone(), e))?;

        Ok(destination)
    }
}

/// Resolves where a page is written.
///
/// A declared output has one leading separator stripped and is joined under
/// `output_dir`. Without one, the source file name (extension included) is
/// used, so same-named files in different data subdirectories collide.
///
/// The result always stays below `output_dir`: further root or prefix
/// components are dropped and `..` is refused.
pub fn output_destination(
    output_dir: &Path,
    source: &Path,
    declared: Option<&str>,
) -> Result<PathBuf, SkipReason> {
    let Some(output) = declared else {
        let name = source.file_name().ok_or(SkipReason::EmptyOutput)?;
        return Ok(output_dir.join(name));
    };

    let mut chars = output.chars();
    let relative = match chars.next() {
        Some(c) if std::path::is_separator(c) => chars.as_str(),
        _ => output,
    };

    let mut destination = output_dir.to_path_buf();
    let mut named = false;
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(part) => {
                destination.push(part);
                named = true;
            }
            Component::ParentDir => return Err(SkipReason::OutsideOutput(output.to_string())),
            Component::RootDir | Component::Prefix(_) | Component::CurDir => {}
        }
    }

    if !named {
        return Err(SkipReason::EmptyOutput);
    }
    Ok(destination)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    struct Fixture {
        dir: TempDir,
        templates: TemplateRegistry,
        shared: DataMap,
    }

    impl Fixture {
        fn new() -> Self {
            let templates = TemplateRegistry::from_sources(vec![
                ("page/list", "{{ title }}:{% for i in items %}{{ i }}{% endfor %}"),
                ("plain", "{{ title }} by {{ _shared.site.author }}"),
            ])
            .unwrap();
            let shared = match json!({"site": {"author": "Ann"}}) {
                Value::Object(map) => map,
                _ => unreachable!(),
            };
            Self {
                dir: tempfile::tempdir().unwrap(),
                templates,
                shared,
            }
        }

        fn data(&self) -> PathBuf {
            self.dir.path().join("data")
        }

        fn out(&self) -> PathBuf {
            self.dir.path().join("pages")
        }

        fn write(&self, relative: &str, content: &str) -> PathBuf {
            let path = self.data().join(relative);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(&path, content).unwrap();
            path
        }

        fn renderer(&self) -> PageRenderer<'_> {
            PageRenderer::new(&self.templates, &self.shared, self.out())
        }
    }

    #[test]
    fn test_output_destination_strips_leading_slash() {
        let out = Path::new("pages");
        let src = Path::new("data/x.yaml");
        assert_eq!(
            output_destination(out, src, Some("/blog/index.html")).unwrap(),
            output_destination(out, src, Some("blog/index.html")).unwrap()
        );
        assert_eq!(
            output_destination(out, src, Some("/blog/index.html")).unwrap(),
            PathBuf::from("pages/blog/index.html")
        );
    }

    #[test]
    fn test_output_destination_stays_below_output_dir() {
        let out = Path::new("pages");
        let src = Path::new("data/x.yaml");
        assert_eq!(
            output_destination(out, src, Some("//a/b.html")).unwrap(),
            PathBuf::from("pages/a/b.html")
        );
        assert_eq!(
            output_destination(out, src, Some("/./a//b.html")).unwrap(),
            PathBuf::from("pages/a/b.html")
        );
        assert!(matches!(
            output_destination(out, src, Some("../escape.html")),
            Err(SkipReason::OutsideOutput(_))
        ));
        assert!(matches!(
            output_destination(out, src, Some("/a/../../escape.html")),
            Err(SkipReason::OutsideOutput(_))
        ));
    }

    #[test]
    fn test_output_destination_falls_back_to_file_name() {
        let out = Path::new("pages");
        let src = Path::new("data/x.yaml");
        assert_eq!(
            output_destination(out, Path::new("data/a/index.yaml"), None).unwrap(),
            PathBuf::from("pages/index.yaml")
        );
        assert!(matches!(output_destination(out, src, Some("/")), Err(SkipReason::EmptyOutput)));
        assert!(matches!(output_destination(out, src, Some("")), Err(SkipReason::EmptyOutput)));
    }

    #[cfg(unix)]
    #[test]
    fn test_output_destination_keeps_non_utf8_file_names() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let name = OsStr::from_bytes(b"caf\xe9.json");
        let src = Path::new("data").join(name);

        assert_eq!(
            output_destination(Path::new("pages"), &src, None).unwrap(),
            Path::new("pages").join(name)
        );
    }

    #[test]
    fn test_absolute_output_is_written_inside_output_dir() {
        let fx = Fixture::new();
        let outside = fx.dir.path().join("outside.html");
        let src = fx.write(
            "x.json",
            &json!({"title": "T", "_page": {"template": "plain", "output": outside}}).to_string(),
        );

        let destination = fx.renderer().render_file(&src).unwrap();

        assert!(destination.starts_with(fx.out()));
        assert!(!outside.exists());
    }

    #[test]
    fn test_shared_context_replaces_page_shared_key() {
        let fx = Fixture::new();
        let src = fx.write(
            "x.yaml",
            concat!(
                "title: T\n",
                "_shared:\n  site:\n    author: Mallory\n",
                "_page:\n  template: plain\n  output: x.txt\n",
            ),
        );

        let destination = fx.renderer().render_file(&src).unwrap();

        assert_eq!(std::fs::read_to_string(destination).unwrap(), "T by Ann");
        assert_eq!(Value::Object(fx.shared.clone()), json!({"site": {"author": "Ann"}}));
    }

    #[test]
    fn test_renders_page_with_shared_context_and_creates_dirs() {
        let fx = Fixture::new();
        let src = fx.write(
            "post.yaml",
            "title: Hello\n_page:\n  template: plain\n  output: /blog/2024/hello.html\n",
        );

        let destination = fx.renderer().render_file(&src).unwrap();

        assert_eq!(destination, fx.out().join("blog/2024/hello.html"));
        assert_eq!(std::fs::read_to_string(destination).unwrap(), "Hello by Ann");
    }

    #[test]
    fn test_skips_files_without_valid_page() {
        let fx = Fixture::new();
        let renderer = fx.renderer();

        let no_page = fx.write("a.json", r#"{"title": "x"}"#);
        let bad_page = fx.write("b.json", r#"{"_page": "plain"}"#);
        let no_template = fx.write("c.json", r#"{"_page": {"output": "c.html"}}"#);
        let bad_template =
            fx.write("d.json", r#"{"_page": {"template": 3, "output": "d.html"}}"#);
        let unknown_format = fx.write("e.txt", "_page: {template: plain}");
        let broken = fx.write("f.toml", "_page = ");

        assert!(matches!(renderer.render_file(&no_page), Err(SkipReason::MissingPage)));
        assert!(matches!(renderer.render_file(&bad_page), Err(SkipReason::MissingPage)));
        assert!(matches!(renderer.render_file(&no_template), Err(SkipReason::MissingTemplate)));
        assert!(matches!(renderer.render_file(&bad_template), Err(SkipReason::MissingTemplate)));
        assert!(matches!(
            renderer.render_file(&unknown_format),
            Err(SkipReason::Unreadable(DataError::UnsupportedFormat(_)))
        ));
        assert!(matches!(renderer.render_file(&broken), Err(SkipReason::Unreadable(_))));
        assert!(!fx.out().exists());
    }

    #[test]
    fn test_unknown_template_is_skipped() {
        let fx = Fixture::new();
        let src = fx.write(
            "x.json",
            r#"{"_page": {"template": "missing", "output": "sub/x.html"}}"#,
        );

        let err = fx.renderer().render_file(&src).unwrap_err();

        assert!(matches!(err, SkipReason::UnknownTemplate(ref name) if name == "missing"));
        assert!(!fx.out().join("sub/x.html").exists());
    }

    #[test]
    fn test_render_dir_continues_past_failures() {
        let fx = Fixture::new();
        fx.write("1-skip.json", r#"{"nothing": true}"#);
        fx.write(
            "2-list.toml",
            concat!(
                "title = \"L\"\nitems = [1, 2]\n",
                "[_page]\ntemplate = \"page/list\"\noutput = \"list.txt\"\n",
            ),
        );
        fx.write(
            "nested/3.json",
            r#"{"title": "N", "_page": {"template": "plain", "output": "n.txt"}}"#,
        );

        let report = fx.renderer().render_dir(fx.data()).unwrap();

        assert_eq!(report.rendered, vec![fx.out().join("list.txt"), fx.out().join("n.txt")]);
        assert_eq!(report.skipped.len(), 1);
        assert!(report.overwritten.is_empty());
        assert_eq!(std::fs::read_to_string(fx.out().join("list.txt")).unwrap(), "L:12");
        assert_eq!(report.summary(), "2 rendered, 1 skipped, 0 overwritten");
    }

    #[test]
    fn test_same_file_name_without_output_collides() {
        let fx = Fixture::new();
        fx.write("a/index.yaml", "title: First\n_page:\n  template: plain\n");
        fx.write("b/index.yaml", "title: Second\n_page:\n  template: plain\n");

        let report = fx.renderer().render_dir(fx.data()).unwrap();
        let destination = fx.out().join("index.yaml");

        assert_eq!(report.rendered, vec![destination.clone(), destination.clone()]);
        assert_eq!(report.overwritten, vec![destination.clone()]);
        assert_eq!(std::fs::read_to_string(destination).unwrap(), "Second by Ann");
    }

    #[test]
    fn test_missing_data_dir_is_fatal() {
        let fx = Fixture::new();
        let err = fx.renderer().render_dir(fx.data()).unwrap_err();
        assert!(matches!(err, BuildError::DataDir(..)));
    }
}
