pub mod builder;
pub mod config;
pub mod data;
pub mod renderer;
pub mod shared;
pub mod template;

// Re-export main types
pub use builder::{BuildError, build_pages};
pub use config::BuildConfig;
pub use data::{DataError, DataMap, Format};
pub use renderer::{PageRenderer, RenderReport, SkipReason, SkippedPage, output_destination};
pub use shared::load_shared;
pub use template::{TemplateError, TemplateRegistry, template_name};
