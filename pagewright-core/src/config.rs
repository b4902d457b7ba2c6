use serde::{Deserialize, Serialize};

/// Where a build reads its inputs from and writes pages to.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct BuildConfig {
    /// Output root for rendered pages
    pub output: String,
    /// Template root
    pub templates: String,
    /// Extension (without dot) of files loaded from the template root
    pub template_extension: String,
    /// Shared context root, optional on disk
    pub shared: String,
    /// Data root containing page files
    pub data: String,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            output: "pages".to_string(),
            templates: ".processor/templates".to_string(),
            template_extension: "hbs".to_string(),
            shared: "shared".to_string(),
            data: "data".to_string(),
        }
    }
}
