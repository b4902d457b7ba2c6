use std::path::{Path, PathBuf};

use serde_json::{Map, Number, Value};

/// A parsed data file: string keys mapping to format-agnostic values.
pub type DataMap = Map<String, Value>;

#[derive(Debug)]
pub enum DataError {
    IoError(std::io::Error),
    UnsupportedFormat(PathBuf),
    Encoding(std::str::Utf8Error),
    Json(serde_json::Error),
    Yaml(serde_yaml::Error),
    Toml(toml::de::Error),
}

impl From<std::io::Error> for DataError {
    fn from(err: std::io::Error) -> Self {
        DataError::IoError(err)
    }
}

impl From<std::str::Utf8Error> for DataError {
    fn from(err: std::str::Utf8Error) -> Self {
        DataError::Encoding(err)
    }
}

impl From<serde_json::Error> for DataError {
    fn from(err: serde_json::Error) -> Self {
        DataError::Json(err)
    }
}

impl From<serde_yaml::Error> for DataError {
    fn from(err: serde_yaml::Error) -> Self {
        DataError::Yaml(err)
    }
}

impl From<toml::de::Error> for DataError {
    fn from(err: toml::de::Error) -> Self {
        DataError::Toml(err)
    }
}

impl std::fmt::Display for DataError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataError::IoError(e) => write!(f, "IO error: {}", e),
            DataError::UnsupportedFormat(p) => write!(f, "Unknown file type: {}", p.display()),
            DataError::Encoding(e) => write!(f, "Invalid UTF-8: {}", e),
            DataError::Json(e) => write!(f, "JSON parse error: {}", e),
            DataError::Yaml(e) => write!(f, "YAML parse error: {}", e),
            DataError::Toml(e) => write!(f, "TOML parse error: {}", e),
        }
    }
}

impl std::error::Error for DataError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Yaml,
    Toml,
}

impl Format {
    /// Picks a format from the file extension. Matching is case-sensitive.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<Self> {
        match path.as_ref().extension()?.to_str()? {
            "json" | "json5" => Some(Format::Json),
            "yaml" | "yml" => Some(Format::Yaml),
            "toml" => Some(Format::Toml),
            _ => None,
        }
    }
}

/// Parses `bytes` as a top-level mapping in the given format.
pub fn parse(bytes: &[u8], format: Format) -> Result<DataMap, DataError> {
    match format {
        Format::Json => Ok(serde_json::from_slice(bytes)?),
        Format::Yaml => Ok(serde_yaml::from_slice(bytes)?),
        Format::Toml => {
            let table: toml::Table = toml::from_str(std::str::from_utf8(bytes)?)?;
            Ok(toml_table_to_map(table))
        }
    }
}

/// Reads a data file and parses it according to its extension.
pub fn load_file<P: AsRef<Path>>(path: P) -> Result<DataMap, DataError> {
    let path = path.as_ref();
    let format =
        Format::from_path(path).ok_or_else(|| DataError::UnsupportedFormat(path.to_path_buf()))?;
    let bytes = std::fs::read(path)?;
    parse(&bytes, format)
}

fn toml_table_to_map(table: toml::Table) -> DataMap {
    table
        .into_iter()
        .map(|(key, value)| (key, toml_to_json(value)))
        .collect()
}

fn toml_to_json(value: toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::Number(i.into()),
        // NaN and infinities have no JSON representation
        toml::Value::Float(f) => Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(items) => Value::Array(items.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(toml_table_to_map(table)),
    }
}
