//! Package manifest (`package.json`) loading and persistence.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Value};
use tempfile::NamedTempFile;

use crate::error::{Error, Result};
use crate::fields::FieldSet;

pub const MANIFEST_FILE: &str = "package.json";

const DEFAULT_INDENT: &str = "  ";

/// On-disk layout of a manifest, re-applied when it is written back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Format {
    pub indent: String,
    pub trailing_newline: bool,
}

impl Default for Format {
    fn default() -> Self {
        Self {
            indent: DEFAULT_INDENT.to_string(),
            trailing_newline: true,
        }
    }
}

impl Format {
    /// Uses the leading whitespace of the first indented line as the indent unit.
    pub fn detect(content: &str) -> Self {
        let indent = content
            .lines()
            .skip(1)
            .find_map(|line| {
                let trimmed = line.trim_start();
                let width = line.len() - trimmed.len();
                if trimmed.is_empty() || width == 0 {
                    None
                } else {
                    Some(line[..width].to_string())
                }
            })
            .unwrap_or_else(|| DEFAULT_INDENT.to_string());

        Self {
            indent,
            trailing_newline: content.is_empty() || content.ends_with('\n'),
        }
    }
}

/// A package manifest: the ordered top-level fields of a `package.json`.
#[derive(Debug, Clone, PartialEq)]
pub struct Manifest {
    path: PathBuf,
    fields: Map<String, Value>,
    format: Format,
}

impl Manifest {
    pub fn new(path: impl Into<PathBuf>, fields: Map<String, Value>) -> Self {
        Self {
            path: path.into(),
            fields,
            format: Format::default(),
        }
    }

    /// Reads and parses the manifest at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ManifestRead`] if the file cannot be read and
    /// [`Error::MalformedManifest`] if it is not a JSON object.
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| Error::ManifestRead {
                path: path.clone(),
                source,
            })?;
        Self::parse(path, &content)
    }

    pub fn parse(path: impl Into<PathBuf>, content: &str) -> Result<Self> {
        let path = path.into();
        let content = content.trim_start_matches('\u{feff}');
        let value: Value =
            serde_json::from_str(content).map_err(|e| Error::MalformedManifest {
                path: path.clone(),
                message: e.to_string(),
            })?;

        match value {
            Value::Object(fields) => Ok(Self {
                path,
                fields,
                format: Format::detect(content),
            }),
            other => Err(Error::MalformedManifest {
                path,
                message: format!("expected a JSON object, found {}", json_kind(&other)),
            }),
        }
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[inline]
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    #[inline]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn format(&self) -> &Format {
        &self.format
    }

    /// Returns a manifest for the same file holding `fields` instead.
    pub fn with_fields(&self, fields: Map<String, Value>) -> Self {
        Self {
            path: self.path.clone(),
            fields,
            format: self.format.clone(),
        }
    }

    /// Picks the fields of `set` that this manifest has.
    ///
    /// Absent fields stay absent so the diff can tell "missing" from `null`.
    pub fn restrict(&self, set: &FieldSet) -> Value {
        let view: Map<String, Value> = set
            .iter()
            .filter_map(|field| {
                self.fields
                    .get(field)
                    .map(|value| (field.to_string(), value.clone()))
            })
            .collect();
        Value::Object(view)
    }

    /// Serializes the manifest with its detected indent and trailing newline.
    pub fn render(&self) -> Result<String> {
        let mut buf = Vec::new();
        let formatter = PrettyFormatter::with_indent(self.format.indent.as_bytes());
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.fields
            .serialize(&mut serializer)
            .map_err(|e| Error::ManifestWrite {
                path: self.path.clone(),
                source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
            })?;

        let mut rendered = String::from_utf8_lossy(&buf).into_owned();
        if self.format.trailing_newline {
            rendered.push('\n');
        }
        Ok(rendered)
    }

    /// Writes the whole manifest back to its path.
    ///
    /// The content goes to a temporary file in the same directory which then
    /// replaces the destination, so readers never observe a partial write.
    pub async fn save(&self) -> Result<()> {
        let rendered = self.render()?;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_atomic(&path, rendered.as_bytes())).await?
    }
}

fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let write_err = |source: std::io::Error| Error::ManifestWrite {
        path: path.to_path_buf(),
        source,
    };

    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut tmp = NamedTempFile::new_in(dir).map_err(write_err)?;
    tmp.write_all(contents).map_err(write_err)?;
    tmp.as_file().sync_all().map_err(write_err)?;

    if let Ok(metadata) = std::fs::metadata(path) {
        std::fs::set_permissions(tmp.path(), metadata.permissions()).map_err(write_err)?;
    }

    tmp.persist(path).map_err(|e| write_err(e.error))?;
    Ok(())
}

/// Accepts either a package directory or a `package.json` path.
pub fn normalize_manifest_path(path: &Path) -> PathBuf {
    if path.file_name().and_then(|n| n.to_str()) == Some(MANIFEST_FILE) {
        path.to_path_buf()
    } else {
        path.join(MANIFEST_FILE)
    }
}

/// Finds the nearest `package.json` at or above `start`.
pub async fn find_manifest_upwards(start: &Path) -> Option<PathBuf> {
    crate::path_utils::find_upwards(start, MANIFEST_FILE).await
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
