//! Code emitters, one per target store.
//!
//! Every backend writes three kinds of file:
//!
//! - the internal file (`<dst>/internal/<name>.go`), regenerated on every run
//! - the custom file (`<dst>/<name>.go`), written once and then owned by
//!   the user; whether to overwrite it is the caller's decision
//! - the model registry (`<dst>/model.go`), listing every schema
//!
//! Output goes through the template registry, then
//! [`tidy_go_source`](crate::postprocess::tidy_go_source), and lands on disk
//! atomically.

mod mongodb;
mod postgres;

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{GenError, GenResult};
use crate::postprocess::{run_format_command, tidy_go_source};
use crate::schema::{Field, Schema};
use crate::template::TemplateRegistry;

pub use mongodb::MongoBackend;
pub use postgres::PostgresBackend;

/// Target store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Driver {
    #[default]
    Postgres,
    Mongodb,
}

impl fmt::Display for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Driver::Postgres => write!(f, "postgres"),
            Driver::Mongodb => write!(f, "mongodb"),
        }
    }
}

impl FromStr for Driver {
    type Err = GenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(Driver::Postgres),
            "mongodb" | "mongo" => Ok(Driver::Mongodb),
            other => Err(GenError::Config(format!("unknown driver '{}'", other))),
        }
    }
}

/// The three generation operations every backend provides.
pub trait Backend {
    fn driver(&self) -> Driver;

    /// Derive the accessor source onto `schema` and write the internal file.
    fn generate_internal_file(&self, path: &Path, schema: &mut Schema) -> GenResult<()>;

    /// Write the hand-editable file. Overwrites unconditionally.
    fn generate_custom_file(&self, path: &Path, schema: &Schema) -> GenResult<()>;

    /// Write the registry file for every collected schema.
    fn generate_model_file(&self, path: &Path, schemas: &[Schema]) -> GenResult<()>;
}

/// Settings shared by every backend.
#[derive(Debug, Clone, Default)]
pub struct BackendOptions {
    /// Import path of the package providing the array column types.
    pub db_import: String,
    /// Directory with `<template-name>.tmpl` overrides.
    pub template_dir: Option<PathBuf>,
    /// External formatter, e.g. `["gofmt"]`.
    pub format_command: Vec<String>,
}

/// Build the backend for `driver`.
pub fn new_backend(driver: Driver, options: BackendOptions) -> GenResult<Box<dyn Backend>> {
    Ok(match driver {
        Driver::Postgres => Box::new(PostgresBackend::new(options)?),
        Driver::Mongodb => Box::new(MongoBackend::new(options)?),
    })
}

/// Template names of one backend.
pub(crate) struct TemplateSet {
    pub internal: &'static str,
    pub custom: &'static str,
    pub model: &'static str,
}

/// Template registry plus the write path shared by the backends.
pub(crate) struct Emitter {
    registry: TemplateRegistry,
    options: BackendOptions,
}

impl Emitter {
    /// Register `builtins`, preferring `<template_dir>/<name>.tmpl` when present.
    pub fn new(options: BackendOptions, builtins: &[(&str, &str)]) -> GenResult<Self> {
        let mut registry = TemplateRegistry::new();
        for (name, source) in builtins {
            let custom = options
                .template_dir
                .as_ref()
                .map(|dir| dir.join(format!("{}.tmpl", name)))
                .filter(|path| path.is_file());
            match custom {
                Some(path) => {
                    tracing::debug!("Template '{}' from {}", name, path.display());
                    let source = fs::read_to_string(&path)?;
                    registry.register(name, &source)?;
                }
                None => registry.register(name, source)?,
            }
        }
        Ok(Self { registry, options })
    }

    pub fn db_import(&self) -> &str {
        &self.options.db_import
    }

    /// Render, tidy and write one file.
    pub fn emit<T: Serialize + ?Sized>(
        &self,
        template: &str,
        data: &T,
        path: &Path,
    ) -> GenResult<()> {
        let rendered = self.registry.render_to_vec(template, data)?;
        let source = String::from_utf8(rendered)
            .map_err(|e| GenError::render(template, format!("output is not UTF-8: {}", e)))?;
        let mut source = tidy_go_source(&source)?;
        if !self.options.format_command.is_empty() {
            source = run_format_command(&self.options.format_command, &source)?;
        }
        write_atomic(path, source.as_bytes())?;
        tracing::info!("Wrote {}", path.display());
        Ok(())
    }
}

/// Write through a sibling temporary file renamed over `path`.
pub fn write_atomic(path: &Path, data: &[u8]) -> GenResult<()> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = path.with_file_name(format!(".{}.tmp", file_name));
    fs::write(&tmp, data)?;
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }
    Ok(())
}

/// Template data for the per-schema files.
#[derive(Serialize)]
pub(crate) struct SchemaView<'a> {
    #[serde(flatten)]
    pub schema: &'a Schema,
    pub primary_field: Option<&'a Field>,
    pub short_id: bool,
    pub db_import: &'a str,
}

impl<'a> SchemaView<'a> {
    pub fn new(schema: &'a Schema, db_import: &'a str) -> Self {
        Self {
            schema,
            primary_field: schema.primary_field(),
            short_id: schema.primary.is_some_and(|pk| pk.short_id),
            db_import,
        }
    }
}

/// Template data for the registry file.
#[derive(Serialize)]
pub(crate) struct ModelView<'a> {
    pub pkg_name: String,
    pub db_import: &'a str,
    pub schemas: Vec<SchemaView<'a>>,
}

impl<'a> ModelView<'a> {
    pub fn new(path: &Path, schemas: &'a [Schema], db_import: &'a str) -> Self {
        let pkg_name = path
            .parent()
            .map(crate::path::package_name)
            .unwrap_or_else(|| "model".to_string());
        Self {
            pkg_name,
            db_import,
            schemas: schemas
                .iter()
                .map(|schema| SchemaView::new(schema, db_import))
                .collect(),
        }
    }
}

const GO_KEYWORDS: &[&str] = &[
    "break",
    "case",
    "chan",
    "const",
    "continue",
    "default",
    "defer",
    "else",
    "fallthrough",
    "for",
    "func",
    "go",
    "goto",
    "if",
    "import",
    "interface",
    "map",
    "package",
    "range",
    "return",
    "select",
    "struct",
    "switch",
    "type",
    "var",
];

/// A parameter name that is not a Go keyword.
pub(crate) fn param_name(name: &str) -> String {
    if GO_KEYWORDS.contains(&name) {
        format!("{}_", name)
    } else {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driver_from_str() {
        assert_eq!("postgres".parse::<Driver>().unwrap(), Driver::Postgres);
        assert_eq!("MongoDB".parse::<Driver>().unwrap(), Driver::Mongodb);
        assert!(matches!("mysql".parse::<Driver>(), Err(GenError::Config(_))));
        assert_eq!(Driver::Mongodb.to_string(), "mongodb");
    }

    #[test]
    fn test_write_atomic_replaces() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("user.go");
        write_atomic(&path, b"one").unwrap();
        write_atomic(&path, b"two").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "two");
        assert!(!tmp.path().join(".user.go.tmp").exists());
    }

    #[test]
    fn test_template_dir_override() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("greet.tmpl"), "package {{ pkg }}\n").unwrap();
        let options = BackendOptions {
            template_dir: Some(tmp.path().to_path_buf()),
            ..Default::default()
        };
        let emitter =
            Emitter::new(options, &[("greet", "package builtin\n"), ("other", "x")]).unwrap();

        let out = tmp.path().join("out.go");
        emitter
            .emit("greet", &serde_json::json!({"pkg": "custom"}), &out)
            .unwrap();
        assert_eq!(fs::read_to_string(&out).unwrap(), "package custom\n");
    }

    #[test]
    fn test_param_name() {
        assert_eq!(param_name("type"), "type_");
        assert_eq!(param_name("email"), "email");
    }
}
