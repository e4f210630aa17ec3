//! The `model` run: statement files in, Go packages out.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::backend::{BackendOptions, Driver, new_backend};
use crate::ddl::analyze_bytes;
use crate::error::{GenError, GenResult};
use crate::path::{ModuleInfo, SourceFile, calculate_paths, ensure_dir};
use crate::schema::Schema;
use crate::types::TypeMap;

/// Directory under the destination root holding the regenerated files.
pub const INTERNAL_DIR: &str = "internal";

/// Name of the registry file.
pub const MODEL_FILE: &str = "model.go";

#[derive(Debug, Clone)]
pub struct GenerateOptions {
    /// Statement-file roots (directories or single files).
    pub src: Vec<PathBuf>,
    /// Destination root.
    pub dst: PathBuf,
    pub driver: Driver,
    /// Overwrite existing custom files.
    pub force: bool,
    /// Go module path; discovered from `go.mod` when unset.
    pub module: Option<String>,
    /// Import path of the array column package; `<module>/db` when unset.
    pub db_package: Option<String>,
    pub template_dir: Option<PathBuf>,
    pub format_command: Vec<String>,
    pub types: TypeMap,
    /// Directory relative paths are resolved against; the process working
    /// directory when unset.
    pub work_dir: Option<PathBuf>,
}

impl GenerateOptions {
    pub fn new(src: Vec<PathBuf>, dst: impl Into<PathBuf>) -> Self {
        Self {
            src,
            dst: dst.into(),
            driver: Driver::default(),
            force: false,
            module: None,
            db_package: None,
            template_dir: None,
            format_command: Vec::new(),
            types: TypeMap::new(),
            work_dir: None,
        }
    }
}

/// Files touched by a run.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct GenerateReport {
    pub written: Vec<PathBuf>,
    /// Custom files left alone because they already existed.
    pub skipped: Vec<PathBuf>,
    pub schemas: usize,
}

/// Run the whole pipeline.
///
/// The first failing statement-file stops the run; files written before
/// it stay on disk.
pub fn run(options: &GenerateOptions) -> GenResult<GenerateReport> {
    let cwd = match &options.work_dir {
        Some(dir) => dir.clone(),
        None => env::current_dir()?,
    };
    let dst = &options.dst;

    let module = match &options.module {
        Some(path) => Some(ModuleInfo {
            path: path.clone(),
            root: cwd.clone(),
        }),
        None => ModuleInfo::discover(&cwd),
    };
    let package = match &module {
        Some(module) => module.import_path_for(&cwd, dst),
        None => {
            tracing::warn!("No go.mod found from {}; import paths are relative", cwd.display());
            dst.to_string_lossy().replace('\\', "/")
        }
    };
    tracing::debug!("Destination package {}", package);

    let db_import = match (&options.db_package, &module) {
        (Some(db), _) => db.clone(),
        (None, Some(module)) => format!("{}/db", module.path.trim_end_matches('/')),
        (None, None) => String::new(),
    };
    let backend = new_backend(
        options.driver,
        BackendOptions {
            db_import,
            template_dir: options.template_dir.clone(),
            format_command: options.format_command.clone(),
        },
    )?;

    let roots: Vec<PathBuf> = options.src.iter().map(|root| cwd.join(root)).collect();
    let dst_abs = cwd.join(dst);
    let units = calculate_paths(&roots, &dst_abs, &package)?;
    check_unique_names(&units)?;
    let internal_dir = dst_abs.join(INTERNAL_DIR);
    let internal_import = format!("{}/{}", package.trim_end_matches('/'), INTERNAL_DIR);

    let mut report = GenerateReport::default();
    let mut schemas: Vec<Schema> = Vec::new();

    for unit in &units {
        let mut schema = read_schema(&unit.path, &options.types)?;
        if schema.table_name.is_empty() {
            tracing::debug!("No CREATE TABLE in {}, skipping", unit.path.display());
            continue;
        }
        ensure_dir(&internal_dir)?;

        let internal_path = internal_dir.join(format!("{}.go", unit.name));
        backend
            .generate_internal_file(&internal_path, &mut schema)
            .map_err(|e| e.in_file(&unit.path))?;
        report.written.push(internal_path);

        schema.pkg_name = unit.pkg_name.clone();
        schema.internal_import = internal_import.clone();

        let custom_path = unit.dst.join(format!("{}.go", unit.name));
        if custom_path.exists() && !options.force {
            tracing::info!("Keeping {}", custom_path.display());
            report.skipped.push(custom_path);
        } else {
            ensure_dir(&unit.dst)?;
            backend
                .generate_custom_file(&custom_path, &schema)
                .map_err(|e| e.in_file(&unit.path))?;
            report.written.push(custom_path);
        }

        if unit.dst != dst_abs {
            schema.import = unit.import_path.clone();
        }
        schemas.push(schema);
    }

    ensure_dir(&dst_abs)?;
    let model_path = dst_abs.join(MODEL_FILE);
    backend.generate_model_file(&model_path, &schemas)?;
    report.written.push(model_path);
    report.schemas = schemas.len();
    Ok(report)
}

/// Every internal file lands in one directory, so file stems must be
/// unique across all sources.
fn check_unique_names(units: &[SourceFile]) -> GenResult<()> {
    let mut seen: HashMap<&str, &Path> = HashMap::new();
    for unit in units {
        if let Some(first) = seen.insert(unit.name.as_str(), unit.path.as_path()) {
            return Err(GenError::Config(format!(
                "{} and {} both generate {}/{}.go",
                first.display(),
                unit.path.display(),
                INTERNAL_DIR,
                unit.name
            )));
        }
    }
    Ok(())
}

/// Read and analyze one statement-file.
pub fn read_schema(path: &Path, types: &TypeMap) -> GenResult<Schema> {
    let raw = fs::read(path).map_err(|e| GenError::from(e).in_file(path))?;
    analyze_bytes(&raw, types).map_err(|e| e.in_file(path))
}
