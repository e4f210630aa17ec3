//! Source discovery and destination paths.
//!
//! Every `.sql` file under the source roots becomes one [`SourceFile`].
//! A source that already lives under the destination root keeps its
//! relative folder there, so `model/account/user.sql` with destination
//! `model` produces the package `model/account`.

use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::error::GenResult;

/// Statement-file extension.
pub const SOURCE_EXTENSION: &str = "sql";

/// One statement-file to generate from.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceFile {
    /// File stem, e.g. `user`.
    pub name: String,
    /// File name, e.g. `user.sql`.
    pub file: String,
    /// Path of the statement-file.
    pub path: PathBuf,
    /// Directory receiving the custom file.
    pub dst: PathBuf,
    /// Go package name of `dst`.
    pub pkg_name: String,
    /// Go import path of `dst`.
    pub import_path: String,
}

/// A Go module: its path and the directory holding `go.mod`.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleInfo {
    pub path: String,
    pub root: PathBuf,
}

impl ModuleInfo {
    /// Find the nearest `go.mod` in `start` or its ancestors.
    pub fn discover(start: &Path) -> Option<Self> {
        for dir in start.ancestors() {
            let go_mod = dir.join("go.mod");
            let Ok(content) = fs::read_to_string(&go_mod) else {
                continue;
            };
            if let Some(path) = parse_module_line(&content) {
                tracing::debug!("Found Go module '{}' in {}", path, go_mod.display());
                return Some(Self {
                    path,
                    root: dir.to_path_buf(),
                });
            }
        }
        None
    }

    /// Import path of `dir`, which is relative to the working directory
    /// `cwd` unless absolute.
    pub fn import_path_for(&self, cwd: &Path, dir: &Path) -> String {
        let absolute = cwd.join(dir);
        match absolute.strip_prefix(&self.root) {
            Ok(rel) => join_import(&self.path, &slash_path(rel)),
            Err(_) => join_import(&self.path, &slash_path(dir)),
        }
    }
}

/// The `module <path>` directive of a `go.mod` file.
pub fn parse_module_line(go_mod: &str) -> Option<String> {
    go_mod.lines().find_map(|line| {
        let rest = line.trim().strip_prefix("module")?;
        if !rest.starts_with(char::is_whitespace) {
            return None;
        }
        let path = rest.trim().trim_matches('"');
        (!path.is_empty()).then(|| path.to_string())
    })
}

/// Path components joined with `/`, `.` dropped.
fn slash_path(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            Component::ParentDir => Some("..".to_string()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn join_import(base: &str, rel: &str) -> String {
    match (base.is_empty(), rel.is_empty()) {
        (true, _) => rel.to_string(),
        (false, true) => base.to_string(),
        (false, false) => format!("{}/{}", base.trim_end_matches('/'), rel),
    }
}

/// Enumerate statement-files under `roots` for destination `dst`.
///
/// `package` is the import path of `dst`. Directories are visited in
/// file-name order.
pub fn calculate_paths(roots: &[PathBuf], dst: &Path, package: &str) -> GenResult<Vec<SourceFile>> {
    let mut sources = Vec::new();
    for root in roots {
        let mut found = Vec::new();
        if root.is_file() {
            found.push(root.clone());
        } else {
            walk(root, &mut found)?;
        }

        for path in found {
            if let Some(source) = source_file(&path, dst, package) {
                tracing::debug!(
                    "Source {} -> {}",
                    source.path.display(),
                    source.dst.display()
                );
                sources.push(source);
            }
        }
    }
    Ok(sources)
}

fn walk(dir: &Path, out: &mut Vec<PathBuf>) -> GenResult<()> {
    let mut entries = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()?;
    entries.sort();

    for path in entries {
        if path.is_dir() {
            walk(&path, out)?;
        } else {
            out.push(path);
        }
    }
    Ok(())
}

fn source_file(path: &Path, dst: &Path, package: &str) -> Option<SourceFile> {
    if path.extension().is_none_or(|ext| ext != SOURCE_EXTENSION) {
        return None;
    }
    let file = path.file_name()?.to_string_lossy().into_owned();
    let name = path.file_stem()?.to_string_lossy().into_owned();

    let folder = path
        .parent()
        .and_then(|dir| dir.strip_prefix(dst).ok())
        .map(Path::to_path_buf)
        .unwrap_or_default();
    let dst_dir = dst.join(&folder);
    let pkg_name = package_name(&dst_dir);

    Some(SourceFile {
        name,
        file,
        path: path.to_path_buf(),
        dst: dst_dir,
        pkg_name,
        import_path: join_import(package, &slash_path(&folder)),
    })
}

/// Go package name for a directory: its last normal component.
pub fn package_name(dir: &Path) -> String {
    dir.components()
        .rev()
        .find_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .unwrap_or_else(|| "model".to_string())
}

/// Create `dir` and its parents if missing.
pub fn ensure_dir(dir: &Path) -> GenResult<()> {
    fs::create_dir_all(dir)?;
    Ok(())
}
