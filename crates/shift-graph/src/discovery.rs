//! File discovery: enumerate candidate source files under a root, honoring
//! include/exclude globs. The list comes back sorted so downstream file ids
//! are deterministic.

use globset::{Glob, GlobSet, GlobSetBuilder};
use shift_foundation::{ShiftError, ShiftResult};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

const SOURCE_EXTENSIONS: &[&str] = &["ts", "tsx", "js", "jsx"];

fn build_globset(patterns: &[String]) -> ShiftResult<Option<GlobSet>> {
    if patterns.is_empty() {
        return Ok(None);
    }
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern)
            .map_err(|e| ShiftError::config(format!("bad glob pattern {:?}: {}", pattern, e)))?;
        builder.add(glob);
    }
    let set = builder
        .build()
        .map_err(|e| ShiftError::config(format!("glob set: {}", e)))?;
    Ok(Some(set))
}

/// Walks `root` and returns every supported source file matching the
/// include globs and not matching the exclude globs.
pub fn discover_files(
    root: &Path,
    include: &[String],
    exclude: &[String],
) -> ShiftResult<Vec<PathBuf>> {
    let include_set = build_globset(include)?;
    let exclude_set = build_globset(exclude)?;

    let mut files = Vec::new();
    for entry in WalkDir::new(root).into_iter().filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let supported = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| SOURCE_EXTENSIONS.contains(&ext))
            .unwrap_or(false);
        if !supported {
            continue;
        }
        let relative = path.strip_prefix(root).unwrap_or(path);
        if let Some(set) = &include_set {
            if !set.is_match(relative) {
                continue;
            }
        }
        if let Some(set) = &exclude_set {
            if set.is_match(relative) {
                continue;
            }
        }
        files.push(path.to_path_buf());
    }

    files.sort();
    debug!(count = files.len(), root = %root.display(), "discovered source files");
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, "export {};\n").unwrap();
    }

    #[test]
    fn finds_supported_extensions_sorted() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "src/b.tsx");
        touch(dir.path(), "src/a.ts");
        touch(dir.path(), "src/readme.md");
        let files = discover_files(dir.path(), &[], &[]).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["src/a.ts", "src/b.tsx"]);
    }

    #[test]
    fn exclude_globs_win_over_includes() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "src/app.tsx");
        touch(dir.path(), "node_modules/pkg/index.js");
        let files = discover_files(
            dir.path(),
            &["**/*".to_string()],
            &["node_modules/**".to_string()],
        )
        .unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("src/app.tsx"));
    }

    #[test]
    fn bad_glob_is_a_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = discover_files(dir.path(), &["[".to_string()], &[]).unwrap_err();
        assert!(matches!(err, ShiftError::Config { .. }));
    }
}
