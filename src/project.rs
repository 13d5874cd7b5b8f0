//! Project source index.
//!
//! Recursively walks a project directory to collect source files, skipping
//! entries whose names start with `.` or `_`. Files are indexed by stem so the
//! candidate search can find `Health.cs` for a type named `Health`.

use crate::host::{AssetHandle, AssetIndex};
use anyhow::{Context, Result, bail};
use glob::Pattern;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Collects files with `extension` under `paths`.
///
/// When `default_excludes` is set, entries starting with `.` or `_` are
/// skipped. Entries whose name or path matches one of `excludes` are skipped
/// as well.
pub fn collect_source_files(
    paths: &[PathBuf],
    excludes: &[String],
    default_excludes: bool,
    extension: &str,
) -> Result<Vec<PathBuf>> {
    let patterns = excludes
        .iter()
        .map(|p| Pattern::new(p).with_context(|| format!("Invalid exclude pattern '{}'", p)))
        .collect::<Result<Vec<_>>>()?;

    let mut files = Vec::new();
    for path in paths {
        for entry in WalkDir::new(path)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_excluded(e, &patterns, default_excludes))
        {
            let entry = entry?;
            if entry.file_type().is_file()
                && entry.path().extension().is_some_and(|ext| ext == extension)
            {
                files.push(entry.into_path());
            }
        }
    }

    Ok(files)
}

fn is_excluded(entry: &walkdir::DirEntry, patterns: &[Pattern], default_excludes: bool) -> bool {
    let name = entry.file_name().to_string_lossy();
    if default_excludes && (name.starts_with('.') || name.starts_with('_')) {
        return true;
    }
    patterns
        .iter()
        .any(|p| p.matches(&name) || p.matches_path(entry.path()))
}

/// Source files of a project, keyed by file stem.
#[derive(Debug, Default)]
pub struct ProjectIndex {
    root: PathBuf,
    by_stem: BTreeMap<String, Vec<String>>,
}

impl ProjectIndex {
    /// Indexes the files `collect_source_files` finds under `root`.
    pub fn build(
        root: &Path,
        excludes: &[String],
        default_excludes: bool,
        extension: &str,
    ) -> Result<Self> {
        let files = collect_source_files(&[root.to_path_buf()], excludes, default_excludes, extension)?;
        let mut index = Self {
            root: root.to_path_buf(),
            by_stem: BTreeMap::new(),
        };
        for file in files {
            index.insert(&file);
        }
        debug!(root = %root.display(), files = index.len(), "indexed project");
        Ok(index)
    }

    fn insert(&mut self, file: &Path) {
        let Some(stem) = file.file_stem().and_then(|s| s.to_str()) else {
            warn!("skipping non UTF-8 file name {}", file.display());
            return;
        };
        let relative = file.strip_prefix(&self.root).unwrap_or(file);
        self.by_stem
            .entry(stem.to_string())
            .or_default()
            .push(to_slash(relative));
    }

    /// Number of indexed files.
    pub fn len(&self) -> usize {
        self.by_stem.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_stem.is_empty()
    }

    /// All indexed paths, sorted.
    pub fn paths(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = self.by_stem.values().flatten().map(String::as_str).collect();
        paths.sort_unstable();
        paths
    }
}

fn to_slash(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

impl AssetIndex for ProjectIndex {
    fn find_by_name(&self, simple_name: &str) -> Vec<String> {
        self.by_stem.get(simple_name).cloned().unwrap_or_default()
    }

    fn load(&self, path: &str) -> Result<AssetHandle> {
        let file = self.root.join(path);
        if !file.is_file() {
            bail!("asset {} does not exist", file.display());
        }

        let mut meta = file.clone().into_os_string();
        meta.push(".meta");
        let guid = match std::fs::read_to_string(&meta) {
            Ok(source) => parse_guid(&source),
            Err(_) => None,
        };

        Ok(AssetHandle {
            path: path.to_string(),
            guid,
        })
    }
}

/// Value of the first `guid:` line of a `.meta` file.
fn parse_guid(meta: &str) -> Option<String> {
    meta.lines()
        .find_map(|line| line.trim().strip_prefix("guid:"))
        .map(|guid| guid.trim().to_string())
        .filter(|guid| !guid.is_empty())
}
