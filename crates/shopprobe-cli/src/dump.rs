//! Concatenate a source tree into one markdown file.

use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use walkdir::{DirEntry, WalkDir};

const MAX_FILE_BYTES: u64 = 100 * 1024;

#[derive(Debug, Clone)]
pub struct DumpOptions {
    pub extensions: HashSet<String>,
    /// Included regardless of extension.
    pub file_names: HashSet<String>,
    pub exclude_dirs: HashSet<String>,
    pub exclude_files: HashSet<String>,
    pub max_file_bytes: u64,
}

fn set(items: &[&str]) -> HashSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for DumpOptions {
    fn default() -> Self {
        Self {
            extensions: set(&["java", "ts", "html", "css", "xml", "yml", "json", "js"]),
            file_names: set(&["Dockerfile", "docker-compose.yml", "Jenkinsfile"]),
            exclude_dirs: set(&[
                "node_modules",
                "target",
                ".git",
                ".idea",
                ".vscode",
                "dist",
                "coverage",
            ]),
            exclude_files: set(&["package-lock.json", "yarn.lock"]),
            max_file_bytes: MAX_FILE_BYTES,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DumpStats {
    pub written: usize,
    pub skipped_large: usize,
    pub unreadable: usize,
}

impl DumpOptions {
    fn wants(&self, name: &str, ext: Option<&str>) -> bool {
        if self.exclude_files.contains(name) {
            return false;
        }
        self.file_names.contains(name) || ext.is_some_and(|e| self.extensions.contains(e))
    }

    fn skip_dir(&self, entry: &DirEntry) -> bool {
        entry.depth() > 0
            && entry.file_type().is_dir()
            && entry
                .file_name()
                .to_str()
                .is_some_and(|n| self.exclude_dirs.contains(n))
    }
}

/// Fence language for a file extension.
pub fn fence_language(ext: Option<&str>) -> &str {
    match ext {
        None | Some("") => "text",
        Some("ts") | Some("js") => "typescript",
        Some("yml") => "yaml",
        Some(other) => other,
    }
}

/// Write every matching file under `roots` into `out`.
///
/// Paths are shown relative to the parent of the first root, so dumping
/// `app/backend` and `app/frontend` yields `backend/...` and `frontend/...`.
/// A root outside that parent shows up with `../` components.
pub fn dump_codebase<W: Write>(
    roots: &[PathBuf],
    options: &DumpOptions,
    out: &mut W,
) -> Result<DumpStats> {
    let roots: Vec<PathBuf> = roots
        .iter()
        .map(|r| fs::canonicalize(r).unwrap_or_else(|_| r.clone()))
        .collect();
    let base = roots
        .first()
        .and_then(|r| r.parent())
        .map(Path::to_path_buf)
        .unwrap_or_default();
    let mut stats = DumpStats::default();

    writeln!(out, "# Codebase Dump\n")?;

    for root in &roots {
        let walker = WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !options.skip_dir(e));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::warn!("skipping unreadable entry: {err}");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let name = entry.file_name().to_string_lossy();
            let ext = path.extension().and_then(|e| e.to_str());
            if !options.wants(&name, ext) {
                continue;
            }

            let rel = relative_to(path, &base);
            let size = match entry.metadata() {
                Ok(m) => m.len(),
                Err(err) => {
                    writeln!(out, "## File: {rel} (ERROR READ: {err})\n")?;
                    stats.unreadable += 1;
                    continue;
                }
            };
            if size > options.max_file_bytes {
                writeln!(out, "## File: {rel} (SKIPPED - TOO LARGE > 100KB)\n")?;
                stats.skipped_large += 1;
                continue;
            }

            match fs::read_to_string(path) {
                Ok(content) => {
                    writeln!(out, "## File: {rel}")?;
                    writeln!(out, "```{}", fence_language(ext))?;
                    out.write_all(content.as_bytes())?;
                    writeln!(out, "\n```\n")?;
                    stats.written += 1;
                }
                Err(err) => {
                    writeln!(out, "## File: {rel} (ERROR READ: {err})\n")?;
                    stats.unreadable += 1;
                }
            }
        }
    }

    tracing::info!(
        written = stats.written,
        skipped = stats.skipped_large,
        unreadable = stats.unreadable,
        "dump finished"
    );
    Ok(stats)
}

fn relative_to(path: &Path, base: &Path) -> String {
    pathdiff::diff_paths(path, base)
        .unwrap_or_else(|| path.to_path_buf())
        .display()
        .to_string()
}

pub fn dump_to_file(roots: &[PathBuf], options: &DumpOptions, output: &Path) -> Result<DumpStats> {
    let file = fs::File::create(output)
        .with_context(|| format!("failed to create {}", output.display()))?;
    let mut writer = std::io::BufWriter::new(file);
    let stats = dump_codebase(roots, options, &mut writer)?;
    writer.flush()?;
    Ok(stats)
}
