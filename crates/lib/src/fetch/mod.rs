//! File fetchers: where an asset's bytes are read from.
//!
//! Two variants of one capability. The [`DiskFetcher`] is rooted at the
//! working directory and reads lazily; the [`StateFetcher`] is backed by
//! the list of files the state file recorded for one asset identity.
//! Absence is signalled as `Ok(None)` / an empty match list, never as an
//! error.

use std::io;
use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobMatcher};
use thiserror::Error;
use walkdir::WalkDir;

use crate::file::File;

#[derive(Debug, Error)]
pub enum FetchError {
  #[error("failed to read {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to walk {path}: {source}")]
  Walk {
    path: PathBuf,
    #[source]
    source: walkdir::Error,
  },

  #[error("invalid glob pattern {pattern:?}: {source}")]
  Pattern {
    pattern: String,
    #[source]
    source: globset::Error,
  },

  #[error("more than one file named {name:?}")]
  Ambiguous { name: String },
}

/// Read access to an asset's persisted form.
pub trait FileFetcher {
  /// Fetch the file with exactly the given name.
  ///
  /// The name is matched literally; glob metacharacters have no special
  /// meaning here. `Ok(None)` means the file is absent, which callers
  /// treat as "not found, not an error".
  fn fetch_by_name(&self, name: &str) -> Result<Option<File>, FetchError>;

  /// Fetch all files matching a shell-style glob pattern.
  ///
  /// Returns matches in filename order; empty if none match.
  fn fetch_by_pattern(&self, pattern: &str) -> Result<Vec<File>, FetchError>;
}

/// Fetcher rooted at the working directory.
#[derive(Debug, Clone)]
pub struct DiskFetcher {
  directory: PathBuf,
}

impl DiskFetcher {
  pub fn new(directory: impl Into<PathBuf>) -> Self {
    Self {
      directory: directory.into(),
    }
  }
}

impl FileFetcher for DiskFetcher {
  fn fetch_by_name(&self, name: &str) -> Result<Option<File>, FetchError> {
    let path = self.directory.join(name);
    match std::fs::read(&path) {
      Ok(data) => Ok(Some(File::new(name, data))),
      Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
      Err(source) => Err(FetchError::Read { path, source }),
    }
  }

  fn fetch_by_pattern(&self, pattern: &str) -> Result<Vec<File>, FetchError> {
    let matcher = compile_glob(pattern)?;

    let mut files = Vec::new();
    if !self.directory.exists() {
      return Ok(files);
    }

    for entry in WalkDir::new(&self.directory).min_depth(1) {
      let entry = entry.map_err(|source| FetchError::Walk {
        path: self.directory.clone(),
        source,
      })?;
      if !entry.file_type().is_file() {
        continue;
      }

      let relative = match entry.path().strip_prefix(&self.directory) {
        Ok(rel) => forward_slashes(rel),
        Err(_) => continue,
      };
      if !matcher.is_match(&relative) {
        continue;
      }

      let data = std::fs::read(entry.path()).map_err(|source| FetchError::Read {
        path: entry.path().to_path_buf(),
        source,
      })?;
      files.push(File::new(relative, data));
    }

    files.sort_by(|a, b| a.filename.cmp(&b.filename));
    Ok(files)
  }
}

/// Fetcher over the files the state file recorded for one identity.
#[derive(Debug, Clone, Default)]
pub struct StateFetcher {
  files: Vec<File>,
}

impl StateFetcher {
  pub fn new(files: Vec<File>) -> Self {
    Self { files }
  }
}

impl FileFetcher for StateFetcher {
  fn fetch_by_name(&self, name: &str) -> Result<Option<File>, FetchError> {
    let mut matches = self.files.iter().filter(|f| f.filename == name);
    let first = matches.next();
    if matches.next().is_some() {
      return Err(FetchError::Ambiguous { name: name.to_string() });
    }
    Ok(first.cloned())
  }

  fn fetch_by_pattern(&self, pattern: &str) -> Result<Vec<File>, FetchError> {
    let matcher = compile_glob(pattern)?;

    let mut files: Vec<File> = self
      .files
      .iter()
      .filter(|f| matcher.is_match(&f.filename))
      .cloned()
      .collect();
    files.sort_by(|a, b| a.filename.cmp(&b.filename));
    Ok(files)
  }
}

// Shell semantics: `*` and `?` stop at path separators.
fn compile_glob(pattern: &str) -> Result<GlobMatcher, FetchError> {
  Ok(
    GlobBuilder::new(pattern)
      .literal_separator(true)
      .build()
      .map_err(|source| FetchError::Pattern {
        pattern: pattern.to_string(),
        source,
      })?
      .compile_matcher(),
  )
}

fn forward_slashes(path: &Path) -> String {
  let mut out = String::new();
  for component in path.components() {
    if !out.is_empty() {
      out.push('/');
    }
    out.push_str(&component.as_os_str().to_string_lossy());
  }
  out
}

#[cfg(test)]
mod tests {
  use tempfile::TempDir;

  use super::*;
  use crate::file::write_files;

  fn seeded_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    write_files(
      dir.path(),
      &[
        File::new("install-config.yaml", b"cluster: demo\n".to_vec()),
        File::new("manifests/cluster-config.yaml", b"a\n".to_vec()),
        File::new("manifests/infrastructure.json", b"{}\n".to_vec()),
        File::new("notes.txt", b"n\n".to_vec()),
      ],
    )
    .unwrap();
    dir
  }

  #[test]
  fn disk_fetch_by_name_reads_bytes() {
    let dir = seeded_dir();
    let fetcher = DiskFetcher::new(dir.path());

    let file = fetcher.fetch_by_name("install-config.yaml").unwrap().unwrap();
    assert_eq!(file.filename, "install-config.yaml");
    assert_eq!(file.data, b"cluster: demo\n");
  }

  #[test]
  fn disk_fetch_by_name_absent_is_none() {
    let dir = seeded_dir();
    let fetcher = DiskFetcher::new(dir.path());

    assert!(fetcher.fetch_by_name("missing.yaml").unwrap().is_none());
  }

  #[test]
  fn disk_fetch_by_pattern_matches_nested_paths_in_order() {
    let dir = seeded_dir();
    let fetcher = DiskFetcher::new(dir.path());

    let files = fetcher.fetch_by_pattern("manifests/*").unwrap();
    let names: Vec<&str> = files.iter().map(|f| f.filename.as_str()).collect();
    assert_eq!(names, ["manifests/cluster-config.yaml", "manifests/infrastructure.json"]);
  }

  #[test]
  fn disk_fetch_by_pattern_on_missing_directory_is_empty() {
    let fetcher = DiskFetcher::new("/nonexistent/kiln-test-dir");
    assert!(fetcher.fetch_by_pattern("*").unwrap().is_empty());
  }

  #[test]
  fn disk_fetch_rejects_invalid_patterns() {
    let dir = seeded_dir();
    let fetcher = DiskFetcher::new(dir.path());

    assert!(matches!(
      fetcher.fetch_by_pattern("manifests/[bad"),
      Err(FetchError::Pattern { .. })
    ));
  }

  #[test]
  fn state_fetch_by_name_is_exact() {
    let fetcher = StateFetcher::new(vec![
      File::new("a.txt", b"a".to_vec()),
      File::new("ab.txt", b"ab".to_vec()),
    ]);

    let file = fetcher.fetch_by_name("a.txt").unwrap().unwrap();
    assert_eq!(file.data, b"a");
    assert!(fetcher.fetch_by_name("c.txt").unwrap().is_none());
  }

  #[test]
  fn state_fetch_by_name_treats_glob_metacharacters_literally() {
    let fetcher = StateFetcher::new(vec![
      File::new("a.txt", b"a".to_vec()),
      File::new("a*.txt", b"star".to_vec()),
      File::new("ab.txt", b"ab".to_vec()),
    ]);

    // A pattern-looking name only matches a file literally carrying it.
    let file = fetcher.fetch_by_name("a*.txt").unwrap().unwrap();
    assert_eq!(file.data, b"star");
    assert!(fetcher.fetch_by_name("a?.txt").unwrap().is_none());
  }

  #[test]
  fn state_fetch_by_name_with_duplicates_is_ambiguous() {
    let fetcher = StateFetcher::new(vec![
      File::new("dup.txt", b"1".to_vec()),
      File::new("dup.txt", b"2".to_vec()),
    ]);

    assert!(matches!(
      fetcher.fetch_by_name("dup.txt"),
      Err(FetchError::Ambiguous { .. })
    ));
  }

  #[test]
  fn state_fetch_by_pattern_globs_recorded_names() {
    let fetcher = StateFetcher::new(vec![
      File::new("manifests/b.yaml", b"b".to_vec()),
      File::new("manifests/a.yaml", b"a".to_vec()),
      File::new("other.json", b"{}".to_vec()),
    ]);

    let files = fetcher.fetch_by_pattern("manifests/*.yaml").unwrap();
    let names: Vec<&str> = files.iter().map(|f| f.filename.as_str()).collect();
    assert_eq!(names, ["manifests/a.yaml", "manifests/b.yaml"]);
  }

  #[test]
  fn state_fetch_by_pattern_empty_when_nothing_matches() {
    let fetcher = StateFetcher::new(Vec::new());
    assert!(fetcher.fetch_by_pattern("*").unwrap().is_empty());
  }
}
