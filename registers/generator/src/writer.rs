// Licensed under the Apache-2.0 license

//! Delivery of generated units to their destination.
//!
//! Files are written to a temporary file in the target directory and then
//! renamed over the destination, so readers see either the old or the new
//! contents.

use crate::error::{Error, ExportError, Result};
use crate::output::OutputUnit;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Where generated units go.
#[derive(Debug)]
pub enum Destination {
    /// Standard output; accepts a single unit.
    Stdout,
    /// One file per unit, named after the unit.
    Directory(PathBuf),
    /// A single file; accepts a single unit.
    File(PathBuf),
    /// Collects the units in memory.
    Buffer(Vec<OutputUnit>),
}

impl Destination {
    pub fn write(&mut self, units: Vec<OutputUnit>) -> Result<()> {
        match self {
            Destination::Stdout => {
                let unit = single(units, "stdout")?;
                std::io::stdout()
                    .lock()
                    .write_all(unit.contents.as_bytes())
                    .map_err(|source| Error::Io {
                        path: PathBuf::from("-"),
                        source,
                    })
            }
            Destination::File(path) => {
                let unit = single(units, &path.display().to_string())?;
                let staged = stage(path, &unit.contents)?;
                commit(vec![(staged, path.clone())])
            }
            Destination::Directory(dir) => {
                std::fs::create_dir_all(&*dir).map_err(|source| Error::Io {
                    path: dir.clone(),
                    source,
                })?;
                // Stage everything before replacing anything.
                let mut staged = Vec::new();
                for unit in &units {
                    let path = dir.join(&unit.name);
                    staged.push((stage(&path, &unit.contents)?, path));
                }
                commit(staged)
            }
            Destination::Buffer(buffer) => {
                buffer.extend(units);
                Ok(())
            }
        }
    }
}

fn single(mut units: Vec<OutputUnit>, destination: &str) -> Result<OutputUnit> {
    if units.len() != 1 {
        return Err(ExportError::TooManyUnits {
            destination: destination.to_string(),
            units: units.len(),
        }
        .into());
    }
    units.pop().ok_or_else(|| {
        ExportError::TooManyUnits {
            destination: destination.to_string(),
            units: 0,
        }
        .into()
    })
}

/// Writes `contents` to a temporary file next to `path`.
fn stage(path: &Path, contents: &str) -> Result<NamedTempFile> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let io_error = |source| Error::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut file = NamedTempFile::new_in(dir).map_err(io_error)?;
    file.write_all(contents.as_bytes()).map_err(io_error)?;
    file.flush().map_err(io_error)?;
    Ok(file)
}

fn commit(staged: Vec<(NamedTempFile, PathBuf)>) -> Result<()> {
    for (file, path) in staged {
        file.persist(&path).map_err(|err| Error::Io {
            path: path.clone(),
            source: err.error,
        })?;
        log::info!("Wrote {}", path.display());
    }
    Ok(())
}

/// Writes `contents` to `path` atomically.
pub fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let staged = stage(path, contents)?;
    commit(vec![(staged, path.to_path_buf())])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(name: &str, contents: &str) -> OutputUnit {
        OutputUnit {
            name: name.to_string(),
            contents: contents.to_string(),
        }
    }

    #[test]
    fn test_directory() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out");
        let mut destination = Destination::Directory(target.clone());
        destination
            .write(vec![unit("mod.rs", "pub mod a;\n"), unit("a.rs", "// a\n")])
            .unwrap();
        assert_eq!(
            std::fs::read_to_string(target.join("mod.rs")).unwrap(),
            "pub mod a;\n"
        );
        assert_eq!(std::fs::read_to_string(target.join("a.rs")).unwrap(), "// a\n");
    }

    #[test]
    fn test_file_replaces_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("regs.rs");
        std::fs::write(&path, "old contents that are longer").unwrap();
        Destination::File(path.clone())
            .write(vec![unit("regs.rs", "new")])
            .unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new");
        // Only the destination is left behind.
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    fn entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_failed_write_keeps_previous_output() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.rs"), "old").unwrap();
        // A directory where a unit should go cannot be replaced.
        std::fs::create_dir(dir.path().join("b.rs")).unwrap();
        std::fs::write(dir.path().join("b.rs").join("keep"), "").unwrap();

        let err = Destination::Directory(dir.path().to_path_buf())
            .write(vec![unit("b.rs", "new b"), unit("a.rs", "new a")])
            .unwrap_err();
        assert!(matches!(err, Error::Io { ref path, .. } if path.ends_with("b.rs")));
        assert_eq!(std::fs::read_to_string(dir.path().join("a.rs")).unwrap(), "old");
        assert_eq!(entries(dir.path()), vec!["a.rs", "b.rs"]);

        assert!(Destination::File(dir.path().join("b.rs"))
            .write(vec![unit("b.rs", "new b")])
            .is_err());
        assert_eq!(entries(dir.path()), vec!["a.rs", "b.rs"]);
        assert_eq!(entries(&dir.path().join("b.rs")), vec!["keep"]);
    }

    #[test]
    fn test_staging_failure_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("out");
        std::fs::write(&blocker, "not a directory").unwrap();
        assert!(Destination::Directory(blocker.clone())
            .write(vec![unit("a.rs", "x")])
            .is_err());
        assert_eq!(std::fs::read_to_string(&blocker).unwrap(), "not a directory");
        assert_eq!(entries(dir.path()), vec!["out"]);
    }

    #[test]
    fn test_file_rejects_many_units() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("regs.rs");
        let err = Destination::File(path.clone())
            .write(vec![unit("mod.rs", ""), unit("a.rs", "")])
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Export(ExportError::TooManyUnits { units: 2, .. })
        ));
        assert!(!path.exists());
    }

    #[test]
    fn test_buffer() {
        let mut destination = Destination::Buffer(Vec::new());
        destination.write(vec![unit("a.rs", "x")]).unwrap();
        destination.write(vec![unit("b.rs", "y")]).unwrap();
        let Destination::Buffer(units) = destination else {
            panic!("not a buffer");
        };
        assert_eq!(units.len(), 2);
        assert_eq!(units[1].name, "b.rs");
    }
}
