//! Write-then-rename file replacement

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use polars::prelude::*;

use crate::error::Result;

/// Write `path` through a temporary sibling and rename it into place.
///
/// The temporary file is removed when `write` fails; the destination is
/// either the previous content or the complete new content.
pub fn write_atomic<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<&mut File>) -> Result<()>,
{
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let temp_path = temp_path(path);
    let written = (|| -> Result<()> {
        let mut file = File::create(&temp_path)?;
        {
            let mut writer = BufWriter::new(&mut file);
            write(&mut writer)?;
            writer.flush()?;
        }
        file.sync_all()?;
        Ok(())
    })();

    if let Err(e) = written {
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }

    fs::rename(&temp_path, path)?;
    Ok(())
}

/// Persist a frame as parquet with an atomic replace
pub fn write_frame(path: &Path, df: &mut DataFrame) -> Result<()> {
    write_atomic(path, |writer| {
        ParquetWriter::new(writer).finish(df)?;
        Ok(())
    })
}

fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.{}.tmp", name, std::process::id()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;

    #[test]
    fn test_write_atomic_replaces_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("model.json");

        write_atomic(&path, |w| Ok(w.write_all(b"first")?)).unwrap();
        write_atomic(&path, |w| Ok(w.write_all(b"second")?)).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "second");
        let leftovers: Vec<_> = fs::read_dir(path.parent().unwrap())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_failed_write_keeps_previous_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("predicoes_clf.parquet");

        write_atomic(&path, |w| Ok(w.write_all(b"complete")?)).unwrap();
        let result = write_atomic(&path, |w| {
            w.write_all(b"half")?;
            Err(PipelineError::value("interrupted"))
        });

        assert!(result.is_err());
        assert_eq!(fs::read_to_string(&path).unwrap(), "complete");
        assert!(!temp_path(&path).exists());
    }
}
