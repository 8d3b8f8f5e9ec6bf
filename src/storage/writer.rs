//! Append-only frame writer with fsync enforcement
//!
//! A frame is acknowledged only after `write_all` and `fsync` both succeed.
//! Frames are never updated in place; the only rewrite is a whole-file
//! replacement (temp file, fsync, rename, fsync directory) used by retention.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use super::errors::{StorageError, StorageResult};
use super::record::Frame;

/// Append-only writer for one store file.
pub struct FrameWriter {
    path: PathBuf,
    file: File,
    current_offset: u64,
    #[cfg(test)]
    fail_appends: bool,
}

impl FrameWriter {
    /// Opens or creates the frame file, creating parent directories if needed.
    pub fn open(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| {
                    StorageError::write_failed(
                        format!("Failed to create data directory: {}", parent.display()),
                        e,
                    )
                })?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)
            .map_err(|e| {
                StorageError::write_failed(
                    format!("Failed to open store file: {}", path.display()),
                    e,
                )
            })?;

        let current_offset = file
            .metadata()
            .map_err(|e| StorageError::write_failed("Failed to read file metadata", e))?
            .len();

        Ok(Self {
            path: path.to_path_buf(),
            file,
            current_offset,
            #[cfg(test)]
            fail_appends: false,
        })
    }

    /// Make every following append fail without touching the file.
    #[cfg(test)]
    pub(crate) fn set_fail_appends(&mut self, fail: bool) {
        self.fail_appends = fail;
    }

    /// Appends one frame and fsyncs.
    ///
    /// Returns the byte offset where the frame starts. On failure the file is
    /// truncated back to its previous length so no partial frame remains.
    pub fn append(&mut self, frame: &Frame) -> StorageResult<u64> {
        #[cfg(test)]
        {
            if self.fail_appends {
                return Err(StorageError::write_failed_no_source(format!(
                    "Appends disabled for {}",
                    self.path.display()
                )));
            }
        }

        let serialized = frame.serialize();
        let offset = self.current_offset;

        if let Err(e) = self.file.write_all(&serialized) {
            let _ = self.file.set_len(offset);
            return Err(StorageError::write_failed(
                format!("Failed to append frame to {}", self.path.display()),
                e,
            ));
        }

        if let Err(e) = self.file.sync_all() {
            let _ = self.file.set_len(offset);
            return Err(StorageError::write_failed(
                format!("fsync failed for {}", self.path.display()),
                e,
            ));
        }

        self.current_offset += serialized.len() as u64;
        Ok(offset)
    }

    /// fsyncs the file.
    pub fn sync(&self) -> StorageResult<()> {
        self.file
            .sync_all()
            .map_err(|e| StorageError::io_error(format!("fsync failed for {}", self.path.display()), e))
    }

    /// Atomically replaces the file content with `frames` and reopens it.
    pub fn replace_all(&mut self, frames: &[Frame]) -> StorageResult<()> {
        let tmp_path = self.path.with_extension("compact");

        {
            let mut tmp = File::create(&tmp_path).map_err(|e| {
                StorageError::write_failed(
                    format!("Failed to create compaction file: {}", tmp_path.display()),
                    e,
                )
            })?;
            for frame in frames {
                tmp.write_all(&frame.serialize()).map_err(|e| {
                    StorageError::write_failed(
                        format!("Failed to write compaction file: {}", tmp_path.display()),
                        e,
                    )
                })?;
            }
            tmp.sync_all().map_err(|e| {
                StorageError::write_failed(format!("fsync failed for {}", tmp_path.display()), e)
            })?;
        }

        fs::rename(&tmp_path, &self.path).map_err(|e| {
            StorageError::write_failed(
                format!("Failed to replace {}", self.path.display()),
                e,
            )
        })?;

        if let Some(parent) = self.path.parent() {
            fsync_dir(parent)?;
        }

        *self = Self::open(&self.path.clone())?;
        Ok(())
    }
}

/// fsync a directory so a rename is durable.
fn fsync_dir(path: &Path) -> StorageResult<()> {
    if path.as_os_str().is_empty() {
        return Ok(());
    }
    let dir = OpenOptions::new().read(true).open(path).map_err(|e| {
        StorageError::io_error(format!("Failed to open directory: {}", path.display()), e)
    })?;
    dir.sync_all().map_err(|e| {
        StorageError::io_error(format!("fsync directory failed: {}", path.display()), e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::reader::FrameReader;
    use crate::storage::record::FrameKind;
    use tempfile::TempDir;

    fn read_frames(path: &Path) -> Vec<Frame> {
        let mut reader = FrameReader::open(path).unwrap();
        let mut frames = Vec::new();
        while let Some(frame) = reader.read_next().unwrap() {
            frames.push(frame);
        }
        frames
    }

    fn frame(body: &str) -> Frame {
        Frame {
            kind: FrameKind::SnapshotCycle,
            body: body.as_bytes().to_vec(),
        }
    }

    #[test]
    fn test_open_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/data/s.dat");
        FrameWriter::open(&path).unwrap();
        assert!(path.exists());
        assert_eq!(fs::metadata(&path).unwrap().len(), 0);
    }

    #[test]
    fn test_append_returns_increasing_offsets() {
        let dir = TempDir::new().unwrap();
        let mut writer = FrameWriter::open(&dir.path().join("s.dat")).unwrap();
        let first = writer.append(&frame("{}")).unwrap();
        let second = writer.append(&frame("{}")).unwrap();
        assert_eq!(first, 0);
        assert!(second > first);
    }

    #[test]
    fn test_reopen_continues_at_end() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("s.dat");
        let end = {
            let mut writer = FrameWriter::open(&path).unwrap();
            writer.append(&frame("[1]")).unwrap();
            fs::metadata(&path).unwrap().len()
        };
        let mut writer = FrameWriter::open(&path).unwrap();
        assert_eq!(writer.append(&frame("[2]")).unwrap(), end);
        assert_eq!(read_frames(&path), vec![frame("[1]"), frame("[2]")]);
    }

    #[test]
    fn test_replace_all_rewrites_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("s.dat");
        let mut writer = FrameWriter::open(&path).unwrap();
        writer.append(&frame("[1]")).unwrap();
        writer.append(&frame("[2]")).unwrap();

        writer.replace_all(&[frame("[2]")]).unwrap();
        writer.append(&frame("[3]")).unwrap();

        assert_eq!(read_frames(&path), vec![frame("[2]"), frame("[3]")]);
        assert!(!path.with_extension("compact").exists());
    }

    #[test]
    fn test_disabled_appends_leave_file_untouched() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("s.dat");
        let mut writer = FrameWriter::open(&path).unwrap();
        writer.append(&frame("[1]")).unwrap();

        writer.set_fail_appends(true);
        let err = writer.append(&frame("[2]")).unwrap_err();
        assert_eq!(err.code().code(), "SHELF_STORAGE_WRITE_FAILED");

        writer.set_fail_appends(false);
        writer.append(&frame("[3]")).unwrap();
        assert_eq!(read_frames(&path), vec![frame("[1]"), frame("[3]")]);
    }
}
