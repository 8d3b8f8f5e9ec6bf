//! Sequential frame reader with strict corruption detection
//!
//! Used when a store is opened to rebuild its in-memory table. Every frame is
//! checksum-verified; a torn or corrupted frame aborts the open.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use super::errors::{StorageError, StorageResult};
use super::record::{Frame, MIN_FRAME_SIZE};

/// Reader over an append-only frame file.
pub struct FrameReader {
    path: PathBuf,
    reader: BufReader<File>,
    current_offset: u64,
    file_size: u64,
}

impl FrameReader {
    /// Opens the frame file for reading.
    pub fn open(path: &Path) -> StorageResult<Self> {
        let file = File::open(path).map_err(|e| {
            StorageError::read_failed(format!("Failed to open store file: {}", path.display()), e)
        })?;

        let file_size = file
            .metadata()
            .map_err(|e| StorageError::read_failed("Failed to read file metadata", e))?
            .len();

        Ok(Self {
            path: path.to_path_buf(),
            reader: BufReader::new(file),
            current_offset: 0,
            file_size,
        })
    }

    /// Returns the file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the current read offset.
    pub fn current_offset(&self) -> u64 {
        self.current_offset
    }

    /// Reads the next frame.
    ///
    /// - `Ok(Some(frame))` if a frame was read
    /// - `Ok(None)` at end of file
    /// - `Err(SHELF_DATA_CORRUPTION)` on any framing or checksum failure
    pub fn read_next(&mut self) -> StorageResult<Option<Frame>> {
        if self.current_offset >= self.file_size {
            return Ok(None);
        }

        let remaining = self.file_size - self.current_offset;
        if remaining < MIN_FRAME_SIZE as u64 {
            return Err(StorageError::corruption_at_offset(
                self.current_offset,
                format!(
                    "Truncated store: {} bytes remaining, minimum frame size is {}",
                    remaining, MIN_FRAME_SIZE
                ),
            ));
        }

        let mut len_buf = [0u8; 4];
        self.reader.read_exact(&mut len_buf).map_err(|e| {
            StorageError::corruption_at_offset(
                self.current_offset,
                format!("Failed to read frame length: {}", e),
            )
        })?;
        let frame_length = u32::from_le_bytes(len_buf) as u64;

        if frame_length < MIN_FRAME_SIZE as u64 {
            return Err(StorageError::corruption_at_offset(
                self.current_offset,
                format!("Invalid frame length: {}", frame_length),
            ));
        }

        if frame_length > remaining {
            return Err(StorageError::corruption_at_offset(
                self.current_offset,
                format!(
                    "Frame length {} exceeds remaining file size {}",
                    frame_length, remaining
                ),
            ));
        }

        let mut frame_buf = vec![0u8; frame_length as usize];
        frame_buf[0..4].copy_from_slice(&len_buf);
        self.reader.read_exact(&mut frame_buf[4..]).map_err(|e| {
            StorageError::corruption_at_offset(
                self.current_offset,
                format!("Failed to read frame body: {}", e),
            )
        })?;

        let (frame, consumed) = Frame::deserialize(&frame_buf)
            .map_err(|e| StorageError::corruption_at_offset(self.current_offset, e.to_string()))?;

        self.current_offset += consumed as u64;
        Ok(Some(frame))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::record::FrameKind;
    use crate::storage::writer::FrameWriter;
    use std::fs;
    use tempfile::TempDir;

    fn frame(n: u8) -> Frame {
        Frame {
            kind: FrameKind::TransitionBatch,
            body: format!("[{}]", n).into_bytes(),
        }
    }

    #[test]
    fn test_reads_frames_in_append_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("t.dat");
        {
            let mut writer = FrameWriter::open(&path).unwrap();
            writer.append(&frame(1)).unwrap();
            writer.append(&frame(2)).unwrap();
        }

        let mut reader = FrameReader::open(&path).unwrap();
        assert_eq!(reader.read_next().unwrap(), Some(frame(1)));
        assert_eq!(reader.read_next().unwrap(), Some(frame(2)));
        assert!(reader.read_next().unwrap().is_none());
    }

    #[test]
    fn test_torn_tail_is_corruption() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("t.dat");
        {
            let mut writer = FrameWriter::open(&path).unwrap();
            writer.append(&frame(1)).unwrap();
            writer.append(&frame(2)).unwrap();
        }
        let bytes = fs::read(&path).unwrap();
        fs::write(&path, &bytes[..bytes.len() - 3]).unwrap();

        let mut reader = FrameReader::open(&path).unwrap();
        assert!(reader.read_next().unwrap().is_some());
        let err = reader.read_next().unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(err.code().code(), "SHELF_DATA_CORRUPTION");
    }
}
