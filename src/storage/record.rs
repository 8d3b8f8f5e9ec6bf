//! On-disk frame format
//!
//! ```text
//! +------------------+
//! | Frame Length     | (u32 LE, total bytes including this field)
//! +------------------+
//! | Frame Kind       | (u8)
//! +------------------+
//! | Body             | (JSON bytes)
//! +------------------+
//! | Checksum         | (u32 LE)
//! +------------------+
//! ```
//!
//! Checksum covers all bytes except the checksum itself. One frame holds one
//! whole batch (a scrape cycle or a detection run), so a batch is either fully
//! on disk or detected as torn.

use std::io;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::checksum::{compute_checksum, verify_checksum};

/// Length + kind + checksum
pub const MIN_FRAME_SIZE: usize = 4 + 1 + 4;

/// What a frame body contains
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// All snapshot rows of one patron's scrape cycle
    SnapshotCycle,
    /// All transition rows produced by one detection run
    TransitionBatch,
}

impl FrameKind {
    fn as_byte(self) -> u8 {
        match self {
            FrameKind::SnapshotCycle => 1,
            FrameKind::TransitionBatch => 2,
        }
    }

    fn from_byte(b: u8) -> Option<Self> {
        match b {
            1 => Some(FrameKind::SnapshotCycle),
            2 => Some(FrameKind::TransitionBatch),
            _ => None,
        }
    }
}

/// A single checksummed frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub kind: FrameKind,
    pub body: Vec<u8>,
}

impl Frame {
    /// Build a frame by serializing `value` as JSON.
    pub fn encode<T: Serialize>(kind: FrameKind, value: &T) -> serde_json::Result<Self> {
        Ok(Self {
            kind,
            body: serde_json::to_vec(value)?,
        })
    }

    /// Decode the JSON body into `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_slice(&self.body)
    }

    /// Serialize the complete frame to bytes.
    pub fn serialize(&self) -> Vec<u8> {
        let frame_length = (MIN_FRAME_SIZE + self.body.len()) as u32;

        let mut frame = Vec::with_capacity(frame_length as usize);
        frame.extend_from_slice(&frame_length.to_le_bytes());
        frame.push(self.kind.as_byte());
        frame.extend_from_slice(&self.body);

        let checksum = compute_checksum(&frame);
        frame.extend_from_slice(&checksum.to_le_bytes());
        frame
    }

    /// Deserialize a frame from bytes, verifying checksum.
    ///
    /// Returns the frame and the number of bytes consumed.
    pub fn deserialize(data: &[u8]) -> io::Result<(Self, usize)> {
        if data.len() < MIN_FRAME_SIZE {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "Frame too short"));
        }

        let frame_length = u32::from_le_bytes([data[0], data[1], data[2], data[3]]) as usize;

        if frame_length < MIN_FRAME_SIZE {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Invalid frame length: {}", frame_length),
            ));
        }

        if data.len() < frame_length {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "Frame truncated: expected {} bytes, got {}",
                    frame_length,
                    data.len()
                ),
            ));
        }

        let checksum_offset = frame_length - 4;
        let stored_checksum = u32::from_le_bytes([
            data[checksum_offset],
            data[checksum_offset + 1],
            data[checksum_offset + 2],
            data[checksum_offset + 3],
        ]);

        if !verify_checksum(&data[..checksum_offset], stored_checksum) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "Frame checksum mismatch",
            ));
        }

        let kind = FrameKind::from_byte(data[4]).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Unknown frame kind: {}", data[4]),
            )
        })?;

        let frame = Frame {
            kind,
            body: data[5..checksum_offset].to_vec(),
        };

        Ok((frame, frame_length))
    }
}
