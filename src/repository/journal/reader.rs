//! Journal reader with zero-tolerance corruption detection
//!
//! - Frames are read strictly in order, starting at sequence 1
//! - A bad checksum, a truncated tail or a sequence gap stops the read
//! - No skipping, no repair attempts

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use super::frame::{read_u32, JournalFrame, MIN_FRAME_SIZE};
use crate::errors::{LifecycleError, LifecycleResult};

/// Sequential reader over `journal.log`.
pub struct JournalReader {
    path: PathBuf,
    reader: BufReader<File>,
    current_offset: u64,
    file_size: u64,
    last_sequence: u64,
}

impl JournalReader {
    pub fn open(path: &Path) -> LifecycleResult<Self> {
        let file = File::open(path).map_err(|e| {
            LifecycleError::Storage(format!(
                "Failed to open journal {}: {}",
                path.display(),
                e
            ))
        })?;
        let file_size = file.metadata()?.len();

        Ok(Self {
            path: path.to_path_buf(),
            reader: BufReader::new(file),
            current_offset: 0,
            file_size,
            last_sequence: 0,
        })
    }

    /// Opens the journal positioned after frame `last_sequence`, which ends
    /// at byte `offset`.
    ///
    /// Used to pick up frames appended since a replay; the first frame read
    /// must carry `last_sequence + 1`.
    pub fn resume(path: &Path, offset: u64, last_sequence: u64) -> LifecycleResult<Self> {
        let mut reader = Self::open(path)?;
        if offset > reader.file_size {
            return Err(LifecycleError::Corruption {
                offset,
                reason: format!("journal shrank to {} bytes", reader.file_size),
            });
        }
        reader.reader.seek(SeekFrom::Start(offset))?;
        reader.current_offset = offset;
        reader.last_sequence = last_sequence;
        Ok(reader)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Byte offset of the next frame.
    pub fn current_offset(&self) -> u64 {
        self.current_offset
    }

    pub fn last_sequence_number(&self) -> u64 {
        self.last_sequence
    }

    /// Reads the next frame.
    ///
    /// Returns `Ok(None)` at a clean end of file.
    ///
    /// # Errors
    ///
    /// `Corruption` if the frame is truncated, fails its checksum, or breaks
    /// the sequence.
    pub fn read_next(&mut self) -> LifecycleResult<Option<JournalFrame>> {
        if self.current_offset >= self.file_size {
            return Ok(None);
        }

        let remaining = self.file_size - self.current_offset;
        if remaining < MIN_FRAME_SIZE as u64 {
            return Err(self.corruption(format!(
                "truncated journal: {} bytes remaining, minimum frame size is {}",
                remaining, MIN_FRAME_SIZE
            )));
        }

        let mut len_buf = [0u8; 4];
        self.reader
            .read_exact(&mut len_buf)
            .map_err(|e| self.corruption(format!("failed to read frame length: {}", e)))?;
        let frame_length = read_u32(&len_buf) as u64;

        if frame_length < MIN_FRAME_SIZE as u64 {
            return Err(self.corruption(format!("invalid frame length: {}", frame_length)));
        }
        if frame_length > remaining {
            return Err(self.corruption(format!(
                "frame length {} exceeds remaining file size {}",
                frame_length, remaining
            )));
        }

        let mut frame_buf = vec![0u8; frame_length as usize];
        frame_buf[0..4].copy_from_slice(&len_buf);
        self.reader
            .read_exact(&mut frame_buf[4..])
            .map_err(|e| self.corruption(format!("failed to read frame body: {}", e)))?;

        let frame = JournalFrame::deserialize(&frame_buf).map_err(|e| self.corruption(e))?;

        let expected = self.last_sequence + 1;
        if frame.sequence != expected {
            return Err(self.corruption(format!(
                "non-sequential sequence number: expected {}, got {}",
                expected, frame.sequence
            )));
        }

        self.current_offset += frame_length;
        self.last_sequence = frame.sequence;
        Ok(Some(frame))
    }

    /// Reads every remaining frame.
    pub fn read_all(&mut self) -> LifecycleResult<Vec<JournalFrame>> {
        let mut frames = Vec::new();
        while let Some(frame) = self.read_next()? {
            frames.push(frame);
        }
        Ok(frames)
    }

    fn corruption(&self, reason: impl Into<String>) -> LifecycleError {
        LifecycleError::Corruption {
            offset: self.current_offset,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::journal::{JournalSync, JournalWriter};
    use std::fs::OpenOptions;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_frames(path: &Path, count: u64) {
        let mut writer = JournalWriter::open(path, 1, JournalSync::None).unwrap();
        for n in 0..count {
            writer.append(format!("{{\"n\":{}}}", n).into_bytes()).unwrap();
        }
    }

    #[test]
    fn test_empty_journal() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("journal.log");
        File::create(&path).unwrap();
        assert!(JournalReader::open(&path).unwrap().read_next().unwrap().is_none());
    }

    #[test]
    fn test_truncated_tail_is_corruption() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("journal.log");
        write_frames(&path, 2);

        let len = std::fs::metadata(&path).unwrap().len();
        OpenOptions::new()
            .write(true)
            .open(&path)
            .unwrap()
            .set_len(len - 3)
            .unwrap();

        let mut reader = JournalReader::open(&path).unwrap();
        assert!(reader.read_next().unwrap().is_some());
        let err = reader.read_next().unwrap_err();
        match err {
            LifecycleError::Corruption { offset, .. } => assert!(offset > 0),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_sequence_gap_is_corruption() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("journal.log");
        let mut file = File::create(&path).unwrap();
        file.write_all(&JournalFrame::new(1, b"{}".to_vec()).serialize()).unwrap();
        file.write_all(&JournalFrame::new(3, b"{}".to_vec()).serialize()).unwrap();
        drop(file);

        let mut reader = JournalReader::open(&path).unwrap();
        assert!(matches!(
            reader.read_all().unwrap_err(),
            LifecycleError::Corruption { .. }
        ));
    }

    #[test]
    fn test_resume_reads_only_new_frames() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("journal.log");
        write_frames(&path, 2);

        let mut reader = JournalReader::open(&path).unwrap();
        reader.read_all().unwrap();
        let offset = reader.current_offset();

        let mut writer = JournalWriter::open(&path, 3, JournalSync::None).unwrap();
        writer.append(b"{\"n\":2}".to_vec()).unwrap();

        let mut resumed = JournalReader::resume(&path, offset, 2).unwrap();
        let frames = resumed.read_all().unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].sequence, 3);
        assert!(JournalReader::resume(&path, offset, 1).unwrap().read_next().is_err());
    }

    #[test]
    fn test_first_sequence_must_be_one() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("journal.log");
        std::fs::write(&path, JournalFrame::new(2, b"{}".to_vec()).serialize()).unwrap();
        assert!(JournalReader::open(&path).unwrap().read_next().is_err());
    }
}
