use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use tracing::{debug, error, warn};

use crate::error::{StateError, StateResult};
use crate::types::Block;

/// Header size: 4 bytes length + 4 bytes CRC.
const HEADER_SIZE: usize = 8;

/// Flush/sync strategy for the journal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SyncMode {
    /// `fsync` after every block (safest, highest latency).
    EveryWrite,
    /// Flush to the OS and rely on its page cache.
    #[default]
    OsDefault,
}

/// What replay found in the journal file.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Recovery {
    pub blocks: Vec<Block>,
    /// Bytes of torn or corrupt tail that were cut off.
    pub discarded_bytes: u64,
}

struct JournalWriter {
    writer: BufWriter<File>,
    /// Current end of valid data.
    offset: u64,
    /// Set when a failed append could not be rolled back.
    failed: bool,
}

/// Append-only block journal.
///
/// On-disk format, one frame per block:
/// ```text
/// [4 bytes: payload length (little-endian u32)]
/// [4 bytes: CRC32 of payload (little-endian u32)]
/// [N bytes: payload (bincode-serialized Block)]
/// ```
///
/// Recovery reads front-to-back and stops at the first frame that is short,
/// fails its CRC, or does not decode. Everything from that point on is a torn
/// write and is truncated away so later appends land on a clean boundary.
pub struct Journal {
    path: PathBuf,
    writer: Mutex<JournalWriter>,
    sync_mode: SyncMode,
}

impl Journal {
    /// Open (or create) the journal file at `path`.
    pub fn open(path: &Path, sync_mode: SyncMode) -> StateResult<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)?;
        let offset = file.metadata()?.len();

        Ok(Self {
            path: path.to_path_buf(),
            writer: Mutex::new(JournalWriter {
                writer: BufWriter::new(file),
                offset,
                failed: false,
            }),
            sync_mode,
        })
    }

    /// Append one block. Returns the byte offset of its frame.
    ///
    /// A failed append leaves the file ending at the previous frame, so the
    /// next append starts on a clean boundary.
    pub fn append(&self, block: &Block) -> StateResult<u64> {
        let payload =
            bincode::serialize(block).map_err(|e| StateError::Serialization(e.to_string()))?;
        let length = u32::try_from(payload.len())
            .map_err(|_| StateError::Serialization("block larger than 4 GiB".into()))?;
        let crc = crc32fast::hash(&payload);

        let mut w = self.lock()?;
        if w.failed {
            return Err(StateError::Poisoned("journal writer"));
        }
        let frame_offset = w.offset;

        if let Err(e) = write_frame(&mut w.writer, length, crc, &payload, self.sync_mode) {
            warn!(offset = frame_offset, error = %e, "journal append failed; rolling back");
            if let Err(rollback) = self.rollback(&mut w) {
                error!(offset = frame_offset, error = %rollback, "journal rollback failed");
                w.failed = true;
            }
            return Err(e.into());
        }

        w.offset += HEADER_SIZE as u64 + payload.len() as u64;

        debug!(offset = frame_offset, block = block.number, len = payload.len(), "journal append");
        Ok(frame_offset)
    }

    /// Read every intact block and cut off a torn tail.
    pub fn recover(&self) -> StateResult<Recovery> {
        let (blocks, offset, file_len) = read_intact(&self.path)?;

        let discarded_bytes = file_len - offset;
        if discarded_bytes > 0 {
            warn!(
                offset,
                discarded_bytes,
                path = %self.path.display(),
                "torn journal tail; truncating"
            );
            self.truncate_to(offset)?;
        }

        debug!(recovered = blocks.len(), "journal recovery complete");
        Ok(Recovery {
            blocks,
            discarded_bytes,
        })
    }

    /// Read the intact blocks of the journal at `path` without opening it
    /// for writing. `discarded_bytes` reports the torn tail, which stays on
    /// disk.
    pub fn read_only(path: &Path) -> StateResult<Recovery> {
        let (blocks, offset, file_len) = read_intact(path)?;
        Ok(Recovery {
            blocks,
            discarded_bytes: file_len - offset,
        })
    }

    /// Current end of valid data.
    pub fn offset(&self) -> StateResult<u64> {
        Ok(self.lock()?.offset)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn truncate_to(&self, len: u64) -> StateResult<()> {
        let mut w = self.lock()?;
        w.writer.flush()?;

        let file = OpenOptions::new().write(true).open(&self.path)?;
        file.set_len(len)?;
        file.sync_all()?;
        drop(file);

        let file = OpenOptions::new().read(true).append(true).open(&self.path)?;
        w.writer = BufWriter::new(file);
        w.offset = len;
        Ok(())
    }

    /// Drop whatever a failed append left behind, buffered or on disk.
    fn rollback(&self, w: &mut JournalWriter) -> StateResult<()> {
        let file = OpenOptions::new().read(true).append(true).open(&self.path)?;
        let stale = std::mem::replace(&mut w.writer, BufWriter::new(file));
        let (stale_file, _unwritten) = stale.into_parts();
        stale_file.set_len(w.offset)?;
        stale_file.sync_all()?;
        Ok(())
    }

    fn lock(&self) -> StateResult<MutexGuard<'_, JournalWriter>> {
        self.writer
            .lock()
            .map_err(|_| StateError::Poisoned("journal writer"))
    }
}

fn write_frame(
    writer: &mut BufWriter<File>,
    length: u32,
    crc: u32,
    payload: &[u8],
    sync_mode: SyncMode,
) -> io::Result<()> {
    writer.write_all(&length.to_le_bytes())?;
    writer.write_all(&crc.to_le_bytes())?;
    writer.write_all(payload)?;
    writer.flush()?;
    if sync_mode == SyncMode::EveryWrite {
        writer.get_ref().sync_all()?;
    }
    Ok(())
}

/// Intact blocks at the front of the file, where they end, and the file length.
fn read_intact(path: &Path) -> StateResult<(Vec<Block>, u64, u64)> {
    let mut file = BufReader::new(File::open(path)?);
    let file_len = file.get_ref().metadata()?.len();
    let mut blocks = Vec::new();
    let mut offset: u64 = 0;

    while offset < file_len {
        match read_frame(&mut file, offset, file_len)? {
            Some((block, frame_len)) => {
                blocks.push(block);
                offset += frame_len;
            }
            None => break,
        }
    }
    Ok((blocks, offset, file_len))
}

/// Decode the frame at `offset`. `Ok(None)` marks the start of a torn tail.
fn read_frame(
    file: &mut BufReader<File>,
    offset: u64,
    file_len: u64,
) -> StateResult<Option<(Block, u64)>> {
    if offset + HEADER_SIZE as u64 > file_len {
        warn!(offset, "truncated journal header");
        return Ok(None);
    }

    file.seek(SeekFrom::Start(offset))?;
    let mut header = [0u8; HEADER_SIZE];
    match file.read_exact(&mut header) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let length = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
    let expected_crc = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
    let frame_len = HEADER_SIZE as u64 + length as u64;

    if length == 0 || offset + frame_len > file_len {
        warn!(offset, length, file_len, "invalid journal frame length");
        return Ok(None);
    }

    let mut payload = vec![0u8; length as usize];
    match file.read_exact(&mut payload) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let actual_crc = crc32fast::hash(&payload);
    if actual_crc != expected_crc {
        warn!(offset, expected = expected_crc, actual = actual_crc, "journal CRC mismatch");
        return Ok(None);
    }

    match bincode::deserialize::<Block>(&payload) {
        Ok(block) => Ok(Some((block, frame_len))),
        Err(e) => {
            warn!(offset, error = %e, "undecodable journal frame");
            Ok(None)
        }
    }
}

impl std::fmt::Debug for Journal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Journal")
            .field("path", &self.path)
            .field("sync_mode", &self.sync_mode)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wsr_types::{TemporalAnchor, TxId};

    fn chain(n: u64) -> Vec<Block> {
        let mut prev = [0u8; 32];
        (1..=n)
            .map(|number| {
                let block = Block::seal(
                    number,
                    TxId::new(),
                    TemporalAnchor::new(1000 + number, 0, 1),
                    prev,
                    vec![(format!("k{number}"), Some(vec![number as u8]))],
                )
                .unwrap();
                prev = block.hash;
                block
            })
            .collect()
    }

    #[test]
    fn append_and_recover() {
        let dir = tempfile::tempdir().unwrap();
        let journal = Journal::open(&dir.path().join("j"), SyncMode::default()).unwrap();
        let blocks = chain(3);
        for block in &blocks {
            journal.append(block).unwrap();
        }

        let recovery = journal.recover().unwrap();
        assert_eq!(recovery.blocks, blocks);
        assert_eq!(recovery.discarded_bytes, 0);
    }

    #[test]
    fn recover_empty_journal() {
        let dir = tempfile::tempdir().unwrap();
        let journal = Journal::open(&dir.path().join("empty"), SyncMode::EveryWrite).unwrap();
        assert_eq!(journal.recover().unwrap(), Recovery::default());
    }

    #[test]
    fn append_returns_increasing_offsets() {
        let dir = tempfile::tempdir().unwrap();
        let journal = Journal::open(&dir.path().join("j"), SyncMode::default()).unwrap();
        let offsets: Vec<u64> = chain(3).iter().map(|b| journal.append(b).unwrap()).collect();
        assert_eq!(offsets[0], 0);
        assert!(offsets[1] > offsets[0]);
        assert!(offsets[2] > offsets[1]);
    }

    #[test]
    fn torn_tail_is_truncated_and_appends_continue() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tail");
        let blocks = chain(3);
        {
            let journal = Journal::open(&path, SyncMode::default()).unwrap();
            journal.append(&blocks[0]).unwrap();
            journal.append(&blocks[1]).unwrap();
            let total = journal.offset().unwrap();
            let file = OpenOptions::new().write(true).open(&path).unwrap();
            file.set_len(total - 4).unwrap();
        }

        let journal = Journal::open(&path, SyncMode::default()).unwrap();
        let recovery = journal.recover().unwrap();
        assert_eq!(recovery.blocks, vec![blocks[0].clone()]);
        assert!(recovery.discarded_bytes > 0);

        journal.append(&blocks[1]).unwrap();
        let again = journal.recover().unwrap();
        assert_eq!(again.blocks, blocks[..2].to_vec());
        assert_eq!(again.discarded_bytes, 0);
    }

    #[test]
    fn crc_mismatch_stops_recovery() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corrupt");
        let blocks = chain(2);
        {
            let journal = Journal::open(&path, SyncMode::default()).unwrap();
            journal.append(&blocks[0]).unwrap();
            let second = journal.append(&blocks[1]).unwrap();

            let mut file = OpenOptions::new().read(true).write(true).open(&path).unwrap();
            let at = second + HEADER_SIZE as u64;
            file.seek(SeekFrom::Start(at)).unwrap();
            let mut buf = [0u8; 1];
            file.read_exact(&mut buf).unwrap();
            buf[0] ^= 0xFF;
            file.seek(SeekFrom::Start(at)).unwrap();
            file.write_all(&buf).unwrap();
            file.sync_all().unwrap();
        }

        let journal = Journal::open(&path, SyncMode::default()).unwrap();
        let recovery = journal.recover().unwrap();
        assert_eq!(recovery.blocks, vec![blocks[0].clone()]);
        assert!(recovery.discarded_bytes > 0);
    }

    #[test]
    fn rolled_back_append_keeps_later_frames_recoverable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rollback");
        let blocks = chain(2);
        let journal = Journal::open(&path, SyncMode::default()).unwrap();
        journal.append(&blocks[0]).unwrap();
        {
            // Half a frame reached the file and more is still buffered.
            let mut w = journal.lock().unwrap();
            w.writer.write_all(&[0xAB; 5]).unwrap();
            w.writer.flush().unwrap();
            w.writer.write_all(&[0xCD; 3]).unwrap();
            journal.rollback(&mut w).unwrap();
        }
        journal.append(&blocks[1]).unwrap();
        drop(journal);

        let reopened = Journal::open(&path, SyncMode::default()).unwrap();
        let recovery = reopened.recover().unwrap();
        assert_eq!(recovery.blocks, blocks);
        assert_eq!(recovery.discarded_bytes, 0);
    }

    #[test]
    fn failed_journal_refuses_appends() {
        let dir = tempfile::tempdir().unwrap();
        let journal = Journal::open(&dir.path().join("j"), SyncMode::default()).unwrap();
        journal.lock().unwrap().failed = true;
        assert!(matches!(
            journal.append(&chain(1)[0]),
            Err(StateError::Poisoned(_))
        ));
    }

    #[test]
    fn read_only_leaves_torn_tail_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ro");
        let blocks = chain(2);
        let journal = Journal::open(&path, SyncMode::default()).unwrap();
        journal.append(&blocks[0]).unwrap();
        journal.append(&blocks[1]).unwrap();
        let total = journal.offset().unwrap();
        drop(journal);
        OpenOptions::new().write(true).open(&path).unwrap().set_len(total - 2).unwrap();

        let recovery = Journal::read_only(&path).unwrap();
        assert_eq!(recovery.blocks, vec![blocks[0].clone()]);
        assert!(recovery.discarded_bytes > 0);
        assert_eq!(fs::metadata(&path).unwrap().len(), total - 2);
    }
}
