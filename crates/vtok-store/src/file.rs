use std::collections::{BTreeMap, HashSet};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};
use vtok_types::Attributes;
use zeroize::Zeroize;

use crate::error::{StoreError, StoreResult};
use crate::key::StoreKey;
use crate::traits::ObjectStore;

/// File header identifying an object store log, version 1.
pub const MAGIC: &[u8; 8] = b"VTOKSTR1";

/// Frame header size: 4 bytes length + 4 bytes CRC.
const FRAME_HEADER_SIZE: u64 = 8;

/// Largest payload a frame may carry.
const MAX_FRAME: u32 = 16 * 1024 * 1024;

/// Flush strategy for store writes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SyncMode {
    /// `fsync` before every mutation returns.
    #[default]
    EveryWrite,
    /// Leave flushing to the OS page cache.
    OsDefault,
}

/// Configuration for [`FileObjectStore`].
#[derive(Clone, Debug, Default)]
pub struct StoreConfig {
    pub sync_mode: SyncMode,
}

/// Decoded log record.
#[derive(Deserialize)]
enum Record {
    Put { key: StoreKey, attributes: Attributes },
    Delete { key: StoreKey },
}

/// Borrowed form of [`Record`] used when writing, so attribute sets are not
/// cloned. Variant order must match `Record`.
#[derive(Serialize)]
enum RecordRef<'a> {
    Put {
        key: StoreKey,
        attributes: &'a Attributes,
    },
    Delete {
        key: StoreKey,
    },
}

#[derive(Debug)]
struct LogState {
    file: File,
    /// Length of the valid prefix of the file; the next record starts here.
    len: u64,
    live: HashSet<StoreKey>,
}

/// Object store backed by a single append-only record log.
///
/// On-disk format:
/// ```text
/// [8 bytes: magic "VTOKSTR1"]
/// repeated:
///   [4 bytes: payload length (little-endian u32)]
///   [4 bytes: CRC32 of payload (little-endian u32)]
///   [N bytes: payload (bincode Put { key, attributes } | Delete { key })]
/// ```
///
/// Replay applies records in order. An incomplete final frame is the trace
/// of an interrupted write and is dropped with a warning. A complete frame
/// whose checksum or payload is bad means the file is damaged and opening
/// fails with [`StoreError::Corrupt`]. So does a frame whose length is over
/// the frame limit, or runs past EOF while a complete frame follows it.
#[derive(Debug)]
pub struct FileObjectStore {
    path: PathBuf,
    config: StoreConfig,
    state: Mutex<LogState>,
}

impl FileObjectStore {
    /// Open (or create) the store log at `path`.
    ///
    /// Opening an existing valid store does not change its content, so this
    /// is safe to retry. Every failure is reported as [`StoreError::Init`].
    pub fn open(path: impl AsRef<Path>, config: StoreConfig) -> StoreResult<Self> {
        let path = path.as_ref();
        Self::open_inner(path, config).map_err(|e| StoreError::init(path, e))
    }

    fn open_inner(path: &Path, config: StoreConfig) -> StoreResult<Self> {
        fs::create_dir_all(parent_dir(path))?;
        if !path.exists() {
            create_empty(path)?;
        }

        let replay = replay(path)?;
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        if replay.end < replay.file_len {
            file.set_len(replay.end)?;
            file.sync_all()?;
        }

        info!(
            path = %path.display(),
            objects = replay.entries.len(),
            "object store opened"
        );
        Ok(Self {
            path: path.to_path_buf(),
            config,
            state: Mutex::new(LogState {
                file,
                len: replay.end,
                live: replay.entries.into_keys().collect(),
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Current size of the log in bytes.
    pub fn log_size(&self) -> u64 {
        self.lock().len
    }

    /// Rewrite the log so it holds exactly one `Put` per live entry.
    ///
    /// The new log is written to a temporary file in the same directory and
    /// renamed over the old one, so a crash leaves either the old or the new
    /// log in place. Returns the number of bytes reclaimed.
    pub fn compact(&self) -> StoreResult<u64> {
        let mut state = self.lock();
        let replay = replay(&self.path)?;

        let mut tmp = NamedTempFile::new_in(parent_dir(&self.path))?;
        tmp.write_all(MAGIC)?;
        let mut len = MAGIC.len() as u64;
        for (key, attributes) in &replay.entries {
            let mut frame = encode_frame(&RecordRef::Put {
                key: *key,
                attributes,
            })?;
            let written = tmp.write_all(&frame);
            len += frame.len() as u64;
            frame.zeroize();
            written?;
        }
        tmp.as_file().sync_all()?;
        let file = tmp.persist(&self.path).map_err(|e| StoreError::Io(e.error))?;

        let reclaimed = state.len.saturating_sub(len);
        state.file = file;
        state.len = len;
        info!(
            path = %self.path.display(),
            objects = replay.entries.len(),
            reclaimed,
            "object store compacted"
        );
        Ok(reclaimed)
    }

    fn lock(&self) -> MutexGuard<'_, LogState> {
        self.state.lock().expect("store mutex poisoned")
    }

    /// Append one record. On failure the file is cut back to its previous
    /// length so committed records stay intact.
    fn append(&self, state: &mut LogState, record: &RecordRef<'_>) -> StoreResult<()> {
        let mut frame = encode_frame(record)?;
        let start = state.len;
        let result = write_frame(&mut state.file, start, &frame, self.config.sync_mode);
        let written = frame.len() as u64;
        frame.zeroize();

        match result {
            Ok(()) => {
                state.len = start + written;
                Ok(())
            }
            Err(err) => {
                if let Err(rollback) = state.file.set_len(start) {
                    warn!(
                        path = %self.path.display(),
                        offset = start,
                        error = %rollback,
                        "failed to roll back partial record"
                    );
                }
                Err(err.into())
            }
        }
    }
}

impl ObjectStore for FileObjectStore {
    fn load_all(&self) -> StoreResult<Vec<(StoreKey, Attributes)>> {
        let _state = self.lock();
        Ok(replay(&self.path)?.entries.into_iter().collect())
    }

    fn insert(&self, attributes: &Attributes) -> StoreResult<StoreKey> {
        let key = StoreKey::new();
        let mut state = self.lock();
        self.append(&mut state, &RecordRef::Put { key, attributes })?;
        state.live.insert(key);
        debug!(key = %key.short_id(), "store insert");
        Ok(key)
    }

    fn update(&self, key: &StoreKey, attributes: &Attributes) -> StoreResult<()> {
        let mut state = self.lock();
        if !state.live.contains(key) {
            return Err(StoreError::NotFound(*key));
        }
        self.append(&mut state, &RecordRef::Put { key: *key, attributes })?;
        debug!(key = %key.short_id(), "store update");
        Ok(())
    }

    fn delete(&self, key: &StoreKey) -> StoreResult<()> {
        let mut state = self.lock();
        if !state.live.contains(key) {
            return Err(StoreError::NotFound(*key));
        }
        self.append(&mut state, &RecordRef::Delete { key: *key })?;
        state.live.remove(key);
        debug!(key = %key.short_id(), "store delete");
        Ok(())
    }

    fn len(&self) -> usize {
        self.lock().live.len()
    }

    fn is_durable(&self) -> bool {
        true
    }

    fn location(&self) -> Option<&Path> {
        Some(&self.path)
    }
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// Create a log holding only the header. The header is written to a
/// temporary file first so a crash never leaves a half-written header.
fn create_empty(path: &Path) -> StoreResult<()> {
    let mut tmp = NamedTempFile::new_in(parent_dir(path))?;
    tmp.write_all(MAGIC)?;
    tmp.as_file().sync_all()?;
    match tmp.persist_noclobber(path) {
        Ok(_) => {
            debug!(path = %path.display(), "created object store log");
            Ok(())
        }
        // Another opener created it first.
        Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => Ok(()),
        Err(e) => Err(StoreError::Io(e.error)),
    }
}

fn encode_frame(record: &RecordRef<'_>) -> StoreResult<Vec<u8>> {
    let mut payload =
        bincode::serialize(record).map_err(|e| StoreError::Serialization(e.to_string()))?;
    let length = match u32::try_from(payload.len()) {
        Ok(length) if length <= MAX_FRAME => length,
        _ => {
            let size = payload.len();
            payload.zeroize();
            return Err(StoreError::Serialization(format!(
                "record of {size} bytes exceeds the frame limit"
            )));
        }
    };

    let mut frame = Vec::with_capacity(FRAME_HEADER_SIZE as usize + payload.len());
    frame.extend_from_slice(&length.to_le_bytes());
    frame.extend_from_slice(&crc32fast::hash(&payload).to_le_bytes());
    frame.extend_from_slice(&payload);
    payload.zeroize();
    Ok(frame)
}

fn write_frame(file: &mut File, offset: u64, frame: &[u8], sync_mode: SyncMode) -> io::Result<()> {
    file.seek(SeekFrom::Start(offset))?;
    file.write_all(frame)?;
    if sync_mode == SyncMode::EveryWrite {
        file.sync_data()?;
    }
    Ok(())
}

struct Replay {
    entries: BTreeMap<StoreKey, Attributes>,
    /// End of the last complete record.
    end: u64,
    file_len: u64,
}

fn replay(path: &Path) -> StoreResult<Replay> {
    let file = File::open(path)?;
    let file_len = file.metadata()?.len();
    let mut reader = BufReader::new(file);

    if file_len < MAGIC.len() as u64 {
        return Err(StoreError::Format(format!(
            "{file_len} bytes is too short for a store header"
        )));
    }
    let mut magic = [0u8; 8];
    reader.read_exact(&mut magic)?;
    if &magic != MAGIC {
        return Err(StoreError::Format(format!(
            "bad magic {}",
            String::from_utf8_lossy(&magic)
        )));
    }

    let mut entries = BTreeMap::new();
    let mut offset = MAGIC.len() as u64;
    while offset + FRAME_HEADER_SIZE <= file_len {
        let mut header = [0u8; FRAME_HEADER_SIZE as usize];
        reader.read_exact(&mut header)?;
        let length = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
        let expected_crc = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);

        if length > MAX_FRAME {
            return Err(StoreError::Corrupt {
                offset,
                reason: format!("frame length {length} exceeds the frame limit"),
            });
        }

        let end = offset + FRAME_HEADER_SIZE + u64::from(length);
        if end > file_len {
            // Only the last frame can be torn.
            let mut tail = Vec::new();
            reader.read_to_end(&mut tail)?;
            let followed = contains_complete_frame(&tail);
            tail.zeroize();
            if followed {
                return Err(StoreError::Corrupt {
                    offset,
                    reason: format!("frame length {length} runs past a later record"),
                });
            }
            break;
        }

        let mut payload = vec![0u8; length as usize];
        reader.read_exact(&mut payload)?;
        if crc32fast::hash(&payload) != expected_crc {
            payload.zeroize();
            return Err(StoreError::Corrupt {
                offset,
                reason: "checksum mismatch".into(),
            });
        }
        let decoded = bincode::deserialize::<Record>(&payload);
        payload.zeroize();
        match decoded {
            Ok(Record::Put { key, attributes }) => {
                entries.insert(key, attributes);
            }
            Ok(Record::Delete { key }) => {
                entries.remove(&key);
            }
            Err(e) => {
                return Err(StoreError::Corrupt {
                    offset,
                    reason: e.to_string(),
                })
            }
        }
        offset = end;
    }

    if offset < file_len {
        warn!(
            path = %path.display(),
            offset,
            file_len,
            "ignoring torn record at end of object store"
        );
    }
    Ok(Replay {
        entries,
        end: offset,
        file_len,
    })
}

/// Whether a checksum-valid frame starts anywhere after the first byte of
/// `tail`.
fn contains_complete_frame(tail: &[u8]) -> bool {
    let header = FRAME_HEADER_SIZE as usize;
    (1..tail.len()).any(|start| {
        let Some(bytes) = tail.get(start..start + header) else {
            return false;
        };
        let length = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let crc = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        if length == 0 || length > MAX_FRAME {
            return false;
        }
        let body = start + header;
        tail.get(body..body + length as usize)
            .is_some_and(|payload| crc32fast::hash(payload) == crc)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use vtok_types::{AttributeType, ObjectClass};

    fn data(label: &str) -> Attributes {
        Attributes::new()
            .with(AttributeType::CLASS, ObjectClass::Data)
            .with(AttributeType::TOKEN, true)
            .with(AttributeType::LABEL, label)
            .with(AttributeType::VALUE, vec![0xA5u8; 40])
    }

    fn open(path: &Path) -> FileObjectStore {
        FileObjectStore::open(path, StoreConfig::default()).unwrap()
    }

    fn open_err(path: &Path) -> StoreError {
        match FileObjectStore::open(path, StoreConfig::default()) {
            Ok(_) => panic!("open should fail for {}", path.display()),
            Err(e) => e,
        }
    }

    // -----------------------------------------------------------------------
    // Init
    // -----------------------------------------------------------------------
    #[test]
    fn open_creates_header_only_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/token/objects.log");
        let store = open(&path);
        assert!(store.is_durable());
        assert_eq!(store.location(), Some(path.as_path()));
        assert!(store.is_empty());
        assert_eq!(fs::read(&path).unwrap(), MAGIC.to_vec());
    }

    #[test]
    fn reopen_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("objects.log");
        let store = open(&path);
        store.insert(&data("a")).unwrap();
        drop(store);

        let before = fs::read(&path).unwrap();
        let again = open(&path);
        drop(again);
        assert_eq!(fs::read(&path).unwrap(), before);
    }

    #[test]
    fn bad_magic_is_format_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("objects.log");
        fs::write(&path, b"NOTASTORE-FILE").unwrap();
        match open_err(&path) {
            StoreError::Init { source, .. } => {
                assert!(matches!(*source, StoreError::Format(_)))
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unwritable_location_fails_with_init() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("plain-file");
        fs::write(&blocker, b"x").unwrap();
        let err = open_err(&blocker.join("objects.log"));
        assert!(matches!(err, StoreError::Init { .. }));
    }

    // -----------------------------------------------------------------------
    // Mutations survive reopen
    // -----------------------------------------------------------------------
    #[test]
    fn mutations_round_trip_through_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("objects.log");
        let store = open(&path);
        let a = store.insert(&data("a")).unwrap();
        let b = store.insert(&data("b")).unwrap();
        let c = store.insert(&data("c")).unwrap();
        store.update(&b, &data("b2")).unwrap();
        store.delete(&c).unwrap();
        drop(store);

        let store = open(&path);
        assert_eq!(store.len(), 2);
        let all = store.load_all().unwrap();
        assert_eq!(all, vec![(a, data("a")), (b, data("b2"))]);
    }

    #[test]
    fn missing_keys_are_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(&dir.path().join("objects.log"));
        let key = store.insert(&data("a")).unwrap();
        store.delete(&key).unwrap();
        assert!(matches!(store.delete(&key), Err(StoreError::NotFound(_))));
        assert!(matches!(store.update(&key, &data("a")), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn os_default_sync_mode_still_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("objects.log");
        let config = StoreConfig {
            sync_mode: SyncMode::OsDefault,
        };
        let store = FileObjectStore::open(&path, config).unwrap();
        store.insert(&data("a")).unwrap();
        drop(store);
        assert_eq!(open(&path).len(), 1);
    }

    // -----------------------------------------------------------------------
    // Recovery
    // -----------------------------------------------------------------------
    #[test]
    fn torn_tail_is_dropped_and_log_stays_appendable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("objects.log");
        let store = open(&path);
        let a = store.insert(&data("a")).unwrap();
        store.insert(&data("b")).unwrap();
        let total = store.log_size();
        drop(store);

        let file = OpenOptions::new().write(true).open(&path).unwrap();
        file.set_len(total - 3).unwrap();
        drop(file);

        let store = open(&path);
        assert_eq!(store.load_all().unwrap(), vec![(a, data("a"))]);
        let c = store.insert(&data("c")).unwrap();
        drop(store);

        let keys: Vec<StoreKey> = open(&path)
            .load_all()
            .unwrap()
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(keys, vec![a, c]);
    }

    #[test]
    fn checksum_mismatch_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("objects.log");
        let store = open(&path);
        store.insert(&data("a")).unwrap();
        store.insert(&data("b")).unwrap();
        drop(store);

        // First payload byte of the first record.
        let target = MAGIC.len() as u64 + FRAME_HEADER_SIZE;
        let mut file = OpenOptions::new().read(true).write(true).open(&path).unwrap();
        file.seek(SeekFrom::Start(target)).unwrap();
        let mut byte = [0u8; 1];
        file.read_exact(&mut byte).unwrap();
        byte[0] ^= 0xFF;
        file.seek(SeekFrom::Start(target)).unwrap();
        file.write_all(&byte).unwrap();
        file.sync_all().unwrap();
        drop(file);

        match open_err(&path) {
            StoreError::Init { source, .. } => match *source {
                StoreError::Corrupt { offset, .. } => assert_eq!(offset, MAGIC.len() as u64),
                other => panic!("unexpected source: {other}"),
            },
            other => panic!("unexpected error: {other}"),
        }
    }

    fn set_first_frame_length(path: &Path, length: u32) {
        let mut file = OpenOptions::new().write(true).open(path).unwrap();
        file.seek(SeekFrom::Start(MAGIC.len() as u64)).unwrap();
        file.write_all(&length.to_le_bytes()).unwrap();
        file.sync_all().unwrap();
    }

    fn assert_corrupt_at_first_frame(path: &Path) {
        match open_err(path) {
            StoreError::Init { source, .. } => match *source {
                StoreError::Corrupt { offset, .. } => assert_eq!(offset, MAGIC.len() as u64),
                other => panic!("unexpected source: {other}"),
            },
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn damaged_length_before_later_records_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("objects.log");
        let store = open(&path);
        for label in ["a", "b", "c"] {
            store.insert(&data(label)).unwrap();
        }
        let total = store.log_size();
        drop(store);

        // Points just past EOF, but records b and c follow the real frame.
        let past_eof = (total - MAGIC.len() as u64) as u32;
        set_first_frame_length(&path, past_eof);
        assert_corrupt_at_first_frame(&path);
        assert_eq!(fs::metadata(&path).unwrap().len(), total);
    }

    #[test]
    fn oversized_frame_length_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("objects.log");
        let store = open(&path);
        for label in ["a", "b", "c"] {
            store.insert(&data(label)).unwrap();
        }
        let total = store.log_size();
        drop(store);

        set_first_frame_length(&path, 0x4000_0000);
        assert_corrupt_at_first_frame(&path);
        assert_eq!(fs::metadata(&path).unwrap().len(), total);
    }

    // -----------------------------------------------------------------------
    // Compaction
    // -----------------------------------------------------------------------
    #[test]
    fn compact_preserves_live_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("objects.log");
        let store = open(&path);
        let keep = store.insert(&data("keep")).unwrap();
        for i in 0..5 {
            let key = store.insert(&data(&format!("tmp{i}"))).unwrap();
            store.delete(&key).unwrap();
        }
        store.update(&keep, &data("kept")).unwrap();

        let before = store.log_size();
        let reclaimed = store.compact().unwrap();
        assert!(reclaimed > 0);
        assert_eq!(store.log_size(), before - reclaimed);
        assert_eq!(store.load_all().unwrap(), vec![(keep, data("kept"))]);

        let later = store.insert(&data("later")).unwrap();
        drop(store);
        let store = open(&path);
        assert_eq!(store.len(), 2);
        assert_eq!(
            store.load_all().unwrap(),
            vec![(keep, data("kept")), (later, data("later"))]
        );
    }
}
