use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tfm_types::{MetricsRecord, RecordKey};
use tracing::{debug, error, info, warn};

use crate::config::{StoreConfig, SyncMode};
use crate::error::{StoreError, StoreResult};
use crate::item::{self, Item};
use crate::traits::MetricsStore;

/// Header size: 4 bytes length + 4 bytes CRC.
const HEADER_SIZE: usize = 8;

/// Upper bound on a single frame's payload. Items are a few hundred bytes;
/// anything larger is a corrupt length field.
const MAX_FRAME_LEN: u32 = 1024 * 1024;

/// Mutable state: the append handle and the live index.
struct JournalState {
    file: File,
    /// Length of the journal up to the end of the last durable frame.
    committed_len: u64,
    index: HashMap<RecordKey, Item>,
    /// Valid frames currently in the journal file, live or superseded.
    frames: u64,
    /// A failed write could not be rolled back; the file may hold a frame
    /// the index does not reflect.
    stranded: bool,
}

/// Durable metrics table backed by an append-only journal.
///
/// Each `put` appends one frame:
/// ```text
/// [4 bytes: payload length (little-endian u32)]
/// [4 bytes: CRC32 of payload (little-endian u32)]
/// [N bytes: payload (JSON-encoded item)]
/// ```
/// On open the journal is replayed front to back into an in-memory index;
/// the last frame per key wins, which gives upsert semantics.
///
/// Damaged regions (bad length, bad CRC) are skipped by searching forward
/// for the next frame whose CRC checks out, so one corrupt frame never hides
/// the frames after it. Only a torn frame at the very end of the file, one
/// whose declared length runs past end-of-file with no valid frame after it,
/// is truncated away. Other damage is left on disk.
///
/// A `put` that fails is cut back out of the file before the error is
/// returned, so a reported failure never reappears on replay.
pub struct JournalMetricsStore {
    path: PathBuf,
    table_name: String,
    region: String,
    sync_mode: SyncMode,
    state: Mutex<JournalState>,
}

impl JournalMetricsStore {
    /// Open (or create) the table described by `config` in `region`.
    pub fn open(config: &StoreConfig, region: &str) -> StoreResult<Self> {
        let path = config.journal_path(region);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)?;

        let replay = replay(&path)?;
        let mut committed_len = file.metadata()?.len();
        match replay.tail {
            Tail::Clean => {}
            Tail::Torn { offset } => {
                warn!(
                    path = %path.display(),
                    offset,
                    file_len = committed_len,
                    "truncating torn journal tail"
                );
                file.set_len(offset)?;
                committed_len = offset;
            }
            Tail::Damaged { offset } => {
                warn!(
                    path = %path.display(),
                    offset,
                    file_len = committed_len,
                    "unreadable bytes at journal tail left in place"
                );
            }
        }

        info!(
            table = %config.table_name,
            region,
            items = replay.index.len(),
            frames = replay.frames,
            skipped_bytes = replay.skipped_bytes,
            "metrics table opened"
        );

        Ok(Self {
            path,
            table_name: config.table_name.clone(),
            region: region.to_string(),
            sync_mode: config.sync_mode,
            state: Mutex::new(JournalState {
                file,
                committed_len,
                index: replay.index,
                frames: replay.frames,
                stranded: false,
            }),
        })
    }

    /// Path of the journal file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// Number of live items.
    pub fn len(&self) -> StoreResult<usize> {
        let state = self.state.lock().map_err(|_| StoreError::LockPoisoned)?;
        Ok(state.index.len())
    }

    /// Returns `true` if the table holds no items.
    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Number of valid frames in the journal, including superseded writes.
    pub fn frame_count(&self) -> StoreResult<u64> {
        let state = self.state.lock().map_err(|_| StoreError::LockPoisoned)?;
        Ok(state.frames)
    }

    /// Read the record stored at `key`.
    pub fn get(&self, key: &RecordKey) -> StoreResult<Option<MetricsRecord>> {
        let state = self.state.lock().map_err(|_| StoreError::LockPoisoned)?;
        state.index.get(key).map(item::from_item).transpose()
    }

    /// All records, sorted by key.
    pub fn records(&self) -> StoreResult<Vec<MetricsRecord>> {
        let state = self.state.lock().map_err(|_| StoreError::LockPoisoned)?;
        let mut keys: Vec<&RecordKey> = state.index.keys().collect();
        keys.sort();
        keys.into_iter()
            .map(|key| item::from_item(&state.index[key]))
            .collect()
    }

    /// Rewrite the journal with exactly one frame per live item.
    ///
    /// The compacted journal is written to a sibling file, synced, and then
    /// renamed over the current one. The handle to the new file is opened
    /// before the rename, so once the rename succeeds later writes always
    /// land in the live journal. Returns the number of frames dropped.
    pub fn compact(&self) -> StoreResult<u64> {
        let mut state = self.state.lock().map_err(|_| StoreError::LockPoisoned)?;

        let tmp_path = self.path.with_extension("journal.compact");
        match fs::remove_file(&tmp_path) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => return Err(e.into()),
            _ => {}
        }

        let mut compacted = Vec::new();
        let mut keys: Vec<&RecordKey> = state.index.keys().collect();
        keys.sort();
        for key in keys {
            compacted.extend_from_slice(&encode_frame(&state.index[key])?);
        }

        let mut file = OpenOptions::new()
            .create_new(true)
            .read(true)
            .append(true)
            .open(&tmp_path)?;
        let written = file
            .write_all(&compacted)
            .and_then(|()| file.sync_all())
            .and_then(|()| fs::rename(&tmp_path, &self.path));
        if let Err(e) = written {
            if let Err(cleanup) = fs::remove_file(&tmp_path) {
                warn!(path = %tmp_path.display(), error = %cleanup, "failed to remove compaction file");
            }
            return Err(e.into());
        }

        let live = state.index.len() as u64;
        let dropped = state.frames.saturating_sub(live);
        state.file = file;
        state.committed_len = compacted.len() as u64;
        state.frames = live;
        state.stranded = false;

        info!(table = %self.table_name, live, dropped, "journal compacted");
        Ok(dropped)
    }
}

impl MetricsStore for JournalMetricsStore {
    fn put(&self, record: &MetricsRecord) -> StoreResult<()> {
        let key = record.key();
        let encoded = item::to_item(record);
        let frame = encode_frame(&encoded)?;

        let mut state = self.state.lock().map_err(|_| StoreError::LockPoisoned)?;
        if state.stranded {
            return Err(StoreError::Unavailable(format!(
                "journal {} holds an unreverted failed write; reopen the table",
                self.path.display()
            )));
        }

        let committed_len = state.committed_len;
        if let Err(failure) = append_frame(&mut state.file, committed_len, &frame, self.sync_mode) {
            if !failure.rolled_back {
                error!(
                    table = %self.table_name,
                    path = %self.path.display(),
                    "failed write could not be reverted; refusing further writes"
                );
                state.stranded = true;
            }
            return Err(failure.source.into());
        }

        // The index only changes once the frame is in the file.
        let replaced = state.index.insert(key, encoded).is_some();
        state.committed_len += frame.len() as u64;
        state.frames += 1;

        debug!(
            table = %self.table_name,
            bucket = %record.bucket_name,
            key = %record.file_key,
            len = frame.len() - HEADER_SIZE,
            replaced,
            "journal put"
        );
        Ok(())
    }
}

impl std::fmt::Debug for JournalMetricsStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut out = f.debug_struct("JournalMetricsStore");
        out.field("path", &self.path)
            .field("table_name", &self.table_name)
            .field("region", &self.region);
        match self.len() {
            Ok(count) => out.field("item_count", &count),
            Err(_) => out.field("item_count", &"<poisoned>"),
        };
        out.finish()
    }
}

/// Encode one item as a complete frame (header and payload).
fn encode_frame(item: &Item) -> StoreResult<Vec<u8>> {
    let payload =
        serde_json::to_vec(item).map_err(|e| StoreError::Serialization(e.to_string()))?;
    let length = u32::try_from(payload.len())
        .ok()
        .filter(|len| *len <= MAX_FRAME_LEN)
        .ok_or_else(|| StoreError::Serialization(format!("item too large: {} bytes", payload.len())))?;
    let crc = crc32fast::hash(&payload);

    let mut frame = Vec::with_capacity(HEADER_SIZE + payload.len());
    frame.extend_from_slice(&length.to_le_bytes());
    frame.extend_from_slice(&crc.to_le_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

/// File operations an append needs besides [`Write`].
trait JournalFile: Write {
    fn set_len(&self, len: u64) -> io::Result<()>;
    fn sync_all(&self) -> io::Result<()>;
}

impl JournalFile for File {
    fn set_len(&self, len: u64) -> io::Result<()> {
        File::set_len(self, len)
    }

    fn sync_all(&self) -> io::Result<()> {
        File::sync_all(self)
    }
}

/// A failed append.
struct AppendFailure {
    source: io::Error,
    /// The file was cut back to its committed length.
    rolled_back: bool,
}

/// Append `frame` to an append-mode `file` whose durable content ends at
/// `committed_len`.
///
/// Writes are unbuffered, so nothing of a failed frame is left in memory to
/// reach the file later. On failure the file is truncated back to
/// `committed_len`.
fn append_frame<F: JournalFile>(
    file: &mut F,
    committed_len: u64,
    frame: &[u8],
    sync_mode: SyncMode,
) -> Result<(), AppendFailure> {
    let written = file.write_all(frame).and_then(|()| file.flush()).and_then(|()| {
        if sync_mode == SyncMode::EveryWrite {
            file.sync_all()
        } else {
            Ok(())
        }
    });
    let Err(source) = written else {
        return Ok(());
    };

    let rolled_back = match file.set_len(committed_len) {
        Ok(()) => true,
        Err(e) => {
            warn!(committed_len, error = %e, "failed to revert partial journal write");
            false
        }
    };
    Err(AppendFailure {
        source,
        rolled_back,
    })
}

/// What follows the last readable frame.
#[derive(Debug, PartialEq, Eq)]
enum Tail {
    /// The file ends exactly after a frame.
    Clean,
    /// A frame starting at `offset` runs past end-of-file.
    Torn { offset: u64 },
    /// Bytes from `offset` on hold no valid frame and are not a torn write.
    Damaged { offset: u64 },
}

/// Outcome of replaying a journal file.
struct Replay {
    index: HashMap<RecordKey, Item>,
    frames: u64,
    /// Bytes skipped over while resynchronizing past damaged regions.
    skipped_bytes: u64,
    tail: Tail,
}

/// A frame as read at some offset.
enum Frame {
    /// Header and CRC check out.
    Valid(Vec<u8>),
    /// The header or the declared payload extends past end-of-file.
    Torn,
    /// Impossible length or CRC mismatch.
    Invalid,
}

fn read_frame_at<R: Read + Seek>(reader: &mut R, offset: u64, file_len: u64) -> io::Result<Frame> {
    if offset + HEADER_SIZE as u64 > file_len {
        return Ok(Frame::Torn);
    }
    reader.seek(SeekFrom::Start(offset))?;
    let mut header = [0u8; HEADER_SIZE];
    reader.read_exact(&mut header)?;
    let length = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
    let expected = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);

    if length == 0 || length > MAX_FRAME_LEN {
        return Ok(Frame::Invalid);
    }
    if offset + (HEADER_SIZE as u64) + u64::from(length) > file_len {
        return Ok(Frame::Torn);
    }

    let mut payload = vec![0u8; length as usize];
    reader.read_exact(&mut payload)?;
    if crc32fast::hash(&payload) != expected {
        return Ok(Frame::Invalid);
    }
    Ok(Frame::Valid(payload))
}

/// Offset of the first valid frame at or after `from`, if any.
fn next_valid_frame<R: Read + Seek>(reader: &mut R, from: u64, file_len: u64) -> io::Result<Option<u64>> {
    let mut offset = from;
    while offset + HEADER_SIZE as u64 <= file_len {
        if let Frame::Valid(_) = read_frame_at(reader, offset, file_len)? {
            return Ok(Some(offset));
        }
        offset += 1;
    }
    Ok(None)
}

fn replay(path: &Path) -> StoreResult<Replay> {
    let mut reader = BufReader::new(File::open(path)?);
    let file_len = reader.get_ref().metadata()?.len();
    let mut index = HashMap::new();
    let mut frames = 0u64;
    let mut skipped_bytes = 0u64;
    let mut offset = 0u64;
    let mut tail = Tail::Clean;

    while offset < file_len {
        let payload = match read_frame_at(&mut reader, offset, file_len)? {
            Frame::Valid(payload) => payload,
            damaged => {
                match next_valid_frame(&mut reader, offset + 1, file_len)? {
                    Some(next) => {
                        warn!(offset, skipped = next - offset, "damaged journal region; resuming at next valid frame");
                        skipped_bytes += next - offset;
                        offset = next;
                        continue;
                    }
                    None => {
                        tail = match damaged {
                            Frame::Torn => Tail::Torn { offset },
                            _ => Tail::Damaged { offset },
                        };
                        break;
                    }
                }
            }
        };
        let frame_offset = offset;
        offset += (HEADER_SIZE + payload.len()) as u64;
        frames += 1;

        let decoded: Item = match serde_json::from_slice(&payload) {
            Ok(item) => item,
            Err(e) => {
                warn!(offset = frame_offset, error = %e, "undecodable journal frame; skipping");
                continue;
            }
        };
        match item::key_of(&decoded) {
            Ok(key) => {
                index.insert(key, decoded);
            }
            Err(e) => {
                warn!(offset = frame_offset, error = %e, "journal frame without key; skipping");
            }
        }
    }

    debug!(path = %path.display(), frames, items = index.len(), ?tail, "journal replay complete");
    Ok(Replay {
        index,
        frames,
        skipped_bytes,
        tail,
    })
}
