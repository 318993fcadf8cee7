//! # Stack Manager
//!
//! The store proper: a bounded, persistent LIFO over a [`ScopedFs`].
//!
//! ## Files Are Truth
//!
//! There is no index, no metadata sidecar and no in-memory cache. The
//! content files under `history/` *are* the store; every list walks the
//! directory, parses filenames back into timestamps and rebuilds item
//! descriptors from the bytes on disk. Files whose names do not parse are
//! someone else's: listing, eviction and clear all leave them alone.
//!
//! ## Ordering
//!
//! Filenames encode the push instant with microsecond resolution. Within a
//! process the manager bumps the clock forward by one microsecond whenever
//! it fails to advance on its own, so two pushes can never collide and
//! listing order always matches reverse push order.
//!
//! ## Cost Model
//!
//! Listing re-reads every content file to recover size, fingerprint and
//! title. The bound keeps the store at a few dozen files, so the re-read
//! stays cheap, and deriving everything from content means external edits
//! are always reflected.

use std::io::Read;
use std::path::PathBuf;

use chrono::{DateTime, Duration, FixedOffset, Local, Timelike};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::content::{generate_title, is_binary, sanitize, truncate_title};
use crate::error::{RemError, Result};
use crate::fs::{ContentStream, DiskFs, ScopedFs};
use crate::migrate;
use crate::model::{
    format_timestamp, parse_timestamp, Item, CONTENT_FILE_EXT, MAX_STACK_SIZE, MAX_TITLE_LEN,
    SAMPLE_BYTES, STORE_DIR,
};

/// Bounded LIFO stack of content blobs. Newest item is index 0.
pub struct StackManager<F: ScopedFs> {
    fs: F,
    max_size: usize,
    last_timestamp: Option<DateTime<FixedOffset>>,
}

impl StackManager<DiskFs> {
    /// Open the store at the default location (`$HOME/.config/rem`),
    /// running the legacy migration first.
    pub fn open_default() -> Result<Self> {
        Self::open_at("")
    }

    /// Open the store rooted at `location` (see [`DiskFs::with_root`]).
    /// Migration runs only when `location` selects the default root.
    pub fn open_at(location: &str) -> Result<Self> {
        let fs = DiskFs::with_root(location)?;
        if fs.is_default_root() {
            migrate::migrate_legacy(&fs)?;
        }
        Self::with_fs(fs)
    }
}

impl<F: ScopedFs> StackManager<F> {
    /// Build a manager over an existing filesystem. No migration runs;
    /// the content directory is created if missing.
    pub fn with_fs(fs: F) -> Result<Self> {
        fs.mkdir_all(STORE_DIR, 0o755)?;
        Ok(Self {
            fs,
            max_size: MAX_STACK_SIZE,
            last_timestamp: None,
        })
    }

    /// Adjust the stack bound. Takes effect on the next push.
    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Push a new item onto the stack.
    ///
    /// The source is read to exhaustion; an empty source is rejected with
    /// [`RemError::EmptyContent`] and leaves no file behind. A non-empty
    /// `title` overrides the derived title for text content; binary
    /// content always gets the binary sentinel. Returns the descriptor of
    /// the committed item after eviction has restored the bound.
    pub fn push<R: Read>(&mut self, mut source: R, title: Option<&str>) -> Result<Item> {
        let timestamp = self.next_timestamp();
        let id = format_timestamp(&timestamp);

        // The filesystem contract is whole-file write, so the payload is
        // buffered while the digest runs over it.
        let mut payload = Vec::new();
        let mut hasher = Sha256::new();
        let mut chunk = [0u8; 8192];
        loop {
            let n = source.read(&mut chunk)?;
            if n == 0 {
                break;
            }
            hasher.update(&chunk[..n]);
            payload.extend_from_slice(&chunk[..n]);
        }

        if payload.is_empty() {
            return Err(RemError::EmptyContent);
        }

        let sample = &payload[..payload.len().min(SAMPLE_BYTES)];
        let binary = is_binary(sample);
        let title = match title.map(sanitize) {
            Some(t) if !binary && !t.is_empty() => t,
            _ => generate_title(sample, binary),
        };
        let title = truncate_title(&title, MAX_TITLE_LEN);

        self.fs.write_file(&content_path(&id), &payload, 0o644)?;
        self.last_timestamp = Some(timestamp);
        self.evict()?;

        Ok(Item {
            timestamp,
            id,
            title,
            size: payload.len() as u64,
            is_binary: binary,
            sha256: hex::encode(hasher.finalize()),
        })
    }

    /// All items, newest first. Ties (identical instants from different
    /// processes) order by filename for stability.
    pub fn list(&self) -> Result<Vec<Item>> {
        let entries = match self.fs.read_dir(STORE_DIR) {
            Ok(entries) => entries,
            Err(RemError::NotFound(_)) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut items = Vec::new();
        for entry in entries {
            if entry.is_dir {
                continue;
            }
            let Some(stem) = entry.name.strip_suffix(CONTENT_FILE_EXT) else {
                continue;
            };
            let Some(timestamp) = parse_timestamp(stem) else {
                continue;
            };
            // Unreadable files are skipped rather than failing the whole
            // listing; the store stays usable around stray damage.
            if let Ok(item) = self.read_item(stem, timestamp) {
                items.push(item);
            }
        }

        items.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| a.id.cmp(&b.id)));
        Ok(items)
    }

    /// Item at `index`, 0 being the newest.
    pub fn get(&self, index: usize) -> Result<Item> {
        let mut items = self.list()?;
        let len = items.len();
        if index >= len {
            return Err(RemError::OutOfRange { index, len });
        }
        Ok(items.swap_remove(index))
    }

    /// Open an item's content for reading. The stream is owned by the
    /// caller and closes on drop.
    pub fn get_content(&self, id: &str) -> Result<Box<dyn ContentStream>> {
        if parse_timestamp(id).is_none() {
            return Err(RemError::NotFound(id.to_string()));
        }
        self.fs.open(&content_path(id))
    }

    /// Absolute path of an item's content file, for handing to external
    /// programs. The file itself is not checked.
    pub fn item_path(&self, id: &str) -> Result<PathBuf> {
        if parse_timestamp(id).is_none() {
            return Err(RemError::NotFound(id.to_string()));
        }
        Ok(self
            .fs
            .root()
            .join(STORE_DIR)
            .join(format!("{}{}", id, CONTENT_FILE_EXT)))
    }

    /// Remove the item at `index`.
    pub fn delete(&mut self, index: usize) -> Result<()> {
        let item = self.get(index)?;
        self.fs.remove(&content_path(&item.id))
    }

    /// Remove every item. Files that are not content files stay.
    pub fn clear(&mut self) -> Result<()> {
        let entries = match self.fs.read_dir(STORE_DIR) {
            Ok(entries) => entries,
            Err(RemError::NotFound(_)) => return Ok(()),
            Err(e) => return Err(e),
        };
        for entry in entries {
            if entry.is_dir || !is_content_name(&entry.name) {
                continue;
            }
            self.fs.remove(&format!("{}/{}", STORE_DIR, entry.name))?;
        }
        Ok(())
    }

    /// Number of items currently stored. Cheaper than `list()`: counts
    /// directory entries without opening payloads.
    pub fn size(&self) -> Result<usize> {
        let entries = match self.fs.read_dir(STORE_DIR) {
            Ok(entries) => entries,
            Err(RemError::NotFound(_)) => return Ok(0),
            Err(e) => return Err(e),
        };
        Ok(entries
            .iter()
            .filter(|e| !e.is_dir && is_content_name(&e.name))
            .count())
    }

    /// Allocate the next push instant: wall clock truncated to
    /// microseconds, bumped one microsecond past the previous allocation
    /// whenever the clock has not advanced, so filenames stay strictly
    /// monotonic within a process.
    fn next_timestamp(&self) -> DateTime<FixedOffset> {
        let mut t = truncate_to_micros(Local::now().fixed_offset());
        if let Some(last) = self.last_timestamp {
            if t <= last {
                t = last + Duration::microseconds(1);
            }
        }
        t
    }

    /// Drop the oldest content files until the count is back at the
    /// bound. Ascending filename order equals ascending timestamp order.
    fn evict(&self) -> Result<()> {
        let entries = self.fs.read_dir(STORE_DIR)?;
        let mut names: Vec<String> = entries
            .into_iter()
            .filter(|e| !e.is_dir && is_content_name(&e.name))
            .map(|e| e.name)
            .collect();

        if names.len() <= self.max_size {
            return Ok(());
        }
        names.sort();

        let excess = names.len() - self.max_size;
        for name in &names[..excess] {
            self.fs.remove(&format!("{}/{}", STORE_DIR, name))?;
        }
        debug!(removed = excess, "evicted oldest stack items");
        Ok(())
    }

    fn read_item(&self, stem: &str, timestamp: DateTime<FixedOffset>) -> Result<Item> {
        let mut stream = self.fs.open(&content_path(stem))?;

        let mut hasher = Sha256::new();
        let mut sample: Vec<u8> = Vec::new();
        let mut size: u64 = 0;
        let mut chunk = [0u8; 8192];
        loop {
            let n = stream.read(&mut chunk)?;
            if n == 0 {
                break;
            }
            hasher.update(&chunk[..n]);
            if sample.len() < SAMPLE_BYTES {
                let take = (SAMPLE_BYTES - sample.len()).min(n);
                sample.extend_from_slice(&chunk[..take]);
            }
            size += n as u64;
        }

        let binary = is_binary(&sample);
        let title = truncate_title(&generate_title(&sample, binary), MAX_TITLE_LEN);
        Ok(Item {
            timestamp,
            id: stem.to_string(),
            title,
            size,
            is_binary: binary,
            sha256: hex::encode(hasher.finalize()),
        })
    }
}

/// Drop sub-microsecond precision so an allocated instant round-trips
/// exactly through its filename.
fn truncate_to_micros(t: DateTime<FixedOffset>) -> DateTime<FixedOffset> {
    t.with_nanosecond(t.timestamp_subsec_micros() * 1_000)
        .unwrap_or(t)
}

fn content_path(stem: &str) -> String {
    format!("{}/{}{}", STORE_DIR, stem, CONTENT_FILE_EXT)
}

fn is_content_name(name: &str) -> bool {
    name.strip_suffix(CONTENT_FILE_EXT)
        .is_some_and(|stem| parse_timestamp(stem).is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemFs;

    fn manager() -> StackManager<MemFs> {
        StackManager::with_fs(MemFs::new()).unwrap()
    }

    fn push_str(m: &mut StackManager<MemFs>, s: &str) -> Item {
        m.push(s.as_bytes(), None).unwrap()
    }

    #[test]
    fn test_push_assigns_monotonic_ids() {
        let mut m = manager();
        let a = push_str(&mut m, "first");
        let b = push_str(&mut m, "second");
        assert_ne!(a.id, b.id);
        assert!(b.timestamp > a.timestamp);
    }

    #[test]
    fn test_push_id_matches_filename_format() {
        let mut m = manager();
        let item = push_str(&mut m, "content");
        let parsed = parse_timestamp(&item.id).expect("id must parse");
        assert_eq!(parsed, item.timestamp);
        assert_eq!(format_timestamp(&parsed), item.id);
    }

    #[test]
    fn test_list_is_newest_first() {
        let mut m = manager();
        push_str(&mut m, "one");
        push_str(&mut m, "two");
        push_str(&mut m, "three");

        let items = m.list().unwrap();
        let titles: Vec<&str> = items.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["three", "two", "one"]);
    }

    #[test]
    fn test_override_title_applies_to_text_only() {
        let mut m = manager();
        let text = m.push("body".as_bytes(), Some("  My   Title ")).unwrap();
        assert_eq!(text.title, "My Title");

        let binary = m.push(&b"\x00\x01\x02"[..], Some("ignored")).unwrap();
        assert_eq!(binary.title, "[binary content]");
    }

    #[test]
    fn test_blank_override_falls_back_to_derived() {
        let mut m = manager();
        let item = m.push("Actual first line".as_bytes(), Some("   ")).unwrap();
        assert_eq!(item.title, "Actual first line");
    }

    #[test]
    fn test_empty_push_is_rejected_and_leaves_nothing() {
        let mut m = manager();
        assert!(matches!(
            m.push(&b""[..], None),
            Err(RemError::EmptyContent)
        ));
        assert_eq!(m.size().unwrap(), 0);
    }

    #[test]
    fn test_failed_write_leaves_store_usable() {
        let mut m = manager();
        m.fs.set_fail_writes(true);
        assert!(matches!(m.push(&b"data"[..], None), Err(RemError::Io(_))));
        assert_eq!(m.size().unwrap(), 0);

        m.fs.set_fail_writes(false);
        push_str(&mut m, "data");
        assert_eq!(m.size().unwrap(), 1);
    }

    #[test]
    fn test_eviction_keeps_newest() {
        let mut m = manager().with_max_size(3);
        for i in 0..5 {
            push_str(&mut m, &format!("Item {}", i));
        }
        assert_eq!(m.size().unwrap(), 3);

        let titles: Vec<String> = m.list().unwrap().into_iter().map(|i| i.title).collect();
        assert_eq!(titles, vec!["Item 4", "Item 3", "Item 2"]);
    }

    #[test]
    fn test_foreign_files_are_ignored_everywhere() {
        let mut m = manager();
        push_str(&mut m, "real");
        m.fs
            .write_file("history/notes.txt", b"not ours", 0o644)
            .unwrap();
        m.fs
            .write_file("history/2024-03-01T09-15-30.123456Z", b"no ext", 0o644)
            .unwrap();

        assert_eq!(m.size().unwrap(), 1);
        assert_eq!(m.list().unwrap().len(), 1);

        m.clear().unwrap();
        assert_eq!(m.size().unwrap(), 0);
        // Foreign files survive a clear.
        assert!(m.fs.contains_file("history/notes.txt"));
    }

    #[test]
    fn test_get_bounds() {
        let mut m = manager();
        push_str(&mut m, "only");
        assert!(m.get(0).is_ok());
        assert!(matches!(
            m.get(1),
            Err(RemError::OutOfRange { index: 1, len: 1 })
        ));
    }

    #[test]
    fn test_get_content_unknown_id() {
        let m = manager();
        assert!(matches!(
            m.get_content("not-a-timestamp"),
            Err(RemError::NotFound(_))
        ));
    }

    #[test]
    fn test_get_content_roundtrip() {
        let mut m = manager();
        let item = push_str(&mut m, "round trip payload");

        let mut buf = String::new();
        m.get_content(&item.id)
            .unwrap()
            .read_to_string(&mut buf)
            .unwrap();
        assert_eq!(buf, "round trip payload");
    }

    #[test]
    fn test_item_path_points_into_store_dir() {
        let mut m = manager();
        let item = push_str(&mut m, "x");
        let path = m.item_path(&item.id).unwrap();
        assert!(path.ends_with(format!("history/{}.txt", item.id)));
    }

    #[test]
    fn test_list_title_rederived_from_content() {
        let mut m = manager();
        m.push("First line\nSecond".as_bytes(), Some("Override"))
            .unwrap();
        // Without a sidecar the override is not persisted; a fresh list
        // derives the title from the file again.
        let items = m.list().unwrap();
        assert_eq!(items[0].title, "First line");
    }
}
