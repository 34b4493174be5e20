//! Filesystem cache store.
//!
//! Entries live at `<root>/<category>/<name>/<hash>.entry`. Each entry file
//! is a 4-byte little-endian header length, a bincode-encoded
//! [`EntryHeader`], and a JSON payload describing the key. Entries are
//! written to a temporary file in the same directory and renamed into
//! place, so readers never observe a partial entry.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use skein_common::ContentHash;
use tracing::debug;

use crate::error::CacheError;
use crate::store::{CacheCategory, CacheHits, CacheItem, CacheStore, Provenance, StoreSummary};

/// Magic bytes identifying a Skein cache entry.
const ENTRY_MAGIC: [u8; 4] = *b"SKEN";

/// Current entry format version. Increment on breaking changes to
/// the header or payload format.
const ENTRY_FORMAT_VERSION: u32 = 1;

const ENTRY_EXT: &str = "entry";

/// Header prepended to every cache entry for validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryHeader {
    /// Magic bytes: must be `b"SKEN"`.
    pub magic: [u8; 4],

    /// Entry format version.
    pub format_version: u32,

    /// Skein version that wrote this entry.
    pub tool_version: String,

    /// Content hash of the payload (for integrity checks).
    pub checksum: ContentHash,
}

#[derive(Debug, Serialize, Deserialize)]
struct EntryPayload {
    category: CacheCategory,
    name: String,
    hash: String,
}

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Cache store on the local filesystem.
pub struct LocalCacheStore {
    root: PathBuf,
    tool_version: String,
}

impl LocalCacheStore {
    /// Creates a store rooted at `root`. Directories are created on first write.
    pub fn new(root: impl Into<PathBuf>, tool_version: &str) -> Self {
        Self {
            root: root.into(),
            tool_version: tool_version.to_string(),
        }
    }

    /// Root directory of the store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the file path of an entry.
    pub fn entry_path(&self, category: CacheCategory, item: &CacheItem) -> PathBuf {
        self.root
            .join(category.as_str())
            .join(dir_name(&item.name))
            .join(format!("{}.{ENTRY_EXT}", item.hash))
    }

    /// Returns `true` if a valid entry for `item` exists.
    ///
    /// Missing, truncated, corrupt, or foreign files all read as absent.
    pub fn contains(&self, category: CacheCategory, item: &CacheItem) -> bool {
        let path = self.entry_path(category, item);
        match read_entry(&path) {
            Some(payload) => {
                payload.category == category
                    && payload.name == item.name
                    && payload.hash == item.hash.to_hex()
            }
            None => false,
        }
    }

    /// Writes one entry atomically.
    pub fn write_entry(&self, category: CacheCategory, item: &CacheItem) -> Result<(), CacheError> {
        let path = self.entry_path(category, item);
        let dir = path.parent().unwrap_or(&self.root).to_path_buf();
        std::fs::create_dir_all(&dir).map_err(|e| CacheError::Io {
            path: dir.clone(),
            source: e,
        })?;

        let payload = serde_json::to_vec(&EntryPayload {
            category,
            name: item.name.clone(),
            hash: item.hash.to_hex(),
        })
        .map_err(|e| CacheError::Serialization {
            reason: e.to_string(),
        })?;
        let header = EntryHeader {
            magic: ENTRY_MAGIC,
            format_version: ENTRY_FORMAT_VERSION,
            tool_version: self.tool_version.clone(),
            checksum: ContentHash::from_bytes(&payload),
        };
        let header_bytes = bincode::serde::encode_to_vec(&header, bincode::config::standard())
            .map_err(|e| CacheError::Serialization {
                reason: e.to_string(),
            })?;

        // 4-byte header length (little-endian) + header + payload
        let mut output = Vec::with_capacity(4 + header_bytes.len() + payload.len());
        output.extend_from_slice(&(header_bytes.len() as u32).to_le_bytes());
        output.extend_from_slice(&header_bytes);
        output.extend_from_slice(&payload);

        let temp = dir.join(format!(
            ".{}.{}-{}.tmp",
            item.hash,
            std::process::id(),
            TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        std::fs::write(&temp, &output).map_err(|e| CacheError::Io {
            path: temp.clone(),
            source: e,
        })?;
        std::fs::rename(&temp, &path).map_err(|e| {
            let _ = std::fs::remove_file(&temp);
            CacheError::Io { path, source: e }
        })
    }

    /// Removes entries of `category` that are not in `live`.
    ///
    /// Name directories left empty are removed too. Returns the number of
    /// entries deleted.
    pub fn gc(&self, category: CacheCategory, live: &BTreeSet<CacheItem>) -> Result<usize, CacheError> {
        let category_dir = self.root.join(category.as_str());
        if !category_dir.exists() {
            return Ok(0);
        }
        let keep: BTreeSet<PathBuf> = live.iter().map(|i| self.entry_path(category, i)).collect();

        let mut removed = 0;
        for name_dir in read_dir(&category_dir)? {
            if !name_dir.is_dir() {
                continue;
            }
            let mut remaining = 0;
            for path in read_dir(&name_dir)? {
                let is_entry = path.extension().and_then(|e| e.to_str()) == Some(ENTRY_EXT);
                if is_entry && !keep.contains(&path) {
                    std::fs::remove_file(&path).map_err(|e| CacheError::Io {
                        path: path.clone(),
                        source: e,
                    })?;
                    removed += 1;
                } else {
                    remaining += 1;
                }
            }
            if remaining == 0 {
                let _ = std::fs::remove_dir(&name_dir);
            }
        }
        debug!(category = %category, removed, "cache gc");
        Ok(removed)
    }
}

impl CacheStore for LocalCacheStore {
    fn fetch(&self, category: CacheCategory, items: &BTreeSet<CacheItem>) -> Result<CacheHits, CacheError> {
        let hits: CacheHits = items
            .iter()
            .filter(|item| self.contains(category, item))
            .map(|item| (item.clone(), Provenance::Local))
            .collect();
        debug!(category = %category, requested = items.len(), hits = hits.len(), "local cache fetch");
        Ok(hits)
    }

    fn store(&self, category: CacheCategory, items: &BTreeSet<CacheItem>) -> Result<StoreSummary, CacheError> {
        for item in items {
            self.write_entry(category, item)?;
        }
        Ok(StoreSummary {
            local: items.len(),
            remote: 0,
        })
    }
}

/// Maps a target name to a single safe path component.
fn dir_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '+') {
                c
            } else {
                '_'
            }
        })
        .collect();
    match cleaned.as_str() {
        "" | "." | ".." => format!("_{cleaned}"),
        _ => cleaned,
    }
}

fn read_dir(dir: &Path) -> Result<Vec<PathBuf>, CacheError> {
    let io = |e| CacheError::Io {
        path: dir.to_path_buf(),
        source: e,
    };
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io)? {
        paths.push(entry.map_err(io)?.path());
    }
    Ok(paths)
}

/// Reads and validates an entry. Any problem reads as `None`.
fn read_entry(path: &Path) -> Option<EntryPayload> {
    let raw = std::fs::read(path).ok()?;
    if raw.len() < 4 {
        return None;
    }
    let header_len = u32::from_le_bytes(raw[..4].try_into().ok()?) as usize;
    if raw.len() < 4 + header_len {
        return None;
    }
    let header: EntryHeader =
        bincode::serde::decode_from_slice(&raw[4..4 + header_len], bincode::config::standard())
            .ok()?
            .0;
    if header.magic != ENTRY_MAGIC || header.format_version != ENTRY_FORMAT_VERSION {
        debug!(path = %path.display(), "ignoring cache entry with foreign header");
        return None;
    }
    let payload = &raw[4 + header_len..];
    if ContentHash::from_bytes(payload) != header.checksum {
        debug!(path = %path.display(), "ignoring corrupt cache entry");
        return None;
    }
    serde_json::from_slice(payload).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(name: &str, content: &str) -> CacheItem {
        CacheItem::new(name, ContentHash::from_bytes(content.as_bytes()))
    }

    fn set(items: &[CacheItem]) -> BTreeSet<CacheItem> {
        items.iter().cloned().collect()
    }

    #[test]
    fn store_then_fetch() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalCacheStore::new(dir.path(), "0.1.0");
        let a = item("CoreTests", "v1");
        let b = item("AppTests", "v1");

        let summary = store.store(CacheCategory::SelectiveTests, &set(&[a.clone()])).unwrap();
        assert_eq!(summary.local, 1);

        let hits = store
            .fetch(CacheCategory::SelectiveTests, &set(&[a.clone(), b.clone()]))
            .unwrap();
        assert_eq!(hits.provenance(&a), Provenance::Local);
        assert_eq!(hits.provenance(&b), Provenance::Miss);
    }

    #[test]
    fn entry_layout() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalCacheStore::new(dir.path(), "0.1.0");
        let a = item("CoreTests", "v1");
        store.write_entry(CacheCategory::SelectiveTests, &a).unwrap();
        let expected = dir
            .path()
            .join("selective-tests")
            .join("CoreTests")
            .join(format!("{}.entry", a.hash));
        assert!(expected.is_file());
        assert_eq!(store.entry_path(CacheCategory::SelectiveTests, &a), expected);
    }

    #[test]
    fn categories_are_partitioned() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalCacheStore::new(dir.path(), "0.1.0");
        let a = item("Core", "v1");
        store.store(CacheCategory::Binaries, &set(&[a.clone()])).unwrap();
        assert!(store.contains(CacheCategory::Binaries, &a));
        assert!(!store.contains(CacheCategory::SelectiveTests, &a));
    }

    #[test]
    fn changed_hash_misses() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalCacheStore::new(dir.path(), "0.1.0");
        store
            .store(CacheCategory::SelectiveTests, &set(&[item("Core", "v1")]))
            .unwrap();
        assert!(!store.contains(CacheCategory::SelectiveTests, &item("Core", "v2")));
    }

    #[test]
    fn corrupt_entry_is_miss() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalCacheStore::new(dir.path(), "0.1.0");
        let a = item("Core", "v1");
        store.write_entry(CacheCategory::SelectiveTests, &a).unwrap();

        let path = store.entry_path(CacheCategory::SelectiveTests, &a);
        let mut raw = std::fs::read(&path).unwrap();
        let last = raw.len() - 2;
        raw[last] ^= 0xff;
        std::fs::write(&path, &raw).unwrap();
        assert!(!store.contains(CacheCategory::SelectiveTests, &a));
    }

    #[test]
    fn truncated_and_foreign_files_are_misses() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalCacheStore::new(dir.path(), "0.1.0");
        let a = item("Core", "v1");
        let path = store.entry_path(CacheCategory::SelectiveTests, &a);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();

        std::fs::write(&path, [1u8, 0]).unwrap();
        assert!(!store.contains(CacheCategory::SelectiveTests, &a));

        std::fs::write(&path, b"{\"not\": \"an entry\"}").unwrap();
        assert!(!store.contains(CacheCategory::SelectiveTests, &a));
    }

    #[test]
    fn entry_copied_under_another_name_is_miss() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalCacheStore::new(dir.path(), "0.1.0");
        let real = item("Core", "v1");
        let other = CacheItem::new("Models", real.hash);
        store.write_entry(CacheCategory::SelectiveTests, &real).unwrap();

        let target = store.entry_path(CacheCategory::SelectiveTests, &other);
        std::fs::create_dir_all(target.parent().unwrap()).unwrap();
        std::fs::copy(store.entry_path(CacheCategory::SelectiveTests, &real), &target).unwrap();
        assert!(!store.contains(CacheCategory::SelectiveTests, &other));
    }

    #[test]
    fn no_temp_files_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalCacheStore::new(dir.path(), "0.1.0");
        let a = item("Core", "v1");
        store.write_entry(CacheCategory::SelectiveTests, &a).unwrap();
        store.write_entry(CacheCategory::SelectiveTests, &a).unwrap();
        let files: Vec<_> = std::fs::read_dir(dir.path().join("selective-tests/Core"))
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn unsafe_names_stay_in_one_directory() {
        assert_eq!(dir_name("Feature/Tests"), "Feature_Tests");
        assert_eq!(dir_name(".."), "_..");
        assert_eq!(dir_name("Core-iOS"), "Core-iOS");
    }

    #[test]
    fn gc_removes_dead_entries() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalCacheStore::new(dir.path(), "0.1.0");
        let live = item("Core", "v2");
        let dead = item("Core", "v1");
        let gone = item("Old", "v1");
        store
            .store(CacheCategory::SelectiveTests, &set(&[live.clone(), dead.clone(), gone.clone()]))
            .unwrap();

        let removed = store.gc(CacheCategory::SelectiveTests, &set(&[live.clone()])).unwrap();
        assert_eq!(removed, 2);
        assert!(store.contains(CacheCategory::SelectiveTests, &live));
        assert!(!store.contains(CacheCategory::SelectiveTests, &dead));
        assert!(!dir.path().join("selective-tests/Old").exists());
    }

    #[test]
    fn gc_missing_category_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalCacheStore::new(dir.path(), "0.1.0");
        assert_eq!(store.gc(CacheCategory::Binaries, &BTreeSet::new()).unwrap(), 0);
    }
}
