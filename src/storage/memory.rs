//! In-memory object store.
//!
//! Objects are held in a `tokio::sync::RwLock<BTreeMap<...>>`, so listings
//! come back in lexicographic key order just as S3 returns them. Reads are
//! split into fixed-size chunks to exercise the streaming path.
//!
//! The store counts calls and can be switched into failure modes, which
//! makes it the backend of choice for handler tests. [`MemoryStore::load_dir`]
//! seeds it from a `YYYY/MM/DD/<file>` directory tree for local runs
//! without S3.

use anyhow::Context;
use bytes::Bytes;
use futures_util::stream;
use std::collections::BTreeMap;
use std::fs::FileType;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tracing::info;

use super::backend::{ObjectStore, StoreObject};

/// Default read chunk size (64 KiB).
const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// In-memory object store.
pub struct MemoryStore {
    objects: tokio::sync::RwLock<BTreeMap<String, Bytes>>,
    chunk_size: usize,
    list_calls: AtomicUsize,
    get_calls: AtomicUsize,
    /// Fail every `list` and `get` before any data is produced.
    failing: AtomicBool,
    /// Fail every body stream after its first chunk.
    fail_mid_stream: AtomicBool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_chunk_size(DEFAULT_CHUNK_SIZE)
    }

    /// Create a store that splits bodies into `chunk_size`-byte chunks.
    pub fn with_chunk_size(chunk_size: usize) -> Self {
        Self {
            objects: tokio::sync::RwLock::new(BTreeMap::new()),
            chunk_size: chunk_size.max(1),
            list_calls: AtomicUsize::new(0),
            get_calls: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
            fail_mid_stream: AtomicBool::new(false),
        }
    }

    /// Load every `YYYY/MM/DD/<file>` under `root` into a new store.
    ///
    /// Regular files at exactly that depth become objects keyed by their
    /// relative path. Anything else, including non-UTF-8 names, is skipped.
    pub fn load_dir<P: AsRef<Path>>(root: P) -> anyhow::Result<Self> {
        let root = root.as_ref();
        let mut objects = BTreeMap::new();

        for (year, year_path, year_type) in dir_entries(root)? {
            if !year_type.is_dir() {
                continue;
            }
            for (month, month_path, month_type) in dir_entries(&year_path)? {
                if !month_type.is_dir() {
                    continue;
                }
                for (day, day_path, day_type) in dir_entries(&month_path)? {
                    if !day_type.is_dir() {
                        continue;
                    }
                    for (file, file_path, file_type) in dir_entries(&day_path)? {
                        if !file_type.is_file() {
                            continue;
                        }
                        let data = std::fs::read(&file_path)
                            .with_context(|| format!("reading {}", file_path.display()))?;
                        objects.insert(format!("{year}/{month}/{day}/{file}"), Bytes::from(data));
                    }
                }
            }
        }

        info!(
            "Memory store loaded {} object(s) from {}",
            objects.len(),
            root.display()
        );

        Ok(Self {
            objects: tokio::sync::RwLock::new(objects),
            ..Self::new()
        })
    }

    /// Store `data` at `key`, replacing any previous object.
    pub async fn insert(&self, key: &str, data: impl Into<Bytes>) {
        self.objects.write().await.insert(key.to_string(), data.into());
    }

    /// Make every subsequent call fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Make every subsequent body stream fail after its first chunk.
    pub fn set_fail_mid_stream(&self, fail: bool) {
        self.fail_mid_stream.store(fail, Ordering::SeqCst);
    }

    /// Number of `list` calls made so far.
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// Number of `get` calls made so far.
    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }
}

/// Named entries of `dir` with their file types, skipping non-UTF-8 names.
fn dir_entries(dir: &Path) -> anyhow::Result<Vec<(String, PathBuf, FileType)>> {
    let mut entries = Vec::new();
    let read_dir = std::fs::read_dir(dir)
        .with_context(|| format!("reading directory {}", dir.display()))?;
    for entry in read_dir {
        let entry = entry?;
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        entries.push((name, entry.path(), entry.file_type()?));
    }
    Ok(entries)
}

impl ObjectStore for MemoryStore {
    fn list(
        &self,
        prefix: &str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Vec<String>>> + Send + '_>> {
        let prefix = prefix.to_string();
        Box::pin(async move {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            if self.failing.load(Ordering::SeqCst) {
                anyhow::bail!("memory store unavailable");
            }
            let objects = self.objects.read().await;
            Ok(objects
                .range(prefix.clone()..)
                .take_while(|(k, _)| k.starts_with(&prefix))
                .map(|(k, _)| k.clone())
                .collect())
        })
    }

    fn get(
        &self,
        key: &str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<StoreObject>> + Send + '_>> {
        let key = key.to_string();
        Box::pin(async move {
            self.get_calls.fetch_add(1, Ordering::SeqCst);
            if self.failing.load(Ordering::SeqCst) {
                anyhow::bail!("memory store unavailable");
            }
            let data = self
                .objects
                .read()
                .await
                .get(&key)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("Object not found: {key}"))?;

            let content_length = Some(data.len() as u64);
            let mut chunks: Vec<std::io::Result<Bytes>> = data
                .chunks(self.chunk_size)
                .map(|c| Ok(data.slice_ref(c)))
                .collect();
            if self.fail_mid_stream.load(Ordering::SeqCst) {
                chunks.truncate(1);
                chunks.push(Err(std::io::Error::new(
                    std::io::ErrorKind::ConnectionReset,
                    "memory store stream interrupted",
                )));
            }

            Ok(StoreObject {
                content_length,
                body: Box::pin(stream::iter(chunks)),
            })
        })
    }
}
