//! File-backed TTL cache with a fingerprint based conditional read.
//!
//! Every key maps to one file holding a bincode encoded [`CacheEntry`]. Writes replace the
//! whole file through a temporary file and a rename, so a reader sees either the old or
//! the new entry. Concurrent writers of one key race on "last write wins".
//!
//! The cache never fails a request. Unreadable, corrupt or expired entries are misses,
//! write failures are logged and dropped, and a cache that cannot write at all keeps
//! serving freshly computed payloads.

use crate::cache::error::CacheError;
use bincode::config::{Configuration, Fixint, LittleEndian};
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::future::Future;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

const BINCODE_CONFIG: Configuration<LittleEndian, Fixint> =
    bincode::config::standard().with_fixed_int_encoding();
const ENTRY_EXTENSION: &str = "bin";

/// Default lifetime of an entry.
pub const DEFAULT_TTL: Duration = Duration::from_secs(10 * 60);

/// A cached payload together with its fingerprint and lifetime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    pub payload: T,
    pub fingerprint: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl<T> CacheEntry<T> {
    /// `true` while `now` is before the absolute expiry and, if given, the entry is no
    /// older than `max_age`. Both conditions must hold.
    pub fn is_fresh(&self, now: DateTime<Utc>, max_age: Option<Duration>) -> bool {
        if now >= self.expires_at {
            return false;
        }
        match max_age.map(chrono::Duration::from_std) {
            None | Some(Err(_)) => true,
            Some(Ok(max_age)) => now - self.created_at <= max_age,
        }
    }
}

/// Result of [`RequestCache::get_or_compute`].
#[derive(Debug, Clone, PartialEq)]
pub struct Cached<T> {
    pub payload: T,
    /// Hex SHA-256 of the payload's JSON encoding.
    pub fingerprint: String,
    /// `true` when the payload came from the cache rather than a fresh computation.
    pub was_cached: bool,
}

/// Result of [`RequestCache::conditional_get`].
#[derive(Debug, Clone, PartialEq)]
pub enum Conditional<T> {
    /// The caller already holds the current payload.
    NotModified { fingerprint: String },
    Modified(Cached<T>),
}

impl<T> Conditional<T> {
    pub fn fingerprint(&self) -> &str {
        match self {
            Conditional::NotModified { fingerprint } => fingerprint,
            Conditional::Modified(cached) => &cached.fingerprint,
        }
    }
}

/// What the backing directory allows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageAvailability {
    /// Entries are read and written.
    Writable,
    /// Existing entries are read, nothing is written or deleted.
    ReadOnly,
    /// Every lookup is a miss.
    Disabled,
}

/// Hex SHA-256 of the JSON encoding of `payload`.
pub fn fingerprint<T: Serialize + ?Sized>(payload: &T) -> Result<String, CacheError> {
    let json = serde_json::to_vec(payload)?;
    Ok(hex::encode(Sha256::digest(&json)))
}

#[derive(Debug, Clone)]
pub struct RequestCache {
    dir: PathBuf,
    availability: StorageAvailability,
}

impl RequestCache {
    /// Opens a cache in `dir`, creating it if needed. Writability is decided here, once,
    /// by writing a scratch file; a directory that fails the check gives a read-only cache.
    pub async fn open(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        match check_writable(&dir).await {
            Ok(()) => {
                info!("Using request cache at {}", dir.display());
                Self::with_availability(dir, StorageAvailability::Writable)
            }
            Err(e) => {
                warn!("Request cache at {} is read-only: {}", dir.display(), e);
                Self::with_availability(dir, StorageAvailability::ReadOnly)
            }
        }
    }

    /// Opens the first candidate directory that passes the write check. When none does,
    /// the cache is read-only on the first candidate, or disabled if there are none.
    pub async fn open_first_writable(candidates: Vec<PathBuf>) -> Self {
        let mut fallback = None;
        for dir in candidates {
            match check_writable(&dir).await {
                Ok(()) => {
                    info!("Using request cache at {}", dir.display());
                    return Self::with_availability(dir, StorageAvailability::Writable);
                }
                Err(e) => {
                    warn!("Skipping cache location {}: {}", dir.display(), e);
                    fallback.get_or_insert(dir);
                }
            }
        }
        match fallback {
            Some(dir) => {
                warn!("No writable cache location, reading from {} only", dir.display());
                Self::with_availability(dir, StorageAvailability::ReadOnly)
            }
            None => Self::disabled(),
        }
    }

    pub fn read_only(dir: impl Into<PathBuf>) -> Self {
        Self::with_availability(dir.into(), StorageAvailability::ReadOnly)
    }

    pub fn disabled() -> Self {
        Self::with_availability(PathBuf::new(), StorageAvailability::Disabled)
    }

    fn with_availability(dir: PathBuf, availability: StorageAvailability) -> Self {
        Self { dir, availability }
    }

    pub fn availability(&self) -> StorageAvailability {
        self.availability
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File backing `key`. The name is the SHA-256 of the key, so any key is a safe name.
    pub fn entry_path(&self, key: &str) -> PathBuf {
        let name = hex::encode(Sha256::digest(key.as_bytes()));
        self.dir.join(format!("{name}.{ENTRY_EXTENSION}"))
    }

    /// Returns the entry for `key` if it exists and is fresh (see [`CacheEntry::is_fresh`]).
    /// A stale or unreadable entry is deleted and reported as a miss.
    pub async fn get<T>(&self, key: &str, max_age: Option<Duration>) -> Option<CacheEntry<T>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        if self.availability == StorageAvailability::Disabled {
            return None;
        }
        let path = self.entry_path(key);
        match read_entry::<T>(path.clone()).await {
            Ok(None) => None,
            Ok(Some(entry)) if entry.is_fresh(Utc::now(), max_age) => Some(entry),
            Ok(Some(_)) => {
                debug!("Cache entry for '{}' is stale", key);
                self.discard(&path).await;
                None
            }
            Err(e) => {
                warn!("Ignoring cache entry for '{}': {}", key, e);
                self.discard(&path).await;
                None
            }
        }
    }

    /// Stores `payload` under `key` for `ttl` and returns its fingerprint.
    ///
    /// Fingerprinting, encoding and the file write run on the blocking pool on a copy of
    /// the payload. Failing to write is logged, not returned. The fingerprint is empty
    /// only for a payload that cannot be encoded as JSON, which is then not stored either.
    pub async fn set<T>(&self, key: &str, payload: &T, ttl: Duration) -> String
    where
        T: Serialize + Clone + Send + 'static,
    {
        let key = key.to_string();
        let payload = payload.clone();
        let availability = self.availability;
        let dir = self.dir.clone();
        let path = self.entry_path(&key);
        let stored = tokio::task::spawn_blocking(move || {
            store_entry(&key, &payload, ttl, availability, &dir, &path)
        })
        .await;
        match stored {
            Ok(fingerprint) => fingerprint,
            Err(e) => {
                warn!("{}", CacheError::TaskJoin(e));
                String::new()
            }
        }
    }

    /// Deletes the entry for `key`, if any.
    pub async fn remove(&self, key: &str) {
        if self.availability == StorageAvailability::Writable {
            self.discard(&self.entry_path(key)).await;
        }
    }

    /// Returns the fresh cached payload for `key`, or runs `compute`, stores its output
    /// for `ttl` and returns that. Only `compute` can fail.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use buoy_wind::{RequestCache, DEFAULT_TTL};
    /// # async fn run() {
    /// let cache = RequestCache::open("/tmp/buoy_wind_cache").await;
    /// let cached = cache
    ///     .get_or_compute("wind-days:46025:2024-06-01T13", DEFAULT_TTL, || async {
    ///         Ok::<_, std::io::Error>(vec![1, 2, 3])
    ///     })
    ///     .await
    ///     .unwrap();
    /// println!("{} (from cache: {})", cached.fingerprint, cached.was_cached);
    /// # }
    /// ```
    pub async fn get_or_compute<T, E, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        compute: F,
    ) -> Result<Cached<T>, E>
    where
        T: Serialize + DeserializeOwned + Clone + Send + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(entry) = self.get::<T>(key, Some(ttl)).await {
            debug!("Cache hit for '{}'", key);
            return Ok(Cached {
                payload: entry.payload,
                fingerprint: entry.fingerprint,
                was_cached: true,
            });
        }

        debug!("Cache miss for '{}'", key);
        self.compute_and_store(key, ttl, compute).await
    }

    /// [`RequestCache::get_or_compute`] for a caller that already holds the payload with
    /// fingerprint `if_none_match`.
    ///
    /// * A fresh entry with that fingerprint gives [`Conditional::NotModified`] without
    ///   running `compute`.
    /// * A fresh entry with any other fingerprint, or no fresh entry, runs `compute` and
    ///   stores the result. The new payload is returned as [`Conditional::Modified`],
    ///   unless it happens to have the caller's fingerprint again.
    /// * Without `if_none_match` this is [`RequestCache::get_or_compute`].
    pub async fn conditional_get<T, E, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        if_none_match: Option<&str>,
        compute: F,
    ) -> Result<Conditional<T>, E>
    where
        T: Serialize + DeserializeOwned + Clone + Send + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let Some(known) = if_none_match else {
            return Ok(Conditional::Modified(
                self.get_or_compute(key, ttl, compute).await?,
            ));
        };

        match self.get::<T>(key, Some(ttl)).await {
            Some(entry) if matches_fingerprint(known, &entry.fingerprint) => {
                debug!("Cache hit for '{}', caller is up to date", key);
                return Ok(Conditional::NotModified {
                    fingerprint: entry.fingerprint,
                });
            }
            Some(_) => debug!("Caller holds an outdated '{}', recomputing", key),
            None => debug!("Cache miss for '{}'", key),
        }

        let cached = self.compute_and_store(key, ttl, compute).await?;
        if matches_fingerprint(known, &cached.fingerprint) {
            Ok(Conditional::NotModified {
                fingerprint: cached.fingerprint,
            })
        } else {
            Ok(Conditional::Modified(cached))
        }
    }

    async fn compute_and_store<T, E, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        compute: F,
    ) -> Result<Cached<T>, E>
    where
        T: Serialize + Clone + Send + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let payload = compute().await?;
        let fingerprint = self.set(key, &payload, ttl).await;
        Ok(Cached {
            payload,
            fingerprint,
            was_cached: false,
        })
    }

    async fn discard(&self, path: &Path) {
        if self.availability != StorageAvailability::Writable {
            return;
        }
        match tokio::fs::remove_file(path).await {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!("{}", CacheError::Remove(path.to_path_buf(), e)),
        }
    }
}

fn matches_fingerprint(known: &str, current: &str) -> bool {
    !current.is_empty() && known == current
}

fn store_entry<T: Serialize>(
    key: &str,
    payload: &T,
    ttl: Duration,
    availability: StorageAvailability,
    dir: &Path,
    path: &Path,
) -> String {
    let fingerprint = match fingerprint(payload) {
        Ok(fingerprint) => fingerprint,
        Err(e) => {
            warn!("Not caching '{}': {}", key, e);
            return String::new();
        }
    };
    if availability != StorageAvailability::Writable {
        debug!("Cache is {:?}, not storing '{}'", availability, key);
        return fingerprint;
    }

    let created_at = Utc::now();
    let expires_at = chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|ttl| created_at.checked_add_signed(ttl))
        .unwrap_or(DateTime::<Utc>::MAX_UTC);
    let entry = CacheEntry {
        payload,
        fingerprint: fingerprint.clone(),
        created_at,
        expires_at,
    };
    if let Err(e) = write_entry(dir, path, &entry) {
        warn!("Failed to cache '{}': {}", key, e);
    }
    fingerprint
}

fn write_entry<T: Serialize>(
    dir: &Path,
    path: &Path,
    entry: &CacheEntry<&T>,
) -> Result<(), CacheError> {
    let bytes = bincode::serde::encode_to_vec(entry, BINCODE_CONFIG)
        .map_err(|e| CacheError::Encode(Box::new(e)))?;
    let mut file =
        tempfile::NamedTempFile::new_in(dir).map_err(|e| CacheError::Write(path.to_path_buf(), e))?;
    file.write_all(&bytes)
        .map_err(|e| CacheError::Write(path.to_path_buf(), e))?;
    file.persist(path)
        .map_err(|e| CacheError::Write(path.to_path_buf(), e.error))?;
    Ok(())
}

async fn read_entry<T>(path: PathBuf) -> Result<Option<CacheEntry<T>>, CacheError>
where
    T: DeserializeOwned + Send + 'static,
{
    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(CacheError::Read(path, e)),
    };
    let entry = tokio::task::spawn_blocking(move || {
        bincode::serde::decode_from_slice::<CacheEntry<T>, _>(&bytes, BINCODE_CONFIG)
            .map(|(entry, _)| entry)
            .map_err(|e| CacheError::Decode(path, Box::new(e)))
    })
    .await??;
    Ok(Some(entry))
}

async fn check_writable(dir: &Path) -> Result<(), CacheError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| CacheError::DirCreation(dir.to_path_buf(), e))?;
    let dir = dir.to_path_buf();
    tokio::task::spawn_blocking(move || -> Result<(), CacheError> {
        let mut file = tempfile::NamedTempFile::new_in(&dir)
            .map_err(|e| CacheError::NotWritable(dir.clone(), e))?;
        file.write_all(b"buoy-wind")
            .map_err(|e| CacheError::NotWritable(dir.clone(), e))?;
        Ok(())
    })
    .await?
}
