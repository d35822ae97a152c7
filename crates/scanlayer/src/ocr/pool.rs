//! Recognition-engine pool.
//!
//! Keeps at most `capacity` loaded engines, keyed by language, in LRU order.
//! Each entry is a shared once-cell: the first `acquire` for a language starts
//! the load, and concurrent callers await the same cell instead of loading
//! again. Loads still in flight are never evicted, so the pool can briefly hold
//! more than `capacity` entries until they resolve. Failed loads are shared
//! with every waiter and then dropped from the pool, so a later run tries again.

use super::engine::{EngineHandle, EngineLoader};
use crate::{Result, ScanlayerError};
use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::OnceCell;

type LoadOutcome = std::result::Result<EngineHandle, String>;
type Slot = Arc<OnceCell<LoadOutcome>>;

/// Pool counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStats {
    /// Loads handed to the loader.
    pub loads: u64,
    /// Acquisitions served by an existing (loaded or in-flight) entry.
    pub hits: u64,
    pub evictions: u64,
    pub failures: u64,
}

pub struct EnginePool {
    loader: Arc<dyn EngineLoader>,
    capacity: usize,
    /// Front is least recently used.
    entries: Mutex<IndexMap<String, Slot>>,
    loads: AtomicU64,
    hits: AtomicU64,
    evictions: AtomicU64,
    failures: AtomicU64,
}

impl std::fmt::Debug for EnginePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnginePool")
            .field("capacity", &self.capacity)
            .field("languages", &self.cached_languages())
            .finish()
    }
}

impl EnginePool {
    /// A capacity of 0 is treated as 1.
    pub fn new(loader: Arc<dyn EngineLoader>, capacity: usize) -> Self {
        Self {
            loader,
            capacity: capacity.max(1),
            entries: Mutex::new(IndexMap::new()),
            loads: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            failures: AtomicU64::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Get the engine for `language`, loading it on first use.
    ///
    /// # Errors
    ///
    /// Returns `ModelLoadFailure` if loading fails. Every caller waiting on the
    /// same load gets the failure; nothing is retried here.
    pub async fn acquire(&self, language: &str) -> Result<EngineHandle> {
        let slot = self.slot_for(language);

        let outcome = slot
            .get_or_init(|| async {
                self.loads.fetch_add(1, Ordering::Relaxed);
                tracing::debug!("Loading recognition engine for '{}'", language);
                match self.loader.load(language).await {
                    Ok(engine) => {
                        tracing::debug!("Recognition engine for '{}' ready", language);
                        Ok(engine)
                    }
                    Err(ScanlayerError::ModelLoadFailure { message, .. }) => Err(message),
                    Err(other) => Err(other.to_string()),
                }
            })
            .await;

        match outcome {
            Ok(engine) => {
                let mut entries = self.entries.lock();
                self.trim(&mut entries, Some(language));
                Ok(Arc::clone(engine))
            }
            Err(message) => {
                let removed = {
                    let mut entries = self.entries.lock();
                    match entries.get(language) {
                        Some(current) if Arc::ptr_eq(current, &slot) => entries.shift_remove(language).is_some(),
                        _ => false,
                    }
                };
                if removed {
                    self.failures.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!("Recognition engine for '{}' failed to load: {}", language, message);
                }
                Err(ScanlayerError::model_load(language, message.clone()))
            }
        }
    }

    /// Find or create the slot for `language`, mark it most recently used and
    /// evict over capacity.
    fn slot_for(&self, language: &str) -> Slot {
        let mut entries = self.entries.lock();

        if let Some(slot) = entries.shift_remove(language) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            entries.insert(language.to_string(), Arc::clone(&slot));
            return slot;
        }

        let slot: Slot = Arc::new(OnceCell::new());
        entries.insert(language.to_string(), Arc::clone(&slot));
        self.trim(&mut entries, Some(language));

        slot
    }

    /// Evict least recently used loaded engines until within capacity.
    ///
    /// In-flight slots and `keep` are skipped; concurrent callers still need them.
    fn trim(&self, entries: &mut IndexMap<String, Slot>, keep: Option<&str>) {
        while entries.len() > self.capacity {
            let victim = entries
                .iter()
                .position(|(language, slot)| slot.initialized() && Some(language.as_str()) != keep);
            let Some(index) = victim else {
                break;
            };
            if let Some((evicted, _)) = entries.shift_remove_index(index) {
                self.evictions.fetch_add(1, Ordering::Relaxed);
                tracing::debug!("Evicted recognition engine for '{}'", evicted);
            }
        }
    }

    /// Whether a loaded or in-flight engine exists for `language`.
    pub fn contains(&self, language: &str) -> bool {
        self.entries.lock().contains_key(language)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Cached languages, least recently used first.
    pub fn cached_languages(&self) -> Vec<String> {
        self.entries.lock().keys().cloned().collect()
    }

    /// Drop the engine for `language`. Callers already holding the handle keep it.
    pub fn evict(&self, language: &str) -> bool {
        let removed = self.entries.lock().shift_remove(language).is_some();
        if removed {
            self.evictions.fetch_add(1, Ordering::Relaxed);
        }
        removed
    }

    pub fn clear(&self) {
        let mut entries = self.entries.lock();
        self.evictions.fetch_add(entries.len() as u64, Ordering::Relaxed);
        entries.clear();
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            loads: self.loads.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}
