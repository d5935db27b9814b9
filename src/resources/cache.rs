//! Memoizing asset cache.
//!
//! The first request for a URL starts the underlying load and parks the
//! in-flight future in the map; concurrent requests for the same URL await
//! that same future. A successful result stays cached for the lifetime of the
//! cache. A failure clears the entry so a later call retries.

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex, MutexGuard,
        atomic::{AtomicU64, Ordering},
    },
};

use futures::{
    FutureExt,
    future::{BoxFuture, Shared},
};
use log::{debug, warn};

use crate::{data_structures::model::Model, error::AssetError, resources::ModelLoader};

type SharedLoad = Shared<BoxFuture<'static, Result<Arc<Model>, AssetError>>>;

enum CacheEntry {
    Ready(Arc<Model>),
    Loading { id: u64, load: SharedLoad },
}

type Entries = Arc<Mutex<HashMap<String, CacheEntry>>>;

fn lock(entries: &Entries) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
    // A panic while holding the lock cannot leave the map half-updated.
    entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Cheap to clone; all clones share the same entries.
#[derive(Clone)]
pub struct AssetCache {
    loader: Arc<dyn ModelLoader>,
    entries: Entries,
    next_id: Arc<AtomicU64>,
}

impl AssetCache {
    pub fn new(loader: Arc<dyn ModelLoader>) -> Self {
        Self {
            loader,
            entries: Arc::new(Mutex::new(HashMap::new())),
            next_id: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Resolves to the decoded model for `url`, sharing one load between all
    /// concurrent callers.
    pub fn load(&self, url: &str) -> BoxFuture<'static, Result<Arc<Model>, AssetError>> {
        let mut entries = lock(&self.entries);
        let load = match entries.get(url) {
            Some(CacheEntry::Ready(model)) => {
                return futures::future::ready(Ok(Arc::clone(model))).boxed();
            }
            Some(CacheEntry::Loading { load, .. }) => load.clone(),
            None => {
                let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                let load = self.start(url, id);
                entries.insert(
                    url.to_string(),
                    CacheEntry::Loading {
                        id,
                        load: load.clone(),
                    },
                );
                load
            }
        };
        drop(entries);
        load.boxed()
    }

    /// The loader is only invoked on first poll, after the entry lock is
    /// released, so loaders may call back into the cache.
    fn start(&self, url: &str, id: u64) -> SharedLoad {
        let loader = Arc::clone(&self.loader);
        let entries = Arc::clone(&self.entries);
        let url = url.to_string();
        async move {
            debug!("Loading asset {}", url);
            let result = loader.load(&url).await.map(Arc::new).map_err(|e| AssetError::LoadFailed {
                url: url.clone(),
                reason: format!("{e:#}"),
            });
            let mut entries = lock(&entries);
            let still_ours = matches!(
                entries.get(&url),
                Some(CacheEntry::Loading { id: current, .. }) if *current == id
            );
            match &result {
                Ok(model) if still_ours => {
                    entries.insert(url, CacheEntry::Ready(Arc::clone(model)));
                }
                Err(err) => {
                    warn!("{}", err);
                    if still_ours {
                        entries.remove(&url);
                    }
                }
                Ok(_) => {}
            }
            result
        }
        .boxed()
        .shared()
    }

    /// Tries `urls` in order and resolves to the first that loads.
    pub fn load_first_available(
        &self,
        urls: &[String],
    ) -> BoxFuture<'static, Result<Arc<Model>, AssetError>> {
        let cache = self.clone();
        let urls = urls.to_vec();
        async move {
            if urls.is_empty() {
                return Err(AssetError::EmptyCandidates);
            }
            let mut attempts = Vec::with_capacity(urls.len());
            for url in &urls {
                match cache.load(url).await {
                    Ok(model) => {
                        if !attempts.is_empty() {
                            debug!("Resolved {} after {} failed candidates", url, attempts.len());
                        }
                        return Ok(model);
                    }
                    Err(err) => attempts.push(err),
                }
            }
            Err(AssetError::NoneAvailable { attempts })
        }
        .boxed()
    }

    /// The decoded model if it already finished loading.
    pub fn get(&self, url: &str) -> Option<Arc<Model>> {
        match lock(&self.entries).get(url) {
            Some(CacheEntry::Ready(model)) => Some(Arc::clone(model)),
            _ => None,
        }
    }

    pub fn is_loading(&self, url: &str) -> bool {
        matches!(lock(&self.entries).get(url), Some(CacheEntry::Loading { .. }))
    }

    /// Number of URLs that are cached or in flight.
    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for AssetCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetCache").field("entries", &self.len()).finish()
    }
}
