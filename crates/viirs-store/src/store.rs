//! Dataset stores: key routing, source resolution and cached decoding.
//!
//! A store maps a dataset key to its configured locator, fetches the bytes
//! through a [`SourceResolver`] and decodes them on the blocking pool. Each
//! store caches its own decoded value per key; the geo reference and raster
//! stores decode the same source independently.

use std::sync::Arc;
use std::time::Instant;

use metrics::counter;
use tracing::{error, info};

use darkness_common::{DatasetKind, DatasetSources, LightPollutionError, LightPollutionResult};

use crate::cache::{DatasetCache, DatasetCacheStats, LoadOutcome};
use crate::source::SourceResolver;

/// Decodes the value a store caches from the raw source bytes.
pub type DecodeFn<V> = fn(&str, &[u8]) -> LightPollutionResult<V>;

/// Cached, single-flight store of one decoded value per dataset key.
pub struct DatasetStore<V> {
    name: &'static str,
    sources: DatasetSources,
    resolver: Arc<dyn SourceResolver>,
    cache: DatasetCache<V>,
    decode: DecodeFn<V>,
}

impl<V> DatasetStore<V>
where
    V: Send + Sync + 'static,
{
    /// Create a store with an explicit decoder.
    pub fn with_decoder(
        name: &'static str,
        sources: DatasetSources,
        resolver: Arc<dyn SourceResolver>,
        decode: DecodeFn<V>,
    ) -> Self {
        Self {
            name,
            sources,
            resolver,
            cache: DatasetCache::new(),
            decode,
        }
    }

    /// Load the value for `key` unless it is already cached.
    ///
    /// Keys that route to no configured dataset are logged and reported as
    /// [`LoadOutcome::Unknown`]; they are not an error and leave no entry.
    pub async fn get_or_load(&self, key: &str) -> LightPollutionResult<LoadOutcome<V>> {
        let Some(kind) = DatasetKind::route(key) else {
            error!(store = self.name, key = %key, "Error while reading TIFF file, unknown key");
            return Ok(LoadOutcome::Unknown);
        };

        let locator = self.sources.locator(kind).to_string();
        let resolver = Arc::clone(&self.resolver);
        let decode = self.decode;
        let name = self.name;
        let owned_key = key.to_string();

        let value = self
            .cache
            .get_or_load(key, move || async move {
                let start = Instant::now();

                let bytes = resolver
                    .open(&locator)
                    .await
                    .map_err(|e| LightPollutionError::tiff_load(owned_key.clone(), e))?;
                let size_bytes = bytes.len();

                let task_key = owned_key.clone();
                let decoded = tokio::task::spawn_blocking(move || decode(&task_key, &bytes))
                    .await
                    .map_err(|e| {
                        LightPollutionError::Internal(format!("{} decode task failed: {}", name, e))
                    })?;

                match &decoded {
                    Ok(_) => {
                        counter!("dataset_decodes_total", "store" => name).increment(1);
                        info!(
                            store = name,
                            key = %owned_key,
                            dataset = %kind,
                            size_bytes,
                            elapsed_ms = start.elapsed().as_millis() as u64,
                            "Dataset loaded"
                        );
                    }
                    Err(e) => {
                        counter!("dataset_decode_failures_total", "store" => name).increment(1);
                        error!(store = name, key = %owned_key, error = %e, "Dataset load failed");
                    }
                }
                decoded
            })
            .await?;

        Ok(LoadOutcome::Loaded(value))
    }

    /// Cached value for `key`, if it has been loaded.
    pub fn get(&self, key: &str) -> Option<Arc<V>> {
        self.cache.get(key)
    }

    /// Keys with a cached value.
    pub fn cached_keys(&self) -> Vec<String> {
        self.cache.keys()
    }

    pub fn stats(&self) -> &DatasetCacheStats {
        self.cache.stats()
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn sources(&self) -> &DatasetSources {
        &self.sources
    }
}
