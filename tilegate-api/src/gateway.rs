//! Tile Gateway
//!
//! Turns a raw request query into a tile: derive the cache key, serve a
//! cached entry if one exists, otherwise run the renderer, parse its output
//! and hand the result back while the cache is filled in the background.
//!
//! The gateway only talks to the [`TileStore`], [`RenderInvoker`] and
//! [`ResponseParser`] traits, so each of them can be swapped independently.

use std::sync::Arc;
use std::time::Instant;

use tilegate_core::{
    CacheKey, GatewayResult, KeyDigest, ParsedTile, RenderError, RequestQuery,
};
use tilegate_render::{ProcessInvoker, RenderInvoker, ResponseParser};
use tilegate_storage::{StoreOutcome, TileStore};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::config::GatewayConfig;
use crate::telemetry::metrics;

/// Where a served tile came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileSource {
    Cache,
    Renderer,
}

impl TileSource {
    /// Value of the `X-Tile-Cache` response header.
    pub fn cache_status(&self) -> &'static str {
        match self {
            TileSource::Cache => "hit",
            TileSource::Renderer => "miss",
        }
    }
}

/// A tile ready to be sent to the client.
#[derive(Debug)]
pub struct ServedTile {
    pub tile: ParsedTile,
    pub source: TileSource,
    pub key: CacheKey,

    /// Background cache write started for a freshly rendered tile.
    ///
    /// Dropping the handle detaches the task; the response never waits on it.
    pub cache_fill: Option<JoinHandle<()>>,
}

/// Orchestrates cache lookups, rendering and cache population.
#[derive(Clone)]
pub struct TileGateway {
    store: Arc<dyn TileStore>,
    invoker: Arc<dyn RenderInvoker>,
    parser: Arc<dyn ResponseParser>,
    digest: KeyDigest,
}

impl TileGateway {
    pub fn new(
        store: Arc<dyn TileStore>,
        invoker: Arc<dyn RenderInvoker>,
        parser: Arc<dyn ResponseParser>,
    ) -> Self {
        Self {
            store,
            invoker,
            parser,
            digest: KeyDigest::default(),
        }
    }

    pub fn with_digest(mut self, digest: KeyDigest) -> Self {
        self.digest = digest;
        self
    }

    /// Build a gateway that runs the configured renderer executable.
    pub fn from_config(config: &GatewayConfig, store: Arc<dyn TileStore>) -> Self {
        let invoker = ProcessInvoker::new(&config.renderer_path)
            .with_timeout(config.render_timeout)
            .with_capture(config.output_capture);
        Self::new(store, Arc::new(invoker), config.parser.build()).with_digest(config.key_digest)
    }

    pub fn store(&self) -> &Arc<dyn TileStore> {
        &self.store
    }

    pub fn invoker(&self) -> &Arc<dyn RenderInvoker> {
        &self.invoker
    }

    pub fn parser_name(&self) -> &'static str {
        self.parser.name()
    }

    /// Cache key for `query` under this gateway's digest.
    pub fn key_for(&self, query: &RequestQuery) -> CacheKey {
        self.digest.derive(query)
    }

    /// Serve the tile for a raw query string.
    ///
    /// An absent or empty query fails with `EmptyQuery` before anything else
    /// happens. A cache read error is logged and treated as a miss. On a miss
    /// the rendered tile is returned immediately and written to the cache by
    /// a detached task, so a failed write never affects the response.
    pub async fn serve(&self, raw_query: Option<String>) -> GatewayResult<ServedTile> {
        let query = RequestQuery::from_optional(raw_query)?;
        let key = self.key_for(&query);

        if let Some(bytes) = self.lookup(&key).await {
            debug!(key = %key, bytes = bytes.len(), "Serving tile from cache");
            return Ok(ServedTile {
                tile: ParsedTile::from_cache(bytes),
                source: TileSource::Cache,
                key,
                cache_fill: None,
            });
        }

        let tile = self.render(&query).await?;
        let cache_fill = self.spawn_cache_fill(key.clone(), tile.bytes.clone());

        Ok(ServedTile {
            tile,
            source: TileSource::Renderer,
            key,
            cache_fill: Some(cache_fill),
        })
    }

    async fn lookup(&self, key: &CacheKey) -> Option<Vec<u8>> {
        let (result, hit) = match self.store.lookup(key).await {
            Ok(Some(bytes)) => ("hit", Some(bytes)),
            Ok(None) => ("miss", None),
            Err(e) => {
                warn!(key = %key, error = %e, "Cache lookup failed, rendering instead");
                ("error", None)
            }
        };
        if let Some(m) = metrics() {
            m.record_cache_lookup(result);
        }
        hit
    }

    /// Run the renderer and parse its output.
    async fn render(&self, query: &RequestQuery) -> Result<ParsedTile, RenderError> {
        let started = Instant::now();
        let result = match self.invoker.invoke(query).await {
            Ok(output) => self.parser.parse(&output),
            Err(e) => Err(e),
        };

        let outcome = match &result {
            Ok(tile) => {
                debug!(
                    subtype = %tile.subtype,
                    bytes = tile.len(),
                    parser = self.parser.name(),
                    "Rendered tile"
                );
                "ok"
            }
            Err(RenderError::Rejected { message }) => {
                error!(cause = %message, "Renderer rejected request");
                "rejected"
            }
            Err(RenderError::MessageParseFailed) => {
                error!("Renderer returned an error page without a message");
                "rejected"
            }
            Err(RenderError::Timeout { after }) => {
                error!(timeout_ms = after.as_millis() as u64, "Renderer timed out");
                "timeout"
            }
            Err(e) => {
                error!(error = %e, "Failed to render tile");
                "failed"
            }
        };
        if let Some(m) = metrics() {
            m.record_render(outcome, started.elapsed().as_secs_f64());
        }

        result
    }

    fn spawn_cache_fill(&self, key: CacheKey, bytes: Vec<u8>) -> JoinHandle<()> {
        let store = Arc::clone(&self.store);
        tokio::spawn(async move {
            let result = match store.store(&key, bytes).await {
                Ok(StoreOutcome::Written) => {
                    debug!(key = %key, "Cached tile");
                    "written"
                }
                Ok(StoreOutcome::AlreadyPresent) => {
                    debug!(key = %key, "Tile already cached by another request");
                    "present"
                }
                Err(e) => {
                    warn!(key = %key, error = %e, "Failed to cache tile");
                    "error"
                }
            };
            if let Some(m) = metrics() {
                m.record_cache_store(result);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tilegate_core::{GatewayError, ImageSubtype};
    use tilegate_render::ParserKind;
    use tilegate_test_utils::fixtures::{error_page, png_stream, PNG_BYTES, WMS_QUERY};
    use tilegate_test_utils::{FailingStore, MemoryTileStore, MockInvoker};

    fn gateway(store: Arc<dyn TileStore>, invoker: MockInvoker) -> TileGateway {
        TileGateway::new(store, Arc::new(invoker), ParserKind::Literal.build())
    }

    #[tokio::test]
    async fn test_empty_query_rejected_before_render() {
        let invoker = MockInvoker::returning(png_stream());
        let gw = gateway(Arc::new(MemoryTileStore::new()), invoker.clone());

        assert!(matches!(gw.serve(None).await, Err(GatewayError::EmptyQuery)));
        assert!(matches!(
            gw.serve(Some(String::new())).await,
            Err(GatewayError::EmptyQuery)
        ));
        assert_eq!(invoker.calls(), 0);
    }

    #[tokio::test]
    async fn test_miss_renders_then_fills_cache() -> GatewayResult<()> {
        let store = Arc::new(MemoryTileStore::new());
        let invoker = MockInvoker::returning(png_stream());
        let gw = gateway(store.clone(), invoker.clone());

        let served = gw.serve(Some(WMS_QUERY.to_string())).await?;
        assert_eq!(served.source, TileSource::Renderer);
        assert_eq!(served.tile.subtype, ImageSubtype::Png);
        assert_eq!(served.tile.bytes, PNG_BYTES.to_vec());
        assert_eq!(invoker.queries(), vec![WMS_QUERY.to_string()]);

        if let Some(fill) = served.cache_fill {
            fill.await.expect("cache fill task should not panic");
        }
        assert_eq!(store.lookup(&served.key).await?, Some(PNG_BYTES.to_vec()));

        let again = gw.serve(Some(WMS_QUERY.to_string())).await?;
        assert_eq!(again.source, TileSource::Cache);
        assert_eq!(again.tile.subtype, ImageSubtype::Jpeg);
        assert!(again.cache_fill.is_none());
        assert_eq!(invoker.calls(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_rejection_is_not_cached() -> GatewayResult<()> {
        let store = Arc::new(MemoryTileStore::new());
        let invoker = MockInvoker::returning(error_page("msDrawMap(): Image handling error."));
        let gw = gateway(store.clone(), invoker);

        let err = gw
            .serve(Some("LAYERS=broken".to_string()))
            .await
            .expect_err("error page must not be served");
        assert_eq!(
            err,
            GatewayError::Render(RenderError::Rejected {
                message: "msDrawMap(): Image handling error.".to_string()
            })
        );
        assert!(store.is_empty().await);
        Ok(())
    }

    #[tokio::test]
    async fn test_failing_store_falls_through_to_render() -> GatewayResult<()> {
        let store = Arc::new(FailingStore::new());
        let invoker = MockInvoker::returning(png_stream());
        let gw = gateway(store.clone(), invoker.clone());

        let served = gw.serve(Some("LAYERS=a".to_string())).await?;
        assert_eq!(served.source, TileSource::Renderer);
        if let Some(fill) = served.cache_fill {
            fill.await.expect("cache fill task should not panic");
        }
        assert_eq!(store.writes_attempted(), 1);
        assert_eq!(invoker.calls(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_digest_selects_key_shape() {
        let gw = gateway(
            Arc::new(MemoryTileStore::new()),
            MockInvoker::returning(png_stream()),
        )
        .with_digest(KeyDigest::Sha256);
        let query = RequestQuery::new("a=1").expect("non-empty query");
        assert_eq!(gw.key_for(&query).as_str().len(), 64);
    }
}
