//! Tilegate Test Utilities
//!
//! Centralized test infrastructure for the tilegate workspace:
//! - Mock renderer invokers (scripted, call-counting)
//! - Failing store for error-path tests
//! - Fixtures for renderer output streams
//! - Proptest generators for request queries

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

pub use tilegate_core::{
    CacheError, CacheKey, GatewayError, ImageSubtype, KeyDigest, ParsedTile, RenderError,
    RequestQuery,
};
pub use tilegate_render::{RenderInvoker, ResponseParser};
pub use tilegate_storage::{MemoryTileStore, StoreOutcome, StoreStats, TileStore};

// ============================================================================
// MOCK INVOKER
// ============================================================================

/// Scripted [`RenderInvoker`] that records every call.
///
/// Each call pops the next scripted result; once the script is exhausted the
/// fallback result is returned. Clones share the same script and counters.
#[derive(Debug, Clone)]
pub struct MockInvoker {
    inner: Arc<MockInvokerInner>,
}

#[derive(Debug)]
struct MockInvokerInner {
    script: Mutex<VecDeque<Result<Vec<u8>, RenderError>>>,
    fallback: Result<Vec<u8>, RenderError>,
    calls: AtomicUsize,
    queries: Mutex<Vec<String>>,
    delay: Option<Duration>,
}

impl MockInvoker {
    /// Always return `output`.
    pub fn returning(output: impl Into<Vec<u8>>) -> Self {
        Self::with_fallback(Ok(output.into()))
    }

    /// Always fail with `error`.
    pub fn failing(error: RenderError) -> Self {
        Self::with_fallback(Err(error))
    }

    fn with_fallback(fallback: Result<Vec<u8>, RenderError>) -> Self {
        Self {
            inner: Arc::new(MockInvokerInner {
                script: Mutex::new(VecDeque::new()),
                fallback,
                calls: AtomicUsize::new(0),
                queries: Mutex::new(Vec::new()),
                delay: None,
            }),
        }
    }

    /// Queue results returned before the fallback.
    pub fn then(self, result: Result<Vec<u8>, RenderError>) -> Self {
        if let Ok(mut script) = self.inner.script.lock() {
            script.push_back(result);
        }
        self
    }

    /// Sleep before answering, to widen race windows in concurrency tests.
    pub fn with_delay(self, delay: Duration) -> Self {
        let inner = MockInvokerInner {
            script: Mutex::new(self.inner.script.lock().map(|s| s.clone()).unwrap_or_default()),
            fallback: self.inner.fallback.clone(),
            calls: AtomicUsize::new(0),
            queries: Mutex::new(Vec::new()),
            delay: Some(delay),
        };
        Self {
            inner: Arc::new(inner),
        }
    }

    /// Number of times the renderer was invoked.
    pub fn calls(&self) -> usize {
        self.inner.calls.load(Ordering::SeqCst)
    }

    /// Raw queries the renderer was invoked with, in call order.
    pub fn queries(&self) -> Vec<String> {
        self.inner
            .queries
            .lock()
            .map(|q| q.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl RenderInvoker for MockInvoker {
    async fn invoke(&self, query: &RequestQuery) -> Result<Vec<u8>, RenderError> {
        self.inner.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut queries) = self.inner.queries.lock() {
            queries.push(query.as_str().to_string());
        }
        if let Some(delay) = self.inner.delay {
            tokio::time::sleep(delay).await;
        }
        let scripted = self
            .inner
            .script
            .lock()
            .ok()
            .and_then(|mut script| script.pop_front());
        scripted.unwrap_or_else(|| self.inner.fallback.clone())
    }
}

// ============================================================================
// FAILING STORE
// ============================================================================

/// [`TileStore`] whose reads and writes always fail.
#[derive(Debug, Default)]
pub struct FailingStore {
    writes_attempted: AtomicUsize,
}

impl FailingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn writes_attempted(&self) -> usize {
        self.writes_attempted.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TileStore for FailingStore {
    async fn lookup(&self, key: &CacheKey) -> Result<Option<Vec<u8>>, CacheError> {
        Err(CacheError::Read {
            key: key.to_string(),
            reason: "simulated I/O error".to_string(),
        })
    }

    async fn store(&self, key: &CacheKey, _bytes: Vec<u8>) -> Result<StoreOutcome, CacheError> {
        self.writes_attempted.fetch_add(1, Ordering::SeqCst);
        Err(CacheError::Write {
            key: key.to_string(),
            reason: "simulated disk full".to_string(),
        })
    }

    async fn check(&self) -> Result<(), CacheError> {
        Err(CacheError::Root {
            path: "<failing>".to_string(),
            reason: "simulated".to_string(),
        })
    }

    fn stats(&self) -> StoreStats {
        StoreStats::default()
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

pub mod fixtures {
    /// A minimal PNG: signature, IHDR and IEND chunks.
    pub const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\n\
\x00\x00\x00\rIHDR\x00\x00\x00\x01\x00\x00\x00\x01\x08\x06\x00\x00\x00\x1f\x15\xc4\x89\
\x00\x00\x00\x00IEND\xaeB`\x82";

    /// A minimal JPEG: SOI, APP0 marker and EOI.
    pub const JPEG_BYTES: &[u8] = b"\xff\xd8\xff\xe0\x00\x10JFIF\x00\x01\x01\x00\x00\x01\x00\x01\x00\x00\xff\xd9";

    pub const WMS_QUERY: &str =
        "SERVICE=WMS&VERSION=1.1.1&REQUEST=GetMap&LAYERS=roads&SRS=EPSG:3857&BBOX=0,0,256,256&WIDTH=256&HEIGHT=256&FORMAT=image/png";

    /// Renderer output announcing `image/<subtype>` followed by `body`.
    pub fn cgi_image(subtype: &str, body: &[u8]) -> Vec<u8> {
        let mut out = format!("Content-Type: image/{}\r\n\r\n", subtype).into_bytes();
        out.extend_from_slice(body);
        out
    }

    pub fn png_stream() -> Vec<u8> {
        cgi_image("png", PNG_BYTES)
    }

    pub fn jpeg_stream() -> Vec<u8> {
        cgi_image("jpeg", JPEG_BYTES)
    }

    /// Renderer HTML error page with `message` inside `<body>`.
    pub fn error_page(message: &str) -> Vec<u8> {
        format!(
            "Content-Type: text/html\r\n\r\n<HTML>\n<HEAD><TITLE>MapServer Message</TITLE></HEAD>\n\
             <!-- MapServer version 8.0.1 -->\n<BODY BGCOLOR=\"#FFFFFF\">\n{}\n</BODY></HTML>",
            message
        )
        .into_bytes()
    }

    /// Renderer error page with no `<body>` element.
    pub fn bodyless_error_page() -> Vec<u8> {
        b"<HTML><HEAD><TITLE>MapServer Message</TITLE></HEAD></HTML>".to_vec()
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    use proptest::prelude::*;

    /// Non-empty raw query strings.
    pub fn arb_query() -> impl Strategy<Value = String> {
        "[A-Za-z0-9=&%,:._/-]{1,200}"
    }

    /// Pairs of queries that differ in exactly one character position.
    pub fn arb_near_duplicate_queries() -> impl Strategy<Value = (String, String)> {
        ("[a-z0-9=&]{1,100}", any::<prop::sample::Index>(), "[a-z0-9=&]").prop_filter_map(
            "replacement must differ",
            |(base, index, replacement)| {
                let chars: Vec<char> = base.chars().collect();
                let pos = index.index(chars.len());
                let replacement = replacement.chars().next()?;
                if chars[pos] == replacement {
                    return None;
                }
                let mut other = chars.clone();
                other[pos] = replacement;
                Some((base, other.into_iter().collect()))
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_invoker_script_then_fallback() {
        let invoker = MockInvoker::returning(b"fallback".to_vec())
            .then(Err(RenderError::MessageParseFailed));
        let query = RequestQuery::new("a=1").expect("non-empty query");

        assert_eq!(invoker.invoke(&query).await, Err(RenderError::MessageParseFailed));
        assert_eq!(invoker.invoke(&query).await, Ok(b"fallback".to_vec()));
        assert_eq!(invoker.calls(), 2);
        assert_eq!(invoker.queries(), vec!["a=1".to_string(), "a=1".to_string()]);
    }

    #[tokio::test]
    async fn test_failing_store() {
        let store = FailingStore::new();
        let key = CacheKey::derive(&RequestQuery::new("a=1").expect("non-empty query"));
        assert!(store.lookup(&key).await.is_err());
        assert!(store.store(&key, vec![1]).await.is_err());
        assert_eq!(store.writes_attempted(), 1);
    }
}
