//! Tile Endpoint
//!
//! The whole query string of the request is the renderer input; it is never
//! parsed or validated beyond being non-empty.

use std::sync::Arc;

use axum::{
    extract::{RawQuery, State},
    http::{header, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};

use crate::error::ApiResult;
use crate::gateway::{ServedTile, TileGateway};

/// Response header reporting whether the tile came from the cache.
pub const TILE_CACHE_HEADER: HeaderName = HeaderName::from_static("x-tile-cache");

/// GET/HEAD `<base>` - render or serve a cached tile for the raw query.
pub async fn get_tile(
    State(gateway): State<Arc<TileGateway>>,
    RawQuery(query): RawQuery,
) -> ApiResult<Response> {
    let served = gateway.serve(query).await?;
    Ok(tile_response(served))
}

/// Build the success response for a served tile.
pub fn tile_response(served: ServedTile) -> Response {
    // The cache fill handle is dropped here; the write continues detached.
    let ServedTile { tile, source, .. } = served;

    let content_type = HeaderValue::from_str(&tile.subtype.content_type())
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
    let disposition = HeaderValue::from_str(&format!(
        "inline; filename=\"tile.{}\"",
        tile.subtype.extension()
    ))
    .unwrap_or_else(|_| HeaderValue::from_static("inline"));

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_DISPOSITION, disposition),
            (TILE_CACHE_HEADER, HeaderValue::from_static(source.cache_status())),
        ],
        tile.bytes,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tilegate_core::{CacheKey, ImageSubtype, ParsedTile, RequestQuery};

    use crate::gateway::TileSource;

    fn served(subtype: ImageSubtype, source: TileSource) -> ServedTile {
        let query = RequestQuery::new("a=1").expect("non-empty query");
        ServedTile {
            tile: ParsedTile::new(b"bytes".to_vec(), subtype),
            source,
            key: CacheKey::derive(&query),
            cache_fill: None,
        }
    }

    fn header_str<'a>(response: &'a Response, name: &HeaderName) -> Option<&'a str> {
        response.headers().get(name).and_then(|v| v.to_str().ok())
    }

    #[test]
    fn test_png_headers() {
        let response = tile_response(served(ImageSubtype::Png, TileSource::Renderer));
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(header_str(&response, &header::CONTENT_TYPE), Some("image/png"));
        assert_eq!(
            header_str(&response, &header::CONTENT_DISPOSITION),
            Some("inline; filename=\"tile.png\"")
        );
        assert_eq!(header_str(&response, &TILE_CACHE_HEADER), Some("miss"));
    }

    #[test]
    fn test_unresolved_subtype_is_octet_stream() {
        let response = tile_response(served(ImageSubtype::Unresolved, TileSource::Renderer));
        assert_eq!(
            header_str(&response, &header::CONTENT_TYPE),
            Some("application/octet-stream")
        );
        assert_eq!(
            header_str(&response, &header::CONTENT_DISPOSITION),
            Some("inline; filename=\"tile.bin\"")
        );
    }

    #[test]
    fn test_cache_hit_header() {
        let response = tile_response(served(ImageSubtype::Jpeg, TileSource::Cache));
        assert_eq!(header_str(&response, &header::CONTENT_TYPE), Some("image/jpeg"));
        assert_eq!(header_str(&response, &TILE_CACHE_HEADER), Some("hit"));
    }
}
