//! Output caching middleware.
//!
//! On a hit the stored payload is replayed, or a 304 is returned when the
//! client already holds the stored etag. On a miss the handler runs, its body
//! is buffered and the response is stored before it is returned, so the bytes
//! served and the bytes stored are always the same.
//!
//! Store failures never fail a request: they are logged, counted and handled
//! as a miss.

use crate::arguments::{path_arguments, query_pairs};
use crate::context::{CacheOutcome, RequestCacheContext, SkipOutputCache};
use crate::headers::{apply_freshness_headers, if_none_match, set_etag};
use crate::metrics::{record_outcome, record_store_error};
use crate::operation::CacheableOperation;
use axum::{
    body::{Body, Bytes},
    extract::{RawPathParams, State},
    http::{header::CONTENT_TYPE, response::Parts, HeaderMap, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use futures::StreamExt;
use outcache_core::{metadata_key, FreshnessWindow, OutcacheError, OutcacheResult, ResponseMetadata};
use outcache_store::{OutputStoreExt, StoredValue};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Caches the responses of the route it is layered on.
///
/// Install with `axum::middleware::from_fn_with_state(operation, cache_output)`
/// where `operation` comes from
/// [`ControllerScope::cache`](crate::ControllerScope::cache).
pub async fn cache_output(
    State(operation): State<Arc<CacheableOperation>>,
    params: Option<RawPathParams>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !operation.allowed(&request) {
        debug!(route = %operation.identity(), "Output caching bypassed");
        return finish(next.run(request).await, CacheOutcome::Bypass);
    }

    let arguments = path_arguments(params.as_ref());
    let query = query_pairs(request.uri());
    let media_type = operation.media_type(request.headers());
    let key = operation.cache_key(&arguments, &query, &media_type);
    let mut context = RequestCacheContext::new(key, media_type);

    if let Some(response) = serve_cached(&operation, &mut context, request.headers()).await {
        let outcome = served_outcome(&context, &response);
        return finish(response, outcome);
    }

    let response = next.run(request).await;
    let (response, outcome) = capture(&operation, &mut context, response).await;
    finish(response, outcome)
}

fn finish(mut response: Response, outcome: CacheOutcome) -> Response {
    record_outcome(outcome);
    response.extensions_mut().insert(outcome);
    response
}

fn store_failure(operation: &'static str, key: &str, error: &OutcacheError) {
    record_store_error(operation);
    warn!(operation, key, error = %error, "Output store call failed, treating as a miss");
}

/// Looks the request up in the store.
///
/// Returns `None` when the request has to reach the handler: on a miss, when
/// the payload or its metadata is gone, or when any store read fails.
async fn serve_cached(
    operation: &CacheableOperation,
    context: &mut RequestCacheContext,
    headers: &HeaderMap,
) -> Option<Response> {
    let store = operation.store();

    match store.contains(context.key()).await {
        Ok(true) => {}
        Ok(false) => {
            debug!(key = context.key(), "Output cache miss");
            return None;
        }
        Err(e) => {
            store_failure("contains", context.key(), &e);
            return None;
        }
    }

    let metadata: ResponseMetadata = match store.get_json(&metadata_key(context.key())).await {
        Ok(Some(metadata)) => metadata,
        Ok(None) => {
            debug!(key = context.key(), "Cached metadata vanished, running handler");
            return None;
        }
        Err(e) => {
            store_failure("get_metadata", context.key(), &e);
            return None;
        }
    };

    if if_none_match(headers).is_some_and(|candidate| metadata.matches_etag(candidate)) {
        context.mark_served_from_cache();
        debug!(key = context.key(), "Output cache revalidated, returning 304");
        return Some(not_modified(operation, context, &metadata));
    }

    let payload = match store.get_bytes(context.key()).await {
        Ok(Some(payload)) => payload,
        Ok(None) => {
            debug!(key = context.key(), "Cached payload vanished, running handler");
            return None;
        }
        Err(e) => {
            store_failure("get", context.key(), &e);
            return None;
        }
    };

    context.mark_served_from_cache();
    debug!(key = context.key(), bytes = payload.len(), "Output cache hit");
    Some(replay(operation, context, &metadata, payload))
}

fn served_outcome(context: &RequestCacheContext, response: &Response) -> CacheOutcome {
    match (context.served_from_cache(), response.status()) {
        (false, _) => CacheOutcome::Miss,
        (true, StatusCode::NOT_MODIFIED) => CacheOutcome::NotModified,
        (true, _) => CacheOutcome::Hit,
    }
}

fn not_modified(
    operation: &CacheableOperation,
    context: &mut RequestCacheContext,
    metadata: &ResponseMetadata,
) -> Response {
    let window = context.window(operation.freshness_policy());
    let mut response = StatusCode::NOT_MODIFIED.into_response();
    let headers = response.headers_mut();
    set_etag(headers, &metadata.etag_header());
    apply_freshness_headers(headers, operation.directives(), &window, None);
    response
}

fn replay(
    operation: &CacheableOperation,
    context: &mut RequestCacheContext,
    metadata: &ResponseMetadata,
    payload: Vec<u8>,
) -> Response {
    let window = context.window(operation.freshness_policy());
    let mut response = Response::new(Body::from(payload));
    *response.status_mut() = StatusCode::from_u16(metadata.status_code).unwrap_or(StatusCode::OK);

    let content_type = metadata
        .content_type
        .as_deref()
        .unwrap_or(context.media_type());
    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(content_type) {
        headers.insert(CONTENT_TYPE, value);
    }
    set_etag(headers, &metadata.etag_header());
    apply_freshness_headers(
        headers,
        operation.directives(),
        &window,
        Some(metadata.last_modified),
    );
    response
}

/// Result of buffering a handler body.
enum Captured {
    Complete(Bytes),
    /// The body exceeded the limit; carries a body replaying everything.
    Oversized(Body),
}

async fn buffer_body(body: Body, limit: usize) -> Result<Captured, axum::Error> {
    let mut stream = body.into_data_stream();
    let mut chunks: Vec<Bytes> = Vec::new();
    let mut size = 0usize;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        size = size.saturating_add(chunk.len());
        chunks.push(chunk);

        if size > limit {
            let buffered = futures::stream::iter(chunks.into_iter().map(Ok::<_, axum::Error>));
            return Ok(Captured::Oversized(Body::from_stream(buffered.chain(stream))));
        }
    }

    if chunks.len() == 1 {
        return Ok(Captured::Complete(chunks.remove(0)));
    }
    let mut joined = Vec::with_capacity(size);
    for chunk in &chunks {
        joined.extend_from_slice(chunk);
    }
    Ok(Captured::Complete(Bytes::from(joined)))
}

/// Runs the miss path on a fresh handler response.
async fn capture(
    operation: &CacheableOperation,
    context: &mut RequestCacheContext,
    response: Response,
) -> (Response, CacheOutcome) {
    if !response.status().is_success() {
        debug!(
            key = context.key(),
            status = response.status().as_u16(),
            "Handler response not cacheable"
        );
        return (response, CacheOutcome::Miss);
    }

    if response.extensions().get::<SkipOutputCache>().is_some() {
        return (response, CacheOutcome::Bypass);
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match buffer_body(body, operation.settings().max_body_bytes()).await {
        Ok(Captured::Complete(bytes)) => bytes,
        Ok(Captured::Oversized(body)) => {
            debug!(
                key = context.key(),
                limit = operation.settings().max_body_bytes(),
                "Response body too large to cache"
            );
            return (Response::from_parts(parts, body), CacheOutcome::Miss);
        }
        Err(e) => {
            warn!(key = context.key(), error = %e, "Failed to read handler response body");
            return (StatusCode::INTERNAL_SERVER_ERROR.into_response(), CacheOutcome::Miss);
        }
    };

    let now = context.started_at();
    let window = context.window(operation.freshness_policy());
    if window.is_live(now) {
        if let Err(e) = populate(operation, context, &mut parts, &bytes, &window).await {
            store_failure("add", context.key(), &e);
        }
    }

    apply_freshness_headers(&mut parts.headers, operation.directives(), &window, Some(now));
    (Response::from_parts(parts, Body::from(bytes)), CacheOutcome::Miss)
}

/// Stores payload and metadata under the key, linked into the route's group.
async fn populate(
    operation: &CacheableOperation,
    context: &RequestCacheContext,
    parts: &mut Parts,
    bytes: &Bytes,
    window: &FreshnessWindow,
) -> OutcacheResult<()> {
    let store = operation.store();
    let key = context.key();

    // Another request may have stored this variant since the lookup.
    let meta_key = metadata_key(key);
    if store.contains(key).await? && store.contains(&meta_key).await? {
        return Ok(());
    }

    let content_type = parts
        .headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map_or_else(|| context.media_type().to_string(), str::to_string);
    let metadata = ResponseMetadata::new(
        parts.status.as_u16(),
        Some(content_type),
        Uuid::new_v4().to_string(),
        context.started_at(),
    );

    let base_key = operation.base_key();
    let expires_at = window.absolute_expiration;

    store
        .add(&base_key, StoredValue::sentinel(), expires_at, None)
        .await?;
    store
        .add(key, StoredValue::Bytes(bytes.to_vec()), expires_at, Some(&base_key))
        .await?;
    if let Err(e) = store
        .add_json(&meta_key, &metadata, expires_at, Some(&base_key))
        .await
    {
        // A payload without metadata must never be replayed.
        if let Err(cleanup) = store.remove(key).await {
            store_failure("remove", key, &cleanup);
        }
        return Err(e);
    }

    set_etag(&mut parts.headers, &metadata.etag_header());
    debug!(key, group = %base_key, expires_at = %expires_at, "Stored response");
    Ok(())
}
