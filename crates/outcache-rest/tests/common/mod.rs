//! Shared fixture: a small widgets router with cached and invalidating routes.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    extract::{Path, State},
    handler::Handler,
    http::{Request, StatusCode},
    middleware::from_fn_with_state,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use http_body_util::BodyExt;
use outcache_core::{OutcacheError, OutcacheResult};
use outcache_rest::{
    cache_output, invalidate_output, CacheOutputConfig, CacheSettings, InvalidationTarget,
    OutputCache, SkipOutputCache,
};
use outcache_store::{OutputStore, StoredValue, ValueKind};
use serde_json::json;
use outcache_store::LocalOutputStore;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tower::ServiceExt;

/// Handler invocation counter.
#[derive(Clone, Default)]
pub struct Calls(Arc<AtomicUsize>);

impl Calls {
    pub fn hit(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

async fn list_widgets(State(calls): State<Calls>) -> Json<serde_json::Value> {
    calls.hit();
    Json(json!({ "widgets": ["sprocket", "gear"] }))
}

async fn get_widget(State(calls): State<Calls>, Path(id): Path<u32>) -> Response {
    calls.hit();
    if id == 404 {
        return (StatusCode::NOT_FOUND, "missing").into_response();
    }
    Json(json!({ "id": id, "name": format!("widget-{}", id) })).into_response()
}

async fn create_widget(State(calls): State<Calls>) -> StatusCode {
    calls.hit();
    StatusCode::CREATED
}

async fn update_widget(State(calls): State<Calls>, Path(_id): Path<u32>) -> StatusCode {
    calls.hit();
    StatusCode::NO_CONTENT
}

async fn rejected_update(State(calls): State<Calls>) -> StatusCode {
    calls.hit();
    StatusCode::BAD_REQUEST
}

async fn private_report(State(calls): State<Calls>) -> Response {
    calls.hit();
    let mut response = Json(json!({ "report": "secret" })).into_response();
    response.extensions_mut().insert(SkipOutputCache);
    response
}

/// Builds the fixture router on top of `store`.
pub fn router(
    store: Arc<dyn OutputStore>,
    settings: CacheSettings,
    list_config: CacheOutputConfig,
    calls: Calls,
) -> Router {
    let cache = OutputCache::new(store).with_settings(settings);
    let widgets = cache.controller("WidgetsController").unwrap();

    let list = widgets.cache("GetWidgets", list_config).unwrap();
    let one = widgets
        .cache("GetWidget", CacheOutputConfig::new(60).client_time_span(60))
        .unwrap();
    let report = widgets
        .cache("GetReport", CacheOutputConfig::new(60))
        .unwrap();

    let on_create = widgets.invalidate("GetWidgets").unwrap();
    let on_update = widgets
        .invalidate_targets([
            InvalidationTarget::action("GetWidgets"),
            InvalidationTarget::action("GetWidget").with_arguments(["id"]),
        ])
        .unwrap();
    let on_reject = widgets.invalidate("GetWidgets").unwrap();

    Router::new()
        .route(
            "/widgets",
            get(list_widgets.layer(from_fn_with_state(list, cache_output)))
                .post(create_widget.layer(from_fn_with_state(on_create, invalidate_output))),
        )
        .route(
            "/widgets/:id",
            get(get_widget.layer(from_fn_with_state(one, cache_output)))
                .put(update_widget.layer(from_fn_with_state(on_update, invalidate_output))),
        )
        .route(
            "/rejected",
            axum::routing::post(rejected_update.layer(from_fn_with_state(on_reject, invalidate_output))),
        )
        .route(
            "/report",
            get(private_report.layer(from_fn_with_state(report, cache_output))),
        )
        .with_state(calls)
}

pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub async fn send(router: &Router, request: Request<Body>) -> Response {
    router.clone().oneshot(request).await.unwrap()
}

pub async fn body_bytes(response: Response) -> Vec<u8> {
    response.into_body().collect().await.unwrap().to_bytes().to_vec()
}

/// Store whose every call fails.
#[derive(Debug, Default)]
pub struct FailingStore;

#[async_trait]
impl OutputStore for FailingStore {
    async fn contains(&self, _key: &str) -> OutcacheResult<bool> {
        Err(OutcacheError::store_unavailable("connection refused"))
    }

    async fn get(&self, _key: &str, _kind: ValueKind) -> OutcacheResult<Option<StoredValue>> {
        Err(OutcacheError::store_unavailable("connection refused"))
    }

    async fn add(
        &self,
        _key: &str,
        _value: StoredValue,
        _expires_at: DateTime<Utc>,
        _group_key: Option<&str>,
    ) -> OutcacheResult<()> {
        Err(OutcacheError::Timeout("add".to_string()))
    }

    async fn remove(&self, _key: &str) -> OutcacheResult<()> {
        Err(OutcacheError::store_unavailable("connection refused"))
    }

    async fn remove_group(&self, _key: &str) -> OutcacheResult<u64> {
        Err(OutcacheError::store_unavailable("connection refused"))
    }

    fn backend(&self) -> &'static str {
        "failing"
    }
}

/// Local store whose text reads or text writes can be made to fail.
///
/// Payloads are bytes and metadata is text, so this breaks exactly the
/// metadata half of a cached response.
#[derive(Debug, Default)]
pub struct TextFaultStore {
    pub inner: LocalOutputStore,
    fail_text_reads: AtomicBool,
    fail_text_writes: AtomicBool,
}

impl TextFaultStore {
    pub fn fail_text_reads(&self, fail: bool) {
        self.fail_text_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_text_writes(&self, fail: bool) {
        self.fail_text_writes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl OutputStore for TextFaultStore {
    async fn contains(&self, key: &str) -> OutcacheResult<bool> {
        self.inner.contains(key).await
    }

    async fn get(&self, key: &str, kind: ValueKind) -> OutcacheResult<Option<StoredValue>> {
        if kind == ValueKind::Text && self.fail_text_reads.load(Ordering::SeqCst) {
            return Err(OutcacheError::Timeout("get".to_string()));
        }
        self.inner.get(key, kind).await
    }

    async fn add(
        &self,
        key: &str,
        value: StoredValue,
        expires_at: DateTime<Utc>,
        group_key: Option<&str>,
    ) -> OutcacheResult<()> {
        let is_text = matches!(&value, StoredValue::Text(text) if !text.is_empty());
        if is_text && self.fail_text_writes.load(Ordering::SeqCst) {
            return Err(OutcacheError::store_unavailable("connection reset"));
        }
        self.inner.add(key, value, expires_at, group_key).await
    }

    async fn remove(&self, key: &str) -> OutcacheResult<()> {
        self.inner.remove(key).await
    }

    async fn remove_group(&self, key: &str) -> OutcacheResult<u64> {
        self.inner.remove_group(key).await
    }

    fn backend(&self) -> &'static str {
        "text-fault"
    }
}
