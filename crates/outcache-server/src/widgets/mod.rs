//! Widgets API.
//!
//! Reads are cached per route; writes invalidate the listings and, for a
//! single widget, only the cached variants of that widget.

mod repository;

pub use repository::{Widget, WidgetInput, WidgetRepository, WidgetSummary};

use axum::{
    extract::{Path, Query, State},
    handler::Handler,
    http::StatusCode,
    middleware::from_fn_with_state,
    routing::get,
    Json, Router,
};
use outcache_core::OutcacheResult;
use outcache_rest::{
    cache_output, invalidate_output,
    responses::{created, no_content, ok, ApiResponse, ApiResult, AppError},
    CacheOutputConfig, CacheUntilConfig, InvalidationTarget, OutputCache,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

/// Controller identity of every widgets route.
pub const CONTROLLER: &str = "WidgetsController";

/// State shared by the widgets handlers.
#[derive(Clone)]
pub struct WidgetState {
    pub repository: Arc<WidgetRepository>,
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    tag: Option<String>,
}

/// Creates the widgets router with its cache and invalidation layers.
pub fn router(repository: Arc<WidgetRepository>, cache: &OutputCache) -> OutcacheResult<Router> {
    let widgets = cache.controller(CONTROLLER)?;

    let list = widgets.cache("GetWidgets", CacheOutputConfig::new(60).client_time_span(60))?;
    let one = widgets.cache(
        "GetWidget",
        CacheOutputConfig::new(300).client_time_span(60).must_revalidate(true),
    )?;
    let summary = widgets.cache(
        "GetSummary",
        CacheUntilConfig::new("00:00, 12:00").public(true),
    )?;

    let on_create = widgets.invalidate_targets([
        InvalidationTarget::action("GetWidgets"),
        InvalidationTarget::action("GetSummary"),
    ])?;
    let on_change = widgets.invalidate_targets([
        InvalidationTarget::action("GetWidgets"),
        InvalidationTarget::action("GetSummary"),
        InvalidationTarget::action("GetWidget").with_arguments(["id"]),
    ])?;

    let state = WidgetState { repository };

    Ok(Router::new()
        .route(
            "/widgets",
            get(list_widgets.layer(from_fn_with_state(list, cache_output)))
                .post(create_widget.layer(from_fn_with_state(on_create, invalidate_output))),
        )
        .route(
            "/widgets/:id",
            get(get_widget.layer(from_fn_with_state(one, cache_output)))
                .put(update_widget.layer(from_fn_with_state(on_change.clone(), invalidate_output)))
                .delete(delete_widget.layer(from_fn_with_state(on_change, invalidate_output))),
        )
        .route(
            "/summary",
            get(widget_summary.layer(from_fn_with_state(summary, cache_output))),
        )
        .with_state(state))
}

/// List widgets, optionally filtered by tag.
async fn list_widgets(
    State(state): State<WidgetState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<Widget>> {
    debug!(tag = ?query.tag, "List widgets request");
    ok(state.repository.list(query.tag.as_deref()))
}

/// Get a widget by ID.
async fn get_widget(State(state): State<WidgetState>, Path(id): Path<u64>) -> ApiResult<Widget> {
    debug!("Get widget request: {}", id);
    ok(state.repository.get(id)?)
}

/// Widget counts per tag.
async fn widget_summary(State(state): State<WidgetState>) -> ApiResult<WidgetSummary> {
    ok(state.repository.summary())
}

/// Create a new widget.
async fn create_widget(
    State(state): State<WidgetState>,
    Json(input): Json<WidgetInput>,
) -> Result<(StatusCode, Json<ApiResponse<Widget>>), AppError> {
    debug!("Create widget request: {}", input.name);
    input.validate()?;
    Ok(created(state.repository.create(input)))
}

/// Update a widget.
async fn update_widget(
    State(state): State<WidgetState>,
    Path(id): Path<u64>,
    Json(input): Json<WidgetInput>,
) -> ApiResult<Widget> {
    debug!("Update widget request: {}", id);
    input.validate()?;
    ok(state.repository.update(id, input)?)
}

/// Delete a widget.
async fn delete_widget(
    State(state): State<WidgetState>,
    Path(id): Path<u64>,
) -> Result<StatusCode, AppError> {
    debug!("Delete widget request: {}", id);
    state.repository.delete(id)?;
    Ok(no_content())
}
