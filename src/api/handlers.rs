use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::{
    api::models::*,
    db::{
        self,
        models::RecipeDetails,
        search::{FilterResults, RecipeFilter},
    },
    rag::{HybridSearchResults, IndexingStatus, RagEngine},
    Result,
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pool: sqlx::SqlitePool,
    pub engine: Arc<RagEngine>,
    pub settings: crate::config::Settings,
}

/// GET /api/recipes/search - Structured filter search
pub async fn filter_search(
    State(state): State<AppState>,
    Query(params): Query<FilterParams>,
) -> Result<Json<FilterResults>> {
    debug!("Filter search request: {:?}", params);

    let filter = RecipeFilter {
        q: params.q,
        include_ingredients: split_csv(&params.include_ingredients),
        exclude_ingredients: split_csv(&params.exclude_ingredients),
        tags: split_csv(&params.tags),
        category: params.category.unwrap_or_default(),
        cal_min: params.cal_min,
        cal_max: params.cal_max,
        nutrient: params.nutrient.unwrap_or_default(),
        nutrient_max: params.nutrient_max,
        page: params.page,
        page_size: params.page_size,
    };
    filter.validate()?;

    let results = db::search::search_recipes(&state.pool, &filter).await?;
    Ok(Json(results))
}

/// GET /api/recipes/:id - Full recipe details
pub async fn get_recipe(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<RecipeDetails>> {
    debug!("Get recipe request: {}", id);

    let details = db::recipes::get_recipe_with_details(&state.pool, id).await?;
    Ok(Json(details))
}

/// GET /api/tags - Tag names with usage counts
pub async fn list_tags(State(state): State<AppState>) -> Result<Json<Vec<db::models::NameCount>>> {
    Ok(Json(db::tags::get_tags_with_count(&state.pool).await?))
}

/// GET /api/categories - Category names with usage counts
pub async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<db::models::NameCount>>> {
    Ok(Json(db::categories::get_categories_with_count(&state.pool).await?))
}

/// POST /api/search - Natural-language hybrid search
pub async fn hybrid_search(
    State(state): State<AppState>,
    Json(request): Json<HybridSearchRequest>,
) -> Result<Json<HybridSearchResults>> {
    debug!("Hybrid search request: {:?}", request);

    let results = state
        .engine
        .hybrid_search(&state.pool, &request.query, request.page, request.page_size)
        .await?;
    Ok(Json(results))
}

/// POST /api/admin/reindex - Start a full rebuild of the vector index.
/// The claim is taken synchronously so a concurrent start gets 409; the
/// rebuild itself runs in a background task and is observed via the status
/// endpoint.
pub async fn start_reindex(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<IndexingStatus>)> {
    let claim = state.engine.claim_indexing()?;
    info!("Reindex started");

    let engine = Arc::clone(&state.engine);
    let pool = state.pool.clone();
    tokio::spawn(async move {
        match engine.run_indexing_from_store(claim, &pool).await {
            Ok(indexed) => info!("Reindex finished: {indexed} recipes embedded"),
            Err(e) => error!("Reindex failed: {e}"),
        }
    });

    Ok((StatusCode::ACCEPTED, Json(state.engine.indexing_status())))
}

/// GET /api/admin/reindex/status - Indexing status snapshot
pub async fn reindex_status(State(state): State<AppState>) -> Result<Json<IndexingStatus>> {
    Ok(Json(state.engine.indexing_status()))
}

/// POST /api/admin/reindex/reload - Re-attach to the persisted index
pub async fn reload_index(State(state): State<AppState>) -> Result<Json<ReloadResponse>> {
    let loaded = state.engine.reload().await?;
    Ok(Json(ReloadResponse { loaded }))
}

/// GET /api/stats - System statistics
pub async fn get_stats(State(state): State<AppState>) -> Result<Json<Stats>> {
    debug!("Get stats request");

    let total_recipes = db::recipes::count_all_recipes(&state.pool).await?;
    let total_ingredients = db::ingredients::count_ingredients(&state.pool).await?;
    let total_tags = db::tags::count_tags(&state.pool).await?;
    let total_categories = db::categories::count_categories(&state.pool).await?;

    Ok(Json(Stats {
        total_recipes,
        total_ingredients,
        total_tags,
        total_categories,
        indexed_vectors: state.engine.vector_count(),
    }))
}

/// GET /health - Health check endpoint
pub async fn health_check() -> Result<Json<HealthResponse>> {
    Ok(Json(HealthResponse {
        status: "ok".to_string(),
    }))
}
