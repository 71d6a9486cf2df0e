//! Menu catalog handlers. Read-only pass-through data.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
};

use tableside_core::MenuItem;
use tableside_store::{Direction, Query};

use crate::error::{AppError, Result};
use crate::state::AppState;

const MENU_CACHE_KEY: &str = "menu";

/// `GET /api/menu` - the full catalog, served through the read cache.
pub async fn list_menu(State(state): State<AppState>) -> Result<Json<Vec<MenuItem>>> {
    let items = state
        .menu_cache()
        .try_get_with(MENU_CACHE_KEY, load_menu(state.clone()))
        .await
        .map_err(|err: Arc<AppError>| AppError::Unavailable(err.to_string()))?;
    Ok(Json(items.as_ref().clone()))
}

/// `GET /api/menu/{id}` - a single item, bypassing the cache.
pub async fn get_menu_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MenuItem>> {
    let doc = state
        .menu()
        .get(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("menu/{id}")))?;
    Ok(Json(doc.deserialize()?))
}

async fn load_menu(state: AppState) -> Result<Arc<Vec<MenuItem>>> {
    let docs = state
        .menu()
        .query(&Query::all().order_by("name", Direction::Ascending))
        .await?;
    let items = docs
        .iter()
        .map(tableside_store::Document::deserialize)
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(Arc::new(items))
}
