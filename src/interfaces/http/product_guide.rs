use crate::application::CatalogService;
use crate::shared::{AppError, LocationId};
use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

#[derive(Clone)]
pub struct ProductGuideState {
    pub catalog_service: CatalogService,
}

#[derive(Debug, Serialize)]
pub struct ProductGuideItem {
    pub name: String,
    pub category_id: String,
}

/// §6: the unauthenticated public menu endpoint. Lists active items only
/// — there is no `AuthUser` extractor here, and the response deliberately
/// carries none of an item's operational fields (barcode, vendor, cost).
pub async fn product_guide_handler(
    State(state): State<ProductGuideState>,
    Path(location_id): Path<LocationId>,
) -> Result<Json<Vec<ProductGuideItem>>, AppError> {
    let items = state.catalog_service.list_items(location_id).await?;
    Ok(Json(
        items
            .into_iter()
            .filter(|i| i.active)
            .map(|i| ProductGuideItem {
                name: i.name,
                category_id: i.category_id.to_string(),
            })
            .collect(),
    ))
}
