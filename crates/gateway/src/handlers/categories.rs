//! Category listing

use axum::{extract::State, Json};
use serde::Serialize;
use uuid::Uuid;

use crate::AppState;
use agora_common::{db::models::Category, errors::Result};

#[derive(Serialize)]
pub struct CategoryResponse {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
}

impl From<Category> for CategoryResponse {
    fn from(category: Category) -> Self {
        Self {
            id: category.id,
            name: category.name,
            description: category.description,
        }
    }
}

pub async fn list_categories(State(state): State<AppState>) -> Result<Json<Vec<CategoryResponse>>> {
    let categories = state.repo().list_categories().await?;
    Ok(Json(categories.into_iter().map(Into::into).collect()))
}
