//! HTTP handlers for the drink menu

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;
use kafejo::jwt::CoreClaims;
use kafejo_axum::response::error_response;
use serde::{Deserialize, Serialize};

use crate::claims::guards;
use crate::drinks::{Drink, DrinkSummary, Ingredient, MenuError};
use crate::error::ApiError;
use crate::AppState;

/// The success envelope wrapping drink payloads
#[derive(Debug, Serialize)]
pub struct DrinksResponse<T> {
    pub success: bool,
    pub drinks: Vec<T>,
}

impl<T> DrinksResponse<T> {
    fn of(drinks: Vec<T>) -> Json<Self> {
        Json(Self {
            success: true,
            drinks,
        })
    }
}

/// The success envelope confirming a deletion
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub delete: u32,
}

/// A recipe submitted as either a single ingredient or a list of them
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RecipeBody {
    Many(Vec<Ingredient>),
    One(Ingredient),
}

impl From<RecipeBody> for Vec<Ingredient> {
    fn from(body: RecipeBody) -> Self {
        match body {
            RecipeBody::Many(many) => many,
            RecipeBody::One(one) => vec![one],
        }
    }
}

/// The request body shared by drink creation and drink edits
#[derive(Debug, Deserialize)]
pub struct DrinkBody {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    recipe: Option<RecipeBody>,
}

/// `GET /drinks`
///
/// Public. Recipes are reduced to colors and proportions.
pub async fn list_drinks(State(state): State<AppState>) -> Json<DrinksResponse<DrinkSummary>> {
    let drinks = state.menu.list().iter().map(Drink::summary).collect();
    DrinksResponse::of(drinks)
}

/// `GET /drinks-detail`
///
/// Requires `get:drinks-detail`. Recipes include their full ingredients.
pub async fn drink_details(
    _guard: guards::DrinksDetail,
    State(state): State<AppState>,
) -> Json<DrinksResponse<Drink>> {
    DrinksResponse::of(state.menu.list())
}

/// `POST /drinks`
///
/// Requires `post:drinks`. The new drink is returned in its long form.
pub async fn create_drink(
    guards::PostDrinks(claims): guards::PostDrinks,
    State(state): State<AppState>,
    body: Result<Json<DrinkBody>, JsonRejection>,
) -> Result<Json<DrinksResponse<Drink>>, ApiError> {
    let Json(body) = body?;
    let title = body
        .title
        .filter(|t| !t.is_empty())
        .ok_or(ApiError::Validation("title is required"))?;
    let recipe = body
        .recipe
        .map(Vec::from)
        .filter(|r| !r.is_empty())
        .ok_or(ApiError::Validation("recipe is required"))?;

    let drink = state.menu.create(title, recipe)?;
    tracing::info!(
        id = drink.id,
        subject = claims.sub().map(|s| s.as_str()),
        "drink added to the menu"
    );
    Ok(DrinksResponse::of(vec![drink]))
}

/// `PATCH /drinks/:id`
///
/// Requires `patch:drinks`. The body must carry a title; the recipe is
/// replaced only when one is provided.
pub async fn update_drink(
    _guard: guards::PatchDrinks,
    State(state): State<AppState>,
    id: Result<Path<u32>, PathRejection>,
    body: Result<Json<DrinkBody>, JsonRejection>,
) -> Result<Json<DrinksResponse<Drink>>, ApiError> {
    let id = drink_id(id)?;

    // Unknown drinks report 404 before the body is inspected
    state.menu.get(id)?;

    let Json(body) = body?;
    let title = body
        .title
        .filter(|t| !t.is_empty())
        .ok_or(ApiError::Validation("title is required"))?;

    // An empty recipe list leaves the existing recipe in place
    let recipe = body.recipe.map(Vec::from).filter(|r| !r.is_empty());
    let drink = state.menu.update(id, title, recipe)?;
    Ok(DrinksResponse::of(vec![drink]))
}

/// `DELETE /drinks/:id`
///
/// Requires `delete:drinks`. Responds with the id of the deleted drink.
pub async fn delete_drink(
    _guard: guards::DeleteDrinks,
    State(state): State<AppState>,
    id: Result<Path<u32>, PathRejection>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let id = drink_id(id)?;
    state.menu.delete(id)?;
    tracing::info!(id, "drink removed from the menu");
    Ok(Json(DeleteResponse {
        success: true,
        delete: id,
    }))
}

/// `GET /health`
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Fallback for paths that name no resource
pub async fn not_found() -> Response {
    error_response(StatusCode::NOT_FOUND, "resource not found")
}

/// A path segment that does not parse as an id cannot name a drink
fn drink_id(id: Result<Path<u32>, PathRejection>) -> Result<u32, ApiError> {
    let Path(id) = id.map_err(|_| MenuError::NotFound)?;
    Ok(id)
}
