//! Request handlers for the locallens HTTP surface.
//!
//! Each persistence handler validates its inputs at the boundary, performs
//! exactly one store operation, and maps the outcome straight onto the wire.
//! The relay handlers chain at most two provider calls and pass the results
//! through untouched.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use log::info;
use serde::{Deserialize, Serialize};

use crate::{required, GeoPoint, LensError, NewsArticle, Result, SavedArticle};

use super::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveArticleRequest {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub location: Option<GeoPoint>,
}

#[derive(Debug, Serialize)]
pub struct SaveArticleResponse {
    pub success: bool,
    pub id: String,
}

/// POST /articles - persist one article for the requesting user
pub async fn save_article(
    State(state): State<AppState>,
    Json(req): Json<SaveArticleRequest>,
) -> Result<(StatusCode, Json<SaveArticleResponse>)> {
    required("userId", &req.user_id)?;
    required("title", &req.title)?;
    required("url", &req.url)?;
    required("source", &req.source)?;

    let article = SavedArticle::new(req.user_id, req.title, req.url, req.source, req.location);
    state.store.save_article(&article)?;

    info!("Saved article {} for user {}", article.id, article.user_id);
    Ok((
        StatusCode::CREATED,
        Json(SaveArticleResponse {
            success: true,
            id: article.id,
        }),
    ))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListArticlesQuery {
    #[serde(default)]
    pub user_id: String,
}

/// GET /articles?userId= - the requesting user's saved articles, newest first
pub async fn list_articles(
    State(state): State<AppState>,
    Query(query): Query<ListArticlesQuery>,
) -> Result<Json<Vec<SavedArticle>>> {
    required("userId", &query.user_id)?;

    let articles = state.store.articles_for_user(&query.user_id)?;
    Ok(Json(articles))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteArticleRequest {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub id: String,
}

#[derive(Debug, Serialize)]
pub struct DeleteArticleResponse {
    pub success: bool,
}

/// DELETE /articles - remove one saved article owned by the requesting user
pub async fn delete_article(
    State(state): State<AppState>,
    Json(req): Json<DeleteArticleRequest>,
) -> Result<Json<DeleteArticleResponse>> {
    // An absent id or owner simply matches no record and yields 404
    state.store.delete_article(&req.id, &req.user_id)?;

    Ok(Json(DeleteArticleResponse { success: true }))
}

#[derive(Debug, Deserialize)]
pub struct GeocodeQuery {
    #[serde(default)]
    pub address: String,
}

/// GET /api/geocode?address= - forward geocode a manual location search
pub async fn geocode_address(
    State(state): State<AppState>,
    Query(query): Query<GeocodeQuery>,
) -> Result<Json<GeoPoint>> {
    required("address", &query.address)?;

    let point = state.geocode.geocode_address(&query.address).await?;
    Ok(Json(point))
}

#[derive(Debug, Deserialize)]
pub struct LocalNewsQuery {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct LocalNewsResponse {
    pub city: String,
    pub articles: Vec<NewsArticle>,
}

/// GET /api/news?lat=&lng= - resolve the position to a city, then fetch its
/// recent news
pub async fn local_news(
    State(state): State<AppState>,
    Query(query): Query<LocalNewsQuery>,
) -> Result<Json<LocalNewsResponse>> {
    let lat = query.lat.ok_or(LensError::MissingField { field: "lat" })?;
    let lng = query.lng.ok_or(LensError::MissingField { field: "lng" })?;

    let city = state.geocode.reverse_geocode(lat, lng).await?;
    let articles = state.news.search_news(&city).await?;

    Ok(Json(LocalNewsResponse { city, articles }))
}
