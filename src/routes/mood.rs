use axum::{
    Json, Router,
    extract::{Query, State},
    routing::{get, post},
};

use crate::{
    db::DbPool,
    dto::mood::{MoodAnalyzeRequest, MoodResponse, RecommendQuery, UpsellRequest, UpsellResponse},
    error::AppResult,
    response::{ApiResponse, Meta},
    services::mood_service,
};

pub fn router() -> Router<DbPool> {
    Router::new()
        .route("/analyze", post(analyze_mood))
        .route("/recommend", get(recommend))
        .route("/upsell", post(upsell))
}

#[utoipa::path(
    post,
    path = "/api/mood/analyze",
    request_body = MoodAnalyzeRequest,
    responses(
        (status = 200, description = "Mood with recommended product", body = ApiResponse<MoodResponse>),
        (status = 404, description = "No products available"),
    ),
    tag = "Mood"
)]
pub async fn analyze_mood(
    State(pool): State<DbPool>,
    Json(payload): Json<MoodAnalyzeRequest>,
) -> AppResult<Json<ApiResponse<MoodResponse>>> {
    let data = mood_service::analyze(&pool, &payload.text).await?;
    Ok(Json(ApiResponse::success("Mood", data, Some(Meta::empty()))))
}

#[utoipa::path(
    get,
    path = "/api/mood/recommend",
    params(
        ("mood" = Option<String>, Query, description = "Mood name or free text")
    ),
    responses(
        (status = 200, description = "Recommendation for the given mood", body = ApiResponse<MoodResponse>),
        (status = 404, description = "No products available"),
    ),
    tag = "Mood"
)]
pub async fn recommend(
    State(pool): State<DbPool>,
    Query(query): Query<RecommendQuery>,
) -> AppResult<Json<ApiResponse<MoodResponse>>> {
    let mood = query.mood.unwrap_or_default();
    let data = mood_service::analyze(&pool, &mood).await?;
    Ok(Json(ApiResponse::success("Mood", data, Some(Meta::empty()))))
}

#[utoipa::path(
    post,
    path = "/api/mood/upsell",
    request_body = UpsellRequest,
    responses(
        (status = 200, description = "Suggestion for the current cart", body = ApiResponse<UpsellResponse>),
    ),
    tag = "Mood"
)]
pub async fn upsell(
    State(pool): State<DbPool>,
    Json(payload): Json<UpsellRequest>,
) -> AppResult<Json<ApiResponse<UpsellResponse>>> {
    let data = mood_service::upsell(&pool, &payload.items).await?;
    Ok(Json(ApiResponse::success(
        "Upsell",
        data,
        Some(Meta::empty()),
    )))
}
