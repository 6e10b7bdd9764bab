use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{Category, Product};

#[derive(Debug, Deserialize, ToSchema)]
pub struct MoodAnalyzeRequest {
    pub text: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RecommendQuery {
    pub mood: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MoodResponse {
    pub mood: String,
    pub product: Product,
    pub message: String,
}

/// A cart line as the client sees it; only name and category matter here.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpsellItem {
    pub name: Option<String>,
    pub category: Option<Category>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpsellRequest {
    pub items: Vec<UpsellItem>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UpsellResponse {
    pub suggestion: String,
    pub product: Option<Product>,
    pub reason: String,
}
