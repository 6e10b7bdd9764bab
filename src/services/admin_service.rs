use uuid::Uuid;

use crate::{
    audit::log_audit,
    db::DbPool,
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Order, Product, Role, User},
    response::{ApiResponse, Meta},
    routes::{
        admin::{InventoryAdjustRequest, LowStockQuery, ProductList, StatsResponse, UserList},
        params::normalize_page,
    },
};

pub async fn get_stats(pool: &DbPool, user: &AuthUser) -> AppResult<ApiResponse<StatsResponse>> {
    ensure_admin(user)?;

    let total_customers: (i64,) = sqlx::query_as("SELECT count(*) FROM users WHERE role = $1")
        .bind(Role::Customer)
        .fetch_one(pool)
        .await?;

    let total_orders: (i64,) = sqlx::query_as("SELECT count(*) FROM orders")
        .fetch_one(pool)
        .await?;

    let total_revenue: (i64,) = sqlx::query_as(
        "SELECT COALESCE(SUM(unit_price * quantity), 0)::bigint FROM order_items",
    )
    .fetch_one(pool)
    .await?;

    let low_inventory_count: (i64,) =
        sqlx::query_as("SELECT count(*) FROM products WHERE inventory < $1")
            .bind(LOW_STOCK_THRESHOLD)
            .fetch_one(pool)
            .await?;

    let recent_orders: Vec<Order> =
        sqlx::query_as("SELECT * FROM orders ORDER BY created_at DESC LIMIT 10")
            .fetch_all(pool)
            .await?;

    let data = StatsResponse {
        total_customers: total_customers.0,
        total_orders: total_orders.0,
        total_revenue: total_revenue.0,
        low_inventory_count: low_inventory_count.0,
        recent_orders,
    };
    Ok(ApiResponse::success("Stats", data, Some(Meta::empty())))
}

pub async fn list_users(pool: &DbPool, user: &AuthUser) -> AppResult<ApiResponse<UserList>> {
    ensure_admin(user)?;

    let items: Vec<User> = sqlx::query_as("SELECT * FROM users ORDER BY created_at DESC")
        .fetch_all(pool)
        .await?;

    Ok(ApiResponse::success(
        "Users",
        UserList { items },
        Some(Meta::empty()),
    ))
}

const LOW_STOCK_THRESHOLD: i32 = 20;

pub async fn list_low_stock(
    pool: &DbPool,
    user: &AuthUser,
    query: LowStockQuery,
) -> AppResult<ApiResponse<ProductList>> {
    ensure_admin(user)?;
    let threshold = query.threshold.unwrap_or(LOW_STOCK_THRESHOLD);
    let (page, limit, offset) = normalize_page(query.page, query.per_page);

    let items: Vec<Product> = sqlx::query_as(
        r#"
        SELECT * FROM products
        WHERE inventory < $1
        ORDER BY inventory ASC, created_at DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(threshold)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let total: (i64,) = sqlx::query_as("SELECT count(*) FROM products WHERE inventory < $1")
        .bind(threshold)
        .fetch_one(pool)
        .await?;

    let meta = Meta::new(page, limit, total.0);
    Ok(ApiResponse::success(
        "Low stock",
        ProductList { items },
        Some(meta),
    ))
}

pub async fn adjust_inventory(
    pool: &DbPool,
    user: &AuthUser,
    id: Uuid,
    payload: InventoryAdjustRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;
    if payload.delta == 0 {
        return Err(AppError::Validation("delta must not be 0".into()));
    }

    let mut tx = pool.begin().await?;

    let product: Option<Product> =
        sqlx::query_as("SELECT * FROM products WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
    let product = product.ok_or(AppError::NotFound)?;

    let new_inventory = product.inventory + payload.delta;
    if new_inventory < 0 {
        return Err(AppError::Validation("inventory cannot be negative".into()));
    }

    let updated: Product =
        sqlx::query_as("UPDATE products SET inventory = $2 WHERE id = $1 RETURNING *")
            .bind(id)
            .bind(new_inventory)
            .fetch_one(&mut *tx)
            .await?;

    tx.commit().await?;

    if let Err(err) = log_audit(
        pool,
        Some(user.user_id),
        "inventory_adjust",
        Some("products"),
        Some(serde_json::json!({ "product_id": updated.id, "delta": payload.delta })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Inventory updated",
        updated,
        Some(Meta::empty()),
    ))
}
