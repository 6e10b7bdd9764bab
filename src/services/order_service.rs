use std::collections::HashMap;

use uuid::Uuid;

use crate::{
    audit::log_audit,
    db::DbPool,
    dto::orders::{
        CreateOrderRequest, OrderDetail, OrderItemDetail, OrderList, UpdateOrderRequest,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Order, OrderItem, OrderStatus, Product, Role},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder, normalize_page},
};

/// Places an order as one atomic unit: every line's inventory check and
/// decrement plus the order/item inserts commit together or not at all.
/// Rows are locked in request order, so two creates racing on the same
/// product serialize and the second sees the first's decrement.
pub async fn create_order(
    pool: &DbPool,
    payload: CreateOrderRequest,
) -> AppResult<ApiResponse<OrderDetail>> {
    if payload.items.is_empty() {
        return Err(AppError::Validation(
            "order must contain at least one item".into(),
        ));
    }
    for line in &payload.items {
        if line.quantity < 1 {
            return Err(AppError::Validation(format!(
                "quantity must be at least 1 for product {}",
                line.product_id
            )));
        }
    }

    let mut tx = pool.begin().await?;

    if let Some(user_id) = payload.user_id {
        let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(AppError::NotFound);
        }
    }

    let mut total: i64 = 0;
    let mut lines: Vec<(OrderItemRow, Product)> = Vec::new();

    for line in &payload.items {
        let product: Option<Product> =
            sqlx::query_as("SELECT * FROM products WHERE id = $1 FOR UPDATE")
                .bind(line.product_id)
                .fetch_optional(&mut *tx)
                .await?;
        let product = product.ok_or(AppError::NotFound)?;

        if product.inventory < line.quantity {
            return Err(AppError::InsufficientInventory {
                name: product.name,
                available: product.inventory,
                requested: line.quantity,
            });
        }

        sqlx::query("UPDATE products SET inventory = inventory - $2 WHERE id = $1")
            .bind(line.product_id)
            .bind(line.quantity)
            .execute(&mut *tx)
            .await?;

        total += product.price * i64::from(line.quantity);
        lines.push((
            OrderItemRow {
                product_id: line.product_id,
                quantity: line.quantity,
                unit_price: product.price,
            },
            product,
        ));
    }

    let order: Order = sqlx::query_as(
        r#"
        INSERT INTO orders (id, user_id, table_number, status, notes, total)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(payload.user_id)
    .bind(&payload.table_number)
    .bind(OrderStatus::Pending)
    .bind(&payload.notes)
    .bind(total)
    .fetch_one(&mut *tx)
    .await?;

    let mut items: Vec<OrderItemDetail> = Vec::new();
    for (row, product) in lines {
        let item: OrderItem = sqlx::query_as(
            r#"
            INSERT INTO order_items (id, order_id, product_id, quantity, unit_price)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(order.id)
        .bind(row.product_id)
        .bind(row.quantity)
        .bind(row.unit_price)
        .fetch_one(&mut *tx)
        .await?;

        items.push(OrderItemDetail::from_parts(item, product));
    }

    tx.commit().await?;

    tracing::info!(order_id = %order.id, total = order.total, "order placed");

    if let Err(err) = log_audit(
        pool,
        payload.user_id,
        "order_create",
        Some("orders"),
        Some(serde_json::json!({ "order_id": order.id, "total": order.total })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Order placed",
        OrderDetail { order, items },
        Some(Meta::empty()),
    ))
}

struct OrderItemRow {
    product_id: Uuid,
    quantity: i32,
    unit_price: i64,
}

pub async fn list_orders(
    pool: &DbPool,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = normalize_page(query.page, query.per_page);
    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);

    let sql = format!(
        "SELECT * FROM orders WHERE ($1::text IS NULL OR status = $1) ORDER BY created_at {} LIMIT $2 OFFSET $3",
        sort_order.as_sql()
    );
    let orders: Vec<Order> = sqlx::query_as(&sql)
        .bind(query.status)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

    let total: (i64,) =
        sqlx::query_as("SELECT count(*) FROM orders WHERE ($1::text IS NULL OR status = $1)")
            .bind(query.status)
            .fetch_one(pool)
            .await?;

    let items = attach_items(pool, orders).await?;
    let meta = Meta::new(page, limit, total.0);
    Ok(ApiResponse::success("Orders", OrderList { items }, Some(meta)))
}

pub async fn list_orders_by_user(
    pool: &DbPool,
    user: &AuthUser,
    user_id: Uuid,
) -> AppResult<ApiResponse<OrderList>> {
    if user.role != Role::Admin && user.user_id != user_id {
        return Err(AppError::Forbidden);
    }

    let orders: Vec<Order> =
        sqlx::query_as("SELECT * FROM orders WHERE user_id = $1 ORDER BY created_at DESC")
            .bind(user_id)
            .fetch_all(pool)
            .await?;

    let items = attach_items(pool, orders).await?;
    Ok(ApiResponse::success(
        "Orders",
        OrderList { items },
        Some(Meta::empty()),
    ))
}

pub async fn get_order(pool: &DbPool, id: Uuid) -> AppResult<ApiResponse<OrderDetail>> {
    let order: Option<Order> = sqlx::query_as("SELECT * FROM orders WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    let order = order.ok_or(AppError::NotFound)?;

    let detail = attach_items(pool, vec![order])
        .await?
        .pop()
        .ok_or(AppError::NotFound)?;

    Ok(ApiResponse::success("Order", detail, Some(Meta::empty())))
}

/// Partial update of status and notes. Status changes must follow the
/// fulfillment state machine; moving to CANCELLED puts every item's
/// quantity back on the shelf within the same transaction.
pub async fn update_order(
    pool: &DbPool,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateOrderRequest,
) -> AppResult<ApiResponse<Order>> {
    ensure_admin(user)?;

    let mut tx = pool.begin().await?;

    let order: Option<Order> = sqlx::query_as("SELECT * FROM orders WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
    let order = order.ok_or(AppError::NotFound)?;

    let mut status = order.status;
    if let Some(next) = payload.status {
        if next != order.status {
            if !order.status.can_transition_to(next) {
                return Err(AppError::Validation(format!(
                    "illegal status transition {} -> {}",
                    order.status.as_str(),
                    next.as_str()
                )));
            }
            if next == OrderStatus::Cancelled {
                sqlx::query(
                    r#"
                    UPDATE products p
                    SET inventory = p.inventory + oi.quantity
                    FROM order_items oi
                    WHERE oi.order_id = $1 AND p.id = oi.product_id
                    "#,
                )
                .bind(order.id)
                .execute(&mut *tx)
                .await?;
            }
            status = next;
        }
    }

    let notes = payload.notes.or(order.notes);

    let updated: Order = sqlx::query_as(
        "UPDATE orders SET status = $2, notes = $3, updated_at = now() WHERE id = $1 RETURNING *",
    )
    .bind(order.id)
    .bind(status)
    .bind(notes)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    if let Err(err) = log_audit(
        pool,
        Some(user.user_id),
        "order_update",
        Some("orders"),
        Some(serde_json::json!({ "order_id": updated.id, "status": updated.status })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Order updated",
        updated,
        Some(Meta::empty()),
    ))
}

/// Removes the order and its items. Stock is not restored here; that is
/// the cancellation transition's job.
pub async fn delete_order(pool: &DbPool, user: &AuthUser, id: Uuid) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;

    let result = sqlx::query("DELETE FROM orders WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }

    if let Err(err) = log_audit(
        pool,
        Some(user.user_id),
        "order_delete",
        Some("orders"),
        Some(serde_json::json!({ "order_id": id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

/// Loads items and their products for a page of orders in two queries
/// instead of one per order.
async fn attach_items(pool: &DbPool, orders: Vec<Order>) -> AppResult<Vec<OrderDetail>> {
    if orders.is_empty() {
        return Ok(Vec::new());
    }

    let order_ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
    let items: Vec<OrderItem> =
        sqlx::query_as("SELECT * FROM order_items WHERE order_id = ANY($1) ORDER BY created_at")
            .bind(&order_ids)
            .fetch_all(pool)
            .await?;

    let product_ids: Vec<Uuid> = items.iter().map(|i| i.product_id).collect();
    let products: Vec<Product> = sqlx::query_as("SELECT * FROM products WHERE id = ANY($1)")
        .bind(&product_ids)
        .fetch_all(pool)
        .await?;
    let products: HashMap<Uuid, Product> = products.into_iter().map(|p| (p.id, p)).collect();

    let mut details: Vec<OrderDetail> = orders
        .into_iter()
        .map(|order| OrderDetail {
            order,
            items: Vec::new(),
        })
        .collect();
    let index: HashMap<Uuid, usize> = details
        .iter()
        .enumerate()
        .map(|(i, d)| (d.order.id, i))
        .collect();

    for item in items {
        if let (Some(&i), Some(product)) = (
            index.get(&item.order_id),
            products.get(&item.product_id).cloned(),
        ) {
            details[i].items.push(OrderItemDetail::from_parts(item, product));
        }
    }

    Ok(details)
}
