//! Integration flows against a real database: ordering, fulfillment,
//! auth, and the mood responder. Tests share one database, so each takes
//! the lock and starts from clean tables.

use axum_coffeeshop_api::{
    db::{DbPool, create_pool},
    dto::{
        auth::{LoginRequest, SignupRequest},
        mood::{UpsellItem, UpsellRequest},
        orders::{CreateOrderRequest, OrderItemRequest, UpdateOrderRequest},
        products::UpdateProductRequest,
    },
    error::AppError,
    middleware::auth::AuthUser,
    models::{Category, OrderStatus, Product, Role},
    services::{admin_service, auth_service, mood_service, order_service, product_service},
};
use tokio::sync::Mutex;
use uuid::Uuid;

static DB_LOCK: Mutex<()> = Mutex::const_new(());

async fn connect() -> Option<DbPool> {
    let url = std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .ok();
    let url = match url {
        Some(url) => url,
        None => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
            );
            return None;
        }
    };
    let pool = create_pool(&url).await.expect("connect test database");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("run migrations");
    Some(pool)
}

async fn reset(pool: &DbPool) {
    sqlx::query("TRUNCATE TABLE order_items, orders, audit_logs, products, users CASCADE")
        .execute(pool)
        .await
        .expect("truncate tables");
}

async fn seed_product(
    pool: &DbPool,
    name: &str,
    price: i64,
    category: Category,
    inventory: i32,
) -> Product {
    sqlx::query_as(
        r#"
        INSERT INTO products (id, name, description, price, category, inventory)
        VALUES ($1, $2, NULL, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(name)
    .bind(price)
    .bind(category)
    .bind(inventory)
    .fetch_one(pool)
    .await
    .expect("seed product")
}

async fn inventory_of(pool: &DbPool, id: Uuid) -> i32 {
    let row: (i32,) = sqlx::query_as("SELECT inventory FROM products WHERE id = $1")
        .bind(id)
        .fetch_one(pool)
        .await
        .expect("read inventory");
    row.0
}

fn admin() -> AuthUser {
    AuthUser {
        user_id: Uuid::new_v4(),
        role: Role::Admin,
    }
}

fn order_of(
    items: Vec<(Uuid, i32)>,
    table_number: Option<&str>,
) -> CreateOrderRequest {
    CreateOrderRequest {
        user_id: None,
        table_number: table_number.map(str::to_string),
        notes: None,
        items: items
            .into_iter()
            .map(|(product_id, quantity)| OrderItemRequest {
                product_id,
                quantity,
            })
            .collect(),
    }
}

#[tokio::test]
async fn order_total_is_sum_of_price_snapshots() -> anyhow::Result<()> {
    let Some(pool) = connect().await else {
        return Ok(());
    };
    let _guard = DB_LOCK.lock().await;
    reset(&pool).await;

    let latte = seed_product(&pool, "Latte", 550, Category::Hot, 10).await;
    let cookie = seed_product(&pool, "Chocolate Chip Cookie", 250, Category::Dessert, 5).await;

    let resp =
        order_service::create_order(&pool, order_of(vec![(latte.id, 2), (cookie.id, 1)], Some("7")))
            .await?;
    let detail = resp.data.expect("order detail");

    assert_eq!(detail.order.total, 2 * 550 + 250);
    assert_eq!(detail.order.status, OrderStatus::Pending);
    assert_eq!(detail.order.table_number.as_deref(), Some("7"));
    assert_eq!(detail.items.len(), 2);
    assert_eq!(detail.items[0].unit_price, 550);
    assert_eq!(detail.items[1].unit_price, 250);

    assert_eq!(inventory_of(&pool, latte.id).await, 8);
    assert_eq!(inventory_of(&pool, cookie.id).await, 4);

    Ok(())
}

#[tokio::test]
async fn round_trip_two_units_at_five() -> anyhow::Result<()> {
    let Some(pool) = connect().await else {
        return Ok(());
    };
    let _guard = DB_LOCK.lock().await;
    reset(&pool).await;

    let product = seed_product(&pool, "Cappuccino", 500, Category::Hot, 10).await;

    let resp = order_service::create_order(&pool, order_of(vec![(product.id, 2)], None)).await?;
    let detail = resp.data.expect("order detail");

    assert_eq!(detail.order.total, 1000);
    assert_eq!(detail.items.len(), 1);
    assert_eq!(detail.items[0].quantity, 2);
    assert_eq!(detail.items[0].unit_price, 500);

    Ok(())
}

#[tokio::test]
async fn failing_line_rolls_back_the_whole_order() -> anyhow::Result<()> {
    let Some(pool) = connect().await else {
        return Ok(());
    };
    let _guard = DB_LOCK.lock().await;
    reset(&pool).await;

    let mocha = seed_product(&pool, "Mocha", 600, Category::Hot, 10).await;
    let tiramisu = seed_product(&pool, "Tiramisu", 600, Category::Dessert, 1).await;

    let err = order_service::create_order(
        &pool,
        order_of(vec![(mocha.id, 2), (tiramisu.id, 5)], None),
    )
    .await
    .expect_err("order should fail");
    assert!(matches!(err, AppError::InsufficientInventory { .. }));

    // First line's decrement must not survive the failed second line.
    assert_eq!(inventory_of(&pool, mocha.id).await, 10);
    assert_eq!(inventory_of(&pool, tiramisu.id).await, 1);

    let orders: (i64,) = sqlx::query_as("SELECT count(*) FROM orders")
        .fetch_one(&pool)
        .await?;
    assert_eq!(orders.0, 0);

    Ok(())
}

#[tokio::test]
async fn unknown_product_and_malformed_requests_are_rejected() -> anyhow::Result<()> {
    let Some(pool) = connect().await else {
        return Ok(());
    };
    let _guard = DB_LOCK.lock().await;
    reset(&pool).await;

    let product = seed_product(&pool, "Espresso", 350, Category::Hot, 10).await;

    let err = order_service::create_order(&pool, order_of(vec![(Uuid::new_v4(), 1)], None))
        .await
        .expect_err("unknown product");
    assert!(matches!(err, AppError::NotFound));

    let err = order_service::create_order(&pool, order_of(vec![], None))
        .await
        .expect_err("empty item list");
    assert!(matches!(err, AppError::Validation(_)));

    let err = order_service::create_order(&pool, order_of(vec![(product.id, 0)], None))
        .await
        .expect_err("zero quantity");
    assert!(matches!(err, AppError::Validation(_)));

    assert_eq!(inventory_of(&pool, product.id).await, 10);

    Ok(())
}

#[tokio::test]
async fn concurrent_orders_never_oversell() -> anyhow::Result<()> {
    let Some(pool) = connect().await else {
        return Ok(());
    };
    let _guard = DB_LOCK.lock().await;
    reset(&pool).await;

    let brew = seed_product(&pool, "Cold Brew", 500, Category::Cold, 3).await;

    let (a, b) = tokio::join!(
        order_service::create_order(&pool, order_of(vec![(brew.id, 2)], None)),
        order_service::create_order(&pool, order_of(vec![(brew.id, 2)], None)),
    );

    let successes = [&a, &b].iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1, "exactly one of the racing orders may win");

    let failure = if a.is_err() { a } else { b };
    assert!(matches!(
        failure.expect_err("loser"),
        AppError::InsufficientInventory { .. }
    ));

    assert_eq!(inventory_of(&pool, brew.id).await, 1);

    Ok(())
}

#[tokio::test]
async fn status_follows_the_fulfillment_pipeline() -> anyhow::Result<()> {
    let Some(pool) = connect().await else {
        return Ok(());
    };
    let _guard = DB_LOCK.lock().await;
    reset(&pool).await;

    let admin = admin();
    let product = seed_product(&pool, "Americano", 400, Category::Hot, 10).await;

    let created = order_service::create_order(&pool, order_of(vec![(product.id, 1)], Some("3")))
        .await?
        .data
        .expect("order detail")
        .order;

    // Jumping straight to COMPLETED is not a legal move from PENDING.
    let err = order_service::update_order(
        &pool,
        &admin,
        created.id,
        UpdateOrderRequest {
            status: Some(OrderStatus::Completed),
            notes: None,
        },
    )
    .await
    .expect_err("illegal transition");
    assert!(matches!(err, AppError::Validation(_)));

    for next in [
        OrderStatus::Preparing,
        OrderStatus::Ready,
        OrderStatus::Completed,
    ] {
        let updated = order_service::update_order(
            &pool,
            &admin,
            created.id,
            UpdateOrderRequest {
                status: Some(next),
                notes: None,
            },
        )
        .await?
        .data
        .expect("updated order");
        assert_eq!(updated.status, next);
    }

    let fetched = order_service::get_order(&pool, created.id)
        .await?
        .data
        .expect("order detail");
    assert_eq!(fetched.order.status, OrderStatus::Completed);
    assert_eq!(fetched.order.total, created.total);
    assert_eq!(fetched.order.table_number, created.table_number);
    assert_eq!(fetched.order.created_at, created.created_at);

    // Terminal states accept no further transition.
    let err = order_service::update_order(
        &pool,
        &admin,
        created.id,
        UpdateOrderRequest {
            status: Some(OrderStatus::Cancelled),
            notes: None,
        },
    )
    .await
    .expect_err("completed is terminal");
    assert!(matches!(err, AppError::Validation(_)));

    Ok(())
}

#[tokio::test]
async fn notes_update_leaves_status_alone() -> anyhow::Result<()> {
    let Some(pool) = connect().await else {
        return Ok(());
    };
    let _guard = DB_LOCK.lock().await;
    reset(&pool).await;

    let admin = admin();
    let product = seed_product(&pool, "Croissant", 300, Category::Dessert, 10).await;
    let created = order_service::create_order(&pool, order_of(vec![(product.id, 1)], None))
        .await?
        .data
        .expect("order detail")
        .order;

    let updated = order_service::update_order(
        &pool,
        &admin,
        created.id,
        UpdateOrderRequest {
            status: None,
            notes: Some("no sugar".into()),
        },
    )
    .await?
    .data
    .expect("updated order");

    assert_eq!(updated.status, OrderStatus::Pending);
    assert_eq!(updated.notes.as_deref(), Some("no sugar"));

    Ok(())
}

#[tokio::test]
async fn cancellation_restores_inventory_deletion_does_not() -> anyhow::Result<()> {
    let Some(pool) = connect().await else {
        return Ok(());
    };
    let _guard = DB_LOCK.lock().await;
    reset(&pool).await;

    let admin = admin();
    let muffin = seed_product(&pool, "Blueberry Muffin", 350, Category::Dessert, 10).await;

    let cancelled = order_service::create_order(&pool, order_of(vec![(muffin.id, 2)], None))
        .await?
        .data
        .expect("order detail")
        .order;
    assert_eq!(inventory_of(&pool, muffin.id).await, 8);

    order_service::update_order(
        &pool,
        &admin,
        cancelled.id,
        UpdateOrderRequest {
            status: Some(OrderStatus::Cancelled),
            notes: None,
        },
    )
    .await?;
    assert_eq!(inventory_of(&pool, muffin.id).await, 10);

    let deleted = order_service::create_order(&pool, order_of(vec![(muffin.id, 2)], None))
        .await?
        .data
        .expect("order detail")
        .order;
    assert_eq!(inventory_of(&pool, muffin.id).await, 8);

    order_service::delete_order(&pool, &admin, deleted.id).await?;
    assert_eq!(inventory_of(&pool, muffin.id).await, 8);

    let err = order_service::get_order(&pool, deleted.id)
        .await
        .expect_err("order gone");
    assert!(matches!(err, AppError::NotFound));

    Ok(())
}

#[tokio::test]
async fn unit_price_survives_later_product_edits() -> anyhow::Result<()> {
    let Some(pool) = connect().await else {
        return Ok(());
    };
    let _guard = DB_LOCK.lock().await;
    reset(&pool).await;

    let admin = admin();
    let tea = seed_product(&pool, "Chamomile Tea", 350, Category::Hot, 10).await;

    let created = order_service::create_order(&pool, order_of(vec![(tea.id, 2)], None))
        .await?
        .data
        .expect("order detail")
        .order;

    product_service::update_product(
        &pool,
        &admin,
        tea.id,
        UpdateProductRequest {
            name: None,
            description: None,
            price: Some(999),
            category: None,
            inventory: None,
            image_url: None,
        },
    )
    .await?;

    let fetched = order_service::get_order(&pool, created.id)
        .await?
        .data
        .expect("order detail");
    assert_eq!(fetched.order.total, 700);
    assert_eq!(fetched.items[0].unit_price, 350);
    // The joined product reflects the edit; the snapshot does not.
    assert_eq!(fetched.items[0].product.price, 999);

    Ok(())
}

#[tokio::test]
async fn get_order_is_read_idempotent() -> anyhow::Result<()> {
    let Some(pool) = connect().await else {
        return Ok(());
    };
    let _guard = DB_LOCK.lock().await;
    reset(&pool).await;

    let product = seed_product(&pool, "Iced Latte", 550, Category::Cold, 10).await;
    let created = order_service::create_order(&pool, order_of(vec![(product.id, 1)], None))
        .await?
        .data
        .expect("order detail")
        .order;

    let first = order_service::get_order(&pool, created.id).await?.data;
    let second = order_service::get_order(&pool, created.id).await?.data;
    assert_eq!(
        serde_json::to_value(&first)?,
        serde_json::to_value(&second)?
    );

    Ok(())
}

#[tokio::test]
async fn referenced_product_cannot_be_deleted() -> anyhow::Result<()> {
    let Some(pool) = connect().await else {
        return Ok(());
    };
    let _guard = DB_LOCK.lock().await;
    reset(&pool).await;

    let admin = admin();
    let cheesecake = seed_product(&pool, "Cheesecake Slice", 550, Category::Dessert, 10).await;
    order_service::create_order(&pool, order_of(vec![(cheesecake.id, 1)], None)).await?;

    let err = product_service::delete_product(&pool, &admin, cheesecake.id)
        .await
        .expect_err("referenced product");
    assert!(matches!(err, AppError::Conflict(_)));

    Ok(())
}

#[tokio::test]
async fn signup_login_and_credential_failures() -> anyhow::Result<()> {
    let Some(pool) = connect().await else {
        return Ok(());
    };
    let _guard = DB_LOCK.lock().await;
    reset(&pool).await;
    unsafe { std::env::set_var("JWT_SECRET", "test-secret") };

    let signed_up = auth_service::signup(
        &pool,
        SignupRequest {
            name: "Regular Customer".into(),
            email: "customer@gmail.com".into(),
            password: "customerpassword".into(),
        },
    )
    .await?
    .data
    .expect("auth response");
    assert_eq!(signed_up.user.role, Role::Customer);
    assert!(!signed_up.access_token.is_empty());

    let err = auth_service::signup(
        &pool,
        SignupRequest {
            name: "Someone Else".into(),
            email: "customer@gmail.com".into(),
            password: "other".into(),
        },
    )
    .await
    .expect_err("duplicate email");
    assert!(matches!(err, AppError::EmailAlreadyRegistered));

    let users: (i64,) = sqlx::query_as("SELECT count(*) FROM users")
        .fetch_one(&pool)
        .await?;
    assert_eq!(users.0, 1);

    let logged_in = auth_service::login(
        &pool,
        LoginRequest {
            email: "customer@gmail.com".into(),
            password: "customerpassword".into(),
        },
    )
    .await?
    .data
    .expect("auth response");
    assert_eq!(logged_in.user.id, signed_up.user.id);

    let err = auth_service::login(
        &pool,
        LoginRequest {
            email: "customer@gmail.com".into(),
            password: "wrongpassword".into(),
        },
    )
    .await
    .expect_err("wrong password");
    assert!(matches!(err, AppError::InvalidCredentials));

    let err = auth_service::login(
        &pool,
        LoginRequest {
            email: "nobody@gmail.com".into(),
            password: "whatever".into(),
        },
    )
    .await
    .expect_err("unknown email");
    assert!(matches!(err, AppError::InvalidCredentials));

    Ok(())
}

#[tokio::test]
async fn customers_see_only_their_own_orders() -> anyhow::Result<()> {
    let Some(pool) = connect().await else {
        return Ok(());
    };
    let _guard = DB_LOCK.lock().await;
    reset(&pool).await;
    unsafe { std::env::set_var("JWT_SECRET", "test-secret") };

    let owner = auth_service::signup(
        &pool,
        SignupRequest {
            name: "Owner".into(),
            email: "owner@example.com".into(),
            password: "pw".into(),
        },
    )
    .await?
    .data
    .expect("auth response")
    .user;

    let product = seed_product(&pool, "Iced Mocha", 650, Category::Cold, 10).await;
    let mut request = order_of(vec![(product.id, 1)], None);
    request.user_id = Some(owner.id);
    order_service::create_order(&pool, request).await?;

    let as_owner = AuthUser {
        user_id: owner.id,
        role: Role::Customer,
    };
    let own = order_service::list_orders_by_user(&pool, &as_owner, owner.id)
        .await?
        .data
        .expect("order list");
    assert_eq!(own.items.len(), 1);

    let stranger = AuthUser {
        user_id: Uuid::new_v4(),
        role: Role::Customer,
    };
    let err = order_service::list_orders_by_user(&pool, &stranger, owner.id)
        .await
        .expect_err("stranger");
    assert!(matches!(err, AppError::Forbidden));

    let err = order_service::list_orders(
        &pool,
        &stranger,
        axum_coffeeshop_api::routes::params::OrderListQuery {
            page: None,
            per_page: None,
            status: None,
            sort_order: None,
        },
    )
    .await
    .expect_err("listing all orders is admin-only");
    assert!(matches!(err, AppError::Forbidden));

    Ok(())
}

#[tokio::test]
async fn tired_text_recommends_the_double_espresso() -> anyhow::Result<()> {
    let Some(pool) = connect().await else {
        return Ok(());
    };
    let _guard = DB_LOCK.lock().await;
    reset(&pool).await;

    seed_product(&pool, "Double Espresso", 450, Category::Hot, 100).await;
    seed_product(&pool, "Latte", 550, Category::Hot, 100).await;

    let resp = mood_service::analyze(&pool, "I feel tired").await?;
    assert_eq!(resp.mood, "Tired");
    assert_eq!(resp.product.name, "Double Espresso");
    assert!(resp.message.contains("Double Espresso"));

    Ok(())
}

#[tokio::test]
async fn mood_lookup_degrades_through_the_fallback_chain() -> anyhow::Result<()> {
    let Some(pool) = connect().await else {
        return Ok(());
    };
    let _guard = DB_LOCK.lock().await;
    reset(&pool).await;

    // No Latte on the menu: the Stressed recommendation falls back to the
    // first product with "Coffee" in its name.
    seed_product(&pool, "House Blend Coffee", 400, Category::Hot, 100).await;
    seed_product(&pool, "Croissant", 300, Category::Dessert, 100).await;

    let resp = mood_service::analyze(&pool, "so stressed about my deadline").await?;
    assert_eq!(resp.mood, "Stressed");
    assert_eq!(resp.product.name, "House Blend Coffee");

    Ok(())
}

#[tokio::test]
async fn empty_catalog_reports_no_products_available() -> anyhow::Result<()> {
    let Some(pool) = connect().await else {
        return Ok(());
    };
    let _guard = DB_LOCK.lock().await;
    reset(&pool).await;

    let err = mood_service::analyze(&pool, "I feel happy")
        .await
        .expect_err("empty catalog");
    assert!(matches!(err, AppError::NoCatalogAvailable));

    Ok(())
}

#[tokio::test]
async fn upsell_pairs_coffee_with_a_cookie() -> anyhow::Result<()> {
    let Some(pool) = connect().await else {
        return Ok(());
    };
    let _guard = DB_LOCK.lock().await;
    reset(&pool).await;

    seed_product(&pool, "Chocolate Chip Cookie", 250, Category::Dessert, 50).await;

    let request = UpsellRequest {
        items: vec![UpsellItem {
            name: Some("Latte".into()),
            category: Some(Category::Hot),
        }],
    };
    let resp = mood_service::upsell(&pool, &request.items).await?;
    assert_eq!(resp.suggestion, "Chocolate Chip Cookie");
    assert_eq!(
        resp.product.map(|p| p.name).as_deref(),
        Some("Chocolate Chip Cookie")
    );

    let request = UpsellRequest {
        items: vec![UpsellItem {
            name: Some("Tiramisu".into()),
            category: Some(Category::Dessert),
        }],
    };
    let resp = mood_service::upsell(&pool, &request.items).await?;
    assert_eq!(resp.suggestion, "Bottle of Water");
    assert!(resp.product.is_none());

    Ok(())
}

#[tokio::test]
async fn stats_reflect_orders_and_inventory() -> anyhow::Result<()> {
    let Some(pool) = connect().await else {
        return Ok(());
    };
    let _guard = DB_LOCK.lock().await;
    reset(&pool).await;
    unsafe { std::env::set_var("JWT_SECRET", "test-secret") };

    let admin = admin();
    auth_service::signup(
        &pool,
        SignupRequest {
            name: "Regular Customer".into(),
            email: "customer@gmail.com".into(),
            password: "pw".into(),
        },
    )
    .await?;

    let espresso = seed_product(&pool, "Espresso", 350, Category::Hot, 100).await;
    let tiramisu = seed_product(&pool, "Tiramisu", 600, Category::Dessert, 15).await;

    order_service::create_order(&pool, order_of(vec![(espresso.id, 2)], None)).await?;
    order_service::create_order(&pool, order_of(vec![(tiramisu.id, 1)], None)).await?;

    let stats = admin_service::get_stats(&pool, &admin)
        .await?
        .data
        .expect("stats");
    assert_eq!(stats.total_customers, 1);
    assert_eq!(stats.total_orders, 2);
    assert_eq!(stats.total_revenue, 2 * 350 + 600);
    assert_eq!(stats.low_inventory_count, 1); // tiramisu dropped to 14
    assert_eq!(stats.recent_orders.len(), 2);

    Ok(())
}
