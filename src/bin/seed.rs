use axum_coffeeshop_api::{
    config::AppConfig, db::create_pool, models::Role, services::auth_service::hash_password,
};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    // Ensure migrations are applied.
    sqlx::migrate!("./migrations").run(&pool).await?;

    let admin_id = ensure_user(
        &pool,
        "admin@caffaine.com",
        "adminpassword",
        "Admin User",
        Role::Admin,
    )
    .await?;
    let customer_id = ensure_user(
        &pool,
        "customer@gmail.com",
        "customerpassword",
        "Regular Customer",
        Role::Customer,
    )
    .await?;
    seed_menu(&pool).await?;

    println!("Seed completed. Admin ID: {admin_id}, Customer ID: {customer_id}");
    Ok(())
}

async fn ensure_user(
    pool: &sqlx::PgPool,
    email: &str,
    password: &str,
    name: &str,
    role: Role,
) -> anyhow::Result<Uuid> {
    let password_hash =
        hash_password(password).map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let row: Option<(Uuid,)> = sqlx::query_as(
        r#"
        INSERT INTO users (id, email, password_hash, name, role)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (email) DO UPDATE SET role = EXCLUDED.role
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(password_hash)
    .bind(name)
    .bind(role)
    .fetch_optional(pool)
    .await?;

    // If user already exists, fetch id
    let user_id = match row {
        Some((id,)) => id,
        None => {
            let existing: (Uuid,) = sqlx::query_as("SELECT id FROM users WHERE email = $1")
                .bind(email)
                .fetch_one(pool)
                .await?;
            existing.0
        }
    };

    println!("Ensured user {email} (role={role:?})");
    Ok(user_id)
}

async fn seed_menu(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    // (name, description, price in minor units, category, inventory)
    let menu: &[(&str, &str, i64, &str, i32)] = &[
        (
            "Espresso",
            "Rich and bold single shot of pure coffee essence",
            350,
            "HOT",
            100,
        ),
        (
            "Double Espresso",
            "Two shots of intense espresso for the serious coffee lover",
            450,
            "HOT",
            100,
        ),
        (
            "Cappuccino",
            "Espresso with steamed milk foam, dusted with cocoa",
            500,
            "HOT",
            100,
        ),
        (
            "Latte",
            "Smooth espresso with creamy steamed milk",
            550,
            "HOT",
            100,
        ),
        (
            "Americano",
            "Espresso diluted with hot water for a milder taste",
            400,
            "HOT",
            100,
        ),
        (
            "Mocha",
            "Espresso with chocolate and steamed milk, topped with whipped cream",
            600,
            "HOT",
            100,
        ),
        (
            "Chamomile Tea",
            "Soothing herbal tea with calming chamomile flowers",
            350,
            "HOT",
            50,
        ),
        (
            "Iced Americano",
            "Chilled espresso with cold water over ice",
            450,
            "COLD",
            100,
        ),
        (
            "Iced Latte",
            "Espresso with cold milk served over ice",
            550,
            "COLD",
            100,
        ),
        (
            "Iced Caramel Macchiato",
            "Vanilla-flavored milk with espresso and caramel drizzle",
            650,
            "COLD",
            100,
        ),
        (
            "Cold Brew",
            "Slow-steeped for 20 hours, smooth and refreshing",
            500,
            "COLD",
            80,
        ),
        (
            "Iced Mocha",
            "Chilled chocolate espresso with milk and whipped cream",
            650,
            "COLD",
            100,
        ),
        (
            "Chocolate Chip Cookie",
            "Freshly baked with gooey chocolate chips",
            250,
            "DESSERT",
            50,
        ),
        (
            "Blueberry Muffin",
            "Soft and moist muffin bursting with blueberries",
            350,
            "DESSERT",
            40,
        ),
        ("Croissant", "Buttery and flaky French pastry", 300, "DESSERT", 30),
        (
            "Cheesecake Slice",
            "Creamy New York style cheesecake with graham crust",
            550,
            "DESSERT",
            20,
        ),
        (
            "Tiramisu",
            "Italian coffee-flavored layered dessert with mascarpone",
            600,
            "DESSERT",
            15,
        ),
    ];

    for (name, description, price, category, inventory) in menu {
        sqlx::query(
            r#"
            INSERT INTO products (id, name, description, price, category, inventory)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (name) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(description)
        .bind(price)
        .bind(category)
        .bind(inventory)
        .execute(pool)
        .await?;
    }

    println!("Seeded menu");
    Ok(())
}
