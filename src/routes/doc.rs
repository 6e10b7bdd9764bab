use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        auth::{AuthResponse, LoginRequest, SignupRequest},
        mood::{MoodAnalyzeRequest, MoodResponse, UpsellItem, UpsellRequest, UpsellResponse},
        orders::{
            CreateOrderRequest, OrderDetail, OrderItemDetail, OrderItemRequest, OrderList,
            UpdateOrderRequest,
        },
        products,
    },
    models::{Category, Order, OrderItem, OrderStatus, Product, Role, User},
    response::{ApiResponse, Meta},
    routes::{
        admin, auth, health, mood, orders, params, products as product_routes,
    },
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::signup,
        auth::login,
        product_routes::list_products,
        product_routes::create_product,
        product_routes::get_product,
        product_routes::update_product,
        product_routes::delete_product,
        orders::create_order,
        orders::list_orders,
        orders::list_orders_by_user,
        orders::get_order,
        orders::update_order,
        orders::delete_order,
        mood::analyze_mood,
        mood::recommend,
        mood::upsell,
        admin::get_stats,
        admin::list_users,
        admin::list_low_stock,
        admin::adjust_inventory
    ),
    components(
        schemas(
            User,
            Product,
            Order,
            OrderItem,
            Role,
            Category,
            OrderStatus,
            SignupRequest,
            LoginRequest,
            AuthResponse,
            products::CreateProductRequest,
            products::UpdateProductRequest,
            products::ProductList,
            CreateOrderRequest,
            OrderItemRequest,
            UpdateOrderRequest,
            OrderItemDetail,
            OrderDetail,
            OrderList,
            MoodAnalyzeRequest,
            MoodResponse,
            UpsellItem,
            UpsellRequest,
            UpsellResponse,
            admin::StatsResponse,
            admin::UserList,
            admin::LowStockQuery,
            admin::InventoryAdjustRequest,
            params::ProductQuery,
            params::OrderListQuery,
            Meta,
            ApiResponse<Product>,
            ApiResponse<products::ProductList>,
            ApiResponse<OrderDetail>,
            ApiResponse<OrderList>,
            ApiResponse<AuthResponse>,
            ApiResponse<MoodResponse>,
            ApiResponse<UpsellResponse>,
            ApiResponse<admin::StatsResponse>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Authentication endpoints"),
        (name = "Products", description = "Catalog endpoints"),
        (name = "Orders", description = "Ordering and fulfillment endpoints"),
        (name = "Mood", description = "Scripted barista recommendation endpoints"),
        (name = "Admin", description = "Admin endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
