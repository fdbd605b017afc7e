pub mod application;
pub mod config;
pub mod db;
pub mod domain;
pub mod errors;
pub mod handlers;
pub mod infrastructure;
pub mod schema;

use actix_web::{middleware::Logger, web, App, HttpServer};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use application::order_service::OrderService;
use infrastructure::journal_repo::DieselReconciliationJournal;
use infrastructure::ledger::DieselInventoryLedger;
use infrastructure::order_repo::DieselOrderRepository;

pub use config::Config;
pub use db::{create_pool, DbPool};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// The order service wired to its Postgres adapters.
pub type AppService =
    OrderService<DieselOrderRepository, DieselInventoryLedger, DieselReconciliationJournal>;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::orders::create_order,
        handlers::orders::list_orders,
        handlers::orders::get_order,
        handlers::orders::update_order,
        handlers::orders::delete_order,
        handlers::products::get_product,
        handlers::products::adjust_stock,
        handlers::reconciliation::list_pending,
        handlers::reconciliation::replay,
        handlers::reconciliation::resolve,
    ),
    components(schemas(
        handlers::orders::CreateOrderRequest,
        handlers::orders::UpdateOrderRequest,
        handlers::orders::OrderLineRequest,
        handlers::orders::BillDiscountRequest,
        handlers::orders::OrderResponse,
        handlers::orders::OrderLineResponse,
        handlers::orders::DeleteOrderResponse,
        handlers::products::ProductResponse,
        handlers::products::StockAdjustmentRequest,
        handlers::products::StockResponse,
        handlers::reconciliation::JournalEntryResponse,
        handlers::reconciliation::AdjustmentResponse,
    )),
    tags(
        (name = "orders", description = "Order lifecycle with stock reconciliation"),
        (name = "products", description = "Stock counter of catalog products"),
        (name = "reconciliation", description = "Partially applied orders awaiting replay"),
    )
)]
pub struct ApiDoc;

/// Run any pending Diesel migrations against the pool's database.
pub fn run_migrations(pool: &DbPool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut conn = pool.get()?;
    let applied = conn.run_pending_migrations(MIGRATIONS)?;
    if !applied.is_empty() {
        log::info!("Applied {} migration(s)", applied.len());
    }
    Ok(())
}

/// Wires the service to Postgres using one shared pool.
pub fn build_service(pool: DbPool, config: &Config) -> AppService {
    OrderService::new(
        DieselOrderRepository::new(pool.clone()),
        DieselInventoryLedger::new(pool.clone(), config.allow_negative_stock),
        DieselReconciliationJournal::new(pool),
    )
}

/// Registers every route on an actix `App`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    use handlers::{orders, products, reconciliation};

    cfg.service(
        web::scope("/orders")
            .route("", web::post().to(orders::create_order))
            .route("", web::get().to(orders::list_orders))
            .route("/{invoice_id}", web::get().to(orders::get_order))
            .route("/{invoice_id}", web::put().to(orders::update_order))
            .route("/{invoice_id}", web::delete().to(orders::delete_order)),
    )
    .service(
        web::scope("/products")
            .route("/{id}", web::get().to(products::get_product))
            .route("/{id}/stock", web::post().to(products::adjust_stock)),
    )
    .service(
        web::scope("/reconciliation")
            .route("", web::get().to(reconciliation::list_pending))
            .route("/{id}/replay", web::post().to(reconciliation::replay))
            .route("/{id}/resolve", web::post().to(reconciliation::resolve)),
    );
}

/// Build and return an actix-web `Server` bound to `host:port`.
///
/// The caller is responsible for `.await`-ing (or `tokio::spawn`-ing) the
/// returned server.
pub fn build_server(
    service: AppService,
    host: &str,
    port: u16,
) -> std::io::Result<actix_web::dev::Server> {
    let service = web::Data::new(service);
    let openapi = ApiDoc::openapi();

    Ok(HttpServer::new(move || {
        App::new()
            .app_data(service.clone())
            .wrap(Logger::default())
            .configure(configure)
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", openapi.clone()),
            )
    })
    .bind((host.to_string(), port))?
    .run())
}
