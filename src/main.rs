use dotenvy::dotenv;
use pos_order_service::{build_server, build_service, create_pool, run_migrations, Config};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = Config::from_env().map_err(std::io::Error::other)?;
    let pool = create_pool(&config.database_url, config.db_pool_max_size)
        .map_err(std::io::Error::other)?;
    run_migrations(&pool).map_err(std::io::Error::other)?;

    if !config.allow_negative_stock {
        log::info!("Strict stock policy: decrements below zero are refused");
    }
    log::info!("Starting server at http://{}:{}", config.host, config.port);

    build_server(build_service(pool, &config), &config.host, config.port)?.await
}
