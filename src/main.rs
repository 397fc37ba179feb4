use actix_web::{App, HttpServer, middleware, web};

use political_ledger::auth::client::AuthClient;
use political_ledger::auth::middleware::require_auth;
use political_ledger::config::AppConfig;
use political_ledger::hub::HubClient;
use political_ledger::{audit, db, handlers};

fn startup_error(context: &str, e: impl std::fmt::Display) -> std::io::Error {
    log::error!("{context}: {e}");
    std::io::Error::other(format!("{context}: {e}"))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // A missing .env is fine; the environment may already be populated.
    let _ = dotenvy::dotenv();
    env_logger::init();

    let config = AppConfig::from_env().map_err(|e| startup_error("Invalid configuration", e))?;
    log::info!("Loaded configuration: {config:?}");
    if config.test_mode {
        log::warn!(
            "Test mode is on: user {} reads every ledger unrestricted",
            config.test_user_id
        );
    }

    let pool = db::init_pool(&config.database_url, config.db_max_connections)
        .await
        .map_err(|e| startup_error("Failed to connect to database", e))?;
    db::run_migrations(&pool)
        .await
        .map_err(|e| startup_error("Failed to run migrations", e))?;

    // Clean up old audit entries based on retention policy
    audit::cleanup_old_entries(&pool, config.audit_retention_days).await;

    let auth = AuthClient::new(
        config.auth_url.clone(),
        &config.auth_anon_key,
        config.http_timeout_secs,
    )
    .map_err(|e| startup_error("Failed to build identity client", e))?;
    let hub = HubClient::new(config.hub_url.clone(), &config.hub_api_key, config.http_timeout_secs)
        .map_err(|e| startup_error("Failed to build Hub client", e))?;

    let bind_addr = config.bind_addr.clone();
    log::info!("Starting server at http://{bind_addr}");

    let pool = web::Data::new(pool);
    let auth = web::Data::new(auth);
    let hub = web::Data::new(hub);
    let config = web::Data::new(config);

    HttpServer::new(move || {
        App::new()
            .wrap(middleware::from_fn(require_auth))
            .wrap(middleware::Logger::default())
            .app_data(pool.clone())
            .app_data(auth.clone())
            .app_data(hub.clone())
            .app_data(config.clone())
            .configure(handlers::configure)
    })
    .bind(bind_addr)?
    .run()
    .await
}
