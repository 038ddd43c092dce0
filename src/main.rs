use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer, Responder, get};
use dotenvy::dotenv;
use std::time::Duration;

use oa_portal::auth::session_store;
use oa_portal::config::Config;
use oa_portal::db::{init_db, seed_admin};
use oa_portal::routes;
use tracing::info;
use tracing_appender::rolling;

#[get("/")]
async fn index() -> impl Responder {
    "OA Portal"
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();

    let config = Config::from_env();

    // Rolling daily log
    let file_appender = rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_target(false)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!("Server starting...");

    let pool = init_db(&config.database_url).await;

    seed_admin(&pool, &config)
        .await
        .expect("Failed to seed admin account");

    // Expired sessions are dropped lazily on resolve; this sweep keeps the
    // table from accumulating tokens nobody presents again.
    let purge_pool = pool.clone();
    actix_web::rt::spawn(async move {
        loop {
            match session_store::purge_expired(&purge_pool).await {
                Ok(0) => {}
                Ok(n) => info!(purged = n, "Dropped expired sessions"),
                Err(e) => tracing::warn!(error = %e, "Session purge failed"),
            }
            actix_web::rt::time::sleep(Duration::from_secs(300)).await;
        }
    });

    let server_addr = config.server_addr.clone();
    let config_data = config.clone();

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .app_data(Data::new(pool.clone()))
            .app_data(Data::new(config.clone()))
            .service(index)
            .configure(|cfg| routes::configure(cfg, config_data.clone()))
    })
    .bind(server_addr)?
    .run()
    .await
}
