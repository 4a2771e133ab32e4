// codcall_server/src/main.rs

mod config;
mod db;
mod errors;
mod scheduler;
mod services;
mod state;
mod web;

use crate::config::AppConfig;
use crate::db::PgStore;
use crate::services::{ShopifyClient, VapiClient};
use crate::state::AppState;

use actix_web::{web as actix_data, App, HttpServer};
use codcall::CallFlow;
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan; // For span events in tracing

#[actix_web::main]
async fn main() -> std::io::Result<()> {
  tracing_subscriber::fmt()
    .with_max_level(Level::INFO)
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env()) // Allow RUST_LOG override
    .with_span_events(FmtSpan::CLOSE) // Log when spans close, showing duration
    .init();

  tracing::info!("Starting COD call-confirmation server...");

  let app_config = match AppConfig::from_env() {
    Ok(cfg) => Arc::new(cfg),
    Err(e) => {
      tracing::error!(error = %e, "Failed to load application configuration.");
      return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()));
    }
  };

  let db_pool = match db::connect(
    &app_config.database_url,
    app_config.database_max_connections,
    app_config.http_timeout,
  )
  .await
  {
    Ok(pool) => {
      tracing::info!("Successfully connected to the database.");
      pool
    }
    Err(e) => {
      tracing::error!(error = %e, "Failed to connect to the database.");
      return Err(std::io::Error::new(std::io::ErrorKind::ConnectionRefused, e.to_string()));
    }
  };

  if app_config.apply_schema {
    if let Err(e) = db::apply_schema(&db_pool).await {
      tracing::error!(error = %e, "Failed to apply database schema.");
      return Err(std::io::Error::new(std::io::ErrorKind::Other, e.to_string()));
    }
    tracing::info!("Database schema applied.");
  }

  let providers = VapiClient::new(app_config.vapi_base_url.clone(), app_config.http_timeout).and_then(|vapi| {
    ShopifyClient::new(app_config.shopify_api_version.clone(), app_config.http_timeout).map(|shopify| (vapi, shopify))
  });
  let (vapi, shopify) = match providers {
    Ok(clients) => clients,
    Err(e) => {
      tracing::error!(error = %e, "Failed to build provider HTTP clients.");
      return Err(std::io::Error::new(std::io::ErrorKind::Other, e.to_string()));
    }
  };

  let flow = Arc::new(
    CallFlow::new(Arc::new(PgStore::new(db_pool.clone())), Arc::new(vapi))
      .with_commerce(Arc::new(shopify))
      .with_sync_lookback(chrono::Duration::days(app_config.sync_lookback_days)),
  );

  let app_state = AppState {
    db_pool: db_pool.clone(),
    flow: flow.clone(),
    config: app_config.clone(),
  };

  scheduler::spawn_ticks(flow, app_config.clone());

  let server_address = app_config.server_address();
  tracing::info!("Attempting to bind server to {}...", server_address);

  HttpServer::new(move || {
    App::new()
      .app_data(actix_data::Data::new(app_state.clone())) // Share AppState with handlers
      .app_data(actix_data::JsonConfig::default().limit(2 * 1024 * 1024))
      .wrap(tracing_actix_web::TracingLogger::default()) // Actix middleware for tracing requests
      .configure(web::configure_app_routes)
  })
  .bind(&server_address)?
  .run()
  .await
}
