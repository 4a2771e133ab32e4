// codcall_server/src/web/routes.rs

use actix_web::{web, HttpResponse};
use serde_json::json;
use tracing::warn;

use crate::state::AppState;
use crate::web::handlers::{
  action_handlers, call_handlers, order_handlers, settings_handlers, store_handlers, webhook_handlers,
};

/// Reports whether the database answers.
async fn health_check_handler(app_state: web::Data<AppState>) -> HttpResponse {
  match sqlx::query("SELECT 1").execute(&app_state.db_pool).await {
    Ok(_) => HttpResponse::Ok().json(json!({ "status": "ok" })),
    Err(e) => {
      warn!(error = %e, "Health check could not reach the database.");
      HttpResponse::ServiceUnavailable().json(json!({ "status": "degraded", "database": "unreachable" }))
    }
  }
}

pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  cfg.service(
    web::scope("/api")
      .route("/health", web::get().to(health_check_handler))
      // Dashboard
      .service(
        web::resource("/orders")
          .route(web::get().to(order_handlers::list_orders_handler))
          .route(web::patch().to(order_handlers::update_order_handler)),
      )
      .route("/calls", web::get().to(call_handlers::list_calls_handler))
      .service(
        web::resource("/settings")
          .route(web::get().to(settings_handlers::get_settings_handler))
          .route(web::post().to(settings_handlers::save_settings_handler)),
      )
      .service(
        web::resource("/stores")
          .route(web::get().to(store_handlers::list_stores_handler))
          .route(web::post().to(store_handlers::create_store_handler))
          .route(web::delete().to(store_handlers::delete_store_handler)),
      )
      // Provider webhooks
      .route("/shopify-webhook", web::post().to(webhook_handlers::shopify_webhook_handler))
      .route("/vapi-callback", web::post().to(webhook_handlers::vapi_callback_handler))
      .route("/vapi-tool", web::post().to(webhook_handlers::vapi_tool_handler))
      // Manual runs
      .route("/trigger-calls", web::post().to(action_handlers::trigger_calls_handler))
      .route("/shopify-sync", web::post().to(action_handlers::shopify_sync_handler))
      .route("/test-call", web::post().to(action_handlers::test_call_handler)),
  );
}
