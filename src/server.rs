//! HTTP server for the rendered status pages

use actix_web::{web, App, HttpResponse, HttpServer, Responder};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub struct AppState {
    pub index_page: PathBuf,
    pub history_page: PathBuf,
    pub started_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct RuntimeStatus {
    status: String,
    version: String,
    started_at: DateTime<Utc>,
    uptime_seconds: i64,
}

async fn serve_page(path: &Path) -> HttpResponse {
    match tokio::fs::read(path).await {
        Ok(body) => HttpResponse::Ok()
            .content_type("text/html; charset=utf-8")
            .body(body),
        Err(e) if e.kind() == ErrorKind::NotFound => HttpResponse::NotFound().finish(),
        Err(e) => {
            warn!("Failed to read {}: {}", path.display(), e);
            HttpResponse::InternalServerError().finish()
        }
    }
}

async fn index(data: web::Data<AppState>) -> impl Responder {
    serve_page(&data.index_page).await
}

async fn history(data: web::Data<AppState>) -> impl Responder {
    serve_page(&data.history_page).await
}

async fn runtime_status(data: web::Data<AppState>) -> impl Responder {
    let now = Utc::now();
    HttpResponse::Ok().json(RuntimeStatus {
        status: "OK".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        started_at: data.started_at,
        uptime_seconds: (now - data.started_at).num_seconds(),
    })
}

async fn method_not_allowed() -> impl Responder {
    HttpResponse::MethodNotAllowed().body("Method Not Allowed!")
}

/// Route table, shared by the server and the tests
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/").route(web::get().to(index)))
        .service(
            web::resource(["/history", "/history/{tail:.*}"]).route(web::get().to(history)),
        )
        .service(
            web::resource(["/status", "/status/{tail:.*}"])
                .route(web::get().to(runtime_status))
                .default_service(web::route().to(method_not_allowed)),
        );
}

/// Serve until the server stops
pub async fn serve(port: u16, index_page: PathBuf, history_page: PathBuf) -> std::io::Result<()> {
    let state = web::Data::new(AppState {
        index_page,
        history_page,
        started_at: Utc::now(),
    });

    info!("Server started on port {}", port);

    HttpServer::new(move || App::new().app_data(state.clone()).configure(configure))
        .bind(("0.0.0.0", port))?
        .run()
        .await
}
