pub mod collecte;
pub mod health;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use sqlx::PgPool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::services::{
    BatchIngestor, LookupService, SubmissionService, VehicleRegistry, VinDecoder,
};
use crate::storage::PhotoStore;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub registry: VehicleRegistry,
    pub submissions: SubmissionService,
    pub batches: BatchIngestor,
    pub lookups: LookupService,
    pub photos: PhotoStore,
}

impl AppState {
    pub fn new(pool: PgPool, config: &Config, decoder: Arc<dyn VinDecoder>) -> Self {
        let registry = VehicleRegistry::new(pool.clone(), decoder);
        let submissions = SubmissionService::new(pool.clone(), registry.clone());
        let batches = BatchIngestor::new(pool.clone(), submissions.clone());
        let lookups = LookupService::new(pool.clone());
        let photos = PhotoStore::new(config.upload_dir.clone());

        Self {
            pool,
            registry,
            submissions,
            batches,
            lookups,
            photos,
        }
    }
}

pub fn router(state: AppState) -> Router {
    // Permissive CORS for the whole /api surface.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_headers(Any)
        .allow_methods(Any)
        .expose_headers(Any);

    Router::new()
        .route("/api/health", get(health::health))
        .route("/api/collecte/vin-check/:vin", get(collecte::vin_check))
        .route("/api/collecte/submit", post(collecte::submit))
        .route("/api/collecte/batch", post(collecte::batch))
        .route("/api/collecte/import-csv", post(collecte::import_csv))
        .route("/api/collecte/upload", post(collecte::upload))
        .route("/api/collecte/stats", get(collecte::stats))
        .route("/api/collecte/verify", get(collecte::verify_chain))
        .route("/api/collecte/verify/:id", get(collecte::verify_submission))
        .route("/api/collecte/lookup/:vin", get(collecte::lookup))
        .route("/api/collecte/templates", get(collecte::templates_index))
        .route("/api/collecte/templates/:name", get(collecte::template_download))
        // 5 photos x 5 MiB plus multipart overhead.
        .layer(DefaultBodyLimit::max(30 * 1024 * 1024))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
