use actix_web::{web, HttpResponse, Responder};
use std::sync::Arc;
use validator::Validate;

use crate::core::parse_seed;
use crate::models::{ErrorResponse, HealthResponse, RunPairingRequest, RunPairingResponse};
use crate::services::{PairingService, RunError, RunOptions};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub pairing: Arc<PairingService>,
}

/// Configure all pairing-related routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/health", web::get().to(health_check))
        .route("/pairings/run", web::post().to(run_pairing));
}

/// Health check endpoint
async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// Run a pairing round
///
/// POST /api/v1/pairings/run
///
/// Request body (all fields optional):
/// ```json
/// {
///   "channel": "#randomcoffees",
///   "lookbackDays": 28,
///   "seed": "42",
///   "dryRun": false
/// }
/// ```
async fn run_pairing(
    state: web::Data<AppState>,
    req: web::Json<RunPairingRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        tracing::info!("Validation failed for run_pairing request: {:?}", errors);
        return HttpResponse::BadRequest().json(ErrorResponse {
            error: "Validation failed".to_string(),
            message: errors.to_string(),
            status_code: 400,
        });
    }

    let req = req.into_inner();

    let seed = match req.seed.as_deref().map(parse_seed).transpose() {
        Ok(seed) => seed,
        Err(e) => return error_response(RunError::InvalidInput(e)),
    };

    let options = RunOptions {
        channel: req.channel,
        lookback_days: req.lookback_days,
        seed,
        dry_run: req.dry_run,
    };

    match state.pairing.run(options).await {
        Ok(outcome) => HttpResponse::Ok().json(RunPairingResponse {
            run_id: outcome.run_id.to_string(),
            channel: outcome.channel,
            pairs: outcome.assignment.pairs,
            odd_one_out: outcome.assignment.odd_one_out,
            seen_pairs: outcome.seen_pairs,
            posted: outcome.posted_to.is_some(),
            announcement: outcome.announcement,
        }),
        Err(e) => error_response(e),
    }
}

fn error_response(err: RunError) -> HttpResponse {
    match err {
        RunError::InvalidInput(e) => {
            tracing::info!("Rejected pairing run: {}", e);
            HttpResponse::BadRequest().json(ErrorResponse {
                error: "Invalid input".to_string(),
                message: e.to_string(),
                status_code: 400,
            })
        }
        RunError::Slack(e) => {
            tracing::error!("Pairing run failed talking to Slack: {}", e);
            HttpResponse::BadGateway().json(ErrorResponse {
                error: "Slack request failed".to_string(),
                message: e.to_string(),
                status_code: 502,
            })
        }
    }
}
