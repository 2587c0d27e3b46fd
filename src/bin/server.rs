use axum::{
    Json, Router,
    http::StatusCode,
    routing::{get, post},
};
use rebar_optimizer::config::OptimizerConfig;
use rebar_optimizer::report::Report;
use rebar_optimizer::solver::{Solver, group_by_diameter};
use rebar_optimizer::types::{DemandLine, Diameter, deserialize_u32_from_number};
use serde::{Deserialize, Serialize};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

#[derive(Deserialize, Serialize)]
struct OptimizeRequest {
    price_per_ton: f64,
    cuts: Vec<CutRequest>,
    #[serde(flatten)]
    config: OptimizerConfig,
}

#[derive(Deserialize, Serialize)]
struct CutRequest {
    diameter: Diameter,
    length: f64,
    #[serde(deserialize_with = "deserialize_u32_from_number")]
    quantity: u32,
}

async fn optimize(
    Json(req): Json<OptimizeRequest>,
) -> Result<Json<Report>, (StatusCode, String)> {
    tracing::info!(
        body = serde_json::to_string(&req).unwrap_or_default(),
        "POST /optimize"
    );

    let demand = group_by_diameter(
        req.cuts
            .into_iter()
            .map(|c| (c.diameter, DemandLine::new(c.length, c.quantity))),
    );
    let solver = Solver::new(req.config, req.price_per_ton, demand);

    let report = tokio::task::spawn_blocking(move || solver.solve())
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    Ok(Json(report))
}

fn app() -> Router {
    Router::new()
        .route("/up", get(|| async { "ok" }))
        .route("/optimize", post(optimize))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}

fn main() {
    let _sentry = sentry::init(sentry::ClientOptions {
        dsn: std::env::var("SENTRY_DSN").ok().and_then(|dsn| dsn.parse().ok()),
        release: sentry::release_name!(),
        ..Default::default()
    });

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open("development.log")
        .expect("failed to open development.log");

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_target(false)
        .with_ansi(false)
        .with_max_level(Level::INFO)
        .init();

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("failed to build tokio runtime")
        .block_on(serve());
}

async fn serve() {
    let port = std::env::var("PORT").unwrap_or_else(|_| "3001".to_string());
    let addr = format!("0.0.0.0:{port}");

    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    eprintln!("Listening on {addr}");
    axum::serve(listener, app()).await.unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(json: &str) -> OptimizeRequest {
        serde_json::from_str(json).unwrap()
    }

    #[tokio::test]
    async fn test_optimize_returns_report() {
        let req = request(
            r#"{
                "price_per_ton": 1000,
                "seed": 7,
                "trials": 50,
                "cuts": [
                    {"diameter": 16, "length": 4.0, "quantity": 6},
                    {"diameter": 12, "length": 5.0, "quantity": 2.0}
                ]
            }"#,
        );
        let Json(report) = optimize(Json(req)).await.unwrap();
        assert_eq!(report.purchase.len(), 2);
        assert_eq!(report.purchase[0].diameter, Diameter::new(12));
        assert_eq!(report.purchase[0].bars, 1);
        assert_eq!(report.purchase[1].bars, 2);
    }

    #[tokio::test]
    async fn test_optimize_rejects_oversized_piece() {
        let req = request(
            r#"{"price_per_ton": 1000, "cuts": [{"diameter": 20, "length": 13.5, "quantity": 1}]}"#,
        );
        let (status, msg) = optimize(Json(req)).await.unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(msg.contains("diameter 20"));
    }

    #[tokio::test]
    async fn test_optimize_rejects_zero_trials() {
        let req = request(
            r#"{"price_per_ton": 1000, "trials": 0, "cuts": [{"diameter": 8, "length": 1.0, "quantity": 1}]}"#,
        );
        let (status, _) = optimize(Json(req)).await.unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_optimize_rejects_oversized_order() {
        let req = request(
            r#"{"price_per_ton": 1000, "cuts": [{"diameter": 12, "length": 0.05, "quantity": 4294967295}]}"#,
        );
        let (status, msg) = optimize(Json(req)).await.unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(msg.contains("pieces"));
    }

    #[test]
    fn test_request_defaults() {
        let req = request(r#"{"price_per_ton": 0, "cuts": []}"#);
        assert_eq!(req.config, OptimizerConfig::default());
    }
}
