//! HTTP trigger for scheduled ingestion.
//!
//! - `GET /health`: liveness, no auth
//! - `GET /api/ingest-trends`: run the pipeline over every active subscription
//! - `GET /api/llm-probe`: one fixed completion, reply returned as received
//!
//! Both `/api` routes require `Authorization: Bearer <NICHETRACK_INGEST_SECRET>`.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{Router, middleware, routing::get};
use clap::Args;
use sqlx::PgPool;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::config::AppConfig;
use crate::ingest::PipelineDeps;
use crate::store::PgStore;
use crate::telemetry;
use crate::telemetry::ops::serve::Phase as ServePhase;

pub mod auth;
pub mod error_response;
pub mod routes;
pub mod state;

pub use state::AppState;

pub fn create_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/api/ingest-trends", get(routes::ingest_trends))
        .route("/api/llm-probe", get(routes::llm_probe))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::require_bearer));

    Router::new()
        .route("/health", get(routes::health))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Args)]
pub struct ServeCmd {
    /// Listen address (defaults to NICHETRACK_BIND)
    #[arg(long)] pub bind: Option<String>,
}

pub async fn serve(pool: &PgPool, cfg: AppConfig, args: ServeCmd) -> Result<()> {
    let log = telemetry::serve();
    let bind = args.bind.unwrap_or_else(|| cfg.server.bind.clone());

    if cfg.ingest_secret().is_err() {
        log.warn("⚠️ NICHETRACK_INGEST_SECRET is not set; /api routes will answer 500");
    }

    let deps = PipelineDeps::from_config(&cfg, Arc::new(PgStore::new(pool.clone())))
        .context("building ingest clients")?;
    let app = create_router(AppState::new(Arc::new(cfg), deps));

    let listener = {
        let _s = log.span_kv(&ServePhase::Bind, [("address", bind.clone())]).entered();
        TcpListener::bind(&bind).await.with_context(|| format!("binding {bind}"))?
    };
    log.info_kv("🌐 listening", [("address", bind)]);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("http server failed")?;

    log.info("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "could not listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt; // for oneshot

    use crate::config::ConfigSource;
    use crate::llm::openai::MockClient;
    use crate::store::memory::MemoryStore;
    use crate::testing::{Script, StubSource, deps, post};

    const SECRET: &str = "cron-secret";

    struct Harness {
        app: Router,
        stub: Arc<StubSource>,
        store: Arc<MemoryStore>,
    }

    fn harness(env: &[(&str, &str)], stub: StubSource, store: MemoryStore, llm: Option<Arc<MockClient>>) -> Harness {
        let cfg = AppConfig::from_source(&ConfigSource::from_pairs(env.iter().copied())).unwrap();
        let stub = Arc::new(stub);
        let store = Arc::new(store);
        let state = AppState::new(Arc::new(cfg), deps(stub.clone(), store.clone(), llm));
        Harness { app: create_router(state), stub, store }
    }

    fn get_req(uri: &str, token: Option<&str>) -> Request<Body> {
        let mut req = Request::builder().method("GET").uri(uri);
        if let Some(t) = token {
            req = req.header("Authorization", format!("Bearer {t}"));
        }
        req.body(Body::empty()).unwrap()
    }

    async fn json_body(resp: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn subscribed() -> MemoryStore {
        MemoryStore::with_subscriptions([("u1", "Entrepreneur"), ("u1", "startups")])
    }

    fn scripted() -> StubSource {
        StubSource::new()
            .script("Entrepreneur", Script::Status(503))
            .script("startups", Script::Posts(vec![post("startups", "s1", "We launched")]))
    }

    #[tokio::test]
    async fn health_needs_no_token() {
        let h = harness(&[], StubSource::new(), MemoryStore::default(), None);
        let resp = h.app.oneshot(get_req("/health", None)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(json_body(resp).await["status"], "ok");
    }

    #[tokio::test]
    async fn missing_or_wrong_token_is_401() {
        let env = [("NICHETRACK_INGEST_SECRET", SECRET), ("NICHETRACK_SUMMARIZE", "false")];
        let h = harness(&env, scripted(), subscribed(), None);

        let resp = h.app.clone().oneshot(get_req("/api/ingest-trends", None)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let json = json_body(resp).await;
        assert_eq!(json["success"], false);
        assert_eq!(json["error"]["code"], "missing_token");

        let resp = h.app.oneshot(get_req("/api/ingest-trends", Some("guess"))).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(resp).await["error"]["code"], "unauthorized");

        assert_eq!(h.store.subscription_reads(), 0);
        assert_eq!(h.stub.total_calls(), 0);
    }

    #[tokio::test]
    async fn unconfigured_secret_is_500() {
        let h = harness(&[("NICHETRACK_SUMMARIZE", "false")], scripted(), subscribed(), None);
        let resp = h.app.oneshot(get_req("/api/ingest-trends", Some(SECRET))).await.unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(h.stub.total_calls(), 0);
    }

    #[tokio::test]
    async fn missing_llm_key_fails_before_any_work() {
        // summarize defaults to on, so OPENAI_API_KEY is required
        let h = harness(&[("NICHETRACK_INGEST_SECRET", SECRET)], scripted(), subscribed(), None);

        let resp = h.app.oneshot(get_req("/api/ingest-trends", Some(SECRET))).await.unwrap();

        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = json_body(resp).await;
        assert_eq!(json["success"], false);
        assert_eq!(json["error"]["code"], "missing_credentials");
        assert_eq!(h.store.subscription_reads(), 0);
        assert_eq!(h.stub.total_calls(), 0);
        assert!(h.store.items().is_empty());
    }

    #[tokio::test]
    async fn partial_reddit_credentials_fail_before_any_work() {
        let env = [
            ("NICHETRACK_INGEST_SECRET", SECRET),
            ("NICHETRACK_SUMMARIZE", "false"),
            ("REDDIT_CLIENT_ID", "id"),
        ];
        let h = harness(&env, scripted(), subscribed(), None);
        let resp = h.app.oneshot(get_req("/api/ingest-trends", Some(SECRET))).await.unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json_body(resp).await["error"]["code"], "partial_credentials");
        assert_eq!(h.stub.total_calls(), 0);
    }

    #[tokio::test]
    async fn trigger_reports_partial_failure_as_200() {
        let env = [("NICHETRACK_INGEST_SECRET", SECRET), ("NICHETRACK_SUMMARIZE", "false")];
        let h = harness(&env, scripted(), subscribed(), None);

        let resp = h.app.oneshot(get_req("/api/ingest-trends", Some(SECRET))).await.unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        let json = json_body(resp).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["processed"], serde_json::json!(["startups"]));
        assert_eq!(json["failed"], serde_json::json!(["Entrepreneur"]));
        assert_eq!(json["details"][0]["status"], "failed");
        assert_eq!(json["details"][0]["kind"], "fetch");
        assert_eq!(json["totals"]["items"], 1);
        assert_eq!(h.store.items().len(), 1);
    }

    #[tokio::test]
    async fn trigger_summarizes_with_llm() {
        let env = [("NICHETRACK_INGEST_SECRET", SECRET), ("OPENAI_API_KEY", "sk-test")];
        let stub = StubSource::new()
            .script("startups", Script::Posts(vec![post("startups", "s1", "We launched")]))
            .comments("s1", &["Congrats!", "What stack?"]);
        let llm = Arc::new(MockClient::new());
        llm.push_content("Launch announcement with congratulations.");
        let h = harness(&env, stub, MemoryStore::with_subscriptions([("u1", "startups")]), Some(llm));

        let resp = h.app.oneshot(get_req("/api/ingest-trends", Some(SECRET))).await.unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(json_body(resp).await["details"][0]["summarized"], 1);
        assert_eq!(h.store.items()[0].summary.as_deref(), Some("Launch announcement with congratulations."));
    }

    #[tokio::test]
    async fn probe_returns_raw_reply() {
        let env = [("NICHETRACK_INGEST_SECRET", SECRET), ("OPENAI_API_KEY", "sk-test")];
        let llm = Arc::new(MockClient::new());
        llm.push_content("Ahoy, matey!");
        let h = harness(&env, StubSource::new(), MemoryStore::default(), Some(llm));

        let resp = h.app.oneshot(get_req("/api/llm-probe", Some(SECRET))).await.unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        let json = json_body(resp).await;
        assert_eq!(json["status"], 200);
        assert!(json["body"].as_str().unwrap().contains("Ahoy, matey!"));
    }

    #[tokio::test]
    async fn probe_without_llm_is_config_error() {
        let env = [("NICHETRACK_INGEST_SECRET", SECRET)];
        let h = harness(&env, StubSource::new(), MemoryStore::default(), None);
        let resp = h.app.oneshot(get_req("/api/llm-probe", Some(SECRET))).await.unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
