use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use stockwatch_core::domain::equity::Equity;
use stockwatch_core::domain::recommendation::ActiveRecommendation;
use stockwatch_core::ops::{self, ActionOutcome};
use stockwatch_core::scoring::{scorer_from_settings, Scorer, ScoringOptions};
use stockwatch_core::storage;
use stockwatch_core::storage::watchlist::WatchlistItem;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = stockwatch_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let pool: Option<PgPool> = match settings.require_database_url() {
        Ok(db_url) => match sqlx::postgres::PgPoolOptions::new()
            .max_connections(5)
            .connect(db_url)
            .await
        {
            Ok(pool) => match storage::migrate(&pool).await {
                Ok(()) => Some(pool),
                Err(e) => {
                    sentry_anyhow::capture_anyhow(&e);
                    tracing::error!(error = %e, "db migrations failed; starting API in degraded mode");
                    None
                }
            },
            Err(e) => {
                let err = anyhow::Error::new(e);
                sentry_anyhow::capture_anyhow(&err);
                tracing::error!(error = %err, "db connect failed; starting API in degraded mode");
                None
            }
        },
        Err(e) => {
            sentry_anyhow::capture_anyhow(&e);
            tracing::error!(error = %e, "DATABASE_URL missing; starting API in degraded mode");
            None
        }
    };

    let scorer: Arc<dyn Scorer> = scorer_from_settings(&settings)?.into();
    let state = AppState {
        pool,
        scorer,
        options: ScoringOptions::from_env(),
    };

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/stocks", get(list_stocks))
        .route("/recommendations", get(list_recommendations))
        .route("/admin/import-catalog", post(import_catalog))
        .route("/admin/generate", post(generate_recommendations))
        .route("/admin/upload-csv", post(upload_csv))
        .route(
            "/users/:user_id/watchlist",
            get(list_watchlist).post(add_to_watchlist),
        )
        .route(
            "/users/:user_id/watchlist/:stock_id",
            delete(remove_from_watchlist),
        )
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Clone)]
struct AppState {
    pool: Option<PgPool>,
    scorer: Arc<dyn Scorer>,
    options: ScoringOptions,
}

impl AppState {
    fn pool(&self) -> Result<&PgPool, StatusCode> {
        self.pool.as_ref().ok_or(StatusCode::SERVICE_UNAVAILABLE)
    }
}

fn internal_error(e: anyhow::Error) -> StatusCode {
    sentry_anyhow::capture_anyhow(&e);
    tracing::error!(error = %e, "request failed");
    StatusCode::INTERNAL_SERVER_ERROR
}

async fn list_stocks(State(state): State<AppState>) -> Result<Json<Vec<Equity>>, StatusCode> {
    let pool = state.pool()?;
    let stocks = storage::equities::list(pool).await.map_err(internal_error)?;
    Ok(Json(stocks))
}

async fn list_recommendations(
    State(state): State<AppState>,
) -> Result<Json<Vec<ActiveRecommendation>>, StatusCode> {
    let pool = state.pool()?;
    let recs = storage::recommendations::list_active(pool)
        .await
        .map_err(internal_error)?;
    Ok(Json(recs))
}

/// Mutating bulk operations take a per-operation advisory lock; a second
/// concurrent request gets 409 instead of interleaving replaces. The lock
/// guard pins one pooled connection for the duration so acquire and release
/// happen on the same session.
async fn with_op_lock<F, Fut>(
    pool: &PgPool,
    op: &str,
    f: F,
) -> Result<Json<ActionOutcome>, StatusCode>
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = anyhow::Result<ActionOutcome>>,
{
    let Some(lock) = storage::lock::try_acquire_op_lock(pool, op)
        .await
        .map_err(internal_error)?
    else {
        return Err(StatusCode::CONFLICT);
    };

    let result = f().await;
    if let Err(err) = lock.release().await {
        tracing::warn!(op, error = %err, "failed to release advisory lock");
    }

    result.map(Json).map_err(internal_error)
}

async fn import_catalog(
    State(state): State<AppState>,
) -> Result<Json<ActionOutcome>, StatusCode> {
    let pool = state.pool()?;
    with_op_lock(pool, "import_catalog", || ops::import_catalog(pool)).await
}

async fn generate_recommendations(
    State(state): State<AppState>,
) -> Result<Json<ActionOutcome>, StatusCode> {
    let pool = state.pool()?;
    with_op_lock(pool, "generate", || {
        ops::generate_recommendations(pool, state.scorer.as_ref(), &state.options)
    })
    .await
}

async fn upload_csv(
    State(state): State<AppState>,
    body: String,
) -> Result<Json<ActionOutcome>, StatusCode> {
    let pool = state.pool()?;
    with_op_lock(pool, "ingest_csv", || ops::ingest_csv(pool, &body)).await
}

async fn list_watchlist(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Vec<WatchlistItem>>, StatusCode> {
    let pool = state.pool()?;
    let items = storage::watchlist::list_for_user(pool, user_id)
        .await
        .map_err(internal_error)?;
    Ok(Json(items))
}

#[derive(Debug, Deserialize)]
struct AddWatchlistRequest {
    symbol: String,
}

#[derive(Debug, Serialize)]
struct AddWatchlistResponse {
    added: bool,
    stock_id: Uuid,
}

async fn add_to_watchlist(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(req): Json<AddWatchlistRequest>,
) -> Result<(StatusCode, Json<AddWatchlistResponse>), StatusCode> {
    let pool = state.pool()?;

    let equity = storage::equities::find_by_symbol(pool, &req.symbol)
        .await
        .map_err(internal_error)?
        .ok_or(StatusCode::NOT_FOUND)?;

    let added = storage::watchlist::add(pool, user_id, equity.id)
        .await
        .map_err(internal_error)?;

    let status = if added {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((
        status,
        Json(AddWatchlistResponse {
            added,
            stock_id: equity.id,
        }),
    ))
}

async fn remove_from_watchlist(
    State(state): State<AppState>,
    Path((user_id, stock_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, StatusCode> {
    let pool = state.pool()?;
    let removed = storage::watchlist::remove(pool, user_id, stock_id)
        .await
        .map_err(internal_error)?;

    if removed {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(StatusCode::NOT_FOUND)
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &stockwatch_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
