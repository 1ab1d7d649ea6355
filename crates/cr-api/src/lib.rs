use std::env;
use std::net::{IpAddr, SocketAddr};
use std::num::NonZeroU32;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use axum::{
    Router,
    body::Body,
    extract::DefaultBodyLimit,
    extract::State,
    extract::connect_info::ConnectInfo,
    http::Method,
    http::Request,
    http::header::{CONTENT_TYPE, HeaderName, HeaderValue},
    middleware,
    middleware::Next,
    response::Response,
    routing::{get, post},
};
use clap::{Parser, ValueEnum};
use cr_common::db::{PgRankingStore, create_pool_from_url_checked, run_migrations};
use cr_common::logging::{LoggingConfig, init_tracing_subscriber};
use cr_common::matching::{MatchingConfig, ScoringEngine, TierThresholds};
use cr_common::ranking::{RankingConfig, RankingOrchestrator};
use cr_common::skill_normalizer::SkillMatching;
use cr_common::sources::{DirectorySource, MemorySource};
use cr_common::store::{MemoryRankingStore, RankingStore};
use dotenvy::dotenv;
use governor::{
    Quota, RateLimiter, clock::DefaultClock, middleware::NoOpMiddleware,
    state::keyed::DashMapStateStore,
};
use strum::AsRefStr;
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::info;

pub mod error;
pub mod handlers;

use error::ApiError;
use handlers::{health, rankings};

const SHUTDOWN_DRAIN_GRACE: Duration = Duration::from_millis(200);
const DEFAULT_METRICS_PORT: u16 = 9102;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum StoreBackend {
    Memory,
    Postgres,
}

#[derive(Debug, Clone, Parser)]
#[command(name = "cr-api", about = "HTTP API for the candidate ranking engine")]
struct Cli {
    /// Server port
    #[arg(long, env = "PORT", default_value_t = 3001)]
    port: u16,

    /// Where ranking runs are kept: memory | postgres
    #[arg(long, env = "CR_STORE", default_value = "memory", value_enum)]
    store: StoreBackend,

    /// PostgreSQL connection string, required for CR_STORE=postgres
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Directory holding parsed_jds/ and parsed_resumes/
    #[arg(long, env = "CR_DATA_DIR", default_value = "data")]
    data_dir: PathBuf,

    /// Comma separated list of allowed CORS origins
    #[arg(long, env = "CR_CORS_ORIGINS", default_value = "http://localhost:3000")]
    cors_origins: String,

    /// Blocking scoring workers per run (defaults to available parallelism)
    #[arg(long, env = "CR_RANK_WORKERS")]
    rank_workers: Option<usize>,

    /// Upper bound on one ranking computation, in milliseconds
    #[arg(long, env = "CR_RANK_TIMEOUT_MS", default_value_t = 30_000)]
    rank_timeout_ms: u64,

    /// Skill comparison: exact | aliased
    #[arg(long, env = "CR_SKILL_MATCHING", default_value = "exact")]
    skill_matching: SkillMatching,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub store: StoreBackend,
    pub database_url: Option<String>,
    pub data_dir: PathBuf,
    pub cors_origins: Vec<String>,
    pub ranking: RankingConfig,
    pub skill_matching: SkillMatching,
}

impl AppConfig {
    fn from_cli(cli: Cli) -> Result<Self, ApiError> {
        let cors_origins = cli
            .cors_origins
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect::<Vec<_>>();

        if cors_origins.iter().any(|origin| origin == "*") {
            return Err(ApiError::Config(
                "CR_CORS_ORIGINS must list explicit origins".into(),
            ));
        }

        if cli.store == StoreBackend::Postgres && cli.database_url.is_none() {
            return Err(ApiError::Config(
                "DATABASE_URL is required when CR_STORE=postgres".into(),
            ));
        }

        if cli.rank_timeout_ms == 0 {
            return Err(ApiError::Config("CR_RANK_TIMEOUT_MS must be positive".into()));
        }

        let defaults = RankingConfig::default();
        let workers = match cli.rank_workers {
            Some(0) => return Err(ApiError::Config("CR_RANK_WORKERS must be positive".into())),
            Some(workers) => workers,
            None => defaults.workers,
        };

        Ok(Self {
            port: cli.port,
            store: cli.store,
            database_url: cli.database_url,
            data_dir: cli.data_dir,
            cors_origins,
            ranking: RankingConfig {
                workers,
                compute_timeout: Duration::from_millis(cli.rank_timeout_ms),
            },
            skill_matching: cli.skill_matching,
        })
    }

    pub fn for_tests() -> Self {
        Self {
            port: 3001,
            store: StoreBackend::Memory,
            database_url: None,
            data_dir: PathBuf::from("data"),
            cors_origins: vec!["http://localhost:3000".into()],
            ranking: RankingConfig {
                workers: 2,
                compute_timeout: Duration::from_secs(5),
            },
            skill_matching: SkillMatching::Exact,
        }
    }
}

type IpRateLimiter = RateLimiter<IpAddr, DashMapStateStore<IpAddr>, DefaultClock, NoOpMiddleware>;

#[derive(Clone)]
pub struct RateLimits {
    global: Arc<IpRateLimiter>,
    rank: Arc<IpRateLimiter>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub global_per_sec: u64,
    pub global_burst: u32,
    pub rank_per_sec: u64,
    pub rank_burst: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            global_per_sec: 20,
            global_burst: 40,
            rank_per_sec: 2,
            rank_burst: 5,
        }
    }
}

impl RateLimitConfig {
    fn parse_env<T: std::str::FromStr + PartialOrd + Default>(name: &str) -> Option<T> {
        env::var(name)
            .ok()
            .and_then(|value| value.trim().parse::<T>().ok())
            .filter(|value| *value > T::default())
    }

    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            global_per_sec: Self::parse_env("CR_RATE_LIMIT_GLOBAL_PER_SEC")
                .unwrap_or(defaults.global_per_sec),
            global_burst: Self::parse_env("CR_RATE_LIMIT_GLOBAL_BURST")
                .unwrap_or(defaults.global_burst),
            rank_per_sec: Self::parse_env("CR_RATE_LIMIT_RANK_PER_SEC")
                .unwrap_or(defaults.rank_per_sec),
            rank_burst: Self::parse_env("CR_RATE_LIMIT_RANK_BURST").unwrap_or(defaults.rank_burst),
        }
    }

    pub fn build(&self) -> RateLimits {
        RateLimits {
            global: build_ip_limiter(self.global_per_sec, self.global_burst),
            rank: build_ip_limiter(self.rank_per_sec, self.rank_burst),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<RankingOrchestrator>,
    pub config: AppConfig,
    pub(crate) rate_limits: RateLimits,
    pub readiness: Arc<AtomicBool>,
}

pub type SharedState = Arc<AppState>;

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed = origins
        .iter()
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect::<Vec<_>>();

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, HeaderName::from_static("x-request-id")])
}

fn build_ip_limiter(per_second: u64, burst_size: u32) -> Arc<IpRateLimiter> {
    let nanos_per_token = 1_000_000_000u64 / per_second.max(1);
    let burst = NonZeroU32::new(burst_size).unwrap_or(NonZeroU32::MIN);
    let quota = Quota::with_period(Duration::from_nanos(nanos_per_token.max(1)))
        .unwrap_or_else(|| Quota::per_second(NonZeroU32::MIN))
        .allow_burst(burst);

    Arc::new(RateLimiter::keyed(quota))
}

pub fn default_rate_limits() -> RateLimits {
    RateLimitConfig::from_env().build()
}

fn request_ip<B>(req: &Request<B>) -> Option<IpAddr> {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip())
}

fn enforce_rate_limit(limiter: &IpRateLimiter, ip: Option<IpAddr>) -> Result<(), ApiError> {
    if let Some(client_ip) = ip {
        if limiter.check_key(&client_ip).is_err() {
            return Err(ApiError::TooManyRequests("rate limit exceeded".into()));
        }
    }

    Ok(())
}

async fn global_rate_limit(
    State(state): State<SharedState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    enforce_rate_limit(&state.rate_limits.global, request_ip(&req))?;
    Ok(next.run(req).await)
}

async fn rank_rate_limit(
    State(state): State<SharedState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    enforce_rate_limit(&state.rate_limits.rank, request_ip(&req))?;
    Ok(next.run(req).await)
}

async fn attach_request_id_context(req: Request<Body>, next: Next) -> Result<Response, ApiError> {
    let request_id = req
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_string());

    Ok(error::with_request_id(request_id, next.run(req)).await)
}

pub fn create_router(state: SharedState) -> Router {
    let cors = cors_layer(&state.config.cors_origins);

    let request_id_header = HeaderName::from_static("x-request-id");
    let trace_header = request_id_header.clone();

    let trace = TraceLayer::new_for_http().make_span_with(move |request: &Request<Body>| {
        let request_id = request
            .headers()
            .get(&trace_header)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("");

        tracing::info_span!(
            "http_request",
            method = %request.method(),
            uri = %request.uri(),
            request_id = %request_id,
            status = tracing::field::Empty,
        )
    });

    let api_routes = Router::new()
        .route(
            "/rank/:job_id",
            post(rankings::rank_job).route_layer(middleware::from_fn_with_state(
                state.clone(),
                rank_rate_limit,
            )),
        )
        .route("/ranking/:ranking_id", get(rankings::get_ranking))
        .route("/rankings", get(rankings::list_rankings));

    Router::new()
        .route("/health", get(health::readyz))
        .route("/livez", get(health::livez))
        .route("/readyz", get(health::readyz))
        .nest("/api", api_routes)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            global_rate_limit,
        ))
        .layer(middleware::from_fn(attach_request_id_context))
        .layer(DefaultBodyLimit::max(64 * 1024))
        .layer(trace)
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(SetRequestIdLayer::new(
            request_id_header,
            MakeRequestUuid,
        ))
        .layer(cors)
        .with_state(state)
}

/// In-memory state over `source`, used by the router tests.
pub fn test_state_with_source(source: Arc<MemorySource>) -> SharedState {
    let config = AppConfig::for_tests();
    let orchestrator = RankingOrchestrator::new(
        source.clone(),
        source,
        Arc::new(MemoryRankingStore::new()),
    )
    .with_config(config.ranking);

    Arc::new(AppState {
        orchestrator: Arc::new(orchestrator),
        config,
        rate_limits: RateLimitConfig::default().build(),
        readiness: Arc::new(AtomicBool::new(true)),
    })
}

pub fn test_state() -> SharedState {
    test_state_with_source(Arc::new(MemorySource::new()))
}

/// Test state with explicit rate limits, for exercising the 429 path.
pub fn test_state_with_limits(source: Arc<MemorySource>, limits: RateLimitConfig) -> SharedState {
    let base = test_state_with_source(source);
    Arc::new(AppState {
        orchestrator: base.orchestrator.clone(),
        config: base.config.clone(),
        rate_limits: limits.build(),
        readiness: base.readiness.clone(),
    })
}

async fn build_store(config: &AppConfig) -> Result<Arc<dyn RankingStore>, ApiError> {
    match config.store {
        StoreBackend::Memory => Ok(Arc::new(MemoryRankingStore::new())),
        StoreBackend::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .ok_or_else(|| ApiError::Config("DATABASE_URL is not set".into()))?;
            let pool = create_pool_from_url_checked(url)
                .await
                .map_err(|err| ApiError::Database(format!("failed to create pool: {err}")))?;
            run_migrations(&pool)
                .await
                .map_err(|err| ApiError::Database(format!("failed to run migrations: {err}")))?;
            Ok(Arc::new(PgRankingStore::new(pool)))
        }
    }
}

pub async fn run() -> Result<(), ApiError> {
    dotenv().ok();
    init_tracing_subscriber(env!("CARGO_PKG_NAME"), &LoggingConfig::from_env());

    let cli = Cli::parse();
    let config = AppConfig::from_cli(cli)?;
    let store = build_store(&config).await?;

    let source = Arc::new(DirectorySource::new(&config.data_dir));
    let engine = ScoringEngine::new(MatchingConfig {
        skill_matching: config.skill_matching,
        ..MatchingConfig::from_env()
    });
    let orchestrator = RankingOrchestrator::new(source.clone(), source, store)
        .with_engine(engine)
        .with_thresholds(TierThresholds::from_env())
        .with_config(config.ranking);

    cr_metrics::init_metrics("CR_METRICS_PORT", DEFAULT_METRICS_PORT);

    let state = Arc::new(AppState {
        orchestrator: Arc::new(orchestrator),
        config: config.clone(),
        rate_limits: default_rate_limits(),
        readiness: Arc::new(AtomicBool::new(true)),
    });

    let addr: SocketAddr = ([0, 0, 0, 0], config.port).into();
    let app = create_router(state.clone());

    info!(
        %addr,
        store = config.store.as_ref(),
        data_dir = %config.data_dir.display(),
        workers = config.ranking.workers,
        "cr-api listening"
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|err| ApiError::Internal(err.to_string()))?;

    let service = app.into_make_service_with_connect_info::<SocketAddr>();

    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal(state.clone()))
        .await
        .map_err(|err| ApiError::Internal(err.to_string()))?;

    Ok(())
}

async fn shutdown_signal(state: SharedState) {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
            let _ = sigterm.recv().await;
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    state.readiness.store(false, Ordering::SeqCst);

    // Load balancers need a moment to see /readyz fail before connections stop.
    tokio::time::sleep(SHUTDOWN_DRAIN_GRACE).await;
}
