//! 应用装配：路由、鉴权中间件、CORS 与监听。

use anyhow::Context;
use axum::{
    Json, Router,
    extract::State,
    http::{
        Method,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    middleware,
    routing::{get, post},
};
use serde_json::{Value, json};
use softclin_protocol::now_rfc3339_nanos;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

use crate::{
    auth::{
        authority::TokenAuthority,
        credentials::CredentialVerifier,
        handlers::{login_handler, logout_handler, refresh_handler},
        middleware::require_bearer,
        registry::RevocationRegistry,
    },
    config::Config,
    records::{appointments::Appointment, handlers::routes, professionals::Professional},
    state::AppState,
};

/// 服务入口：装配状态、启动登记表清理并监听 HTTP。
pub(crate) async fn run(config: Config) -> anyhow::Result<()> {
    let registry = RevocationRegistry::default();
    let _sweeper = config
        .sweep_interval
        .map(|interval| registry.spawn_sweeper(interval));
    let authority = TokenAuthority::new(
        CredentialVerifier::new(config.admin),
        config.strategy,
        registry,
    );
    let app = router(AppState::new(authority));

    let listener = tokio::net::TcpListener::bind(&config.addr)
        .await
        .with_context(|| format!("bind {}", config.addr))?;
    info!("softclin-api listening on {}", config.addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("softclin-api stopped");
    Ok(())
}

/// 构建完整路由；`/api/*` 经过 Bearer 中间件，`/auth/logout` 自行校验 token。
pub(crate) fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION]);

    let protected = Router::new()
        .merge(routes::<Professional>("/api/professionals"))
        .merge(routes::<Appointment>("/api/appointments"))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_bearer));

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/auth/login", post(login_handler))
        .route("/auth/refresh", post(refresh_handler))
        .route("/auth/logout", post(logout_handler))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn root() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "message": "SoftClin API is running",
        "timestamp": now_rfc3339_nanos(),
    }))
}

/// 健康检查接口，附带登记表中的有效 token 数。
async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "registry": { "activeTokens": state.authority.registry().len().await },
        "timestamp": now_rfc3339_nanos(),
    }))
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown signal received");
    }
}
