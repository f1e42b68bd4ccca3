//! 鉴权 HTTP 路由处理函数。

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, header::AUTHORIZATION},
};
use softclin_protocol::{
    LoginRequest, LoginResponse, MessageResponse, RefreshRequest, RefreshResponse,
    TOKEN_TYPE_BEARER, codes,
};
use tracing::{info, warn};

use crate::{
    api::error::ApiError,
    auth::{AuthError, middleware::bearer_token},
    state::AppState,
};

/// 登录接口：校验管理员凭证并签发 token。
pub(crate) async fn login_handler(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let Json(req) = payload.map_err(invalid_body)?;
    if req.username.is_empty() || req.password.is_empty() {
        return Err(ApiError::bad_request(
            codes::MISSING_FIELDS,
            "Username and password are required",
        ));
    }

    info!(username = %req.username, "login attempt");
    let issued = state
        .authority
        .login(&req.username, &req.password)
        .await
        .inspect_err(|err| warn!(username = %req.username, "login failed: {err}"))?;

    Ok(Json(LoginResponse {
        access_token: issued.access_token,
        refresh_token: issued.refresh_token,
        expires_in: issued.expires_in,
        token_type: TOKEN_TYPE_BEARER.to_string(),
        username: issued.username,
    }))
}

/// 刷新接口：用 refresh token 换取新的 access token。
pub(crate) async fn refresh_handler(
    State(state): State<AppState>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> Result<Json<RefreshResponse>, ApiError> {
    let Json(req) = payload.map_err(invalid_body)?;
    let refreshed = state
        .authority
        .refresh(&req.refresh_token)
        .await
        .inspect_err(|err| warn!("refresh failed: {err}"))?;

    Ok(Json(RefreshResponse {
        access_token: refreshed.access_token,
        refresh_token: refreshed.refresh_token,
        expires_in: refreshed.expires_in,
    }))
}

/// 登出接口：吊销当前 token 所在会话。已过期但仍登记的 access token 也可登出。
pub(crate) async fn logout_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<MessageResponse>, ApiError> {
    let header = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    let token = bearer_token(header).ok_or(AuthError::MissingToken)?;
    state
        .authority
        .logout_bearer(token)
        .await
        .inspect_err(|err| warn!("logout rejected: {err}"))?;
    Ok(Json(MessageResponse {
        message: "Logged out successfully".to_string(),
    }))
}

/// 请求体无法解析为 JSON。
pub(crate) fn invalid_body(rejection: JsonRejection) -> ApiError {
    ApiError::new(rejection.status(), codes::INVALID_BODY, "Request body is not valid JSON")
}
