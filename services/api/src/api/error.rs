//! API 错误定义与响应转换。

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use softclin_protocol::{ErrorBody, codes};

use crate::auth::AuthError;

/// 认证与接口错误。
#[derive(Debug)]
pub(crate) struct ApiError {
    pub(crate) status: StatusCode,
    pub(crate) code: &'static str,
    pub(crate) message: String,
}

impl ApiError {
    /// 构造统一 API 错误。
    pub(crate) fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    /// 400 请求参数错误。
    pub(crate) fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, code, message)
    }

    /// 500 内部错误；消息只写日志，不回显给调用方。
    pub(crate) fn internal(message: impl Into<String>) -> Self {
        tracing::error!("internal error: {}", message.into());
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            codes::INTERNAL_ERROR,
            "Internal server error",
        )
    }
}

impl IntoResponse for ApiError {
    /// 转换为 `{error, code}` 响应体。
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorBody {
                error: self.message,
                code: self.code.to_string(),
            }),
        )
            .into_response()
    }
}

impl From<AuthError> for ApiError {
    /// 认证错误到 HTTP 状态与错误码的固定映射；不回显内部细节。
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => Self::new(
                StatusCode::UNAUTHORIZED,
                codes::INVALID_CREDENTIALS,
                "Invalid username or password",
            ),
            AuthError::MissingToken => Self::new(
                StatusCode::UNAUTHORIZED,
                codes::MISSING_TOKEN,
                "Token not provided",
            ),
            AuthError::InvalidToken => {
                Self::new(StatusCode::FORBIDDEN, codes::INVALID_TOKEN, "Invalid token")
            }
            AuthError::TokenExpired => Self::new(
                StatusCode::UNAUTHORIZED,
                codes::TOKEN_EXPIRED,
                "Token expired",
            ),
            AuthError::InvalidRefreshToken => Self::new(
                StatusCode::UNAUTHORIZED,
                codes::INVALID_REFRESH_TOKEN,
                "Invalid refresh token",
            ),
        }
    }
}
