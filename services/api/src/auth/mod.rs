//! 鉴权模块：凭证校验、token 编解码、吊销登记表、签发中心与 HTTP 接入。

pub(crate) mod authority;
pub(crate) mod credentials;
pub(crate) mod handlers;
pub(crate) mod middleware;
pub(crate) mod registry;
pub(crate) mod token;

/// 鉴权子系统对外返回的错误；HTTP 层负责映射到固定状态码。
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub(crate) enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("missing bearer token")]
    MissingToken,
    #[error("invalid token")]
    InvalidToken,
    #[error("token expired")]
    TokenExpired,
    #[error("invalid refresh token")]
    InvalidRefreshToken,
}
