//! 受保护路由的 Bearer 校验中间件。

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use tracing::debug;

use crate::{api::error::ApiError, auth::AuthError, state::AppState};

const BEARER: &str = "Bearer";

/// 从 `Authorization` 头解析 Bearer token；scheme 不区分大小写。
pub(crate) fn bearer_token(header: Option<&str>) -> Option<&str> {
    let (scheme, token) = header?.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case(BEARER) {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// 校验失败时直接短路返回，不进入数据处理函数。
pub(crate) async fn require_bearer(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    let Some(token) = bearer_token(header) else {
        return Err(AuthError::MissingToken.into());
    };

    let identity = state.authority.verify(token).await.map_err(|err| {
        debug!(path = %request.uri().path(), "request rejected: {err}");
        ApiError::from(err)
    })?;
    debug!(
        subject = %identity.subject,
        session = %identity.session_id,
        expires_at_ms = ?identity.expires_at_ms,
        path = %request.uri().path(),
        "request authorized"
    );

    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::bearer_token;

    #[test]
    fn parses_bearer_scheme_only() {
        assert_eq!(bearer_token(Some("Bearer abc.def")), Some("abc.def"));
        assert_eq!(bearer_token(Some("bearer abc")), Some("abc"));
        assert_eq!(bearer_token(Some("Basic abc")), None);
        assert_eq!(bearer_token(Some("Bearer ")), None);
        assert_eq!(bearer_token(Some("Bearer")), None);
        assert_eq!(bearer_token(None), None);
    }
}
