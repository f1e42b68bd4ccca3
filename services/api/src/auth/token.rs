//! Token 编解码：`<prefix>.<payload_b64url>.<sig_b64url>`，HMAC-SHA256 签名。
//!
//! 前缀声明 token 类型（`sat_v1` access / `srt_v1` refresh），签名覆盖前缀与 payload，
//! 因此改动任意一段都会在校验时失败。时间字段均为 unix 毫秒。

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

/// access token 前缀。
pub(crate) const ACCESS_TOKEN_PREFIX: &str = "sat_v1";
/// refresh token 前缀。
pub(crate) const REFRESH_TOKEN_PREFIX: &str = "srt_v1";

/// token 类型。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    /// 对应的版本前缀。
    pub(crate) fn prefix(self) -> &'static str {
        match self {
            Self::Access => ACCESS_TOKEN_PREFIX,
            Self::Refresh => REFRESH_TOKEN_PREFIX,
        }
    }

    fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            ACCESS_TOKEN_PREFIX => Some(Self::Access),
            REFRESH_TOKEN_PREFIX => Some(Self::Refresh),
            _ => None,
        }
    }
}

/// token claims。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct TokenClaims {
    /// 主体（管理员用户名）。
    pub(crate) sub: String,
    pub(crate) typ: TokenKind,
    /// 会话 ID：同一次登录签发的所有 token 共享。
    pub(crate) sid: String,
    pub(crate) iat: u64,
    /// 固定令牌模式下为空，永不过期。
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) exp: Option<u64>,
    pub(crate) jti: String,
}

impl TokenClaims {
    /// 构造新 claims；`ttl_ms` 为空表示不过期。
    pub(crate) fn new(
        kind: TokenKind,
        subject: &str,
        session_id: &str,
        now_ms: u64,
        ttl_ms: Option<u64>,
    ) -> Self {
        Self {
            sub: subject.to_string(),
            typ: kind,
            sid: session_id.to_string(),
            iat: now_ms,
            exp: ttl_ms.map(|ttl| now_ms.saturating_add(ttl)),
            jti: Uuid::new_v4().simple().to_string(),
        }
    }
}

/// token 校验错误。
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub(crate) enum TokenError {
    #[error("token format is invalid")]
    Format,
    #[error("token type does not match")]
    KindMismatch,
    #[error("token signature is invalid")]
    Signature,
    #[error("token payload is invalid")]
    Payload,
    #[error("token has expired")]
    Expired,
}

/// 当前 unix 毫秒。
pub(crate) fn unix_now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or_default()
}

/// 用 `secret` 为 claims 签名并编码。
pub(crate) fn sign_token(secret: &str, claims: &TokenClaims) -> String {
    let payload = serde_json::to_string(claims).expect("token claims must be serializable");
    let payload_b64 = URL_SAFE_NO_PAD.encode(payload.as_bytes());
    let prefix = claims.typ.prefix();
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("hmac key should be valid");
    mac.update(prefix.as_bytes());
    mac.update(b".");
    mac.update(payload_b64.as_bytes());
    let sig_b64 = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
    format!("{prefix}.{payload_b64}.{sig_b64}")
}

/// 校验签名与有效期并解出 claims。
pub(crate) fn decode_token(
    token: &str,
    expected: TokenKind,
    secret: &str,
    now_ms: u64,
) -> Result<TokenClaims, TokenError> {
    let mut parts = token.split('.');
    let prefix = parts.next().unwrap_or_default();
    let payload_b64 = parts.next().unwrap_or_default();
    let sig_b64 = parts.next().unwrap_or_default();
    if payload_b64.is_empty() || sig_b64.is_empty() || parts.next().is_some() {
        return Err(TokenError::Format);
    }
    let Some(kind) = TokenKind::from_prefix(prefix) else {
        return Err(TokenError::Format);
    };
    if kind != expected {
        return Err(TokenError::KindMismatch);
    }

    let sig = URL_SAFE_NO_PAD
        .decode(sig_b64.as_bytes())
        .map_err(|_| TokenError::Signature)?;
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| TokenError::Signature)?;
    mac.update(prefix.as_bytes());
    mac.update(b".");
    mac.update(payload_b64.as_bytes());
    mac.verify_slice(&sig).map_err(|_| TokenError::Signature)?;

    let payload_raw = URL_SAFE_NO_PAD
        .decode(payload_b64.as_bytes())
        .map_err(|_| TokenError::Payload)?;
    let claims: TokenClaims =
        serde_json::from_slice(&payload_raw).map_err(|_| TokenError::Payload)?;
    if claims.typ != expected {
        return Err(TokenError::KindMismatch);
    }

    if let Some(exp) = claims.exp
        && exp <= now_ms
    {
        return Err(TokenError::Expired);
    }
    Ok(claims)
}
