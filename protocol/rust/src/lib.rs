// 文件职责：
// 1) 定义 SoftClin 管理 API 与客户端共用的 JSON 请求/响应结构。
// 2) 集中维护机器可读错误码，保证服务端与测试断言一致。
// 3) 提供跨端一致的时间戳函数。

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// 机器可读错误码。
pub mod codes {
    pub const INVALID_CREDENTIALS: &str = "INVALID_CREDENTIALS";
    pub const MISSING_FIELDS: &str = "MISSING_FIELDS";
    pub const MISSING_TOKEN: &str = "MISSING_TOKEN";
    pub const INVALID_TOKEN: &str = "INVALID_TOKEN";
    pub const TOKEN_EXPIRED: &str = "TOKEN_EXPIRED";
    pub const INVALID_REFRESH_TOKEN: &str = "INVALID_REFRESH_TOKEN";
    pub const INVALID_QUERY: &str = "INVALID_QUERY";
    pub const INVALID_BODY: &str = "INVALID_BODY";
    pub const MISSING_ID: &str = "MISSING_ID";
    pub const NO_FIELDS: &str = "NO_FIELDS";
    pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
}

/// Bearer 类型标识。
pub const TOKEN_TYPE_BEARER: &str = "Bearer";

/// 登录请求。缺失字段按空串处理，由服务端统一返回 `MISSING_FIELDS`。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// 登录成功响应。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    // access token 有效期（秒）；固定令牌模式下不存在。
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
    pub token_type: String,
    pub username: String,
}

/// 刷新请求。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    #[serde(default)]
    pub refresh_token: String,
}

/// 刷新成功响应。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
    // 仅在开启 refresh 轮换时返回新的 refresh token。
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub expires_in: u64,
}

/// 纯消息响应（登出等）。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// 统一错误响应体。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: String,
}

/// 生成纳秒精度 UTC 时间戳（RFC3339）。
pub fn now_rfc3339_nanos() -> String {
    Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Nanos, true)
}
