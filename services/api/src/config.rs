//! 配置模块职责：
//! 1. 从环境变量（可选 `.env`）读取管理员身份、签名密钥与 token 有效期。
//! 2. 启动期严格校验：缺少必填项直接失败，不回退到任何默认密钥或默认密码。
//! 3. 以脱敏形式输出配置摘要，供启动日志与 `doctor` 使用。

use std::{fmt, time::Duration};

use tracing::info;

use crate::auth::{
    authority::{RefreshRotation, TokenStrategy},
    credentials::AdminIdentity,
};

/// 默认监听端口。
pub(crate) const DEFAULT_PORT: u16 = 3000;
/// access token 默认有效期（秒）。
pub(crate) const DEFAULT_ACCESS_TOKEN_TTL_SEC: u64 = 15 * 60;
/// refresh token 默认有效期（秒）。
pub(crate) const DEFAULT_REFRESH_TOKEN_TTL_SEC: u64 = 7 * 24 * 3600;
/// 登记表清理默认周期（秒）。
pub(crate) const DEFAULT_SWEEP_INTERVAL_SEC: u64 = 300;
/// token 有效期上限（秒）；换算成毫秒后不能溢出 u64。
pub(crate) const MAX_TOKEN_TTL_SEC: u64 = u64::MAX / 1000;

pub(crate) const ENV_ADMIN_USERNAME: &str = "ADMIN_USERNAME";
pub(crate) const ENV_ADMIN_PASSWORD_HASH: &str = "ADMIN_PASSWORD_HASH";
pub(crate) const ENV_ACCESS_SECRET: &str = "JWT_SECRET";
pub(crate) const ENV_REFRESH_SECRET: &str = "JWT_REFRESH_SECRET";
pub(crate) const ENV_ACCESS_TTL: &str = "ACCESS_TOKEN_TTL_SEC";
pub(crate) const ENV_REFRESH_TTL: &str = "REFRESH_TOKEN_TTL_SEC";
pub(crate) const ENV_TOKEN_MODE: &str = "AUTH_TOKEN_MODE";
pub(crate) const ENV_REFRESH_ROTATION: &str = "REFRESH_TOKEN_ROTATION";
pub(crate) const ENV_SWEEP_INTERVAL: &str = "REGISTRY_SWEEP_INTERVAL_SEC";
pub(crate) const ENV_API_ADDR: &str = "API_ADDR";
pub(crate) const ENV_PORT: &str = "PORT";

/// 需要脱敏展示的配置项。
const SECRET_KEYS: &[&str] = &[ENV_ADMIN_PASSWORD_HASH, ENV_ACCESS_SECRET, ENV_REFRESH_SECRET];

/// 全部已知配置项（`doctor` 按此顺序输出）。
pub(crate) const KNOWN_KEYS: &[&str] = &[
    ENV_API_ADDR,
    ENV_PORT,
    ENV_ADMIN_USERNAME,
    ENV_ADMIN_PASSWORD_HASH,
    ENV_ACCESS_SECRET,
    ENV_REFRESH_SECRET,
    ENV_TOKEN_MODE,
    ENV_ACCESS_TTL,
    ENV_REFRESH_TTL,
    ENV_REFRESH_ROTATION,
    ENV_SWEEP_INTERVAL,
];

/// 不在 Debug 输出中暴露内容的字符串。
#[derive(Clone, PartialEq, Eq)]
pub(crate) struct SecretString(String);

impl SecretString {
    pub(crate) fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub(crate) fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretString(***)")
    }
}

/// 启动期配置错误；任何一种都会中止启动。
#[derive(Debug, thiserror::Error)]
pub(crate) enum ConfigError {
    #[error("required configuration `{0}` is not set")]
    Missing(&'static str),
    #[error("configuration `{var}` is invalid: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// 服务运行时配置。
#[derive(Debug, Clone)]
pub(crate) struct Config {
    /// HTTP 监听地址。
    pub(crate) addr: String,
    pub(crate) admin: AdminIdentity,
    pub(crate) strategy: TokenStrategy,
    /// 为空表示不启动后台清理。
    pub(crate) sweep_interval: Option<Duration>,
}

impl Config {
    /// 从进程环境变量构建配置。
    pub(crate) fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 从任意键值来源构建配置。
    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let username = required(&lookup, ENV_ADMIN_USERNAME)?;
        let password_hash = required(&lookup, ENV_ADMIN_PASSWORD_HASH)?;
        if !looks_like_bcrypt(&password_hash) {
            return Err(ConfigError::Invalid {
                var: ENV_ADMIN_PASSWORD_HASH,
                reason: "expected a bcrypt hash (run `softclin-api generate-secrets`)".to_string(),
            });
        }
        let access_secret = required(&lookup, ENV_ACCESS_SECRET)?;

        let mode = optional(&lookup, ENV_TOKEN_MODE).unwrap_or_else(|| "pair".to_string());
        let strategy = match mode.to_ascii_lowercase().as_str() {
            "fixed" => TokenStrategy::FixedSecret {
                secret: SecretString::new(access_secret),
            },
            "pair" => {
                let refresh_secret = required(&lookup, ENV_REFRESH_SECRET)?;
                if refresh_secret == access_secret {
                    return Err(ConfigError::Invalid {
                        var: ENV_REFRESH_SECRET,
                        reason: format!("must differ from {ENV_ACCESS_SECRET}"),
                    });
                }
                let rotation = if parse_bool(&lookup, ENV_REFRESH_ROTATION, false)? {
                    RefreshRotation::Rotate
                } else {
                    RefreshRotation::Reuse
                };
                TokenStrategy::AccessRefreshPair {
                    access_secret: SecretString::new(access_secret),
                    refresh_secret: SecretString::new(refresh_secret),
                    access_ttl: parse_secs(&lookup, ENV_ACCESS_TTL, DEFAULT_ACCESS_TOKEN_TTL_SEC)?,
                    refresh_ttl: parse_secs(
                        &lookup,
                        ENV_REFRESH_TTL,
                        DEFAULT_REFRESH_TOKEN_TTL_SEC,
                    )?,
                    rotation,
                }
            }
            other => {
                return Err(ConfigError::Invalid {
                    var: ENV_TOKEN_MODE,
                    reason: format!("unknown mode `{other}`, expected `fixed` or `pair`"),
                });
            }
        };

        let sweep_interval = match optional(&lookup, ENV_SWEEP_INTERVAL) {
            None => Some(Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SEC)),
            Some(raw) => {
                let sec = raw.parse::<u64>().map_err(|_| ConfigError::Invalid {
                    var: ENV_SWEEP_INTERVAL,
                    reason: format!("`{raw}` is not a number of seconds"),
                })?;
                (sec > 0).then(|| Duration::from_secs(sec))
            }
        };

        Ok(Self {
            addr: resolve_addr(&lookup)?,
            admin: AdminIdentity {
                username,
                password_hash: SecretString::new(password_hash),
            },
            strategy,
            sweep_interval,
        })
    }

    /// 输出脱敏配置摘要。
    pub(crate) fn log_summary(&self) {
        info!("configuration loaded:");
        info!("  listen: {}", self.addr);
        info!("  admin username: {}", self.admin.username);
        info!("  token mode: {}", self.strategy.name());
        if let TokenStrategy::AccessRefreshPair {
            access_ttl,
            refresh_ttl,
            rotation,
            ..
        } = &self.strategy
        {
            info!(
                "  access ttl: {}s, refresh ttl: {}s, rotation: {:?}",
                access_ttl.as_secs(),
                refresh_ttl.as_secs(),
                rotation
            );
        } else {
            info!("  fixed tokens never expire; only logout revokes them");
        }
        match self.sweep_interval {
            Some(interval) => info!("  registry sweep: every {}s", interval.as_secs()),
            None => info!("  registry sweep: disabled"),
        }
    }
}

/// 每个已知配置项的脱敏状态（`doctor` 输出）。
pub(crate) fn describe_keys(lookup: impl Fn(&str) -> Option<String>) -> Vec<(&'static str, String)> {
    KNOWN_KEYS
        .iter()
        .map(|key| {
            let value = lookup(*key)
                .map(|raw| raw.trim().to_string())
                .filter(|raw| !raw.is_empty());
            let shown = match value {
                None => "missing".to_string(),
                Some(_) if SECRET_KEYS.contains(key) => "configured".to_string(),
                Some(raw) => raw,
            };
            (*key, shown)
        })
        .collect()
}

/// 读取必填项；空白视为缺失。
fn required(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<String, ConfigError> {
    optional(lookup, key).ok_or(ConfigError::Missing(key))
}

fn optional(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key)
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty())
}

/// 解析正整数秒。
fn parse_secs(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default_sec: u64,
) -> Result<Duration, ConfigError> {
    let Some(raw) = optional(lookup, key) else {
        return Ok(Duration::from_secs(default_sec));
    };
    match raw.parse::<u64>() {
        Ok(sec) if sec > MAX_TOKEN_TTL_SEC => Err(ConfigError::Invalid {
            var: key,
            reason: format!("`{raw}` exceeds the maximum of {MAX_TOKEN_TTL_SEC} seconds"),
        }),
        Ok(sec) if sec > 0 => Ok(Duration::from_secs(sec)),
        _ => Err(ConfigError::Invalid {
            var: key,
            reason: format!("`{raw}` is not a positive number of seconds"),
        }),
    }
}

fn parse_bool(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: bool,
) -> Result<bool, ConfigError> {
    let Some(raw) = optional(lookup, key) else {
        return Ok(default);
    };
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            var: key,
            reason: format!("`{raw}` is not a boolean"),
        }),
    }
}

/// 监听地址：`API_ADDR` 优先，其次 `0.0.0.0:$PORT`。
fn resolve_addr(lookup: &impl Fn(&str) -> Option<String>) -> Result<String, ConfigError> {
    if let Some(addr) = optional(lookup, ENV_API_ADDR) {
        return Ok(addr);
    }
    let port = match optional(lookup, ENV_PORT) {
        Some(raw) => raw.parse::<u16>().map_err(|_| ConfigError::Invalid {
            var: ENV_PORT,
            reason: format!("`{raw}` is not a valid port"),
        })?,
        None => DEFAULT_PORT,
    };
    Ok(format!("0.0.0.0:{port}"))
}

/// 粗略判断是否为 bcrypt 哈希（`$2a$`/`$2b$`/`$2y$` 前缀，60 字符）。
fn looks_like_bcrypt(hash: &str) -> bool {
    hash.len() == 60 && hash.starts_with("$2")
}
