//! 令牌签发中心：登录、刷新、登出与请求期校验。

use std::time::Duration;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    auth::{
        AuthError,
        credentials::CredentialVerifier,
        registry::{RegistryEntry, RevocationRegistry},
        token::{TokenClaims, TokenError, TokenKind, decode_token, sign_token, unix_now_ms},
    },
    config::SecretString,
};

/// refresh token 使用策略。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum RefreshRotation {
    /// 刷新后原 refresh token 继续有效。
    #[default]
    Reuse,
    /// 每次刷新消耗原 refresh token 并签发新的。
    Rotate,
}

/// 启动时选定的签发策略。
#[derive(Debug, Clone)]
pub(crate) enum TokenStrategy {
    /// 单一密钥、无过期时间的固定令牌；只能通过登出吊销。
    FixedSecret { secret: SecretString },
    /// access/refresh 双令牌，各自独立密钥与有效期。
    AccessRefreshPair {
        access_secret: SecretString,
        refresh_secret: SecretString,
        access_ttl: Duration,
        refresh_ttl: Duration,
        rotation: RefreshRotation,
    },
}

impl TokenStrategy {
    /// 指定类型 token 的签名密钥；固定令牌模式没有 refresh token。
    fn secret_for(&self, kind: TokenKind) -> Option<&SecretString> {
        match (self, kind) {
            (Self::FixedSecret { secret }, TokenKind::Access) => Some(secret),
            (Self::FixedSecret { .. }, TokenKind::Refresh) => None,
            (Self::AccessRefreshPair { access_secret, .. }, TokenKind::Access) => {
                Some(access_secret)
            }
            (Self::AccessRefreshPair { refresh_secret, .. }, TokenKind::Refresh) => {
                Some(refresh_secret)
            }
        }
    }

    fn ttl_for(&self, kind: TokenKind) -> Option<Duration> {
        match (self, kind) {
            (Self::FixedSecret { .. }, _) => None,
            (Self::AccessRefreshPair { access_ttl, .. }, TokenKind::Access) => Some(*access_ttl),
            (Self::AccessRefreshPair { refresh_ttl, .. }, TokenKind::Refresh) => {
                Some(*refresh_ttl)
            }
        }
    }

    /// access token 有效期（秒），固定令牌模式为空。
    pub(crate) fn access_expires_in(&self) -> Option<u64> {
        self.ttl_for(TokenKind::Access).map(|ttl| ttl.as_secs())
    }

    /// 策略名称（用于日志与诊断）。
    pub(crate) fn name(&self) -> &'static str {
        match self {
            Self::FixedSecret { .. } => "fixed",
            Self::AccessRefreshPair { .. } => "pair",
        }
    }
}

/// 通过校验的请求身份，由中间件挂到请求扩展上。
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Identity {
    pub(crate) subject: String,
    pub(crate) session_id: String,
    pub(crate) expires_at_ms: Option<u64>,
}

impl From<TokenClaims> for Identity {
    fn from(claims: TokenClaims) -> Self {
        Self {
            subject: claims.sub,
            session_id: claims.sid,
            expires_at_ms: claims.exp,
        }
    }
}

/// 登录签发结果。
#[derive(Debug, Clone)]
pub(crate) struct IssuedTokens {
    pub(crate) access_token: String,
    pub(crate) refresh_token: Option<String>,
    pub(crate) expires_in: Option<u64>,
    pub(crate) username: String,
}

/// 刷新签发结果。
#[derive(Debug, Clone)]
pub(crate) struct RefreshedTokens {
    pub(crate) access_token: String,
    /// 仅轮换策略下返回。
    pub(crate) refresh_token: Option<String>,
    pub(crate) expires_in: u64,
}

/// 令牌签发中心；整个进程共享一个实例。
pub(crate) struct TokenAuthority {
    verifier: CredentialVerifier,
    strategy: TokenStrategy,
    registry: RevocationRegistry,
}

impl TokenAuthority {
    pub(crate) fn new(
        verifier: CredentialVerifier,
        strategy: TokenStrategy,
        registry: RevocationRegistry,
    ) -> Self {
        Self {
            verifier,
            strategy,
            registry,
        }
    }

    pub(crate) fn registry(&self) -> &RevocationRegistry {
        &self.registry
    }

    /// 登录：校验凭证后签发 token，并在同一把写锁内全部登记。
    pub(crate) async fn login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<IssuedTokens, AuthError> {
        let verifier = self.verifier.clone();
        let (username, password) = (username.to_string(), password.to_string());
        // bcrypt 比对是 CPU 密集操作，放到阻塞线程池。
        let subject =
            tokio::task::spawn_blocking(move || verifier.verify_credentials(&username, &password))
                .await
                .map_err(|_| AuthError::InvalidCredentials)??;

        let session_id = new_session_id();
        let now = unix_now_ms();
        let mut issued = Vec::with_capacity(2);
        let access_token = self
            .mint(TokenKind::Access, &subject, &session_id, now, &mut issued)
            .ok_or(AuthError::InvalidCredentials)?;
        let refresh_token = self.mint(TokenKind::Refresh, &subject, &session_id, now, &mut issued);
        self.registry.insert_all(issued).await;

        info!(
            session = %session_id,
            mode = self.strategy.name(),
            "admin session opened"
        );
        Ok(IssuedTokens {
            access_token,
            refresh_token,
            expires_in: self.strategy.access_expires_in(),
            username: subject,
        })
    }

    /// 刷新：refresh token 必须已登记且签名、有效期均合法。
    pub(crate) async fn refresh(&self, refresh_token: &str) -> Result<RefreshedTokens, AuthError> {
        let TokenStrategy::AccessRefreshPair {
            refresh_secret,
            access_ttl,
            rotation,
            ..
        } = &self.strategy
        else {
            return Err(AuthError::InvalidRefreshToken);
        };

        let Some(entry) = self.registry.get(refresh_token).await else {
            return Err(AuthError::InvalidRefreshToken);
        };
        if entry.kind != TokenKind::Refresh {
            return Err(AuthError::InvalidRefreshToken);
        }
        let now = unix_now_ms();
        let claims = decode_token(
            refresh_token,
            TokenKind::Refresh,
            refresh_secret.expose(),
            now,
        )
        .map_err(|err| {
            debug!("refresh token rejected: {err}");
            AuthError::InvalidRefreshToken
        })?;

        let mut issued = Vec::with_capacity(2);
        let access_token = self
            .mint(TokenKind::Access, &claims.sub, &claims.sid, now, &mut issued)
            .ok_or(AuthError::InvalidRefreshToken)?;
        let consume = *rotation == RefreshRotation::Rotate;
        let next_refresh = if consume {
            self.mint(TokenKind::Refresh, &claims.sub, &claims.sid, now, &mut issued)
        } else {
            None
        };

        if !self.registry.renew(refresh_token, consume, issued).await {
            // 并发登出或轮换已移除该 refresh token。
            return Err(AuthError::InvalidRefreshToken);
        }

        debug!(session = %claims.sid, rotated = consume, "access token refreshed");
        Ok(RefreshedTokens {
            access_token,
            refresh_token: next_refresh,
            expires_in: access_ttl.as_secs(),
        })
    }

    /// 登出：移除 token 及同会话的全部 token。幂等，返回移除数量。
    pub(crate) async fn logout(&self, token: &str) -> usize {
        let removed = self.registry.revoke_session(token).await;
        info!("admin session closed, {removed} tokens revoked");
        removed
    }

    /// HTTP 登出：要求已登记且签名合法的 access token，已过期的也接受，
    /// 以便客户端在 access token 过期后仍能吊销同会话的 refresh token。
    pub(crate) async fn logout_bearer(&self, token: &str) -> Result<usize, AuthError> {
        let secret = self.registered_access_secret(token).await?;
        match decode_token(token, TokenKind::Access, secret.expose(), unix_now_ms()) {
            Ok(_) | Err(TokenError::Expired) => Ok(self.logout(token).await),
            Err(other) => {
                warn!("registered token failed logout check: {other}");
                Err(AuthError::InvalidToken)
            }
        }
    }

    /// 请求期校验：先查登记表，再验签名与有效期，成功后刷新最近活跃时间。
    pub(crate) async fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        let secret = self.registered_access_secret(token).await?;
        let now = unix_now_ms();
        let claims =
            decode_token(token, TokenKind::Access, secret.expose(), now).map_err(|err| match err {
                TokenError::Expired => AuthError::TokenExpired,
                other => {
                    warn!("registered token failed verification: {other}");
                    AuthError::InvalidToken
                }
            })?;

        if !self.registry.touch(token, now).await {
            return Err(AuthError::InvalidToken);
        }
        Ok(Identity::from(claims))
    }

    /// 登记表中存在且类型为 access 时返回其签名密钥；不做任何密码学校验。
    async fn registered_access_secret(&self, token: &str) -> Result<&SecretString, AuthError> {
        if token.is_empty() {
            return Err(AuthError::MissingToken);
        }
        match self.registry.get(token).await {
            Some(entry) if entry.kind == TokenKind::Access => self
                .strategy
                .secret_for(TokenKind::Access)
                .ok_or(AuthError::InvalidToken),
            _ => Err(AuthError::InvalidToken),
        }
    }

    /// 签发一个指定类型的 token 并追加到待登记列表；策略不支持该类型时返回 None。
    fn mint(
        &self,
        kind: TokenKind,
        subject: &str,
        session_id: &str,
        now_ms: u64,
        issued: &mut Vec<(String, RegistryEntry)>,
    ) -> Option<String> {
        let secret = self.strategy.secret_for(kind)?;
        let ttl_ms = self
            .strategy
            .ttl_for(kind)
            .map(|ttl| u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX));
        let claims = TokenClaims::new(kind, subject, session_id, now_ms, ttl_ms);
        let token = sign_token(secret.expose(), &claims);
        issued.push((token.clone(), RegistryEntry::from_claims(&claims)));
        Some(token)
    }
}

/// 新会话 ID。
fn new_session_id() -> String {
    format!("ses_{}", Uuid::new_v4().simple())
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::time::Duration;

    use super::{RefreshRotation, TokenAuthority, TokenStrategy};
    use crate::{
        auth::{
            credentials::{AdminIdentity, CredentialVerifier, hash_password},
            registry::RevocationRegistry,
        },
        config::SecretString,
    };

    pub(crate) const ADMIN_USERNAME: &str = "admin";
    pub(crate) const ADMIN_PASSWORD: &str = "admin123";

    pub(crate) fn pair_strategy(
        access_ttl: Duration,
        refresh_ttl: Duration,
        rotation: RefreshRotation,
    ) -> TokenStrategy {
        TokenStrategy::AccessRefreshPair {
            access_secret: SecretString::new("test-access-secret"),
            refresh_secret: SecretString::new("test-refresh-secret"),
            access_ttl,
            refresh_ttl,
            rotation,
        }
    }

    pub(crate) fn fixed_strategy() -> TokenStrategy {
        TokenStrategy::FixedSecret {
            secret: SecretString::new("test-fixed-secret"),
        }
    }

    pub(crate) fn authority(strategy: TokenStrategy) -> TokenAuthority {
        let identity = AdminIdentity {
            username: ADMIN_USERNAME.to_string(),
            password_hash: SecretString::new(
                hash_password(ADMIN_PASSWORD, 4).expect("bcrypt hash"),
            ),
        };
        TokenAuthority::new(
            CredentialVerifier::new(identity),
            strategy,
            RevocationRegistry::default(),
        )
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use super::{
        RefreshRotation,
        test_support::{ADMIN_PASSWORD, ADMIN_USERNAME, authority, fixed_strategy, pair_strategy},
    };
    use crate::auth::{AuthError, token::TokenKind};

    const HOUR: Duration = Duration::from_secs(3600);

    fn default_pair() -> super::TokenStrategy {
        pair_strategy(HOUR / 4, HOUR, RefreshRotation::Reuse)
    }

    #[tokio::test]
    async fn login_token_passes_verify_immediately() {
        let authority = authority(default_pair());
        let issued = authority.login(ADMIN_USERNAME, ADMIN_PASSWORD).await.unwrap();
        assert!(!issued.access_token.is_empty());
        assert!(issued.refresh_token.is_some());
        assert_eq!(issued.expires_in, Some(900));

        let identity = authority.verify(&issued.access_token).await.unwrap();
        assert_eq!(identity.subject, ADMIN_USERNAME);
        assert_eq!(authority.registry().len().await, 2);
    }

    #[tokio::test]
    async fn bad_credentials_issue_nothing() {
        let authority = authority(default_pair());
        for (user, pass) in [("admin", "wrong"), ("root", ADMIN_PASSWORD)] {
            assert_eq!(
                authority.login(user, pass).await.unwrap_err(),
                AuthError::InvalidCredentials
            );
        }
        assert_eq!(authority.registry().len().await, 0);
    }

    #[tokio::test]
    async fn token_is_unusable_after_logout() {
        let authority = authority(default_pair());
        let issued = authority.login(ADMIN_USERNAME, ADMIN_PASSWORD).await.unwrap();
        assert_eq!(authority.logout(&issued.access_token).await, 2);
        assert_eq!(
            authority.verify(&issued.access_token).await,
            Err(AuthError::InvalidToken)
        );
        let refresh = issued.refresh_token.unwrap();
        assert_eq!(
            authority.refresh(&refresh).await.unwrap_err(),
            AuthError::InvalidRefreshToken
        );
        // 幂等
        assert_eq!(authority.logout(&issued.access_token).await, 0);
    }

    #[tokio::test]
    async fn refresh_rejects_unknown_and_access_tokens() {
        let authority = authority(default_pair());
        let issued = authority.login(ADMIN_USERNAME, ADMIN_PASSWORD).await.unwrap();
        assert_eq!(
            authority.refresh("srt_v1.never.issued").await.unwrap_err(),
            AuthError::InvalidRefreshToken
        );
        assert_eq!(
            authority.refresh(&issued.access_token).await.unwrap_err(),
            AuthError::InvalidRefreshToken
        );
    }

    #[tokio::test]
    async fn refresh_without_rotation_keeps_refresh_token_valid() {
        let authority = authority(default_pair());
        let issued = authority.login(ADMIN_USERNAME, ADMIN_PASSWORD).await.unwrap();
        let refresh = issued.refresh_token.unwrap();

        let first = authority.refresh(&refresh).await.unwrap();
        assert!(first.refresh_token.is_none());
        assert_eq!(first.expires_in, 900);
        let second = authority.refresh(&refresh).await.unwrap();
        assert_ne!(first.access_token, second.access_token);

        let identity = authority.verify(&second.access_token).await.unwrap();
        assert_eq!(identity.subject, ADMIN_USERNAME);
    }

    #[tokio::test]
    async fn refresh_with_rotation_consumes_presented_token() {
        let authority = authority(pair_strategy(
            HOUR / 4,
            HOUR,
            RefreshRotation::Rotate,
        ));
        let issued = authority.login(ADMIN_USERNAME, ADMIN_PASSWORD).await.unwrap();
        let refresh = issued.refresh_token.unwrap();

        let rotated = authority.refresh(&refresh).await.unwrap();
        let next = rotated.refresh_token.expect("rotation returns a new refresh token");
        assert_ne!(next, refresh);
        assert_eq!(
            authority.refresh(&refresh).await.unwrap_err(),
            AuthError::InvalidRefreshToken
        );
        assert!(authority.refresh(&next).await.is_ok());
    }

    #[tokio::test]
    async fn concurrent_rotation_of_one_token_has_single_winner() {
        let authority = Arc::new(authority(pair_strategy(
            HOUR / 4,
            HOUR,
            RefreshRotation::Rotate,
        )));
        let issued = authority.login(ADMIN_USERNAME, ADMIN_PASSWORD).await.unwrap();
        let refresh = Arc::new(issued.refresh_token.unwrap());

        let mut handles = Vec::new();
        for _ in 0..16 {
            let authority = authority.clone();
            let refresh = refresh.clone();
            handles.push(tokio::spawn(async move {
                authority.refresh(&refresh).await.is_ok()
            }));
        }
        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn short_lived_access_token_expires() {
        let authority = authority(pair_strategy(
            Duration::from_secs(1),
            HOUR,
            RefreshRotation::Reuse,
        ));
        let issued = authority.login(ADMIN_USERNAME, ADMIN_PASSWORD).await.unwrap();
        assert!(authority.verify(&issued.access_token).await.is_ok());

        tokio::time::sleep(Duration::from_millis(1_100)).await;
        assert_eq!(
            authority.verify(&issued.access_token).await,
            Err(AuthError::TokenExpired)
        );
        // 登记表状态不变，过期只是数据判断。
        assert!(authority.registry().get(&issued.access_token).await.is_some());
    }

    #[tokio::test]
    async fn expired_refresh_token_is_rejected() {
        let authority = authority(pair_strategy(
            HOUR / 4,
            Duration::from_secs(1),
            RefreshRotation::Reuse,
        ));
        let issued = authority.login(ADMIN_USERNAME, ADMIN_PASSWORD).await.unwrap();
        let refresh = issued.refresh_token.unwrap();
        assert!(authority.refresh(&refresh).await.is_ok());

        tokio::time::sleep(Duration::from_millis(1_100)).await;
        assert_eq!(
            authority.refresh(&refresh).await.unwrap_err(),
            AuthError::InvalidRefreshToken
        );
        // access token 仍在自己的有效期内。
        assert!(authority.verify(&issued.access_token).await.is_ok());
    }

    #[tokio::test]
    async fn expired_access_token_can_still_log_out() {
        let authority = authority(pair_strategy(
            Duration::from_secs(1),
            HOUR,
            RefreshRotation::Reuse,
        ));
        let issued = authority.login(ADMIN_USERNAME, ADMIN_PASSWORD).await.unwrap();
        let refresh = issued.refresh_token.unwrap();

        tokio::time::sleep(Duration::from_millis(1_100)).await;
        assert_eq!(
            authority.verify(&issued.access_token).await,
            Err(AuthError::TokenExpired)
        );
        assert_eq!(authority.logout_bearer(&issued.access_token).await, Ok(2));
        assert_eq!(
            authority.refresh(&refresh).await.unwrap_err(),
            AuthError::InvalidRefreshToken
        );
        assert_eq!(
            authority.logout_bearer(&issued.access_token).await,
            Err(AuthError::InvalidToken)
        );
    }

    #[tokio::test]
    async fn logout_bearer_rejects_refresh_and_forged_tokens() {
        let authority = authority(default_pair());
        let issued = authority.login(ADMIN_USERNAME, ADMIN_PASSWORD).await.unwrap();
        let refresh = issued.refresh_token.unwrap();

        assert_eq!(authority.logout_bearer("").await, Err(AuthError::MissingToken));
        assert_eq!(
            authority.logout_bearer(&refresh).await,
            Err(AuthError::InvalidToken)
        );
        assert_eq!(
            authority.logout_bearer("sat_v1.never.issued").await,
            Err(AuthError::InvalidToken)
        );
        // 被拒绝的登出不影响会话。
        assert_eq!(authority.registry().len().await, 2);
    }

    #[tokio::test]
    async fn ttl_near_u64_limit_does_not_wrap() {
        let authority = authority(pair_strategy(
            HOUR / 4,
            Duration::from_secs(u64::MAX / 1000),
            RefreshRotation::Reuse,
        ));
        let issued = authority.login(ADMIN_USERNAME, ADMIN_PASSWORD).await.unwrap();
        let refresh = issued.refresh_token.unwrap();
        let entry = authority.registry().get(&refresh).await.unwrap();
        assert!(entry.expires_at_ms.unwrap() > HOUR.as_millis() as u64);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(authority.refresh(&refresh).await.is_ok());
    }

    #[tokio::test]
    async fn verify_touches_last_activity() {
        let authority = authority(default_pair());
        let issued = authority.login(ADMIN_USERNAME, ADMIN_PASSWORD).await.unwrap();
        let before = authority
            .registry()
            .get(&issued.access_token)
            .await
            .unwrap()
            .last_activity_ms;
        tokio::time::sleep(Duration::from_millis(5)).await;
        authority.verify(&issued.access_token).await.unwrap();
        let after = authority
            .registry()
            .get(&issued.access_token)
            .await
            .unwrap()
            .last_activity_ms;
        assert!(after > before);
    }

    #[tokio::test]
    async fn refresh_token_is_not_accepted_as_access_token() {
        let authority = authority(default_pair());
        let issued = authority.login(ADMIN_USERNAME, ADMIN_PASSWORD).await.unwrap();
        let refresh = issued.refresh_token.unwrap();
        assert!(refresh.starts_with(TokenKind::Refresh.prefix()));
        assert_eq!(authority.verify(&refresh).await, Err(AuthError::InvalidToken));
    }

    #[tokio::test]
    async fn fixed_mode_issues_single_non_expiring_token() {
        let authority = authority(fixed_strategy());
        let issued = authority.login(ADMIN_USERNAME, ADMIN_PASSWORD).await.unwrap();
        assert!(issued.refresh_token.is_none());
        assert!(issued.expires_in.is_none());

        let identity = authority.verify(&issued.access_token).await.unwrap();
        assert_eq!(identity.expires_at_ms, None);
        assert_eq!(
            authority.refresh(&issued.access_token).await.unwrap_err(),
            AuthError::InvalidRefreshToken
        );

        authority.logout(&issued.access_token).await;
        assert_eq!(
            authority.verify(&issued.access_token).await,
            Err(AuthError::InvalidToken)
        );
    }

    #[tokio::test]
    async fn unregistered_token_with_valid_signature_is_rejected() {
        let first = authority(default_pair());
        let second = authority(default_pair());
        let issued = first.login(ADMIN_USERNAME, ADMIN_PASSWORD).await.unwrap();
        // 同密钥的另一个实例没有登记该 token。
        assert_eq!(
            second.verify(&issued.access_token).await,
            Err(AuthError::InvalidToken)
        );
    }

    #[tokio::test]
    async fn concurrent_login_verify_logout_keeps_registry_consistent() {
        let authority = Arc::new(authority(default_pair()));
        let shared = authority.login(ADMIN_USERNAME, ADMIN_PASSWORD).await.unwrap();
        let shared = Arc::new(shared.access_token);

        let mut handles = Vec::new();
        for i in 0..32 {
            let authority = authority.clone();
            let shared = shared.clone();
            handles.push(tokio::spawn(async move {
                let issued = authority.login(ADMIN_USERNAME, ADMIN_PASSWORD).await.unwrap();
                let _ = authority.verify(&shared).await;
                authority.verify(&issued.access_token).await.unwrap();
                if i % 2 == 0 {
                    authority.logout(&issued.access_token).await;
                    assert_eq!(
                        authority.verify(&issued.access_token).await,
                        Err(AuthError::InvalidToken)
                    );
                }
                if i == 7 {
                    authority.logout(&shared).await;
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        // 16 个未登出的会话各保留 access + refresh。
        assert_eq!(authority.registry().len().await, 32);
        assert_eq!(authority.verify(&shared).await, Err(AuthError::InvalidToken));
    }
}
