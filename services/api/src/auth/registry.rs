//! 吊销登记表：记录当前仍被承认的 token（进程内存，不持久化）。

use std::{collections::HashMap, sync::Arc, time::Duration};

use tokio::{sync::RwLock, task::JoinHandle, time::MissedTickBehavior};
use tracing::debug;

use crate::auth::token::{TokenClaims, TokenKind, unix_now_ms};

/// 单个 token 的登记信息。
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RegistryEntry {
    pub(crate) kind: TokenKind,
    pub(crate) session_id: String,
    pub(crate) expires_at_ms: Option<u64>,
    /// 最近一次通过校验的时间。
    pub(crate) last_activity_ms: u64,
}

impl RegistryEntry {
    /// 由刚签发的 claims 构造登记项。
    pub(crate) fn from_claims(claims: &TokenClaims) -> Self {
        Self {
            kind: claims.typ,
            session_id: claims.sid.clone(),
            expires_at_ms: claims.exp,
            last_activity_ms: claims.iat,
        }
    }

    /// 是否已过期；无过期时间的 token 永不过期。
    pub(crate) fn is_expired(&self, now_ms: u64) -> bool {
        self.expires_at_ms.is_some_and(|exp| exp <= now_ms)
    }
}

/// 并发安全的吊销登记表句柄，克隆共享同一份数据。
#[derive(Clone, Default)]
pub(crate) struct RevocationRegistry {
    entries: Arc<RwLock<HashMap<String, RegistryEntry>>>,
}

impl RevocationRegistry {
    /// 在同一把写锁内登记一批 token。
    pub(crate) async fn insert_all(&self, issued: Vec<(String, RegistryEntry)>) {
        let mut guard = self.entries.write().await;
        guard.extend(issued);
    }

    /// 查询登记项。
    pub(crate) async fn get(&self, token: &str) -> Option<RegistryEntry> {
        self.entries.read().await.get(token).cloned()
    }

    /// 刷新最近活跃时间；token 已被移除时返回 false。
    pub(crate) async fn touch(&self, token: &str, now_ms: u64) -> bool {
        let mut guard = self.entries.write().await;
        match guard.get_mut(token) {
            Some(entry) => {
                entry.last_activity_ms = now_ms;
                true
            }
            None => false,
        }
    }

    /// 以 `anchor` 为凭据续签：anchor 仍在登记表中才登记新 token。
    ///
    /// `consume_anchor` 为 true 时 anchor 在同一把写锁内被移除，
    /// 并发使用同一个 anchor 时只有一个调用会成功。
    pub(crate) async fn renew(
        &self,
        anchor: &str,
        consume_anchor: bool,
        issued: Vec<(String, RegistryEntry)>,
    ) -> bool {
        let mut guard = self.entries.write().await;
        if !guard.contains_key(anchor) {
            return false;
        }
        if consume_anchor {
            guard.remove(anchor);
        }
        guard.extend(issued);
        true
    }

    /// 移除 token 及其所在会话的全部 token，返回移除数量。不存在时返回 0。
    pub(crate) async fn revoke_session(&self, token: &str) -> usize {
        let mut guard = self.entries.write().await;
        let Some(entry) = guard.remove(token) else {
            return 0;
        };
        let before = guard.len();
        guard.retain(|_, other| other.session_id != entry.session_id);
        1 + before - guard.len()
    }

    /// 清理已过期的登记项，返回清理数量。
    pub(crate) async fn sweep_expired(&self, now_ms: u64) -> usize {
        let mut guard = self.entries.write().await;
        let before = guard.len();
        guard.retain(|_, entry| !entry.is_expired(now_ms));
        before - guard.len()
    }

    /// 当前登记的 token 数量。
    pub(crate) async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// 启动后台清理任务，按固定周期移除过期登记项。
    pub(crate) fn spawn_sweeper(&self, interval: Duration) -> JoinHandle<()> {
        let registry = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let removed = registry.sweep_expired(unix_now_ms()).await;
                if removed > 0 {
                    debug!("registry sweep removed {removed} expired tokens");
                }
            }
        })
    }
}
