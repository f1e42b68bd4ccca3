//! 内存表：单调递增 ID + 读写锁保护的有序映射。

use std::{
    collections::BTreeMap,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use tokio::sync::RwLock;

use crate::{
    api::error::ApiError,
    records::{Record, query::ListQuery},
};

/// 一张内存表；克隆共享同一份数据。
pub(crate) struct Table<T> {
    rows: Arc<RwLock<BTreeMap<u64, T>>>,
    next_id: Arc<AtomicU64>,
}

impl<T> Clone for Table<T> {
    fn clone(&self) -> Self {
        Self {
            rows: Arc::clone(&self.rows),
            next_id: Arc::clone(&self.next_id),
        }
    }
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            rows: Arc::new(RwLock::new(BTreeMap::new())),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }
}

impl<T: Record> Table<T> {
    /// 按查询条件列出行：过滤、排序（稳定，按 ID 兜底）、截断。
    pub(crate) async fn list(&self, query: &ListQuery) -> Result<Vec<T>, ApiError> {
        let guard = self.rows.read().await;
        let mut rows = Vec::with_capacity(guard.len());
        for row in guard.values() {
            let value = serde_json::to_value(row)
                .map_err(|err| ApiError::internal(format!("serialize {} row: {err}", T::TABLE)))?;
            if query.matches(&value) {
                rows.push((value, row.clone()));
            }
        }
        drop(guard);

        rows.sort_by(|(a, _), (b, _)| query.compare(a, b));
        let limit = query.limit.unwrap_or(rows.len());
        Ok(rows.into_iter().take(limit).map(|(_, row)| row).collect())
    }

    /// 批量插入；任一条校验失败则整批不写入。
    pub(crate) async fn insert_many(&self, inputs: Vec<T::New>) -> Result<Vec<T>, ApiError> {
        let created_at = softclin_protocol::now_rfc3339_nanos();
        let mut guard = self.rows.write().await;
        let mut created = Vec::with_capacity(inputs.len());
        for input in inputs {
            let id = self.next_id.fetch_add(1, Ordering::Relaxed);
            created.push(T::create(id, input, created_at.clone())?);
        }
        for row in &created {
            guard.insert(row.id(), row.clone());
        }
        Ok(created)
    }

    /// 部分更新指定行；行不存在时返回空列表。
    pub(crate) async fn update(&self, id: u64, patch: T::Patch) -> Result<Vec<T>, ApiError> {
        let mut guard = self.rows.write().await;
        let Some(row) = guard.get_mut(&id) else {
            return Ok(Vec::new());
        };
        let mut next = row.clone();
        next.apply(patch)?;
        *row = next.clone();
        Ok(vec![next])
    }

    /// 删除指定行；返回被删除的行。
    pub(crate) async fn delete(&self, id: u64) -> Vec<T> {
        self.rows.write().await.remove(&id).into_iter().collect()
    }
}
