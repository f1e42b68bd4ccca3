//! 诊所业务数据：专业人员与预约的内存表及其受保护 HTTP 接口。

pub(crate) mod appointments;
pub(crate) mod handlers;
pub(crate) mod professionals;
pub(crate) mod query;
pub(crate) mod table;

use serde::{Deserialize, Deserializer, Serialize, de::DeserializeOwned};

use crate::api::error::ApiError;

/// 一张内存表的行类型。
pub(crate) trait Record: Clone + Serialize + Send + Sync + 'static {
    /// 表名（用于日志）。
    const TABLE: &'static str;
    /// 可用于过滤与排序的列名。
    const COLUMNS: &'static [&'static str];

    /// 新建请求体。
    type New: DeserializeOwned + Send + 'static;
    /// 部分更新请求体；缺省字段保持不变。
    type Patch: DeserializeOwned + Send + 'static;

    /// 校验请求体并生成新行。
    fn create(id: u64, input: Self::New, created_at: String) -> Result<Self, ApiError>;

    fn id(&self) -> u64;

    fn patch_is_empty(patch: &Self::Patch) -> bool;

    /// 应用部分更新；校验失败时不修改原行。
    fn apply(&mut self, patch: Self::Patch) -> Result<(), ApiError>;
}

/// 单条或批量请求体。
#[derive(Debug, serde::Deserialize)]
#[serde(untagged)]
pub(crate) enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    pub(crate) fn into_vec(self) -> Vec<T> {
        match self {
            Self::Many(items) => items,
            Self::One(item) => vec![item],
        }
    }
}

/// 可清空字段：缺省为 `None`，显式 `null` 为 `Some(None)`。
///
/// 需与 `#[serde(default)]` 一起使用。
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// 必填文本字段：去除首尾空白后不能为空。
pub(crate) fn required_text(field: &str, value: String) -> Result<String, ApiError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::bad_request(
            softclin_protocol::codes::INVALID_BODY,
            format!("`{field}` is required"),
        ));
    }
    Ok(trimmed.to_string())
}
