//! API 层公共类型：错误定义与响应转换。

pub(crate) mod error;
