//! 服务共享状态：令牌签发中心与业务数据表。

use std::sync::Arc;

use axum::extract::FromRef;

use crate::{
    auth::authority::TokenAuthority,
    records::{appointments::Appointment, professionals::Professional, table::Table},
};

/// 路由共享状态；克隆共享同一份数据。
#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) authority: Arc<TokenAuthority>,
    pub(crate) professionals: Table<Professional>,
    pub(crate) appointments: Table<Appointment>,
}

impl AppState {
    pub(crate) fn new(authority: TokenAuthority) -> Self {
        Self {
            authority: Arc::new(authority),
            professionals: Table::default(),
            appointments: Table::default(),
        }
    }
}

impl FromRef<AppState> for Table<Professional> {
    fn from_ref(state: &AppState) -> Self {
        state.professionals.clone()
    }
}

impl FromRef<AppState> for Table<Appointment> {
    fn from_ref(state: &AppState) -> Self {
        state.appointments.clone()
    }
}
