//! 专业人员表。

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    api::error::ApiError,
    records::{Record, nullable, required_text},
};

/// 专业人员。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct Professional {
    pub(crate) id: u64,
    pub(crate) full_name: String,
    pub(crate) display_name: Option<String>,
    pub(crate) specialty: Option<String>,
    /// 执业注册号。
    pub(crate) registration: Option<String>,
    pub(crate) email: Option<String>,
    pub(crate) phone: Option<String>,
    pub(crate) active: bool,
    /// 出诊配置，原样保存的 JSON。
    pub(crate) service_config: Option<Value>,
    pub(crate) created_at: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct NewProfessional {
    pub(crate) full_name: String,
    #[serde(default)]
    pub(crate) display_name: Option<String>,
    #[serde(default)]
    pub(crate) specialty: Option<String>,
    #[serde(default)]
    pub(crate) registration: Option<String>,
    #[serde(default)]
    pub(crate) email: Option<String>,
    #[serde(default)]
    pub(crate) phone: Option<String>,
    #[serde(default)]
    pub(crate) active: Option<bool>,
    #[serde(default)]
    pub(crate) service_config: Option<Value>,
}

/// 部分更新；可空列显式传 `null` 时清空。
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ProfessionalPatch {
    pub(crate) full_name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub(crate) display_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub(crate) specialty: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub(crate) registration: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub(crate) email: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub(crate) phone: Option<Option<String>>,
    pub(crate) active: Option<bool>,
    #[serde(default, deserialize_with = "nullable")]
    pub(crate) service_config: Option<Option<Value>>,
}

impl Record for Professional {
    const TABLE: &'static str = "professionals";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "full_name",
        "display_name",
        "specialty",
        "registration",
        "email",
        "phone",
        "active",
        "created_at",
    ];

    type New = NewProfessional;
    type Patch = ProfessionalPatch;

    fn create(id: u64, input: NewProfessional, created_at: String) -> Result<Self, ApiError> {
        Ok(Self {
            id,
            full_name: required_text("full_name", input.full_name)?,
            display_name: input.display_name,
            specialty: input.specialty,
            registration: input.registration,
            email: input.email,
            phone: input.phone,
            active: input.active.unwrap_or(true),
            service_config: input.service_config,
            created_at,
        })
    }

    fn id(&self) -> u64 {
        self.id
    }

    fn patch_is_empty(patch: &ProfessionalPatch) -> bool {
        patch.full_name.is_none()
            && patch.display_name.is_none()
            && patch.specialty.is_none()
            && patch.registration.is_none()
            && patch.email.is_none()
            && patch.phone.is_none()
            && patch.active.is_none()
            && patch.service_config.is_none()
    }

    fn apply(&mut self, patch: ProfessionalPatch) -> Result<(), ApiError> {
        if let Some(full_name) = patch.full_name {
            self.full_name = required_text("full_name", full_name)?;
        }
        if let Some(display_name) = patch.display_name {
            self.display_name = display_name;
        }
        if let Some(specialty) = patch.specialty {
            self.specialty = specialty;
        }
        if let Some(registration) = patch.registration {
            self.registration = registration;
        }
        if let Some(email) = patch.email {
            self.email = email;
        }
        if let Some(phone) = patch.phone {
            self.phone = phone;
        }
        if let Some(active) = patch.active {
            self.active = active;
        }
        if let Some(service_config) = patch.service_config {
            self.service_config = service_config;
        }
        Ok(())
    }
}
