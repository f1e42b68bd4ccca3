//! 预约表。日期 `YYYY-MM-DD`，时间 `HH:MM`（可带秒）。

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use softclin_protocol::codes;

use crate::{
    api::error::ApiError,
    records::{Record, nullable, required_text},
};

/// 新预约默认状态。
pub(crate) const DEFAULT_STATUS: &str = "pending";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct Appointment {
    pub(crate) id: u64,
    pub(crate) patient_name: String,
    /// 接诊专业人员名称。
    pub(crate) professional: Option<String>,
    pub(crate) date: String,
    pub(crate) time: String,
    pub(crate) kind: Option<String>,
    pub(crate) status: String,
    pub(crate) notes: Option<String>,
    pub(crate) first_visit: bool,
    pub(crate) created_at: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct NewAppointment {
    pub(crate) patient_name: String,
    #[serde(default)]
    pub(crate) professional: Option<String>,
    pub(crate) date: String,
    pub(crate) time: String,
    #[serde(default)]
    pub(crate) kind: Option<String>,
    #[serde(default)]
    pub(crate) status: Option<String>,
    #[serde(default)]
    pub(crate) notes: Option<String>,
    #[serde(default)]
    pub(crate) first_visit: Option<bool>,
}

/// 部分更新；`professional`、`kind`、`notes` 传 `null` 时清空。
#[derive(Debug, Default, Deserialize)]
pub(crate) struct AppointmentPatch {
    pub(crate) patient_name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub(crate) professional: Option<Option<String>>,
    pub(crate) date: Option<String>,
    pub(crate) time: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub(crate) kind: Option<Option<String>>,
    pub(crate) status: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub(crate) notes: Option<Option<String>>,
    pub(crate) first_visit: Option<bool>,
}

impl Record for Appointment {
    const TABLE: &'static str = "appointments";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "patient_name",
        "professional",
        "date",
        "time",
        "kind",
        "status",
        "first_visit",
        "created_at",
    ];

    type New = NewAppointment;
    type Patch = AppointmentPatch;

    fn create(id: u64, input: NewAppointment, created_at: String) -> Result<Self, ApiError> {
        Ok(Self {
            id,
            patient_name: required_text("patient_name", input.patient_name)?,
            professional: input.professional,
            date: parse_date(&input.date)?,
            time: parse_time(&input.time)?,
            kind: input.kind,
            status: input
                .status
                .filter(|status| !status.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_STATUS.to_string()),
            notes: input.notes,
            first_visit: input.first_visit.unwrap_or(false),
            created_at,
        })
    }

    fn id(&self) -> u64 {
        self.id
    }

    fn patch_is_empty(patch: &AppointmentPatch) -> bool {
        patch.patient_name.is_none()
            && patch.professional.is_none()
            && patch.date.is_none()
            && patch.time.is_none()
            && patch.kind.is_none()
            && patch.status.is_none()
            && patch.notes.is_none()
            && patch.first_visit.is_none()
    }

    fn apply(&mut self, patch: AppointmentPatch) -> Result<(), ApiError> {
        if let Some(patient_name) = patch.patient_name {
            self.patient_name = required_text("patient_name", patient_name)?;
        }
        if let Some(date) = patch.date {
            self.date = parse_date(&date)?;
        }
        if let Some(time) = patch.time {
            self.time = parse_time(&time)?;
        }
        if let Some(status) = patch.status {
            self.status = required_text("status", status)?;
        }
        if let Some(professional) = patch.professional {
            self.professional = professional;
        }
        if let Some(kind) = patch.kind {
            self.kind = kind;
        }
        if let Some(notes) = patch.notes {
            self.notes = notes;
        }
        if let Some(first_visit) = patch.first_visit {
            self.first_visit = first_visit;
        }
        Ok(())
    }
}

/// 归一化为 `YYYY-MM-DD`。
fn parse_date(raw: &str) -> Result<String, ApiError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map(|date| date.format("%Y-%m-%d").to_string())
        .map_err(|_| {
            ApiError::bad_request(
                codes::INVALID_BODY,
                format!("`date` must be YYYY-MM-DD, got `{raw}`"),
            )
        })
}

/// 归一化为 `HH:MM`；秒被丢弃。
fn parse_time(raw: &str) -> Result<String, ApiError> {
    let raw_trimmed = raw.trim();
    NaiveTime::parse_from_str(raw_trimmed, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw_trimmed, "%H:%M:%S"))
        .map(|time| time.format("%H:%M").to_string())
        .map_err(|_| {
            ApiError::bad_request(
                codes::INVALID_BODY,
                format!("`time` must be HH:MM, got `{raw}`"),
            )
        })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{Appointment, AppointmentPatch, NewAppointment, parse_date, parse_time};
    use crate::records::Record;

    fn create(body: serde_json::Value) -> Result<Appointment, crate::api::error::ApiError> {
        let input: NewAppointment = serde_json::from_value(body).unwrap();
        Appointment::create(1, input, "now".to_string())
    }

    #[test]
    fn applies_status_and_first_visit_defaults() {
        let row = create(json!({
            "patient_name": "João",
            "professional": "Dra. Ana",
            "date": "2026-05-04",
            "time": "14:30"
        }))
        .unwrap();
        assert_eq!(row.status, "pending");
        assert!(!row.first_visit);
    }

    #[test]
    fn explicit_status_is_kept() {
        let row = create(json!({
            "patient_name": "João",
            "date": "2026-05-04",
            "time": "14:30:00",
            "status": "confirmed",
            "first_visit": true
        }))
        .unwrap();
        assert_eq!(row.status, "confirmed");
        assert_eq!(row.time, "14:30");
        assert!(row.first_visit);
    }

    #[test]
    fn rejects_malformed_date_and_time() {
        assert!(parse_date("04/05/2026").is_err());
        assert!(parse_date("2026-02-30").is_err());
        assert!(parse_time("25:00").is_err());
        assert!(parse_time("9h").is_err());
        assert_eq!(parse_time("09:05").unwrap(), "09:05");
    }

    #[test]
    fn invalid_date_patch_is_rejected() {
        let mut row = create(json!({
            "patient_name": "João",
            "date": "2026-05-04",
            "time": "14:30"
        }))
        .unwrap();
        let patch: AppointmentPatch = serde_json::from_value(json!({"date": "bad"})).unwrap();
        assert_eq!(row.apply(patch).unwrap_err().code, "INVALID_BODY");
        assert_eq!(row.date, "2026-05-04");
        assert!(Appointment::patch_is_empty(&AppointmentPatch::default()));
    }

    #[test]
    fn null_clears_notes_and_absent_keeps_professional() {
        let mut row = create(json!({
            "patient_name": "João",
            "professional": "Dra. Ana",
            "date": "2026-05-04",
            "time": "14:30",
            "notes": "retorno"
        }))
        .unwrap();
        let patch: AppointmentPatch = serde_json::from_value(json!({"notes": null})).unwrap();
        assert!(!Appointment::patch_is_empty(&patch));
        row.apply(patch).unwrap();
        assert_eq!(row.notes, None);
        assert_eq!(row.professional.as_deref(), Some("Dra. Ana"));
    }
}
