use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    error::Error,
    model::{
        common::election::ElectionStatus,
        db::settings::ElectionSettings,
        mongodb::{serde_hex_id, Id},
    },
};

/// Election settings as submitted by an admin. Replaces the stored settings
/// wholesale; omitted dates mean "no limit".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsSpec {
    #[serde(default)]
    pub status: ElectionStatus,
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default, with = "serde_hex_id::option")]
    pub active_group_id: Option<Id>,
}

impl TryFrom<SettingsSpec> for ElectionSettings {
    type Error = Error;

    /// Check the dates are in order. Whether the active group exists is
    /// checked against the database by the caller.
    fn try_from(spec: SettingsSpec) -> Result<Self, Self::Error> {
        if let (Some(start), Some(end)) = (spec.start_date, spec.end_date) {
            if end < start {
                return Err(Error::bad_request(
                    "Election end date must not be before its start date.",
                ));
            }
        }
        Ok(ElectionSettings::new(
            spec.status,
            spec.start_date,
            spec.end_date,
            spec.active_group_id,
        ))
    }
}

/// Election settings as shown to API clients, with the derived openness.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsDescription {
    pub status: ElectionStatus,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    #[serde(with = "serde_hex_id::option")]
    pub active_group_id: Option<Id>,
    /// Are votes accepted right now?
    pub is_open: bool,
    /// Has voting finished for good?
    pub has_ended: bool,
}

impl SettingsDescription {
    pub fn at(settings: &ElectionSettings, now: DateTime<Utc>) -> Self {
        Self {
            status: settings.status,
            start_date: settings.start(),
            end_date: settings.end(),
            active_group_id: settings.active_group_id,
            is_open: settings.is_open_at(now),
            has_ended: settings.has_ended_at(now),
        }
    }
}

impl From<&ElectionSettings> for SettingsDescription {
    fn from(settings: &ElectionSettings) -> Self {
        Self::at(settings, Utc::now())
    }
}
