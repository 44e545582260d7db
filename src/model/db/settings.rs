use chrono::{DateTime as ChronoDateTime, Utc};
use mongodb::{
    bson::{doc, DateTime, Document},
    error::Error as DbError,
    options::{ReplaceOptions, UpdateOptions},
};
use serde::{Deserialize, Serialize};

use crate::model::{
    common::election::ElectionStatus,
    mongodb::{Coll, Id},
};

/// The `_id` of the singleton settings document.
pub const ELECTION_SETTINGS_ID: &str = "election";

fn election_settings_id() -> String {
    ELECTION_SETTINGS_ID.to_string()
}

/// Election-wide settings, stored as the single document `settings/election`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectionSettings {
    #[serde(rename = "_id", default = "election_settings_id")]
    id: String,
    #[serde(default)]
    pub status: ElectionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime>,
    /// If set, votes are only accepted in this group.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_group_id: Option<Id>,
}

impl Default for ElectionSettings {
    /// An active election with no schedule, as used before any admin has
    /// touched the settings.
    fn default() -> Self {
        Self {
            id: election_settings_id(),
            status: ElectionStatus::Active,
            start_date: None,
            end_date: None,
            active_group_id: None,
        }
    }
}

impl ElectionSettings {
    pub fn new(
        status: ElectionStatus,
        start_date: Option<ChronoDateTime<Utc>>,
        end_date: Option<ChronoDateTime<Utc>>,
        active_group_id: Option<Id>,
    ) -> Self {
        Self {
            status,
            start_date: start_date.map(DateTime::from_chrono),
            end_date: end_date.map(DateTime::from_chrono),
            active_group_id,
            ..Default::default()
        }
    }

    /// Filter matching the singleton document.
    pub fn filter() -> Document {
        doc! { "_id": ELECTION_SETTINGS_ID }
    }

    pub fn start(&self) -> Option<ChronoDateTime<Utc>> {
        self.start_date.map(|d| d.to_chrono())
    }

    pub fn end(&self) -> Option<ChronoDateTime<Utc>> {
        self.end_date.map(|d| d.to_chrono())
    }

    /// Are votes accepted at the given instant?
    pub fn is_open_at(&self, now: ChronoDateTime<Utc>) -> bool {
        self.status == ElectionStatus::Active
            && self.start().map_or(true, |start| now >= start)
            && self.end().map_or(true, |end| now <= end)
    }

    /// Has voting finished for good at the given instant?
    /// An election that has not started yet is not open, but has not ended either.
    pub fn has_ended_at(&self, now: ChronoDateTime<Utc>) -> bool {
        self.status == ElectionStatus::Ended || self.end().map_or(false, |end| now > end)
    }

    /// Load the settings, falling back to the defaults if none are stored.
    pub async fn load(settings: &Coll<ElectionSettings>) -> Result<Self, DbError> {
        Ok(settings
            .find_one(Self::filter(), None)
            .await?
            .unwrap_or_default())
    }

    /// Store these settings, replacing any existing ones.
    pub async fn save(&self, settings: &Coll<ElectionSettings>) -> Result<(), DbError> {
        let options = ReplaceOptions::builder().upsert(true).build();
        settings
            .replace_one(Self::filter(), self, options)
            .await?;
        Ok(())
    }

    /// Mark the election as ended without touching anything else.
    pub async fn mark_ended(settings: &Coll<ElectionSettings>) -> Result<(), DbError> {
        let update = doc! {
            "$set": { "status": ElectionStatus::Ended }
        };
        let options = UpdateOptions::builder().upsert(true).build();
        settings
            .update_one(Self::filter(), update, options)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[test]
    fn default_is_open() {
        let settings = ElectionSettings::default();
        assert!(settings.is_open_at(Utc::now()));
        assert!(!settings.has_ended_at(Utc::now()));
    }

    #[test]
    fn schedule_window() {
        let now = Utc::now();
        let settings = ElectionSettings::new(
            ElectionStatus::Active,
            Some(now + Duration::hours(1)),
            Some(now + Duration::hours(2)),
            None,
        );
        // Not started yet.
        assert!(!settings.is_open_at(now));
        assert!(!settings.has_ended_at(now));
        // In progress.
        assert!(settings.is_open_at(now + Duration::minutes(90)));
        // Finished.
        assert!(!settings.is_open_at(now + Duration::hours(3)));
        assert!(settings.has_ended_at(now + Duration::hours(3)));
    }

    #[test]
    fn ended_status_wins() {
        let now = Utc::now();
        let settings = ElectionSettings::new(
            ElectionStatus::Ended,
            None,
            Some(now + Duration::days(1)),
            None,
        );
        assert!(!settings.is_open_at(now));
        assert!(settings.has_ended_at(now));
    }
}
