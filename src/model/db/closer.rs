use chrono::{DateTime, Utc};
use mongodb::{error::Error as DbError, Database};
use rocket::{
    fairing::{Fairing, Info, Kind},
    tokio::sync::Mutex,
    Build, Rocket,
};

use crate::{
    model::{
        common::election::ElectionStatus, db::settings::ElectionSettings, mongodb::Coll,
    },
    scheduled_task::ScheduledTask,
};

/// Closes the election at its scheduled end date by setting its status to
/// ended. Openness is also checked against the dates on every vote, so this
/// only makes the stored status catch up with the schedule.
pub struct ElectionCloser {
    task: Mutex<Option<ScheduledTask<()>>>,
}

impl ElectionCloser {
    pub fn new() -> Self {
        Self {
            task: Mutex::new(None),
        }
    }

    /// Replace any scheduled closing with one matching the given settings.
    /// Nothing is scheduled unless the election is active and has an end date.
    pub async fn arm(&self, settings: &ElectionSettings, collection: Coll<ElectionSettings>) {
        let mut task = self.task.lock().await;
        Self::cancel(&mut task).await;
        Self::schedule(&mut task, settings, collection);
    }

    /// Store new settings and reschedule the closing to match them.
    /// The old closing is cancelled before anything is written, so it cannot
    /// end an election the new settings keep open.
    pub async fn replace(
        &self,
        settings: &ElectionSettings,
        collection: Coll<ElectionSettings>,
    ) -> Result<(), DbError> {
        let mut task = self.task.lock().await;
        Self::cancel(&mut task).await;
        settings.save(&collection).await?;
        Self::schedule(&mut task, settings, collection);
        Ok(())
    }

    /// End the election immediately. Ended elections have nothing left to
    /// close, so any scheduled closing is dropped.
    pub async fn end_now(&self, collection: &Coll<ElectionSettings>) -> Result<(), DbError> {
        let mut task = self.task.lock().await;
        Self::cancel(&mut task).await;
        ElectionSettings::mark_ended(collection).await
    }

    async fn cancel(task: &mut Option<ScheduledTask<()>>) {
        if let Some(previous) = task.take() {
            if !previous.cancel().await {
                debug!("Cancelled previously scheduled election closing");
            }
        }
    }

    fn schedule(
        task: &mut Option<ScheduledTask<()>>,
        settings: &ElectionSettings,
        collection: Coll<ElectionSettings>,
    ) {
        let end = match (settings.status, settings.end()) {
            (ElectionStatus::Active, Some(end)) => end,
            _ => return,
        };
        info!("Election will close at {end}");
        *task = Some(ScheduledTask::new(Self::close(collection, end), end));
    }

    /// When the election is currently scheduled to close, if at all.
    pub async fn scheduled_for(&self) -> Option<DateTime<Utc>> {
        self.task
            .lock()
            .await
            .as_ref()
            .filter(|task| !task.is_finished())
            .map(|task| task.run_at())
    }

    /// The closing task itself. Failures are logged, not retried.
    async fn close(collection: Coll<ElectionSettings>, end: DateTime<Utc>) {
        match ElectionSettings::mark_ended(&collection).await {
            Ok(()) => warn!("Election closed at its scheduled end ({end})"),
            Err(e) => error!("Failed to close election at its scheduled end ({end}): {e}"),
        }
    }
}

impl Default for ElectionCloser {
    fn default() -> Self {
        Self::new()
    }
}

/// A fairing that arms the election closer from the stored settings during
/// Rocket ignition, and places the `ElectionCloser` into managed state.
/// It needs the database in managed state, so it must be attached after the
/// fairing responsible for that.
pub struct ElectionCloserFairing;

#[rocket::async_trait]
impl Fairing for ElectionCloserFairing {
    fn info(&self) -> Info {
        Info {
            name: "Election Closer",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> rocket::fairing::Result {
        let db = match rocket.state::<Database>() {
            Some(db) => db,
            None => {
                error!("Database was not available when scheduling the election closer");
                return Err(rocket);
            }
        };
        let collection = Coll::<ElectionSettings>::from_db(db);
        let settings = match ElectionSettings::load(&collection).await {
            Ok(settings) => settings,
            Err(e) => {
                error!("Failed to load election settings: {e}");
                return Err(rocket);
            }
        };

        let closer = ElectionCloser::new();
        closer.arm(&settings, collection).await;
        Ok(rocket.manage(closer))
    }
}
