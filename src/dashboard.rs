use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local, NaiveDate, Utc};
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};
use uuid::Uuid;

use crate::fixtures;
use crate::models::{Appointment, Board, DataSource, NewAppointment, Sdr, Snapshot};
use crate::pacing;
use crate::store::{AppointmentStore, StoreError, StoreResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Celebration {
    pub sdr: Sdr,
    pub sound: Option<&'static str>,
}

impl Celebration {
    pub fn for_sdr(sdr: Sdr) -> Self {
        Self {
            sdr,
            sound: sdr.celebration_sound(),
        }
    }
}

/// Owns the current snapshot. Every refresh or creation swaps in a new
/// `Arc<Snapshot>`; readers keep whatever snapshot they already hold.
pub struct Dashboard {
    store: Option<Box<dyn AppointmentStore>>,
    snapshot: Option<Arc<Snapshot>>,
}

impl Dashboard {
    /// `store == None` runs on fixture data only.
    pub fn new(store: Option<Box<dyn AppointmentStore>>) -> Self {
        Self {
            store,
            snapshot: None,
        }
    }

    pub fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.snapshot.clone()
    }

    /// `None` until the first refresh has completed.
    pub fn board(&self, today: NaiveDate) -> Option<Board> {
        self.snapshot
            .as_deref()
            .map(|snapshot| pacing::build_board(snapshot, today))
    }

    /// Reloads everything. Store failures are logged and replaced by fixture
    /// data; this never fails.
    pub async fn refresh(&mut self, today: NaiveDate) -> DataSource {
        let snapshot = match &self.store {
            None => fixtures::fixture_snapshot(today),
            Some(store) => match load_live(store.as_ref(), today).await {
                Ok(snapshot) => snapshot,
                Err(err) => {
                    warn!(error = %err, "refresh failed, showing fixture data");
                    fixtures::fixture_snapshot(today)
                }
            },
        };

        let source = snapshot.source;
        self.snapshot = Some(Arc::new(snapshot));
        source
    }

    /// Books a quick-entry appointment for `sdr`.
    ///
    /// `celebrate` runs before the write is attempted and is not undone if the
    /// write fails. On success the new row is merged into a fresh snapshot.
    pub async fn record_appointment<F>(
        &mut self,
        sdr: Sdr,
        now: DateTime<Local>,
        celebrate: F,
    ) -> StoreResult<Appointment>
    where
        F: FnOnce(&Celebration),
    {
        celebrate(&Celebration::for_sdr(sdr));

        let payload = NewAppointment::quick_entry(sdr, now.date_naive(), now.time());
        let created = match &self.store {
            None => {
                payload.into_appointment(Uuid::new_v4().to_string(), now.with_timezone(&Utc))
            }
            Some(store) => store.create_appointment(&payload).await?,
        };
        info!(id = %created.id, sdr = sdr.name(), "appointment created");

        let mut next = match self.snapshot.as_deref() {
            Some(current) => current.clone(),
            None => empty_snapshot(),
        };
        next.appointments_today.push(created.clone());
        next.accumulated.increment(sdr);
        self.snapshot = Some(Arc::new(next));

        Ok(created)
    }
}

async fn load_live(store: &dyn AppointmentStore, today: NaiveDate) -> Result<Snapshot, StoreError> {
    let (appointments_today, quotas, month) = tokio::try_join!(
        store.fetch_today_appointments(today),
        store.fetch_quotas(),
        store.fetch_month_appointments(today),
    )?;

    info!(
        today = appointments_today.len(),
        month = month.len(),
        quotas = quotas.len(),
        "board data refreshed"
    );

    Ok(Snapshot {
        appointments_today,
        quotas,
        accumulated: pacing::accumulate_by_sdr(&month),
        source: DataSource::Live,
        refreshed_at: Utc::now(),
    })
}

fn empty_snapshot() -> Snapshot {
    Snapshot {
        appointments_today: Vec::new(),
        quotas: Vec::new(),
        accumulated: Default::default(),
        source: DataSource::Live,
        refreshed_at: Utc::now(),
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Intervals {
    pub refresh: Duration,
    pub clock: Duration,
}

/// Runs the board until Ctrl-C: reloads data every `refresh` and redraws every
/// `clock`. A refresh runs to completion before the next tick is looked at, so
/// refreshes never overlap; ticks missed during a slow refresh are skipped.
pub async fn watch<R>(
    dashboard: &mut Dashboard,
    intervals: Intervals,
    mut render: R,
) -> anyhow::Result<()>
where
    R: FnMut(&Board, DateTime<Local>),
{
    let mut refresh = tokio::time::interval(intervals.refresh);
    refresh.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut clock = tokio::time::interval(intervals.clock);
    clock.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = refresh.tick() => {
                let today = Local::now().date_naive();
                let source = dashboard.refresh(today).await;
                info!(?source, "board refreshed");
                redraw(dashboard, &mut render);
            }
            _ = clock.tick() => {
                redraw(dashboard, &mut render);
            }
            result = &mut shutdown => {
                result?;
                info!("shutting down");
                return Ok(());
            }
        }
    }
}

fn redraw<R>(dashboard: &Dashboard, render: &mut R)
where
    R: FnMut(&Board, DateTime<Local>),
{
    let now = Local::now();
    if let Some(board) = dashboard.board(now.date_naive()) {
        render(&board, now);
    }
}
