use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::{info, warn};

use crate::config::{Backend, Settings};
use crate::db::PgStore;
use crate::models::{Appointment, NewAppointment, SdrQuota};
use crate::rest::RestStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Store unreachable, not configured, or answered a read with something unusable.
    #[error("store unavailable: {0}")]
    Connectivity(String),
    /// The store refused a write.
    #[error("store rejected the write: {0}")]
    Validation(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// The four calls the board makes against the appointment store.
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    /// Appointments scheduled for `today`, ordered by time ascending.
    async fn fetch_today_appointments(&self, today: NaiveDate) -> StoreResult<Vec<Appointment>>;

    async fn fetch_quotas(&self) -> StoreResult<Vec<SdrQuota>>;

    /// Appointments from the first to the last day of `today`'s month, inclusive.
    async fn fetch_month_appointments(&self, today: NaiveDate) -> StoreResult<Vec<Appointment>>;

    async fn create_appointment(&self, appointment: &NewAppointment) -> StoreResult<Appointment>;
}

/// Stands in for a backend whose credentials are missing.
pub struct UnconfiguredStore {
    backend: &'static str,
}

impl UnconfiguredStore {
    pub fn new(backend: &'static str) -> Self {
        Self { backend }
    }

    fn error(&self) -> StoreError {
        StoreError::Connectivity(format!("{} backend is not configured", self.backend))
    }
}

#[async_trait]
impl AppointmentStore for UnconfiguredStore {
    async fn fetch_today_appointments(&self, _today: NaiveDate) -> StoreResult<Vec<Appointment>> {
        Err(self.error())
    }

    async fn fetch_quotas(&self) -> StoreResult<Vec<SdrQuota>> {
        Err(self.error())
    }

    async fn fetch_month_appointments(&self, _today: NaiveDate) -> StoreResult<Vec<Appointment>> {
        Err(self.error())
    }

    async fn create_appointment(&self, _appointment: &NewAppointment) -> StoreResult<Appointment> {
        Err(self.error())
    }
}

/// Picks the store for the configured backend. `None` means fixture mode.
pub fn open_store(settings: &Settings) -> anyhow::Result<Option<Box<dyn AppointmentStore>>> {
    let store: Box<dyn AppointmentStore> = match settings.backend {
        Backend::Mock => {
            info!("mock backend selected, store access disabled");
            return Ok(None);
        }
        Backend::Rest => match settings.rest_credentials() {
            Some((url, key)) => {
                info!(url, "using REST backend");
                Box::new(RestStore::new(url, key)?)
            }
            None => {
                warn!("SUPABASE_URL or SUPABASE_ANON_KEY missing, board will show fixture data");
                Box::new(UnconfiguredStore::new("rest"))
            }
        },
        Backend::Postgres => match settings.database_url() {
            Some(url) => {
                info!("using Postgres backend");
                Box::new(PgStore::connect_lazy(url)?)
            }
            None => {
                warn!("DATABASE_URL missing, board will show fixture data");
                Box::new(UnconfiguredStore::new("postgres"))
            }
        },
    };

    Ok(Some(store))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unconfigured_store_fails_every_call_with_connectivity() {
        let store = UnconfiguredStore::new("rest");
        let today = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();

        assert!(matches!(
            store.fetch_today_appointments(today).await,
            Err(StoreError::Connectivity(_))
        ));
        assert!(matches!(store.fetch_quotas().await, Err(StoreError::Connectivity(_))));
        assert!(matches!(
            store.fetch_month_appointments(today).await,
            Err(StoreError::Connectivity(_))
        ));

        let payload = NewAppointment::quick_entry(
            crate::models::Sdr::Lucas,
            today,
            chrono::NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
        );
        let err = store.create_appointment(&payload).await.unwrap_err();
        assert_eq!(err.to_string(), "store unavailable: rest backend is not configured");
    }
}
