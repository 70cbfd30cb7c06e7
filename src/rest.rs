use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, error};

use crate::models::{Appointment, NewAppointment, SdrQuota};
use crate::pacing;
use crate::store::{AppointmentStore, StoreError, StoreResult};

const APPOINTMENTS_TABLE: &str = "agendamentos";
const QUOTAS_TABLE: &str = "sdr_metas";
const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

/// Client for the hosted database's PostgREST interface (`/rest/v1/<table>`).
pub struct RestStore {
    client: Client,
    base_url: String,
}

impl RestStore {
    pub fn new(base_url: &str, api_key: &str) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "apikey",
            HeaderValue::from_str(api_key).context("API key is not a valid header value")?,
        );
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {api_key}"))
                .context("API key is not a valid header value")?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(10))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    async fn read<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        what: &str,
    ) -> StoreResult<T> {
        let response = request
            .send()
            .await
            .map_err(|err| StoreError::Connectivity(format!("{what}: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response_text(response).await;
            error!(%status, what, "store read failed");
            return Err(StoreError::Connectivity(format!("{what}: HTTP {status}: {body}")));
        }

        response
            .json::<T>()
            .await
            .map_err(|err| StoreError::Connectivity(format!("{what}: unreadable response: {err}")))
    }
}

#[async_trait]
impl AppointmentStore for RestStore {
    async fn fetch_today_appointments(&self, today: NaiveDate) -> StoreResult<Vec<Appointment>> {
        let day = today.to_string();
        let request = self.client.get(self.table_url(APPOINTMENTS_TABLE)).query(&[
            ("select", "*".to_string()),
            ("data_agendamento", format!("eq.{day}")),
            ("order", "hora_agendamento.asc".to_string()),
        ]);
        let rows: Vec<Appointment> = self.read(request, "today's appointments").await?;
        debug!(count = rows.len(), %day, "fetched today's appointments");
        Ok(rows)
    }

    async fn fetch_quotas(&self) -> StoreResult<Vec<SdrQuota>> {
        let request = self
            .client
            .get(self.table_url(QUOTAS_TABLE))
            .query(&[("select", "*")]);
        self.read(request, "SDR quotas").await
    }

    async fn fetch_month_appointments(&self, today: NaiveDate) -> StoreResult<Vec<Appointment>> {
        let first = pacing::first_day_of_month(today);
        let last = pacing::last_day_of_month(today);
        let request = self.client.get(self.table_url(APPOINTMENTS_TABLE)).query(&[
            ("select", "*".to_string()),
            ("data_agendamento", format!("gte.{first}")),
            ("data_agendamento", format!("lte.{last}")),
        ]);
        let rows: Vec<Appointment> = self.read(request, "month appointments").await?;
        debug!(count = rows.len(), %first, %last, "fetched month appointments");
        Ok(rows)
    }

    async fn create_appointment(&self, appointment: &NewAppointment) -> StoreResult<Appointment> {
        let response = self
            .client
            .post(self.table_url(APPOINTMENTS_TABLE))
            .header("Prefer", "return=representation")
            .header(ACCEPT, SINGLE_OBJECT)
            .json(&[appointment])
            .send()
            .await
            .map_err(|err| StoreError::Connectivity(format!("create appointment: {err}")))?;

        let status = response.status();
        if status.is_client_error() && status != StatusCode::UNAUTHORIZED {
            let body = response_text(response).await;
            error!(%status, %body, "store rejected appointment");
            return Err(StoreError::Validation(format!("HTTP {status}: {body}")));
        }
        if !status.is_success() {
            let body = response_text(response).await;
            error!(%status, %body, "create appointment failed");
            return Err(StoreError::Connectivity(format!(
                "create appointment: HTTP {status}: {body}"
            )));
        }

        response.json::<Appointment>().await.map_err(|err| {
            StoreError::Connectivity(format!("create appointment: unreadable response: {err}"))
        })
    }
}

async fn response_text(response: Response) -> String {
    response.text().await.unwrap_or_default()
}
