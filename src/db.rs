use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use sqlx::error::ErrorKind;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::{
    clock_time, Appointment, NewAppointment, SdrQuota, Sdr, DEFAULT_DAILY_QUOTA,
    DEFAULT_MONTHLY_QUOTA, SCHEDULED_STATUS,
};
use crate::pacing;
use crate::store::{AppointmentStore, StoreError, StoreResult};

const APPOINTMENT_COLUMNS: &str = "id, sdr_nome, cliente_nome, data_agendamento, \
     hora_agendamento, status, empreendimento, created_at";

/// Direct Postgres access to the `agendamentos` and `sdr_metas` tables.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Builds the pool without connecting, so an unreachable database shows up
    /// as a failed refresh instead of a failed start.
    pub fn connect_lazy(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(5))
            .connect_lazy(database_url)
            .context("DATABASE_URL is not a valid Postgres connection string")?;
        Ok(Self::new(pool))
    }
}

pub async fn connect(database_url: &str) -> anyhow::Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await
        .context("failed to connect to Postgres")
}

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Upserts the default quota row for each SDR.
pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    for sdr in Sdr::ALL {
        sqlx::query(
            r#"
            INSERT INTO sdr_metas (sdr_nome, meta_diaria, meta_mensal)
            VALUES ($1, $2, $3)
            ON CONFLICT (sdr_nome) DO UPDATE
            SET meta_diaria = EXCLUDED.meta_diaria, meta_mensal = EXCLUDED.meta_mensal
            "#,
        )
        .bind(sdr.name())
        .bind(DEFAULT_DAILY_QUOTA as i32)
        .bind(DEFAULT_MONTHLY_QUOTA as i32)
        .execute(pool)
        .await
        .with_context(|| format!("failed to seed quota for {}", sdr.name()))?;
    }

    Ok(())
}

pub fn read_csv<R: std::io::Read>(input: R) -> anyhow::Result<Vec<NewAppointment>> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        sdr_nome: String,
        cliente_nome: String,
        data_agendamento: NaiveDate,
        hora_agendamento: String,
        empreendimento: String,
    }

    let mut reader = csv::Reader::from_reader(input);
    let mut rows = Vec::new();

    for (index, result) in reader.deserialize::<CsvRow>().enumerate() {
        let line = index + 2;
        let row = result.with_context(|| format!("malformed CSV row on line {line}"))?;
        let sdr = Sdr::parse_loose(&row.sdr_nome)
            .with_context(|| format!("unknown SDR `{}` on line {line}", row.sdr_nome))?;
        let time = clock_time::parse(row.hora_agendamento.trim()).with_context(|| {
            format!("invalid time `{}` on line {line}", row.hora_agendamento)
        })?;

        rows.push(NewAppointment {
            sdr_name: sdr.name().to_string(),
            client_name: row.cliente_nome,
            scheduled_date: row.data_agendamento,
            scheduled_time: time,
            status: SCHEDULED_STATUS.to_string(),
            project: row.empreendimento,
        });
    }

    Ok(rows)
}

pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    let file = std::fs::File::open(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let rows = read_csv(file)?;
    let store = PgStore::new(pool.clone());

    let mut inserted = 0usize;
    for row in &rows {
        store.create_appointment(row).await?;
        inserted += 1;
    }

    Ok(inserted)
}

fn appointment_from_row(row: &PgRow) -> Result<Appointment, sqlx::Error> {
    let scheduled_time: NaiveTime = row.try_get("hora_agendamento")?;
    Ok(Appointment {
        id: id_from_row(row)?,
        sdr_name: row.try_get("sdr_nome")?,
        client_name: row.try_get("cliente_nome")?,
        scheduled_date: row.try_get("data_agendamento")?,
        scheduled_time,
        status: row.try_get("status")?,
        project: row.try_get("empreendimento")?,
        created_at: row.try_get("created_at")?,
    })
}

fn id_from_row(row: &PgRow) -> Result<String, sqlx::Error> {
    match row.try_get::<Uuid, _>("id") {
        Ok(id) => Ok(id.to_string()),
        Err(_) => row.try_get::<i64, _>("id").map(|id| id.to_string()),
    }
}

fn appointments_from_rows(rows: Vec<PgRow>) -> StoreResult<Vec<Appointment>> {
    rows.iter()
        .map(appointment_from_row)
        .collect::<Result<Vec<_>, _>>()
        .map_err(read_error)
}

fn read_error(err: sqlx::Error) -> StoreError {
    StoreError::Connectivity(err.to_string())
}

/// Constraint violations are the store refusing the row; everything else is
/// treated as the store being unavailable.
fn write_error(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db_err) if !matches!(db_err.kind(), ErrorKind::Other) => {
            StoreError::Validation(db_err.message().to_string())
        }
        _ => StoreError::Connectivity(err.to_string()),
    }
}

/// `id` and `created_at` are left to the column defaults.
fn insert_query() -> String {
    format!(
        "INSERT INTO agendamentos \
         (sdr_nome, cliente_nome, data_agendamento, hora_agendamento, status, empreendimento) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         RETURNING {APPOINTMENT_COLUMNS}"
    )
}

#[async_trait]
impl AppointmentStore for PgStore {
    async fn fetch_today_appointments(&self, today: NaiveDate) -> StoreResult<Vec<Appointment>> {
        let query = format!(
            "SELECT {APPOINTMENT_COLUMNS} FROM agendamentos \
             WHERE data_agendamento = $1 ORDER BY hora_agendamento ASC"
        );
        let rows = sqlx::query(&query)
            .bind(today)
            .fetch_all(&self.pool)
            .await
            .map_err(read_error)?;
        appointments_from_rows(rows)
    }

    async fn fetch_quotas(&self) -> StoreResult<Vec<SdrQuota>> {
        let rows = sqlx::query("SELECT sdr_nome, meta_diaria, meta_mensal FROM sdr_metas")
            .fetch_all(&self.pool)
            .await
            .map_err(read_error)?;

        let mut quotas = Vec::new();
        for row in rows {
            quotas.push(SdrQuota {
                sdr_name: row.try_get("sdr_nome").map_err(read_error)?,
                daily_quota: row.try_get("meta_diaria").map_err(read_error)?,
                monthly_quota: row.try_get("meta_mensal").map_err(read_error)?,
            });
        }

        Ok(quotas)
    }

    async fn fetch_month_appointments(&self, today: NaiveDate) -> StoreResult<Vec<Appointment>> {
        let query = format!(
            "SELECT {APPOINTMENT_COLUMNS} FROM agendamentos \
             WHERE data_agendamento >= $1 AND data_agendamento <= $2"
        );
        let rows = sqlx::query(&query)
            .bind(pacing::first_day_of_month(today))
            .bind(pacing::last_day_of_month(today))
            .fetch_all(&self.pool)
            .await
            .map_err(read_error)?;
        appointments_from_rows(rows)
    }

    async fn create_appointment(&self, appointment: &NewAppointment) -> StoreResult<Appointment> {
        let row = sqlx::query(&insert_query())
            .bind(&appointment.sdr_name)
            .bind(&appointment.client_name)
            .bind(appointment.scheduled_date)
            .bind(appointment.scheduled_time)
            .bind(&appointment.status)
            .bind(&appointment.project)
            .fetch_one(&self.pool)
            .await
            .map_err(write_error)?;

        appointment_from_row(&row).map_err(read_error)
    }
}
