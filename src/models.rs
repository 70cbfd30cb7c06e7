use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_MONTHLY_QUOTA: u32 = 120;
pub const DEFAULT_DAILY_QUOTA: u32 = 6;
pub const SCHEDULED_STATUS: &str = "agendado";

/// The three sales reps the board tracks. The set is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Sdr {
    Renata,
    Lucas,
    MariaEduarda,
}

impl Sdr {
    pub const ALL: [Sdr; 3] = [Sdr::Renata, Sdr::Lucas, Sdr::MariaEduarda];

    /// Identifier stored in the `sdr_nome` column.
    pub fn name(self) -> &'static str {
        match self {
            Sdr::Renata => "Renata",
            Sdr::Lucas => "Lucas",
            Sdr::MariaEduarda => "Maria Eduarda",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Sdr::MariaEduarda => "Duda",
            other => other.name(),
        }
    }

    pub fn celebration_sound(self) -> Option<&'static str> {
        match self {
            Sdr::Renata => None,
            Sdr::Lucas => Some("sounds/Lucas.mp4"),
            Sdr::MariaEduarda => Some("sounds/Duda.mp4"),
        }
    }

    /// Hex accent used for the SDR's bars and name on the board.
    pub fn accent_color(self) -> &'static str {
        match self {
            Sdr::Renata => "#e879f9",
            Sdr::Lucas => "#38bdf8",
            Sdr::MariaEduarda => "#a78bfa",
        }
    }

    pub fn from_name(name: &str) -> Option<Sdr> {
        Sdr::ALL.into_iter().find(|sdr| sdr.name() == name)
    }

    /// Accepts the stored name or the display name, ignoring case.
    pub fn parse_loose(value: &str) -> Option<Sdr> {
        let value = value.trim();
        Sdr::ALL.into_iter().find(|sdr| {
            sdr.name().eq_ignore_ascii_case(value) || sdr.display_name().eq_ignore_ascii_case(value)
        })
    }
}

impl fmt::Display for Sdr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl Serialize for Sdr {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    /// Opaque store key; hosted tables use UUIDs, older ones integer identities.
    #[serde(deserialize_with = "record_id::deserialize")]
    pub id: String,
    #[serde(rename = "sdr_nome")]
    pub sdr_name: String,
    #[serde(rename = "cliente_nome")]
    pub client_name: String,
    #[serde(rename = "data_agendamento")]
    pub scheduled_date: NaiveDate,
    #[serde(rename = "hora_agendamento", with = "clock_time")]
    pub scheduled_time: NaiveTime,
    pub status: String,
    #[serde(rename = "empreendimento")]
    pub project: String,
    pub created_at: DateTime<Utc>,
}

impl Appointment {
    pub fn sdr(&self) -> Option<Sdr> {
        Sdr::from_name(&self.sdr_name)
    }
}

/// Insert payload; the store assigns `id` and `created_at`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewAppointment {
    #[serde(rename = "sdr_nome")]
    pub sdr_name: String,
    #[serde(rename = "cliente_nome")]
    pub client_name: String,
    #[serde(rename = "data_agendamento")]
    pub scheduled_date: NaiveDate,
    #[serde(rename = "hora_agendamento", with = "clock_time")]
    pub scheduled_time: NaiveTime,
    pub status: String,
    #[serde(rename = "empreendimento")]
    pub project: String,
}

impl NewAppointment {
    pub fn quick_entry(sdr: Sdr, date: NaiveDate, time: NaiveTime) -> Self {
        Self {
            sdr_name: sdr.name().to_string(),
            client_name: "Cliente".to_string(),
            scheduled_date: date,
            scheduled_time: time,
            status: SCHEDULED_STATUS.to_string(),
            project: "Não informado".to_string(),
        }
    }

    pub fn into_appointment(self, id: String, created_at: DateTime<Utc>) -> Appointment {
        Appointment {
            id,
            sdr_name: self.sdr_name,
            client_name: self.client_name,
            scheduled_date: self.scheduled_date,
            scheduled_time: self.scheduled_time,
            status: self.status,
            project: self.project,
            created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SdrQuota {
    #[serde(rename = "sdr_nome")]
    pub sdr_name: String,
    #[serde(rename = "meta_diaria", default)]
    pub daily_quota: i32,
    #[serde(rename = "meta_mensal", default)]
    pub monthly_quota: Option<i32>,
}

/// Month-to-date appointment count per SDR. Always holds all three SDRs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthlyAccumulated(BTreeMap<Sdr, u32>);

impl MonthlyAccumulated {
    pub fn zeroed() -> Self {
        Self(Sdr::ALL.into_iter().map(|sdr| (sdr, 0)).collect())
    }

    pub fn get(&self, sdr: Sdr) -> u32 {
        self.0.get(&sdr).copied().unwrap_or(0)
    }

    pub fn set(&mut self, sdr: Sdr, count: u32) {
        self.0.insert(sdr, count);
    }

    pub fn increment(&mut self, sdr: Sdr) {
        *self.0.entry(sdr).or_insert(0) += 1;
    }

    pub fn total(&self) -> u32 {
        self.0.values().sum()
    }
}

impl Default for MonthlyAccumulated {
    fn default() -> Self {
        Self::zeroed()
    }
}

/// Month-to-date progress against the linearly pro-rated quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PacingMetrics {
    pub accumulated: u32,
    pub expected_to_date: u32,
    pub monthly_quota: u32,
    pub projected_month_total: u32,
    pub on_pace: bool,
    pub remaining_days: u32,
    pub required_daily_rate: u32,
    pub percent_of_goal: u32,
    pub expected_percent: u32,
}

impl PacingMetrics {
    /// Positive when ahead of the expected count, negative when behind.
    pub fn gap_to_expected(&self) -> i64 {
        i64::from(self.accumulated) - i64::from(self.expected_to_date)
    }

    pub fn projection_gap(&self) -> i64 {
        i64::from(self.projected_month_total) - i64::from(self.monthly_quota)
    }
}

/// Today's count against the daily quota and the monthly-derived required rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DailyPace {
    pub today_count: u32,
    pub daily_quota: u32,
    pub percent_of_daily_quota: u32,
    pub quota_met: bool,
    pub exceeded_by: u32,
    pub required_daily_rate: u32,
    pub on_pace_today: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DataSource {
    Live,
    Fixture,
}

/// Everything fetched in one refresh. Replaced as a whole, never patched in place.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub appointments_today: Vec<Appointment>,
    pub quotas: Vec<SdrQuota>,
    pub accumulated: MonthlyAccumulated,
    pub source: DataSource,
    pub refreshed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SdrBoard {
    pub sdr: Sdr,
    pub daily: DailyPace,
    pub monthly: PacingMetrics,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TeamSummary {
    pub total_today: u32,
    pub daily_quota_total: u32,
    pub daily_percent: u32,
    pub remaining_to_daily_quota: u32,
    pub month_accumulated_total: u32,
    pub month_quota_total: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Board {
    pub date: NaiveDate,
    pub day_of_month: u32,
    pub days_in_month: u32,
    pub source: DataSource,
    pub refreshed_at: DateTime<Utc>,
    pub sdrs: Vec<SdrBoard>,
    pub team: TeamSummary,
    pub appointments: Vec<Appointment>,
}

/// Accepts a row id given either as a JSON string or as an integer.
pub mod record_id {
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Integer(i64),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(text) => text,
            RawId::Integer(number) => number.to_string(),
        })
    }
}

/// `hora_agendamento` is a Postgres `time`; REST returns `HH:MM:SS`, older rows
/// and the insert payload use `HH:MM`.
pub mod clock_time {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid time `{raw}`")))
    }

    pub fn parse(raw: &str) -> Option<NaiveTime> {
        NaiveTime::parse_from_str(raw, "%H:%M:%S%.f")
            .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
            .ok()
    }
}
