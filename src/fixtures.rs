use chrono::{Datelike, NaiveDate, NaiveTime, TimeZone, Utc};
use uuid::Uuid;

use crate::models::{
    Appointment, DataSource, MonthlyAccumulated, SdrQuota, Sdr, Snapshot, DEFAULT_DAILY_QUOTA,
    DEFAULT_MONTHLY_QUOTA, SCHEDULED_STATUS,
};

/// Stand-in data shown whenever the store is disabled or a refresh fails.
#[derive(Debug, Clone)]
pub struct FixtureData {
    pub appointments: Vec<Appointment>,
    pub quotas: Vec<SdrQuota>,
    pub accumulated: MonthlyAccumulated,
}

const APPOINTMENTS: [(Sdr, &str, (u32, u32), &str); 15] = [
    (Sdr::Renata, "João Silva", (9, 0), "Residencial Aurora"),
    (Sdr::Renata, "Maria Santos", (10, 30), "Edifício Solaris"),
    (Sdr::Renata, "Pedro Costa", (14, 0), "Condomínio Verde"),
    (Sdr::Renata, "Ana Oliveira", (15, 30), "Residencial Aurora"),
    (Sdr::Renata, "Carlos Lima", (16, 0), "Edifício Solaris"),
    (Sdr::Lucas, "Fernanda Reis", (8, 30), "Residencial Aurora"),
    (Sdr::Lucas, "Roberto Alves", (11, 0), "Condomínio Verde"),
    (Sdr::Lucas, "Juliana Martins", (13, 0), "Edifício Solaris"),
    (Sdr::Lucas, "Marcos Souza", (15, 0), "Residencial Aurora"),
    (Sdr::Lucas, "Patricia Lima", (16, 30), "Condomínio Verde"),
    (Sdr::Lucas, "Ricardo Nunes", (17, 0), "Edifício Solaris"),
    (Sdr::MariaEduarda, "Luciana Ferreira", (9, 30), "Condomínio Verde"),
    (Sdr::MariaEduarda, "Bruno Cardoso", (10, 0), "Residencial Aurora"),
    (Sdr::MariaEduarda, "Camila Rocha", (11, 30), "Edifício Solaris"),
    (Sdr::MariaEduarda, "Diego Mendes", (14, 30), "Residencial Aurora"),
];

pub fn fixture_data(today: NaiveDate) -> FixtureData {
    let created_at = today
        .and_hms_opt(0, 0, 0)
        .map(|midnight| Utc.from_utc_datetime(&midnight))
        .unwrap_or_else(Utc::now);

    let appointments = APPOINTMENTS
        .iter()
        .enumerate()
        .map(|(index, (sdr, client, (hour, minute), project))| Appointment {
            id: Uuid::from_u128(index as u128 + 1).to_string(),
            sdr_name: sdr.name().to_string(),
            client_name: client.to_string(),
            scheduled_date: today,
            scheduled_time: NaiveTime::from_hms_opt(*hour, *minute, 0).unwrap_or_default(),
            status: SCHEDULED_STATUS.to_string(),
            project: project.to_string(),
            created_at,
        })
        .collect();

    let quotas = Sdr::ALL
        .into_iter()
        .map(|sdr| SdrQuota {
            sdr_name: sdr.name().to_string(),
            daily_quota: DEFAULT_DAILY_QUOTA as i32,
            monthly_quota: Some(DEFAULT_MONTHLY_QUOTA as i32),
        })
        .collect();

    // Fixed per-day rates so the monthly cards move as the month advances.
    let elapsed = today.day().saturating_sub(1);
    let mut accumulated = MonthlyAccumulated::zeroed();
    accumulated.set(Sdr::Renata, 10 * elapsed + 5);
    accumulated.set(Sdr::Lucas, 14 * elapsed + 8);
    accumulated.set(Sdr::MariaEduarda, 12 * elapsed + 4);

    FixtureData {
        appointments,
        quotas,
        accumulated,
    }
}

pub fn fixture_snapshot(today: NaiveDate) -> Snapshot {
    let data = fixture_data(today);
    Snapshot {
        appointments_today: data.appointments,
        quotas: data.quotas,
        accumulated: data.accumulated,
        source: DataSource::Fixture,
        refreshed_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pacing;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, d).unwrap()
    }

    #[test]
    fn fixture_has_fifteen_appointments_for_today() {
        let data = fixture_data(day(19));
        assert_eq!(data.appointments.len(), 15);
        assert!(data.appointments.iter().all(|a| a.scheduled_date == day(19)));
        assert_eq!(pacing::count_for(&data.appointments, Sdr::Renata), 5);
        assert_eq!(pacing::count_for(&data.appointments, Sdr::Lucas), 6);
        assert_eq!(pacing::count_for(&data.appointments, Sdr::MariaEduarda), 4);
    }

    #[test]
    fn fixture_quotas_match_defaults() {
        let data = fixture_data(day(1));
        assert_eq!(data.quotas.len(), 3);
        for quota in &data.quotas {
            assert_eq!(quota.daily_quota, 6);
            assert_eq!(quota.monthly_quota, Some(120));
        }
    }

    #[test]
    fn accumulated_scales_with_day_of_month() {
        let first = fixture_data(day(1)).accumulated;
        assert_eq!(first.get(Sdr::Renata), 5);
        assert_eq!(first.get(Sdr::Lucas), 8);
        assert_eq!(first.get(Sdr::MariaEduarda), 4);

        let later = fixture_data(day(11)).accumulated;
        assert_eq!(later.get(Sdr::Renata), 105);
        assert_eq!(later.get(Sdr::Lucas), 148);
        assert_eq!(later.get(Sdr::MariaEduarda), 124);
    }

    #[test]
    fn fixture_is_deterministic_for_a_date() {
        let a = fixture_data(day(7));
        let b = fixture_data(day(7));
        assert_eq!(a.appointments, b.appointments);
        assert_eq!(a.accumulated, b.accumulated);
    }
}
