use chrono::{Datelike, NaiveDate};

use crate::models::{
    Appointment, Board, DailyPace, MonthlyAccumulated, PacingMetrics, SdrBoard, SdrQuota, Sdr,
    Snapshot, TeamSummary, DEFAULT_DAILY_QUOTA, DEFAULT_MONTHLY_QUOTA,
};

pub fn days_in_month(date: NaiveDate) -> u32 {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };

    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|next| next.pred_opt())
        .map(|last| last.day())
        .unwrap_or(31)
}

pub fn first_day_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

pub fn last_day_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(days_in_month(date)).unwrap_or(date)
}

/// Month-to-date pacing for one SDR.
///
/// Expected and projected counts are rounded to the nearest integer; the
/// required rate is a ceiling so that hitting it every remaining day reaches
/// the quota.
pub fn compute_pacing(
    accumulated: u32,
    monthly_quota: u32,
    day_of_month: u32,
    days_in_month: u32,
) -> PacingMetrics {
    let expected_to_date = if monthly_quota == 0 || days_in_month == 0 {
        0
    } else {
        round_u32(monthly_quota as f64 / days_in_month as f64 * day_of_month as f64)
    };

    let daily_average = if day_of_month > 0 {
        accumulated as f64 / day_of_month as f64
    } else {
        0.0
    };
    let projected_month_total = round_u32(daily_average * days_in_month as f64);

    let remaining_days = days_in_month.saturating_sub(day_of_month);
    let shortfall = monthly_quota.saturating_sub(accumulated);
    let required_daily_rate = if remaining_days > 0 {
        shortfall.div_ceil(remaining_days)
    } else {
        0
    };

    PacingMetrics {
        accumulated,
        expected_to_date,
        monthly_quota,
        projected_month_total,
        on_pace: accumulated >= expected_to_date,
        remaining_days,
        required_daily_rate,
        percent_of_goal: percent(accumulated, monthly_quota),
        expected_percent: percent(expected_to_date, monthly_quota),
    }
}

/// The daily card's pace is judged against the monthly-derived required rate,
/// not against the daily quota.
pub fn compute_daily_pace(
    today_count: u32,
    daily_quota: u32,
    monthly: &PacingMetrics,
) -> DailyPace {
    DailyPace {
        today_count,
        daily_quota,
        percent_of_daily_quota: percent(today_count, daily_quota),
        quota_met: today_count >= daily_quota,
        exceeded_by: today_count.saturating_sub(daily_quota),
        required_daily_rate: monthly.required_daily_rate,
        on_pace_today: today_count >= monthly.required_daily_rate,
    }
}

pub fn accumulate_by_sdr(month_appointments: &[Appointment]) -> MonthlyAccumulated {
    let mut accumulated = MonthlyAccumulated::zeroed();
    for sdr in month_appointments.iter().filter_map(Appointment::sdr) {
        accumulated.increment(sdr);
    }
    accumulated
}

pub fn count_for(appointments: &[Appointment], sdr: Sdr) -> u32 {
    appointments
        .iter()
        .filter(|appointment| appointment.sdr_name == sdr.name())
        .count() as u32
}

fn quota_record(quotas: &[SdrQuota], sdr: Sdr) -> Option<&SdrQuota> {
    quotas.iter().find(|quota| quota.sdr_name == sdr.name())
}

/// Missing, null, zero or negative monthly quotas fall back to 120.
pub fn monthly_quota_for(quotas: &[SdrQuota], sdr: Sdr) -> u32 {
    quota_record(quotas, sdr)
        .and_then(|quota| quota.monthly_quota)
        .map(non_negative)
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_MONTHLY_QUOTA)
}

pub fn daily_quota_for(quotas: &[SdrQuota], sdr: Sdr) -> u32 {
    quota_record(quotas, sdr)
        .map(|quota| non_negative(quota.daily_quota))
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_DAILY_QUOTA)
}

/// Header totals. Quota totals follow the fetched quota rows, not the fixed
/// SDR set.
pub fn team_summary(snapshot: &Snapshot) -> TeamSummary {
    let total_today = snapshot.appointments_today.len() as u32;
    let daily_quota_total: u32 = snapshot
        .quotas
        .iter()
        .map(|quota| non_negative(quota.daily_quota))
        .sum();
    let month_quota_total: u32 = snapshot
        .quotas
        .iter()
        .map(|quota| {
            quota
                .monthly_quota
                .map(non_negative)
                .filter(|value| *value > 0)
                .unwrap_or(DEFAULT_MONTHLY_QUOTA)
        })
        .sum();

    TeamSummary {
        total_today,
        daily_quota_total,
        daily_percent: percent(total_today, daily_quota_total),
        remaining_to_daily_quota: daily_quota_total.saturating_sub(total_today),
        month_accumulated_total: snapshot.accumulated.total(),
        month_quota_total,
    }
}

pub fn build_board(snapshot: &Snapshot, today: NaiveDate) -> Board {
    let day_of_month = today.day();
    let days_in_month = days_in_month(today);

    let sdrs = Sdr::ALL
        .into_iter()
        .map(|sdr| {
            let monthly = compute_pacing(
                snapshot.accumulated.get(sdr),
                monthly_quota_for(&snapshot.quotas, sdr),
                day_of_month,
                days_in_month,
            );
            let daily = compute_daily_pace(
                count_for(&snapshot.appointments_today, sdr),
                daily_quota_for(&snapshot.quotas, sdr),
                &monthly,
            );
            SdrBoard { sdr, daily, monthly }
        })
        .collect();

    let mut appointments = snapshot.appointments_today.clone();
    appointments.sort_by_key(|appointment| appointment.scheduled_time);

    Board {
        date: today,
        day_of_month,
        days_in_month,
        source: snapshot.source,
        refreshed_at: snapshot.refreshed_at,
        sdrs,
        team: team_summary(snapshot),
        appointments,
    }
}

fn percent(part: u32, whole: u32) -> u32 {
    if whole == 0 {
        0
    } else {
        round_u32(part as f64 / whole as f64 * 100.0)
    }
}

fn round_u32(value: f64) -> u32 {
    if value.is_finite() && value > 0.0 {
        value.round() as u32
    } else {
        0
    }
}

fn non_negative(value: i32) -> u32 {
    value.max(0) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveTime, Utc};
    use uuid::Uuid;

    use crate::models::DataSource;

    fn appointment(sdr_name: &str, hour: u32) -> Appointment {
        Appointment {
            id: Uuid::new_v4().to_string(),
            sdr_name: sdr_name.to_string(),
            client_name: "Cliente".to_string(),
            scheduled_date: NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(),
            scheduled_time: NaiveTime::from_hms_opt(hour, 0, 0).unwrap(),
            status: "agendado".to_string(),
            project: "Residencial Aurora".to_string(),
            created_at: Utc::now(),
        }
    }

    fn quota(sdr_name: &str, daily: i32, monthly: Option<i32>) -> SdrQuota {
        SdrQuota {
            sdr_name: sdr_name.to_string(),
            daily_quota: daily,
            monthly_quota: monthly,
        }
    }

    fn snapshot(appointments_today: Vec<Appointment>, quotas: Vec<SdrQuota>) -> Snapshot {
        Snapshot {
            appointments_today,
            quotas,
            accumulated: MonthlyAccumulated::zeroed(),
            source: DataSource::Live,
            refreshed_at: Utc::now(),
        }
    }

    #[test]
    fn ahead_of_pace_mid_month() {
        let metrics = compute_pacing(50, 120, 10, 30);
        assert_eq!(metrics.expected_to_date, 40);
        assert!(metrics.on_pace);
        assert_eq!(metrics.projected_month_total, 150);
        assert_eq!(metrics.remaining_days, 20);
        assert_eq!(metrics.required_daily_rate, 4);
        assert_eq!(metrics.percent_of_goal, 42);
        assert_eq!(metrics.gap_to_expected(), 10);
    }

    #[test]
    fn behind_pace_later_in_month() {
        let metrics = compute_pacing(50, 120, 20, 30);
        assert_eq!(metrics.expected_to_date, 80);
        assert!(!metrics.on_pace);
        assert_eq!(metrics.projected_month_total, 75);
        assert_eq!(metrics.remaining_days, 10);
        assert_eq!(metrics.required_daily_rate, 7);
        assert_eq!(metrics.projection_gap(), -45);
    }

    #[test]
    fn first_day_with_nothing_booked() {
        let metrics = compute_pacing(0, 120, 1, 31);
        assert_eq!(metrics.expected_to_date, 4);
        assert!(!metrics.on_pace);
        assert_eq!(metrics.projected_month_total, 0);
        assert_eq!(metrics.required_daily_rate, 4);
    }

    #[test]
    fn last_day_needs_no_rate() {
        let metrics = compute_pacing(90, 120, 30, 30);
        assert_eq!(metrics.remaining_days, 0);
        assert_eq!(metrics.required_daily_rate, 0);
        assert_eq!(metrics.expected_to_date, 120);
    }

    #[test]
    fn quota_reached_needs_no_rate() {
        let metrics = compute_pacing(130, 120, 12, 31);
        assert_eq!(metrics.required_daily_rate, 0);
        assert!(metrics.on_pace);
    }

    #[test]
    fn zero_quota_and_zero_day_stay_finite() {
        let metrics = compute_pacing(5, 0, 10, 30);
        assert_eq!(metrics.expected_to_date, 0);
        assert!(metrics.on_pace);
        assert_eq!(metrics.percent_of_goal, 0);

        let metrics = compute_pacing(5, 120, 0, 30);
        assert_eq!(metrics.projected_month_total, 0);
        assert_eq!(metrics.expected_to_date, 0);
    }

    #[test]
    fn expected_stays_within_quota_and_pace_matches_comparison() {
        for days in 28..=31 {
            for day in 1..=days {
                for accumulated in [0, 1, 37, 119, 120, 200] {
                    let metrics = compute_pacing(accumulated, 120, day, days);
                    assert!(metrics.expected_to_date <= 120);
                    assert_eq!(metrics.on_pace, accumulated >= metrics.expected_to_date);
                    if accumulated >= 120 || day == days {
                        assert_eq!(metrics.required_daily_rate, 0);
                    }
                }
            }
        }
    }

    #[test]
    fn repeated_calls_agree() {
        assert_eq!(compute_pacing(33, 120, 17, 31), compute_pacing(33, 120, 17, 31));
    }

    #[test]
    fn daily_pace_uses_monthly_required_rate() {
        let monthly = compute_pacing(50, 120, 20, 30);
        let daily = compute_daily_pace(6, 6, &monthly);
        assert!(daily.quota_met);
        assert!(!daily.on_pace_today);
        assert_eq!(daily.required_daily_rate, 7);
        assert_eq!(daily.percent_of_daily_quota, 100);

        let daily = compute_daily_pace(8, 6, &monthly);
        assert!(daily.on_pace_today);
        assert_eq!(daily.exceeded_by, 2);
        assert_eq!(daily.percent_of_daily_quota, 133);
    }

    #[test]
    fn month_lengths() {
        assert_eq!(days_in_month(NaiveDate::from_ymd_opt(2026, 2, 10).unwrap()), 28);
        assert_eq!(days_in_month(NaiveDate::from_ymd_opt(2028, 2, 1).unwrap()), 29);
        assert_eq!(days_in_month(NaiveDate::from_ymd_opt(2026, 12, 31).unwrap()), 31);
        assert_eq!(days_in_month(NaiveDate::from_ymd_opt(2026, 11, 5).unwrap()), 30);
        assert_eq!(
            last_day_of_month(NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()),
            NaiveDate::from_ymd_opt(2026, 10, 31).unwrap()
        );
    }

    #[test]
    fn accumulation_ignores_unknown_reps() {
        let month = vec![
            appointment("Lucas", 9),
            appointment("Lucas", 10),
            appointment("Renata", 11),
            appointment("Carla", 12),
        ];
        let accumulated = accumulate_by_sdr(&month);
        assert_eq!(accumulated.get(Sdr::Lucas), 2);
        assert_eq!(accumulated.get(Sdr::Renata), 1);
        assert_eq!(accumulated.get(Sdr::MariaEduarda), 0);
        assert_eq!(accumulated.total(), 3);
    }

    #[test]
    fn quota_defaults_apply_to_missing_and_zero_records() {
        let quotas = vec![quota("Renata", 0, Some(0)), quota("Lucas", 8, Some(150))];
        assert_eq!(monthly_quota_for(&quotas, Sdr::Renata), 120);
        assert_eq!(daily_quota_for(&quotas, Sdr::Renata), 6);
        assert_eq!(monthly_quota_for(&quotas, Sdr::Lucas), 150);
        assert_eq!(daily_quota_for(&quotas, Sdr::Lucas), 8);
        assert_eq!(monthly_quota_for(&quotas, Sdr::MariaEduarda), 120);
    }

    #[test]
    fn board_lists_every_rep_even_without_data() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        let board = build_board(&snapshot(vec![appointment("Lucas", 9)], Vec::new()), today);

        assert_eq!(board.sdrs.len(), 3);
        let duda = board
            .sdrs
            .iter()
            .find(|entry| entry.sdr == Sdr::MariaEduarda)
            .unwrap();
        assert_eq!(duda.monthly.accumulated, 0);
        assert_eq!(duda.monthly.monthly_quota, 120);
        assert_eq!(board.days_in_month, 31);
        assert_eq!(board.day_of_month, 19);
    }

    #[test]
    fn team_totals_follow_quota_rows() {
        let mut state = snapshot(
            vec![appointment("Lucas", 9), appointment("Renata", 8), appointment("Carla", 7)],
            vec![quota("Renata", 6, Some(120)), quota("Lucas", 6, None)],
        );
        state.accumulated.set(Sdr::Lucas, 40);
        state.accumulated.set(Sdr::Renata, 25);

        let team = team_summary(&state);
        assert_eq!(team.total_today, 3);
        assert_eq!(team.daily_quota_total, 12);
        assert_eq!(team.daily_percent, 25);
        assert_eq!(team.remaining_to_daily_quota, 9);
        assert_eq!(team.month_quota_total, 240);
        assert_eq!(team.month_accumulated_total, 65);
    }

    #[test]
    fn board_sorts_today_by_time() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        let board = build_board(
            &snapshot(
                vec![appointment("Lucas", 15), appointment("Renata", 9), appointment("Lucas", 11)],
                Vec::new(),
            ),
            today,
        );
        let hours: Vec<u32> = board
            .appointments
            .iter()
            .map(|appointment| chrono::Timelike::hour(&appointment.scheduled_time))
            .collect();
        assert_eq!(hours, vec![9, 11, 15]);
    }
}
