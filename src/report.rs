use std::fmt::Write;

use chrono::{DateTime, Datelike, Local, Weekday};

use crate::dashboard::Celebration;
use crate::models::{Board, DataSource, SdrBoard};

const BAR_WIDTH: usize = 30;

const WEEKDAYS: [&str; 7] = [
    "segunda-feira",
    "terça-feira",
    "quarta-feira",
    "quinta-feira",
    "sexta-feira",
    "sábado",
    "domingo",
];

const MONTHS: [&str; 12] = [
    "janeiro",
    "fevereiro",
    "março",
    "abril",
    "maio",
    "junho",
    "julho",
    "agosto",
    "setembro",
    "outubro",
    "novembro",
    "dezembro",
];

/// "segunda-feira, 19 de outubro"
pub fn long_date(now: DateTime<Local>) -> String {
    let weekday = WEEKDAYS[weekday_index(now.weekday())];
    let month = MONTHS[now.month0() as usize];
    format!("{}, {:02} de {}", weekday, now.day(), month)
}

fn weekday_index(weekday: Weekday) -> usize {
    weekday.num_days_from_monday() as usize
}

fn bar(value: u32, scale: u32, width: usize) -> String {
    let filled = if scale == 0 {
        0
    } else {
        ((value as f64 / scale as f64) * width as f64).round() as usize
    };
    let filled = filled.min(width);
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}

fn pace_label(entry: &SdrBoard) -> &'static str {
    if entry.monthly.on_pace {
        "✓ No ritmo"
    } else {
        "⚠ Abaixo"
    }
}

fn gap_line(entry: &SdrBoard) -> String {
    let gap = entry.monthly.gap_to_expected();
    if gap > 0 {
        format!("{gap} à frente do esperado!")
    } else if gap == 0 {
        "No ritmo para a meta!".to_string()
    } else {
        format!("Faltam {} para alcançar o ritmo", -gap)
    }
}

fn projection_line(entry: &SdrBoard) -> String {
    let gap = entry.monthly.projection_gap();
    if gap >= 0 {
        "Vai bater a meta!".to_string()
    } else {
        format!("Ficará {} abaixo", -gap)
    }
}

/// Flags a required rate the SDR's daily quota would not cover.
fn rate_warning(entry: &SdrBoard) -> &'static str {
    if entry.monthly.required_daily_rate > entry.daily.daily_quota {
        " ⚠"
    } else {
        ""
    }
}

/// Wraps `text` in an ANSI 24-bit foreground color taken from a `#rrggbb` value.
fn tint(text: &str, hex: &str) -> String {
    match rgb(hex) {
        Some((r, g, b)) => format!("\x1b[38;2;{r};{g};{b}m{text}\x1b[0m"),
        None => text.to_string(),
    }
}

fn rgb(hex: &str) -> Option<(u8, u8, u8)> {
    let hex = hex.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let channel = |at: usize| -> Option<u8> { u8::from_str_radix(hex.get(at..at + 2)?, 16).ok() };
    Some((channel(0)?, channel(2)?, channel(4)?))
}

fn source_note(board: &Board) -> Option<&'static str> {
    match board.source {
        DataSource::Live => None,
        DataSource::Fixture => Some("dados de demonstração (banco indisponível)"),
    }
}

/// Full-screen terminal board.
pub fn render_board(board: &Board, now: DateTime<Local>) -> String {
    let mut output = String::new();
    let team = &board.team;

    let _ = writeln!(
        output,
        "{}    {}    (atualizado {})",
        long_date(now),
        now.format("%H:%M"),
        board.refreshed_at.with_timezone(&Local).format("%H:%M:%S")
    );
    if let Some(note) = source_note(board) {
        let _ = writeln!(output, "[{note}]");
    }
    let _ = writeln!(output);

    let _ = writeln!(
        output,
        "Agendamentos hoje: {}   |   Mês: {} ({} meta)   |   Meta do dia: {}   |   \
         Progresso: {}%   |   Faltam: {}",
        team.total_today,
        team.month_accumulated_total,
        team.month_quota_total,
        team.daily_quota_total,
        team.daily_percent,
        team.remaining_to_daily_quota
    );
    let _ = writeln!(output);

    let scale = board
        .sdrs
        .iter()
        .map(|entry| entry.monthly.accumulated.max(entry.monthly.expected_to_date))
        .max()
        .unwrap_or(0);

    let _ = writeln!(
        output,
        "Progresso mensal (acumulado vs esperado até dia {})",
        board.day_of_month
    );
    for entry in &board.sdrs {
        let monthly = &entry.monthly;
        let accent = entry.sdr.accent_color();
        let _ = writeln!(
            output,
            "  {} {} {:>4}  {}",
            tint(&format!("{:<8}", entry.sdr.display_name()), accent),
            tint(&bar(monthly.accumulated, scale, BAR_WIDTH), accent),
            monthly.accumulated,
            pace_label(entry)
        );
        let _ = writeln!(
            output,
            "  {:<8} {} {:>4}  projeção {}/{}",
            "",
            bar(monthly.expected_to_date, scale, BAR_WIDTH),
            monthly.expected_to_date,
            monthly.projected_month_total,
            monthly.monthly_quota
        );
    }
    let _ = writeln!(output);

    let _ = writeln!(output, "Distribuição hoje ({} total)", team.total_today);
    for entry in &board.sdrs {
        let share = if team.total_today == 0 {
            0
        } else {
            ((entry.daily.today_count as f64 / team.total_today as f64) * 100.0).round() as u32
        };
        let _ = writeln!(
            output,
            "  {:<8} {:>3}  ({share}%)",
            entry.sdr.display_name(),
            entry.daily.today_count
        );
    }
    let _ = writeln!(output);

    let _ = writeln!(output, "Previsão do mês");
    for entry in &board.sdrs {
        let monthly = &entry.monthly;
        let _ = writeln!(
            output,
            "  {:<8} {}% da meta {}  | esperado {} | projeção {} | precisa {}/dia{} | {}",
            entry.sdr.display_name(),
            monthly.percent_of_goal,
            monthly.monthly_quota,
            monthly.expected_to_date,
            monthly.projected_month_total,
            monthly.required_daily_rate,
            rate_warning(entry),
            gap_line(entry)
        );
    }
    let _ = writeln!(output);

    for entry in &board.sdrs {
        let daily = &entry.daily;
        let badge = if daily.exceeded_by > 0 {
            format!("  +{} além da meta!", daily.exceeded_by)
        } else if daily.quota_met {
            "  Meta atingida!".to_string()
        } else {
            String::new()
        };
        let marker = if daily.on_pace_today { "✓" } else { "⚠" };
        let _ = writeln!(output, "[{}]{}", entry.sdr.display_name(), badge);
        let _ = writeln!(
            output,
            "  {}/{} agendamentos   {} precisa {}/dia   (dias restantes: {})",
            daily.today_count,
            daily.daily_quota,
            marker,
            daily.required_daily_rate,
            entry.monthly.remaining_days
        );
        let _ = writeln!(
            output,
            "  {} {}% da meta diária",
            bar(daily.today_count, daily.daily_quota, BAR_WIDTH),
            daily.percent_of_daily_quota
        );
    }
    let _ = writeln!(output);

    let _ = writeln!(output, "Agendamentos do dia ({})", board.appointments.len());
    if board.appointments.is_empty() {
        let _ = writeln!(output, "  Nenhum agendamento hoje.");
    } else {
        for appointment in &board.appointments {
            let name = appointment
                .sdr()
                .map(|sdr| sdr.display_name().to_string())
                .unwrap_or_else(|| appointment.sdr_name.clone());
            let _ = writeln!(
                output,
                "  {}  {:<8} {:<24} {}",
                appointment.scheduled_time.format("%H:%M"),
                name,
                appointment.client_name,
                appointment.project
            );
        }
    }

    output
}

/// Markdown snapshot of the board, written by the `report` command.
pub fn build_report(board: &Board, now: DateTime<Local>) -> String {
    let mut output = String::new();
    let team = &board.team;

    let _ = writeln!(output, "# Painel de Agendamentos");
    let _ = writeln!(
        output,
        "Gerado em {} às {} (dia {} de {})",
        long_date(now),
        now.format("%H:%M"),
        board.day_of_month,
        board.days_in_month
    );
    if let Some(note) = source_note(board) {
        let _ = writeln!(output);
        let _ = writeln!(output, "> {note}");
    }
    let _ = writeln!(output);

    let _ = writeln!(output, "## Resumo");
    let _ = writeln!(output, "- Agendamentos hoje: {}", team.total_today);
    let _ = writeln!(
        output,
        "- Acumulado no mês: {} de {}",
        team.month_accumulated_total, team.month_quota_total
    );
    let _ = writeln!(
        output,
        "- Meta do dia: {} ({}% atingido, faltam {})",
        team.daily_quota_total, team.daily_percent, team.remaining_to_daily_quota
    );
    let _ = writeln!(output);

    let _ = writeln!(output, "## Ritmo Mensal");
    let _ = writeln!(
        output,
        "| SDR | Acumulado | Esperado | Meta | Projeção | Precisa/dia | Status |"
    );
    let _ = writeln!(output, "|---|---|---|---|---|---|---|");
    for entry in &board.sdrs {
        let monthly = &entry.monthly;
        let _ = writeln!(
            output,
            "| {} | {} | {} | {} | {} | {} | {} |",
            entry.sdr.display_name(),
            monthly.accumulated,
            monthly.expected_to_date,
            monthly.monthly_quota,
            monthly.projected_month_total,
            monthly.required_daily_rate,
            pace_label(entry)
        );
    }
    let _ = writeln!(output);

    let _ = writeln!(output, "## Previsão");
    for entry in &board.sdrs {
        let _ = writeln!(
            output,
            "- {}: {} {}",
            entry.sdr.display_name(),
            gap_line(entry),
            projection_line(entry)
        );
    }
    let _ = writeln!(output);

    let _ = writeln!(output, "## Hoje por SDR");
    for entry in &board.sdrs {
        let daily = &entry.daily;
        let _ = writeln!(
            output,
            "- {}: {}/{} ({}% da meta diária), precisa {}/dia {}",
            entry.sdr.display_name(),
            daily.today_count,
            daily.daily_quota,
            daily.percent_of_daily_quota,
            daily.required_daily_rate,
            if daily.on_pace_today { "✓" } else { "⚠" }
        );
    }
    let _ = writeln!(output);

    let _ = writeln!(output, "## Agendamentos do Dia");
    if board.appointments.is_empty() {
        let _ = writeln!(output, "Nenhum agendamento registrado hoje.");
    } else {
        for appointment in &board.appointments {
            let _ = writeln!(
                output,
                "- {} {} com {} ({})",
                appointment.scheduled_time.format("%H:%M"),
                appointment.sdr_name,
                appointment.client_name,
                appointment.project
            );
        }
    }

    output
}

pub fn render_celebration(celebration: &Celebration) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "🎉 🎉 🎉  Novo agendamento!  🎉 🎉 🎉");
    let _ = writeln!(output, "Parabéns, {}!", celebration.sdr.display_name());
    if let Some(sound) = celebration.sound {
        let _ = writeln!(output, "♪ {sound}");
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    use crate::fixtures;
    use crate::models::Sdr;
    use crate::pacing;

    fn now() -> DateTime<Local> {
        Local
            .from_local_datetime(
                &NaiveDate::from_ymd_opt(2026, 10, 19)
                    .unwrap()
                    .and_hms_opt(9, 5, 0)
                    .unwrap(),
            )
            .unwrap()
    }

    fn fixture_board() -> Board {
        let today = now().date_naive();
        pacing::build_board(&fixtures::fixture_snapshot(today), today)
    }

    #[test]
    fn long_date_is_portuguese() {
        assert_eq!(long_date(now()), "segunda-feira, 19 de outubro");
    }

    #[test]
    fn bar_is_clamped_to_width() {
        assert_eq!(bar(10, 5, 4), "████");
        assert_eq!(bar(0, 0, 3), "░░░");
        assert_eq!(bar(1, 2, 4), "██░░");
    }

    #[test]
    fn board_shows_every_rep_and_fixture_note() {
        let text = render_board(&fixture_board(), now());
        assert!(text.contains("09:05"));
        assert!(text.contains("[Renata]"));
        assert!(text.contains("[Lucas]  Meta atingida!"));
        assert!(text.contains("[Duda]"));
        assert!(text.contains("dados de demonstração"));
        assert!(text.contains("Agendamentos do dia (15)"));
    }

    #[test]
    fn bars_and_names_use_the_accent_color() {
        assert_eq!(rgb(Sdr::Lucas.accent_color()), Some((56, 189, 248)));
        assert_eq!(rgb("nope"), None);
        assert_eq!(tint("x", "#e879f9"), "\x1b[38;2;232;121;249mx\x1b[0m");

        let text = render_board(&fixture_board(), now());
        for sdr in Sdr::ALL {
            let (r, g, b) = rgb(sdr.accent_color()).unwrap();
            assert!(text.contains(&format!("\x1b[38;2;{r};{g};{b}m")));
        }
    }

    #[test]
    fn forecast_flags_rates_above_the_daily_quota() {
        let today = now().date_naive();
        let mut snapshot = fixtures::fixture_snapshot(today);
        snapshot.accumulated.set(Sdr::Renata, 10);
        let board = pacing::build_board(&snapshot, today);

        // 110 left over the 12 remaining days of October.
        let text = render_board(&board, now());
        assert!(text.contains("precisa 10/dia ⚠ |"));
        assert!(text.contains("precisa 0/dia |"));
    }

    #[test]
    fn report_has_pace_table_rows() {
        let report = build_report(&fixture_board(), now());
        assert!(report.starts_with("# Painel de Agendamentos"));
        // Day 19 of 31: Lucas has 14*18+8 = 260 against 74 expected.
        assert!(report.contains("| Lucas | 260 | 74 | 120 |"));
        assert!(report.contains("## Agendamentos do Dia"));
    }

    #[test]
    fn celebration_mentions_sound_when_available() {
        let text = render_celebration(&Celebration::for_sdr(Sdr::Lucas));
        assert!(text.contains("Parabéns, Lucas!"));
        assert!(text.contains("Lucas.mp4"));
        let text = render_celebration(&Celebration::for_sdr(Sdr::Renata));
        assert!(!text.contains('♪'));
    }
}
