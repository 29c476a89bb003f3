use chrono::{Duration, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;

use super::types::CellValue;
use crate::models::Flag;

const TRUTHY: [&str; 6] = ["SIM", "S", "YES", "Y", "TRUE", "1"];
const FALSY: [&str; 9] = ["NÃO", "NAO", "N", "NO", "FALSE", "0", "-", "", "NAN"];

/// Ticket cells holding these words mean "nothing to report".
const TICKET_BLACKLIST: [&str; 5] = ["NÃO TEM", "NAO TEM", "", "IMPLANTAÇÃO", "IMPLANTACAO"];

const MONTH_LABELS: [&str; 12] = [
    "JANEIRO", "FEVEREIRO", "MARÇO", "ABRIL", "MAIO", "JUNHO",
    "JULHO", "AGOSTO", "SETEMBRO", "OUTUBRO", "NOVEMBRO", "DEZEMBRO",
];

static RELATIVE_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"A\s*(\d+)\s*(SEMANAS?|MES(?:ES)?)").expect("relative date pattern is valid")
});

pub fn normalize_header(name: &str) -> String {
    name.trim().to_uppercase().replace('\n', " ")
}

fn upper_text(cell: &CellValue) -> String {
    cell.as_text()
        .map(|s| s.trim().to_uppercase())
        .unwrap_or_default()
}

pub fn normalize_flag(cell: &CellValue) -> Flag {
    let s = upper_text(cell);
    if TRUTHY.contains(&s.as_str()) {
        return Flag::Sim;
    }
    if FALSY.contains(&s.as_str()) {
        return Flag::Nao;
    }
    Flag::Nao
}

pub fn parse_date_str(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    let date_formats = ["%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d", "%d-%m-%Y", "%d.%m.%Y"];
    for format in date_formats.iter() {
        if let Ok(d) = NaiveDate::parse_from_str(s, format) {
            return Some(d);
        }
    }

    let datetime_formats = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%d/%m/%Y %H:%M:%S",
        "%d/%m/%Y %H:%M",
    ];
    for format in datetime_formats.iter() {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(dt.date());
        }
    }
    None
}

/// Strict calendar parsing only; free text yields `None`.
pub fn strict_date(cell: &CellValue) -> Option<NaiveDate> {
    match cell {
        CellValue::Date(dt) => Some(dt.date()),
        CellValue::Text(s) => parse_date_str(s),
        CellValue::Number(_) | CellValue::Missing => None,
    }
}

/// Month-block header parsing keeps the time part so it can be compared to "now".
pub fn strict_datetime(cell: &CellValue) -> Option<NaiveDateTime> {
    match cell {
        CellValue::Date(dt) => Some(*dt),
        CellValue::Text(s) => parse_date_str(s).and_then(|d| d.and_hms_opt(0, 0, 0)),
        CellValue::Number(_) | CellValue::Missing => None,
    }
}

/// Parses "A 2 SEMANAS", "a 4 meses atrás" and similar into an approximate date.
pub fn parse_relative_date(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    let upper = text.trim().to_uppercase();
    let caps = RELATIVE_DATE.captures(&upper)?;
    let n: i64 = caps.get(1)?.as_str().parse().ok()?;
    let unit = caps.get(2)?.as_str();

    let days = if unit.starts_with("SEMANA") { n.checked_mul(7)? } else { n.checked_mul(30)? };
    today.checked_sub_signed(Duration::try_days(days)?)
}

/// Real date first, relative free text second, otherwise missing.
pub fn normalize_date(cell: &CellValue, today: NaiveDate) -> Option<NaiveDate> {
    if let Some(d) = strict_date(cell) {
        return Some(d);
    }
    match cell {
        CellValue::Text(s) => parse_relative_date(s, today),
        _ => None,
    }
}

fn parse_number_str(s: &str) -> Option<f64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Numeric coercion that never fails: anything unparseable is 0.
pub fn coerce_number(cell: &CellValue) -> f64 {
    match cell {
        CellValue::Number(n) if n.is_finite() => *n,
        CellValue::Text(s) => parse_number_str(s).unwrap_or(0.0),
        _ => 0.0,
    }
}

/// Ticket volumes are counts, so the result is always finite and non-negative.
pub fn coerce_ticket_value(cell: &CellValue) -> f64 {
    if let CellValue::Text(s) = cell {
        if TICKET_BLACKLIST.contains(&s.trim().to_uppercase().as_str()) {
            return 0.0;
        }
    }
    let v = coerce_number(cell);
    if v > 0.0 {
        v
    } else {
        0.0
    }
}

pub fn text_or(cell: &CellValue, default: &str) -> String {
    match cell.as_text() {
        Some(s) if !s.trim().is_empty() => s.trim().to_string(),
        _ => default.to_string(),
    }
}

pub fn contains_cancel(cell: &CellValue) -> bool {
    match cell {
        CellValue::Text(s) => s.to_uppercase().contains("CANCEL"),
        _ => false,
    }
}

pub fn month_label(month: u32) -> String {
    month
        .checked_sub(1)
        .and_then(|i| MONTH_LABELS.get(i as usize))
        .map(|s| s.to_string())
        .unwrap_or_else(|| month.to_string())
}

/// Client-name cells that are blank or a stringified NaN are not accounts.
pub fn clean_client_name(cell: &CellValue) -> Option<String> {
    let name = cell.as_text()?.trim().to_string();
    if name.is_empty() || name == "nan" {
        None
    } else {
        Some(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 30).unwrap()
    }

    #[test]
    fn flags_accept_known_spellings() {
        for s in ["sim", " S ", "Yes", "y", "true", "1"] {
            assert_eq!(normalize_flag(&CellValue::text(s)), Flag::Sim, "{}", s);
        }
        for s in ["não", "NAO", "n", "no", "False", "0", "-", "", "nan"] {
            assert_eq!(normalize_flag(&CellValue::text(s)), Flag::Nao, "{}", s);
        }
        assert_eq!(normalize_flag(&CellValue::Number(1.0)), Flag::Sim);
        assert_eq!(normalize_flag(&CellValue::Missing), Flag::Nao);
        assert_eq!(normalize_flag(&CellValue::text("talvez")), Flag::Nao);
        assert_eq!(normalize_flag(&CellValue::date(2025, 1, 1)), Flag::Nao);
    }

    #[test]
    fn real_dates_win_over_relative_text() {
        assert_eq!(
            normalize_date(&CellValue::date(2025, 3, 10), today()),
            NaiveDate::from_ymd_opt(2025, 3, 10)
        );
        assert_eq!(
            normalize_date(&CellValue::text("15/04/2025"), today()),
            NaiveDate::from_ymd_opt(2025, 4, 15)
        );
        assert_eq!(
            normalize_date(&CellValue::text("2025-04-15 08:30:00"), today()),
            NaiveDate::from_ymd_opt(2025, 4, 15)
        );
    }

    #[test]
    fn relative_text_uses_fixed_day_counts() {
        assert_eq!(
            normalize_date(&CellValue::text("A 1 SEMANA ATRÁS"), today()),
            NaiveDate::from_ymd_opt(2025, 6, 23)
        );
        assert_eq!(
            normalize_date(&CellValue::text("a 3 semanas"), today()),
            NaiveDate::from_ymd_opt(2025, 6, 9)
        );
        assert_eq!(
            normalize_date(&CellValue::text("A 4 MESES ATRAS"), today()),
            NaiveDate::from_ymd_opt(2025, 3, 2)
        );
        assert_eq!(
            normalize_date(&CellValue::text("a 1 mes"), today()),
            NaiveDate::from_ymd_opt(2025, 5, 31)
        );
    }

    #[test]
    fn unparseable_dates_are_missing() {
        assert_eq!(normalize_date(&CellValue::text("sem contato"), today()), None);
        assert_eq!(normalize_date(&CellValue::Missing, today()), None);
        assert_eq!(normalize_date(&CellValue::Number(12.0), today()), None);
    }

    #[test]
    fn absurd_relative_offsets_are_missing() {
        assert_eq!(normalize_date(&CellValue::text("A 99999999999 SEMANAS"), today()), None);
        assert_eq!(normalize_date(&CellValue::text("a 2000000000000000000 meses"), today()), None);
        assert_eq!(normalize_date(&CellValue::text("a 99999999999999999999 meses"), today()), None);
        assert_eq!(normalize_date(&CellValue::text("A 100000000 MESES"), today()), None);
    }

    #[test]
    fn ticket_values_never_go_negative_or_null() {
        assert_eq!(coerce_ticket_value(&CellValue::Missing), 0.0);
        assert_eq!(coerce_ticket_value(&CellValue::text("Não tem")), 0.0);
        assert_eq!(coerce_ticket_value(&CellValue::text("implantação")), 0.0);
        assert_eq!(coerce_ticket_value(&CellValue::text("  ")), 0.0);
        assert_eq!(coerce_ticket_value(&CellValue::text("abc")), 0.0);
        assert_eq!(coerce_ticket_value(&CellValue::text(" 12 ")), 12.0);
        assert_eq!(coerce_ticket_value(&CellValue::text("nan")), 0.0);
        assert_eq!(coerce_ticket_value(&CellValue::Number(7.0)), 7.0);
        assert_eq!(coerce_ticket_value(&CellValue::Number(-2.0)), 0.0);
        assert_eq!(coerce_ticket_value(&CellValue::Number(f64::INFINITY)), 0.0);
        assert_eq!(coerce_ticket_value(&CellValue::date(2025, 1, 1)), 0.0);
    }

    #[test]
    fn header_normalization_collapses_newlines() {
        assert_eq!(normalize_header("  Último\ncontato "), "ÚLTIMO CONTATO");
    }

    #[test]
    fn month_labels_are_portuguese() {
        assert_eq!(month_label(3), "MARÇO");
        assert_eq!(month_label(12), "DEZEMBRO");
        assert_eq!(month_label(13), "13");
    }

    #[test]
    fn client_names_drop_blank_and_nan() {
        assert_eq!(clean_client_name(&CellValue::text("  Acme ")), Some("Acme".to_string()));
        assert_eq!(clean_client_name(&CellValue::text("nan")), None);
        assert_eq!(clean_client_name(&CellValue::text("   ")), None);
        assert_eq!(clean_client_name(&CellValue::Missing), None);
    }
}
