use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::models::{IncidentProfile, TicketCategory, TicketRecord};

const WINDOW_MONTHS: usize = 6;
const TREND_MONTHS: usize = 3;
const RECURRENT_MIN_MONTHS: usize = 3;

/// Incident volume per month, most recent first. Zero months are kept.
fn incidents_by_month_desc(tickets: &[TicketRecord]) -> Vec<f64> {
    let mut by_month: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for t in tickets.iter().filter(|t| t.category == TicketCategory::Incidentes) {
        *by_month.entry(t.month_ref).or_insert(0.0) += t.value;
    }
    by_month.into_values().rev().collect()
}

/// `[m0, m1, m2]` read most-recent-first: strictly widening into the present.
fn is_growing(recent: &[f64]) -> bool {
    match recent {
        [m0, m1, m2, ..] => m0 > m1 && *m1 > 0.0 && m1 > m2,
        _ => false,
    }
}

pub fn classify_incidents(tickets: &[TicketRecord]) -> IncidentProfile {
    let monthly = incidents_by_month_desc(tickets);
    let total: f64 = monthly.iter().sum();
    if total <= 0.0 {
        return IncidentProfile::SemIncidentes;
    }

    let window: Vec<f64> = monthly.into_iter().take(WINDOW_MONTHS).collect();

    if window.len() >= TREND_MONTHS && is_growing(&window[..TREND_MONTHS]) {
        return IncidentProfile::Crescente;
    }

    let months_with_incidents = window.iter().filter(|v| **v > 0.0).count();
    if months_with_incidents >= RECURRENT_MIN_MONTHS {
        IncidentProfile::Recorrente
    } else {
        IncidentProfile::Esporadico
    }
}
