use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::models::{
    ClientRecord, HealthComponents, HealthScoreResult, TicketCategory, TicketRecord,
};

pub const CONTACT_WEIGHT: u8 = 25;
pub const INCIDENTS_WEIGHT: u8 = 30;
pub const SLA_WEIGHT: u8 = 25;
pub const FLAGS_WEIGHT: u8 = 20;

const RECENT_MONTHS: usize = 3;
const AT_RISK_PENALTY: u8 = 8;
const CHURN_RISK_PENALTY: u8 = 12;

/// Per-month totals for the given categories.
fn monthly_totals(tickets: &[TicketRecord], categories: &[TicketCategory]) -> BTreeMap<NaiveDate, f64> {
    let mut totals = BTreeMap::new();
    for t in tickets.iter().filter(|t| categories.contains(&t.category)) {
        *totals.entry(t.month_ref).or_insert(0.0) += t.value;
    }
    totals
}

/// The most recent months whose volume in `categories` is above zero.
///
/// Months without submitted data are skipped rather than read as quiet months.
fn recent_data_bearing_months(tickets: &[TicketRecord], categories: &[TicketCategory]) -> Vec<NaiveDate> {
    monthly_totals(tickets, categories)
        .into_iter()
        .rev()
        .filter(|(_, total)| *total > 0.0)
        .take(RECENT_MONTHS)
        .map(|(month, _)| month)
        .collect()
}

fn sum_in_months(tickets: &[TicketRecord], months: &[NaiveDate], category: TicketCategory) -> f64 {
    tickets
        .iter()
        .filter(|t| t.category == category && months.contains(&t.month_ref))
        .map(|t| t.value)
        .sum()
}

pub fn contact_points(days_since_contact: Option<i64>) -> u8 {
    match days_since_contact {
        Some(d) if d <= 30 => CONTACT_WEIGHT,
        Some(d) if d <= 90 => 15,
        _ => 5,
    }
}

pub fn incident_rate_points(rate: f64) -> u8 {
    match rate {
        r if r == 0.0 => INCIDENTS_WEIGHT,
        r if r < 10.0 => 25,
        r if r < 25.0 => 15,
        r if r < 50.0 => 8,
        _ => 3,
    }
}

pub fn sla_points(attainment: f64) -> u8 {
    match attainment {
        a if a >= 95.0 => SLA_WEIGHT,
        a if a >= 85.0 => 18,
        a if a >= 70.0 => 10,
        _ => 3,
    }
}

pub fn incidents_component(tickets: &[TicketRecord]) -> u8 {
    let months = recent_data_bearing_months(tickets, &[TicketCategory::Chamados]);
    if months.is_empty() {
        return INCIDENTS_WEIGHT;
    }

    let chamados = sum_in_months(tickets, &months, TicketCategory::Chamados);
    let incidentes = sum_in_months(tickets, &months, TicketCategory::Incidentes);
    if chamados <= 0.0 {
        return INCIDENTS_WEIGHT;
    }
    incident_rate_points(incidentes / chamados * 100.0)
}

pub fn sla_component(tickets: &[TicketRecord]) -> u8 {
    let sla_categories = [TicketCategory::DentroSla, TicketCategory::ForaSla];
    let months = recent_data_bearing_months(tickets, &sla_categories);
    if months.is_empty() {
        return SLA_WEIGHT;
    }

    let dentro = sum_in_months(tickets, &months, TicketCategory::DentroSla);
    let fora = sum_in_months(tickets, &months, TicketCategory::ForaSla);
    let total = dentro + fora;
    if total <= 0.0 {
        return SLA_WEIGHT;
    }
    sla_points(dentro / total * 100.0)
}

pub fn flags_component(client: &ClientRecord) -> u8 {
    let mut points = FLAGS_WEIGHT;
    if client.at_risk.is_set() {
        points = points.saturating_sub(AT_RISK_PENALTY);
    }
    if client.churn_risk.is_set() {
        points = points.saturating_sub(CHURN_RISK_PENALTY);
    }
    points
}

/// Weighted 0-100 health score. `tickets` must already be narrowed to `client`.
pub fn compute_health_score(client: &ClientRecord, tickets: &[TicketRecord]) -> HealthScoreResult {
    let components = HealthComponents {
        contact: contact_points(client.days_since_contact),
        incidents: incidents_component(tickets),
        sla: sla_component(tickets),
        flags: flags_component(client),
    };

    let total = components.contact as u16
        + components.incidents as u16
        + components.sla as u16
        + components.flags as u16;

    HealthScoreResult {
        score: total.min(100) as u8,
        components,
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::NaiveDate;

    use crate::models::{ClientRecord, ContactBucket, Flag, TicketCategory, TicketRecord};

    pub fn client(name: &str, days_since_contact: Option<i64>, at_risk: Flag, churn_risk: Flag) -> ClientRecord {
        ClientRecord {
            name: name.to_string(),
            at_risk,
            churn_risk,
            activation_date: None,
            contract_start: None,
            contract_end: None,
            contract_value: 0.0,
            last_contact: None,
            days_since_contact,
            contact_bucket: days_since_contact.map(ContactBucket::from_days),
            csm: "N/A".to_string(),
            manager: "N/A".to_string(),
            activity: "N/A".to_string(),
            restriction: "N/A".to_string(),
            unit: "N/A".to_string(),
            contact: "N/A".to_string(),
            phone: "N/A".to_string(),
            email: "N/A".to_string(),
            observation: String::new(),
            cancelled: false,
            days_until_contract_end: None,
            expiry_bucket: None,
        }
    }

    pub fn ticket(client: &str, year: i32, month: u32, category: TicketCategory, value: f64) -> TicketRecord {
        TicketRecord {
            client: client.to_string(),
            year,
            month,
            month_label: month.to_string(),
            month_ref: NaiveDate::from_ymd_opt(year, month, 1).unwrap(),
            category,
            value,
        }
    }

    /// Full five-category month, the way the verticalizer emits it.
    pub fn month(client: &str, year: i32, month_no: u32, values: [f64; 5]) -> Vec<TicketRecord> {
        TicketCategory::BLOCK_ORDER
            .iter()
            .zip(values.iter())
            .map(|(c, v)| ticket(client, year, month_no, *c, *v))
            .collect()
    }
}
