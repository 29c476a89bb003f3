//! Cross-account views built on top of the two canonical tables.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use serde::Serialize;

use super::health_score::compute_health_score;
use super::incident_profile::classify_incidents;
use crate::models::{
    ClientRecord, ContactBucket, Flag, HealthLabel, IncidentProfile, TicketCategory,
    TicketRecord,
};

const HIGH_IMPACT_PCT: f64 = 5.0;
const HIGH_RISK: f64 = 40.0;

const ABC_CLASS_A_PCT: f64 = 80.0;
const ABC_CLASS_B_PCT: f64 = 95.0;
// cumulative sums of shares drift by a few ulps
const ABC_TOLERANCE: f64 = 1e-9;

const SLA_WINDOW_MONTHS: usize = 3;

/// Revenue-concentration class from the cumulative share of the curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AbcClass {
    A,
    B,
    C,
}

impl AbcClass {
    pub fn from_cumulative(cumulative_pct: f64) -> Self {
        if cumulative_pct <= ABC_CLASS_A_PCT + ABC_TOLERANCE {
            AbcClass::A
        } else if cumulative_pct <= ABC_CLASS_B_PCT + ABC_TOLERANCE {
            AbcClass::B
        } else {
            AbcClass::C
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RevenueShare {
    pub client: String,
    pub contract_value: f64,
    pub share_pct: f64,
    pub cumulative_pct: f64,
    pub abc_class: AbcClass,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AbcSummary {
    pub class_a: usize,
    pub class_b: usize,
    pub class_c: usize,
}

/// Headline numbers over active accounts. Counts are per row, like the sheet.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PortfolioKpis {
    pub active_clients: usize,
    pub at_risk_clients: usize,
    pub churn_risk_clients: usize,
    pub total_revenue: f64,
    pub revenue_at_risk: f64,
    pub revenue_churn_risk: f64,
    /// Value of accounts carrying either flag, counted once.
    pub revenue_any_risk: f64,
    pub average_contract_value: f64,
}

/// Active accounts activated within the last 30, 31-60 and 61-90 days.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ActivationBuckets {
    pub up_to_30: usize,
    pub up_to_60: usize,
    pub up_to_90: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum ActionPriority {
    #[serde(rename = "CRÍTICA")]
    Critica,
    #[serde(rename = "ALTA")]
    Alta,
    #[serde(rename = "MÉDIA")]
    Media,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionSuggestion {
    pub priority: ActionPriority,
    pub action: String,
    pub recommendation: String,
}

impl ActionSuggestion {
    fn new(priority: ActionPriority, action: impl Into<String>, recommendation: &str) -> Self {
        Self {
            priority,
            action: action.into(),
            recommendation: recommendation.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskQuadrant {
    AltoImpactoAltoRisco,
    AltoImpacto,
    AltoRisco,
    Saudavel,
}

impl RiskQuadrant {
    pub fn classify(impact_pct: f64, risk: f64) -> Self {
        match (impact_pct > HIGH_IMPACT_PCT, risk > HIGH_RISK) {
            (true, true) => RiskQuadrant::AltoImpactoAltoRisco,
            (true, false) => RiskQuadrant::AltoImpacto,
            (false, true) => RiskQuadrant::AltoRisco,
            (false, false) => RiskQuadrant::Saudavel,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PriorityEntry {
    pub client: String,
    pub health_score: u8,
    pub health_label: HealthLabel,
    pub contract_value: f64,
    pub impact_pct: f64,
    pub priority_score: f64,
    pub quadrant: RiskQuadrant,
    pub at_risk: Flag,
    pub churn_risk: Flag,
    pub contact_bucket: Option<ContactBucket>,
}

/// A ticket row enriched with the account attributes reporting filters on.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardRow {
    pub client: String,
    pub year: i32,
    pub month: u32,
    pub month_ref: NaiveDate,
    pub category: TicketCategory,
    pub value: f64,
    pub at_risk: Flag,
    pub churn_risk: Flag,
    pub contract_value: f64,
    pub contact_bucket: Option<ContactBucket>,
    pub days_since_contact: Option<i64>,
    pub cancelled: bool,
}

pub fn active_clients(clients: &[ClientRecord]) -> Vec<&ClientRecord> {
    clients.iter().filter(|c| !c.cancelled).collect()
}

pub fn tickets_for_client(tickets: &[TicketRecord], client: &str) -> Vec<TicketRecord> {
    tickets.iter().filter(|t| t.client == client).cloned().collect()
}

fn total_value(clients: &[&ClientRecord]) -> f64 {
    clients.iter().map(|c| c.contract_value).sum()
}

fn summed_values(clients: &[&ClientRecord]) -> HashMap<String, f64> {
    let mut by_client: HashMap<String, f64> = HashMap::new();
    for c in clients {
        *by_client.entry(c.name.clone()).or_insert(0.0) += c.contract_value;
    }
    by_client
}

/// Contract value per unique active client, largest first.
pub fn revenue_by_client(clients: &[ClientRecord]) -> Vec<RevenueShare> {
    let active = active_clients(clients);
    let total = total_value(&active);

    let mut rows: Vec<(String, f64)> = summed_values(&active).into_iter().collect();
    rows.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });

    let mut cumulative = 0.0;
    rows.into_iter()
        .map(|(client, contract_value)| {
            let share_pct = if total > 0.0 { contract_value / total * 100.0 } else { 0.0 };
            cumulative += share_pct;
            RevenueShare {
                client,
                contract_value,
                share_pct,
                cumulative_pct: cumulative,
                abc_class: AbcClass::from_cumulative(cumulative),
            }
        })
        .collect()
}

pub fn abc_summary(shares: &[RevenueShare]) -> AbcSummary {
    shares.iter().fold(AbcSummary::default(), |mut acc, share| {
        match share.abc_class {
            AbcClass::A => acc.class_a += 1,
            AbcClass::B => acc.class_b += 1,
            AbcClass::C => acc.class_c += 1,
        }
        acc
    })
}

fn value_where(clients: &[&ClientRecord], pred: impl Fn(&ClientRecord) -> bool) -> f64 {
    clients
        .iter()
        .filter(|c| pred(**c))
        .map(|c| c.contract_value)
        .sum()
}

pub fn portfolio_kpis(clients: &[ClientRecord]) -> PortfolioKpis {
    let active = active_clients(clients);
    let total_revenue = total_value(&active);

    PortfolioKpis {
        active_clients: active.len(),
        at_risk_clients: active.iter().filter(|c| c.at_risk.is_set()).count(),
        churn_risk_clients: active.iter().filter(|c| c.churn_risk.is_set()).count(),
        total_revenue,
        revenue_at_risk: value_where(&active, |c| c.at_risk.is_set()),
        revenue_churn_risk: value_where(&active, |c| c.churn_risk.is_set()),
        revenue_any_risk: value_where(&active, |c| c.at_risk.is_set() || c.churn_risk.is_set()),
        average_contract_value: if active.is_empty() {
            0.0
        } else {
            total_revenue / active.len() as f64
        },
    }
}

/// Recent activations among active accounts. Activation dates later than
/// `today` fall in the first bucket.
pub fn new_activations(clients: &[ClientRecord], today: NaiveDate) -> ActivationBuckets {
    active_clients(clients)
        .iter()
        .filter_map(|c| c.activation_date)
        .map(|d| (today - d).num_days())
        .fold(ActivationBuckets::default(), |mut acc, days| {
            match days {
                d if d <= 30 => acc.up_to_30 += 1,
                d if d <= 60 => acc.up_to_60 += 1,
                d if d <= 90 => acc.up_to_90 += 1,
                _ => {}
            }
            acc
        })
}

/// SLA attainment over the latest calendar months present in `tickets`.
fn recent_sla_attainment(tickets: &[TicketRecord]) -> Option<f64> {
    let mut months: Vec<NaiveDate> = tickets.iter().map(|t| t.month_ref).collect();
    months.sort_unstable_by(|a, b| b.cmp(a));
    months.dedup();
    months.truncate(SLA_WINDOW_MONTHS);

    let sum = |category: TicketCategory| -> f64 {
        tickets
            .iter()
            .filter(|t| t.category == category && months.contains(&t.month_ref))
            .map(|t| t.value)
            .sum()
    };
    let dentro = sum(TicketCategory::DentroSla);
    let total = dentro + sum(TicketCategory::ForaSla);
    if total > 0.0 {
        Some(dentro / total * 100.0)
    } else {
        None
    }
}

/// Rule table of follow-ups for one account. `tickets` must already be
/// narrowed to `client`.
pub fn suggest_actions(client: &ClientRecord, tickets: &[TicketRecord]) -> Vec<ActionSuggestion> {
    use ActionPriority::*;

    let mut out = Vec::new();

    if client.at_risk.is_set() {
        out.push(ActionSuggestion::new(
            Alta,
            "Cliente marcado como AT-RISK",
            "Agendar reunião estratégica imediata com stakeholders",
        ));
    }
    if client.churn_risk.is_set() {
        out.push(ActionSuggestion::new(
            Critica,
            "Cliente em risco de cancelamento",
            "Escalar para gerência e criar plano de retenção urgente",
        ));
    }

    match client.days_since_contact {
        Some(d) if d > 90 => out.push(ActionSuggestion::new(
            Alta,
            format!("{} dias sem contato", d),
            "Realizar contato proativo e atualizar cadastro",
        )),
        Some(d) if d > 30 => out.push(ActionSuggestion::new(
            Media,
            format!("{} dias sem contato", d),
            "Agendar check-in de rotina",
        )),
        _ => {}
    }

    match client.days_until_contract_end {
        Some(d) if d < 0 => out.push(ActionSuggestion::new(
            Critica,
            "Contrato vencido",
            "Contatar imediatamente para renovação",
        )),
        Some(d) if d <= 30 => out.push(ActionSuggestion::new(
            Alta,
            format!("Contrato vence em {} dias", d),
            "Iniciar processo de renovação com proposta comercial",
        )),
        Some(d) if d <= 60 => out.push(ActionSuggestion::new(
            Media,
            format!("Contrato vence em {} dias", d),
            "Preparar proposta de renovação",
        )),
        _ => {}
    }

    match recent_sla_attainment(tickets) {
        Some(sla) if sla < 80.0 => out.push(ActionSuggestion::new(
            Alta,
            format!("SLA crítico: {:.1}% (últimos 3 meses)", sla),
            "Revisar processos de atendimento e identificar gargalos",
        )),
        Some(sla) if sla < 90.0 => out.push(ActionSuggestion::new(
            Media,
            format!("SLA abaixo da meta: {:.1}%", sla),
            "Monitorar atendimento e otimizar resposta",
        )),
        _ => {}
    }

    match classify_incidents(tickets) {
        IncidentProfile::Crescente => out.push(ActionSuggestion::new(
            Alta,
            "Incidentes em tendência crescente",
            "Investigar causa raiz e implementar ações preventivas",
        )),
        IncidentProfile::Recorrente => out.push(ActionSuggestion::new(
            Media,
            "Incidentes recorrentes detectados",
            "Analisar padrões e oferecer treinamento ao cliente",
        )),
        _ => {}
    }

    out
}

/// Ranks unique active clients by (100 - health) weighted by revenue impact.
pub fn priority_ranking(clients: &[ClientRecord], tickets: &[TicketRecord], limit: usize) -> Vec<PriorityEntry> {
    let active = active_clients(clients);
    let total = total_value(&active);
    let values = summed_values(&active);

    let mut seen = HashSet::new();
    let mut entries: Vec<PriorityEntry> = active
        .into_iter()
        .filter(|c| seen.insert(c.name.clone()))
        .map(|c| {
            let client_tickets = tickets_for_client(tickets, &c.name);
            let health = compute_health_score(c, &client_tickets);
            let contract_value = values.get(&c.name).copied().unwrap_or(0.0);
            let impact_pct = if total > 0.0 { contract_value / total * 100.0 } else { 0.0 };
            let risk = 100.0 - health.score as f64;

            PriorityEntry {
                client: c.name.clone(),
                health_score: health.score,
                health_label: HealthLabel::from_score(health.score),
                contract_value,
                impact_pct,
                priority_score: risk * (1.0 + impact_pct / 10.0),
                quadrant: RiskQuadrant::classify(impact_pct, risk),
                at_risk: c.at_risk,
                churn_risk: c.churn_risk,
                contact_bucket: c.contact_bucket,
            }
        })
        .collect();

    entries.sort_by(|a, b| {
        b.priority_score
            .partial_cmp(&a.priority_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    entries.truncate(limit);
    entries
}

/// Ticket table left-joined with the first client row of the same name.
pub fn dashboard_rows(clients: &[ClientRecord], tickets: &[TicketRecord]) -> Vec<DashboardRow> {
    let mut first_by_name: HashMap<&str, &ClientRecord> = HashMap::new();
    for c in clients {
        first_by_name.entry(c.name.as_str()).or_insert(c);
    }

    tickets
        .iter()
        .map(|t| {
            let client = first_by_name.get(t.client.as_str());
            DashboardRow {
                client: t.client.clone(),
                year: t.year,
                month: t.month,
                month_ref: t.month_ref,
                category: t.category,
                value: t.value,
                at_risk: client.map(|c| c.at_risk).unwrap_or_default(),
                churn_risk: client.map(|c| c.churn_risk).unwrap_or_default(),
                contract_value: client.map(|c| c.contract_value).unwrap_or(0.0),
                contact_bucket: client.and_then(|c| c.contact_bucket),
                days_since_contact: client.and_then(|c| c.days_since_contact),
                cancelled: client.map(|c| c.cancelled).unwrap_or(false),
            }
        })
        .collect()
}
