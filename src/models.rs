use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

/// Canonical yes/no flag as written in the source sheets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Flag {
    #[serde(rename = "SIM")]
    Sim,
    #[serde(rename = "NÃO")]
    Nao,
}

impl Flag {
    pub fn is_set(&self) -> bool {
        matches!(self, Flag::Sim)
    }
}

impl Default for Flag {
    fn default() -> Self {
        Flag::Nao
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ContactBucket {
    #[serde(rename = "0-30")]
    UpTo30,
    #[serde(rename = "30-90")]
    UpTo90,
    #[serde(rename = "90+")]
    Over90,
}

impl ContactBucket {
    pub fn from_days(days: i64) -> Self {
        match days {
            d if d <= 30 => ContactBucket::UpTo30,
            d if d <= 90 => ContactBucket::UpTo90,
            _ => ContactBucket::Over90,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExpiryBucket {
    Vencido,
    #[serde(rename = "30_DIAS")]
    Within30,
    #[serde(rename = "60_DIAS")]
    Within60,
    #[serde(rename = "90_DIAS")]
    Within90,
    Ok,
}

impl ExpiryBucket {
    pub fn from_days(days: i64) -> Self {
        match days {
            d if d < 0 => ExpiryBucket::Vencido,
            d if d <= 30 => ExpiryBucket::Within30,
            d if d <= 60 => ExpiryBucket::Within60,
            d if d <= 90 => ExpiryBucket::Within90,
            _ => ExpiryBucket::Ok,
        }
    }
}

/// One row per account-name occurrence in the info sheet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClientRecord {
    pub name: String,
    pub at_risk: Flag,
    pub churn_risk: Flag,
    pub activation_date: Option<NaiveDate>,
    pub contract_start: Option<NaiveDate>,
    pub contract_end: Option<NaiveDate>,
    pub contract_value: f64,
    pub last_contact: Option<NaiveDate>,
    pub days_since_contact: Option<i64>,
    pub contact_bucket: Option<ContactBucket>,
    pub csm: String,
    pub manager: String,
    pub activity: String,
    pub restriction: String,
    pub unit: String,
    pub contact: String,
    pub phone: String,
    pub email: String,
    pub observation: String,
    pub cancelled: bool,
    pub days_until_contract_end: Option<i64>,
    pub expiry_bucket: Option<ExpiryBucket>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketCategory {
    Chamados,
    Incidentes,
    Solicitacoes,
    DentroSla,
    ForaSla,
}

impl TicketCategory {
    /// Column order inside every monthly block.
    pub const BLOCK_ORDER: [TicketCategory; 5] = [
        TicketCategory::Chamados,
        TicketCategory::Incidentes,
        TicketCategory::Solicitacoes,
        TicketCategory::DentroSla,
        TicketCategory::ForaSla,
    ];
}

/// One row per (client, year, month, category).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TicketRecord {
    pub client: String,
    pub year: i32,
    pub month: u32,
    pub month_label: String,
    pub month_ref: NaiveDate,
    pub category: TicketCategory,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HealthComponents {
    pub contact: u8,
    pub incidents: u8,
    pub sla: u8,
    pub flags: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HealthScoreResult {
    pub score: u8,
    pub components: HealthComponents,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HealthLabel {
    Excelente,
    Bom,
    #[serde(rename = "ATENÇÃO")]
    Atencao,
    #[serde(rename = "CRÍTICO")]
    Critico,
}

impl HealthLabel {
    pub fn from_score(score: u8) -> Self {
        match score {
            s if s >= 80 => HealthLabel::Excelente,
            s if s >= 60 => HealthLabel::Bom,
            s if s >= 40 => HealthLabel::Atencao,
            _ => HealthLabel::Critico,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IncidentProfile {
    SemIncidentes,
    Esporadico,
    Recorrente,
    Crescente,
}

/// Whether a source sheet could be read at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum SourceStatus {
    Loaded,
    Unavailable(String),
}

impl SourceStatus {
    pub fn is_available(&self) -> bool {
        matches!(self, SourceStatus::Loaded)
    }
}

/// Immutable result of one full workbook load.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub clients: Vec<ClientRecord>,
    pub tickets: Vec<TicketRecord>,
    pub clients_status: SourceStatus,
    pub tickets_status: SourceStatus,
    pub ticket_sheets: Vec<String>,
    pub loaded_at: NaiveDateTime,
}

impl Snapshot {
    pub fn empty(reason: &str, now: NaiveDateTime) -> Self {
        Snapshot {
            clients: Vec::new(),
            tickets: Vec::new(),
            clients_status: SourceStatus::Unavailable(reason.to_string()),
            tickets_status: SourceStatus::Unavailable(reason.to_string()),
            ticket_sheets: Vec::new(),
            loaded_at: now,
        }
    }

    pub fn find_client(&self, name: &str) -> Option<&ClientRecord> {
        let name = name.trim();
        self.clients.iter().find(|c| c.name == name)
    }
}
