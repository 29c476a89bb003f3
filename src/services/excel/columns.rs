use std::collections::HashMap;

use super::utils::normalize_header;

/// Ordered alternatives; each alternative lists substrings that must all appear.
pub type KeywordChain = &'static [&'static [&'static str]];

/// Semantic fields of the client-info sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    ClientName,
    AtRisk,
    ChurnRisk,
    Activation,
    ContractStart,
    ContractEnd,
    ContractValue,
    LastContact,
    Csm,
    Manager,
    Activity,
    Restriction,
    Unit,
    Contact,
    Phone,
    Email,
    Observation,
}

impl Field {
    pub const ALL: [Field; 17] = [
        Field::ClientName,
        Field::AtRisk,
        Field::ChurnRisk,
        Field::Activation,
        Field::ContractStart,
        Field::ContractEnd,
        Field::ContractValue,
        Field::LastContact,
        Field::Csm,
        Field::Manager,
        Field::Activity,
        Field::Restriction,
        Field::Unit,
        Field::Contact,
        Field::Phone,
        Field::Email,
        Field::Observation,
    ];

    pub fn keywords(&self) -> KeywordChain {
        match self {
            Field::ClientName => &[&["CLIENTE"]],
            Field::AtRisk => &[&["AT", "RISK", "CUSTOMER"], &["AT-RISK"]],
            Field::ChurnRisk => &[&["CHURN", "RISK"], &["CANCELAMENTO"]],
            Field::Activation => &[&["ATIVAÇÃO"], &["ATIVACAO"]],
            Field::ContractStart => &[&["VIGÊNCIA", "INICIAL"], &["VIGENCIA", "INICIAL"]],
            Field::ContractEnd => &[&["VIGÊNCIA", "FINAL"], &["VIGENCIA", "FINAL"]],
            Field::ContractValue => &[&["VALOR"]],
            Field::LastContact => &[&["ÚLTIMO", "CONTATO"], &["ULTIMO", "CONTATO"]],
            Field::Csm => &[&["CUSTOMER", "SUCCESS"], &["CSM"]],
            Field::Manager => &[&["GERENTE"]],
            Field::Activity => &[&["ATIVIDADE"]],
            Field::Restriction => &[&["RESTRIÇÃO"], &["RESTRICAO"], &["SOLUÇÃO"]],
            Field::Unit => &[&["UNIDADE"]],
            Field::Contact => &[&["CONTATO"]],
            Field::Phone => &[&["TELEFONE"]],
            Field::Email => &[&["E-MAIL"], &["EMAIL"]],
            Field::Observation => &[&["OBSERVAÇÃO"], &["OBSERVACAO"]],
        }
    }
}

/// Finds the first header containing every keyword of the first alternative
/// that matches anything. Returns the column index.
pub fn resolve_column(headers: &[String], alternatives: &[&[&str]]) -> Option<usize> {
    let normalized: Vec<String> = headers.iter().map(|h| normalize_header(h)).collect();
    resolve_normalized(&normalized, alternatives)
}

fn resolve_normalized(normalized: &[String], alternatives: &[&[&str]]) -> Option<usize> {
    alternatives.iter().find_map(|keywords| {
        let keywords: Vec<String> = keywords.iter().map(|k| k.to_uppercase()).collect();
        normalized
            .iter()
            .position(|header| keywords.iter().all(|k| header.contains(k.as_str())))
    })
}

/// Column positions of every semantic field found in one header row.
#[derive(Debug, Clone, Default)]
pub struct ColumnMap {
    columns: HashMap<Field, usize>,
}

impl ColumnMap {
    pub fn resolve(headers: &[String]) -> Self {
        let normalized: Vec<String> = headers.iter().map(|h| normalize_header(h)).collect();
        let columns = Field::ALL
            .iter()
            .filter_map(|field| {
                resolve_normalized(&normalized, field.keywords()).map(|idx| (*field, idx))
            })
            .collect();
        Self { columns }
    }

    pub fn get(&self, field: Field) -> Option<usize> {
        self.columns.get(&field).copied()
    }

    pub fn missing(&self) -> Vec<Field> {
        Field::ALL
            .iter()
            .filter(|f| !self.columns.contains_key(*f))
            .copied()
            .collect()
    }
}
