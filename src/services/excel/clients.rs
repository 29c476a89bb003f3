use chrono::NaiveDate;

use super::columns::{ColumnMap, Field};
use super::types::{CellValue, Grid};
use super::utils::{
    clean_client_name, coerce_number, contains_cancel, normalize_date, normalize_flag,
    strict_date, text_or,
};
use crate::error::AppError;
use crate::models::{ClientRecord, ContactBucket, ExpiryBucket, Flag};

const HEADER_ROW: usize = 0;
const NOT_AVAILABLE: &str = "N/A";

/// Cells whose free text may mark a cancelled account.
const CANCEL_SOURCES: [Field; 4] = [
    Field::Activation,
    Field::ContractStart,
    Field::ContractEnd,
    Field::ContractValue,
];

struct RowView<'a> {
    grid: &'a Grid,
    columns: &'a ColumnMap,
    row: usize,
}

impl<'a> RowView<'a> {
    fn cell(&self, field: Field) -> Option<&'a CellValue> {
        self.columns
            .get(field)
            .map(|col| self.grid.cell(self.row, col))
    }

    fn flag(&self, field: Field) -> Flag {
        self.cell(field).map(normalize_flag).unwrap_or_default()
    }

    fn date(&self, field: Field) -> Option<NaiveDate> {
        self.cell(field).and_then(strict_date)
    }

    fn text(&self, field: Field, default: &str) -> String {
        self.cell(field)
            .map(|c| text_or(c, default))
            .unwrap_or_else(|| default.to_string())
    }
}

pub fn header_names(grid: &Grid) -> Vec<String> {
    grid.row(HEADER_ROW)
        .iter()
        .map(|cell| cell.as_text().map(|s| s.trim().to_string()).unwrap_or_default())
        .collect()
}

/// Builds the canonical client table from the general-information sheet.
///
/// Only a missing client-name column is an error; every other field falls back
/// to its documented default.
pub fn build_client_records(grid: &Grid, today: NaiveDate) -> Result<Vec<ClientRecord>, AppError> {
    let headers = header_names(grid);
    let columns = ColumnMap::resolve(&headers);

    let name_col = columns
        .get(Field::ClientName)
        .ok_or_else(|| AppError::MissingColumn("CLIENTE".to_string()))?;

    for field in columns.missing() {
        tracing::debug!("Column for {:?} not found, using default", field);
    }

    let records = (HEADER_ROW + 1..grid.height())
        .filter_map(|row| {
            let name = clean_client_name(grid.cell(row, name_col))?;
            let view = RowView { grid, columns: &columns, row };
            Some(build_record(name, &view, today))
        })
        .collect();

    Ok(records)
}

fn build_record(name: String, view: &RowView<'_>, today: NaiveDate) -> ClientRecord {
    let last_contact = view
        .cell(Field::LastContact)
        .and_then(|c| normalize_date(c, today));
    let days_since_contact = last_contact.map(|d| (today - d).num_days());

    let contract_end = view.date(Field::ContractEnd);
    let days_until_contract_end = contract_end.map(|d| (d - today).num_days());

    let cancelled = CANCEL_SOURCES
        .iter()
        .filter_map(|f| view.cell(*f))
        .any(contains_cancel);

    ClientRecord {
        name,
        at_risk: view.flag(Field::AtRisk),
        churn_risk: view.flag(Field::ChurnRisk),
        activation_date: view.date(Field::Activation),
        contract_start: view.date(Field::ContractStart),
        contract_end,
        contract_value: view.cell(Field::ContractValue).map(coerce_number).unwrap_or(0.0),
        last_contact,
        days_since_contact,
        contact_bucket: days_since_contact.map(ContactBucket::from_days),
        csm: view.text(Field::Csm, NOT_AVAILABLE),
        manager: view.text(Field::Manager, NOT_AVAILABLE),
        activity: view.text(Field::Activity, NOT_AVAILABLE),
        restriction: view.text(Field::Restriction, NOT_AVAILABLE),
        unit: view.text(Field::Unit, NOT_AVAILABLE),
        contact: view.text(Field::Contact, NOT_AVAILABLE),
        phone: view.text(Field::Phone, NOT_AVAILABLE),
        email: view.text(Field::Email, NOT_AVAILABLE),
        observation: view.text(Field::Observation, ""),
        cancelled,
        days_until_contract_end,
        expiry_bucket: days_until_contract_end.map(ExpiryBucket::from_days),
    }
}
