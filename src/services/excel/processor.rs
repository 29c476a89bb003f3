use std::io::Cursor;
use std::path::Path;

use bytes::Bytes;
use calamine::{open_workbook_from_rs, Reader, Xlsx};
use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use regex::Regex;

use super::clients::build_client_records;
use super::types::Grid;
use super::verticalizer::verticalize;
use crate::config::Config;
use crate::error::AppError;
use crate::models::{ClientRecord, Snapshot, SourceStatus, TicketRecord};

static SHEET_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{4})").expect("sheet year pattern is valid"));

/// Anything that can hand out named sheets as grids.
pub trait WorkbookSource {
    fn sheet_names(&self) -> Vec<String>;
    fn grid(&mut self, sheet_name: &str) -> Result<Grid, AppError>;
}

pub struct XlsxWorkbook {
    inner: Xlsx<Cursor<Bytes>>,
}

impl XlsxWorkbook {
    pub fn from_bytes(file_data: Bytes) -> Result<Self, AppError> {
        let cursor = Cursor::new(file_data);
        let inner: Xlsx<_> = open_workbook_from_rs(cursor).map_err(|e| {
            tracing::error!("Failed to open Excel file: {}", e);
            AppError::FileProcessingError(format!("Failed to open Excel file: {}", e))
        })?;
        Ok(Self { inner })
    }
}

impl WorkbookSource for XlsxWorkbook {
    fn sheet_names(&self) -> Vec<String> {
        self.inner.sheet_names().to_vec()
    }

    fn grid(&mut self, sheet_name: &str) -> Result<Grid, AppError> {
        self.inner
            .worksheet_range(sheet_name)
            .map(|range| Grid::from_range(&range))
            .map_err(|e| AppError::FileProcessingError(format!("Failed to read worksheet {}: {}", sheet_name, e)))
    }
}

/// Sheet naming conventions of the customer-success workbook.
#[derive(Debug, Clone)]
pub struct SheetLayout {
    pub info_sheet: String,
    pub ticket_marker: String,
}

impl Default for SheetLayout {
    fn default() -> Self {
        Self {
            info_sheet: "Informações Gerais".to_string(),
            ticket_marker: "Chamados Mensais".to_string(),
        }
    }
}

impl SheetLayout {
    pub fn from_config(config: &Config) -> Self {
        Self {
            info_sheet: config.info_sheet.clone(),
            ticket_marker: config.ticket_sheet_marker.clone(),
        }
    }

    pub fn find_info_sheet(&self, names: &[String]) -> Option<String> {
        names
            .iter()
            .find(|n| **n == self.info_sheet)
            .or_else(|| {
                let wanted = self.info_sheet.trim().to_lowercase();
                names.iter().find(|n| n.trim().to_lowercase() == wanted)
            })
            .cloned()
    }

    /// Ticket sheets ordered by the year in their name; sheets without a year
    /// keep workbook order after the dated ones.
    pub fn find_ticket_sheets(&self, names: &[String]) -> Vec<String> {
        let marker = self.ticket_marker.to_lowercase();
        let mut sheets: Vec<(Option<i32>, usize, String)> = names
            .iter()
            .enumerate()
            .filter(|(_, n)| n.to_lowercase().contains(&marker))
            .map(|(idx, n)| (sheet_year(n), idx, n.clone()))
            .collect();

        sheets.sort_by_key(|(year, idx, _)| (year.is_none(), year.unwrap_or(0), *idx));
        sheets.into_iter().map(|(_, _, n)| n).collect()
    }
}

fn sheet_year(name: &str) -> Option<i32> {
    SHEET_YEAR
        .captures_iter(name)
        .last()
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

pub struct ExcelProcessor {
    layout: SheetLayout,
    max_file_size: usize,
}

impl ExcelProcessor {
    pub fn new(layout: SheetLayout, max_file_size: usize) -> Self {
        Self { layout, max_file_size }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(SheetLayout::from_config(config), config.max_file_size)
    }

    /// Full reload from disk. A missing or unreadable file degrades to an
    /// empty snapshot whose sources are marked unavailable.
    pub fn process_path(&self, path: &Path, now: NaiveDateTime) -> Snapshot {
        match self.read_file(path) {
            Ok(file_data) => match self.process_bytes(file_data, now) {
                Ok(snapshot) => snapshot,
                Err(e) => Snapshot::empty(&e.to_string(), now),
            },
            Err(e) => {
                tracing::error!("Workbook {} unavailable: {}", path.display(), e);
                Snapshot::empty(&e.to_string(), now)
            }
        }
    }

    fn read_file(&self, path: &Path) -> Result<Bytes, AppError> {
        let metadata = std::fs::metadata(path)?;
        if metadata.len() as usize > self.max_file_size {
            return Err(AppError::FileProcessingError(format!(
                "Workbook is {} bytes, limit is {}",
                metadata.len(),
                self.max_file_size
            )));
        }
        Ok(Bytes::from(std::fs::read(path)?))
    }

    pub fn process_bytes(&self, file_data: Bytes, now: NaiveDateTime) -> Result<Snapshot, AppError> {
        tracing::info!("Opening workbook ({}KB)", file_data.len() / 1024);
        let mut workbook = XlsxWorkbook::from_bytes(file_data)?;
        Ok(self.process_workbook(&mut workbook, now))
    }

    pub fn process_workbook<W: WorkbookSource>(&self, workbook: &mut W, now: NaiveDateTime) -> Snapshot {
        let start = std::time::Instant::now();
        let sheet_names = workbook.sheet_names();
        tracing::info!("Found {} sheets: {:?}", sheet_names.len(), sheet_names);

        let (clients, clients_status) = self.load_clients(workbook, &sheet_names, now);
        let (tickets, tickets_status, ticket_sheets) = self.load_tickets(workbook, &sheet_names, now);

        tracing::info!(
            "Loaded {} client rows and {} ticket rows in {:?}",
            clients.len(),
            tickets.len(),
            start.elapsed()
        );

        Snapshot {
            clients,
            tickets,
            clients_status,
            tickets_status,
            ticket_sheets,
            loaded_at: now,
        }
    }

    fn load_clients<W: WorkbookSource>(
        &self,
        workbook: &mut W,
        sheet_names: &[String],
        now: NaiveDateTime,
    ) -> (Vec<ClientRecord>, SourceStatus) {
        let sheet = match self.layout.find_info_sheet(sheet_names) {
            Some(s) => s,
            None => {
                tracing::warn!("Sheet {} not found", self.layout.info_sheet);
                let err = AppError::MissingSheet(self.layout.info_sheet.clone());
                return (Vec::new(), SourceStatus::Unavailable(err.to_string()));
            }
        };

        let result = workbook
            .grid(&sheet)
            .and_then(|grid| {
                tracing::info!("Processing sheet: {} ({} rows)", sheet, grid.height());
                build_client_records(&grid, now.date())
            });

        match result {
            Ok(records) => (records, SourceStatus::Loaded),
            Err(e) => {
                tracing::warn!("Client sheet {} unavailable: {}", sheet, e);
                (Vec::new(), SourceStatus::Unavailable(e.to_string()))
            }
        }
    }

    fn load_tickets<W: WorkbookSource>(
        &self,
        workbook: &mut W,
        sheet_names: &[String],
        now: NaiveDateTime,
    ) -> (Vec<TicketRecord>, SourceStatus, Vec<String>) {
        let candidates = self.layout.find_ticket_sheets(sheet_names);
        if candidates.is_empty() {
            tracing::warn!("No sheet named like {} found", self.layout.ticket_marker);
            let err = AppError::MissingSheet(self.layout.ticket_marker.clone());
            return (Vec::new(), SourceStatus::Unavailable(err.to_string()), Vec::new());
        }

        let mut tickets = Vec::new();
        let mut used = Vec::new();
        for sheet in candidates {
            match workbook.grid(&sheet) {
                Ok(grid) => {
                    tracing::info!("Processing sheet: {} ({} rows)", sheet, grid.height());
                    let records = verticalize(&grid, now);
                    if records.is_empty() {
                        tracing::warn!("Sheet {} produced no ticket rows", sheet);
                        continue;
                    }
                    tickets.extend(records);
                    used.push(sheet);
                }
                Err(e) => {
                    tracing::warn!("Failed to read worksheet {}: {}", sheet, e);
                }
            }
        }

        (tickets, SourceStatus::Loaded, used)
    }
}
