use chrono::{Datelike, NaiveDate, NaiveDateTime};

use super::types::Grid;
use super::utils::{clean_client_name, coerce_ticket_value, month_label, strict_datetime};
use crate::models::{TicketCategory, TicketRecord};

const DATE_ROW: usize = 0;
const DATA_START_ROW: usize = 2;
const NAME_COL: usize = 0;
const BLOCK_WIDTH: usize = 5;
const MIN_COLUMNS: usize = 1 + BLOCK_WIDTH;

/// Turns a wide monthly ticket sheet into one record per client, month and category.
///
/// Row 0 carries each block's month date, row 1 the category captions (ignored,
/// the order is fixed), data starts at row 2 with the client in column 0.
/// Blocks dated after `now` are placeholders and are skipped.
pub fn verticalize(grid: &Grid, now: NaiveDateTime) -> Vec<TicketRecord> {
    if grid.width() < MIN_COLUMNS {
        tracing::warn!("Ticket sheet has {} columns, need at least {}", grid.width(), MIN_COLUMNS);
        return Vec::new();
    }

    let clients: Vec<(usize, String)> = (DATA_START_ROW..grid.height())
        .filter_map(|row| clean_client_name(grid.cell(row, NAME_COL)).map(|name| (row, name)))
        .collect();

    if clients.is_empty() {
        tracing::warn!("Ticket sheet has no client names");
        return Vec::new();
    }

    let block_count = (grid.width() - 1) / BLOCK_WIDTH;
    let mut out = Vec::with_capacity(block_count * clients.len() * BLOCK_WIDTH);

    for block in 0..block_count {
        let first_col = 1 + block * BLOCK_WIDTH;

        let month_date = match strict_datetime(grid.cell(DATE_ROW, first_col)) {
            Some(dt) => dt,
            None => {
                tracing::debug!("Block {} has no month date, skipping", block);
                continue;
            }
        };

        if month_date > now {
            tracing::debug!("Block {} dated {} is in the future, skipping", block, month_date);
            continue;
        }

        let year = month_date.year();
        let month = month_date.month();
        let month_ref = match NaiveDate::from_ymd_opt(year, month, 1) {
            Some(d) => d,
            None => continue,
        };
        let label = month_label(month);

        for (row, client) in &clients {
            for (offset, category) in TicketCategory::BLOCK_ORDER.iter().enumerate() {
                let value = coerce_ticket_value(grid.cell(*row, first_col + offset));
                out.push(TicketRecord {
                    client: client.clone(),
                    year,
                    month,
                    month_label: label.clone(),
                    month_ref,
                    category: *category,
                    value,
                });
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::excel::types::CellValue;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 6, 15)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn header_rows(dates: &[CellValue]) -> Vec<Vec<CellValue>> {
        let mut dates_row = vec![CellValue::Missing];
        let mut labels_row = vec![CellValue::Missing];
        for d in dates {
            dates_row.push(d.clone());
            dates_row.extend(std::iter::repeat(CellValue::Missing).take(4));
            for label in ["CHAMADOS", "INCIDENTES", "SOLICITAÇÕES", "DENTRO SLA", "FORA SLA"] {
                labels_row.push(CellValue::text(label));
            }
        }
        vec![dates_row, labels_row]
    }

    fn data_row(name: &str, values: &[f64]) -> Vec<CellValue> {
        let mut row = vec![CellValue::text(name)];
        row.extend(values.iter().map(|v| CellValue::Number(*v)));
        row
    }

    #[test]
    fn rejects_narrow_sheets() {
        let grid = Grid::new(vec![vec![CellValue::Missing; 5]; 4]);
        assert!(verticalize(&grid, now()).is_empty());
    }

    #[test]
    fn rejects_sheets_without_clients() {
        let mut rows = header_rows(&[CellValue::date(2025, 1, 1)]);
        rows.push(vec![CellValue::text("nan"), CellValue::Number(1.0)]);
        rows.push(vec![CellValue::text("   ")]);
        assert!(verticalize(&Grid::new(rows), now()).is_empty());
    }

    #[test]
    fn emits_one_record_per_client_and_category() {
        let mut rows = header_rows(&[CellValue::date(2025, 1, 1), CellValue::date(2025, 2, 1)]);
        rows.push(data_row("Acme", &[10.0, 2.0, 8.0, 9.0, 1.0, 20.0, 4.0, 16.0, 18.0, 2.0]));
        rows.push(data_row(" Globex ", &[1.0, 0.0, 1.0, 1.0, 0.0]));

        let records = verticalize(&Grid::new(rows), now());
        assert_eq!(records.len(), 2 * 2 * 5);

        let first = &records[0];
        assert_eq!(first.client, "Acme");
        assert_eq!(first.year, 2025);
        assert_eq!(first.month, 1);
        assert_eq!(first.month_label, "JANEIRO");
        assert_eq!(first.month_ref, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        assert_eq!(first.category, TicketCategory::Chamados);
        assert_eq!(first.value, 10.0);

        let feb_incidents = records
            .iter()
            .find(|r| r.client == "Acme" && r.month == 2 && r.category == TicketCategory::Incidentes)
            .unwrap();
        assert_eq!(feb_incidents.value, 4.0);

        // Globex has no February cells at all
        let globex_feb: Vec<_> = records
            .iter()
            .filter(|r| r.client == "Globex" && r.month == 2)
            .collect();
        assert_eq!(globex_feb.len(), 5);
        assert!(globex_feb.iter().all(|r| r.value == 0.0));
    }

    #[test]
    fn future_blocks_never_contribute() {
        let mut rows = header_rows(&[CellValue::date(2025, 5, 1), CellValue::date(2099, 1, 1)]);
        rows.push(data_row("Acme", &[1.0, 1.0, 1.0, 1.0, 1.0, 5.0, 2.0, 3.0, 4.0, 1.0]));

        let records = verticalize(&Grid::new(rows), now());
        assert_eq!(records.len(), 5);
        assert!(records.iter().all(|r| r.year == 2025 && r.month == 5));
    }

    #[test]
    fn block_dated_2099_alone_yields_nothing() {
        let mut rows = header_rows(&[CellValue::date(2099, 1, 1)]);
        rows.push(data_row("Acme", &[5.0, 2.0, 3.0, 4.0, 1.0]));
        assert!(verticalize(&Grid::new(rows), now()).is_empty());
    }

    #[test]
    fn undated_and_text_dated_blocks() {
        let mut rows = header_rows(&[
            CellValue::Missing,
            CellValue::text("mês seguinte"),
            CellValue::text("01/03/2025"),
        ]);
        rows.push(data_row("Acme", &[0.0; 15]));
        let records = verticalize(&Grid::new(rows), now());
        assert_eq!(records.len(), 5);
        assert!(records.iter().all(|r| r.month == 3));
    }

    #[test]
    fn textual_cells_are_coerced() {
        let mut rows = header_rows(&[CellValue::date(2025, 4, 1)]);
        rows.push(vec![
            CellValue::text("Acme"),
            CellValue::text("NÃO TEM"),
            CellValue::text("Implantação"),
            CellValue::text("7"),
            CellValue::text("sete"),
            CellValue::Missing,
        ]);
        let records = verticalize(&Grid::new(rows), now());
        let values: Vec<f64> = records.iter().map(|r| r.value).collect();
        assert_eq!(values, vec![0.0, 0.0, 7.0, 0.0, 0.0]);
        assert!(records.iter().all(|r| r.value >= 0.0 && r.value.is_finite()));
    }

    #[test]
    fn clients_keep_their_own_rows_across_gaps() {
        let mut rows = header_rows(&[CellValue::date(2025, 4, 1)]);
        rows.push(data_row("Acme", &[3.0, 0.0, 0.0, 0.0, 0.0]));
        rows.push(vec![CellValue::Missing]);
        rows.push(data_row("Globex", &[9.0, 0.0, 0.0, 0.0, 0.0]));
        let records = verticalize(&Grid::new(rows), now());
        let globex = records
            .iter()
            .find(|r| r.client == "Globex" && r.category == TicketCategory::Chamados)
            .unwrap();
        assert_eq!(globex.value, 9.0);
    }

    #[test]
    fn reads_a_calamine_range_with_excel_dates() {
        use calamine::{Data, ExcelDateTime, ExcelDateTimeType, Range};

        let excel_date = |serial| Data::DateTime(ExcelDateTime::new(serial, ExcelDateTimeType::DateTime, false));

        let mut range: Range<Data> = Range::new((0, 0), (3, 10));
        range.set_value((0, 1), excel_date(45689.0));
        range.set_value((0, 6), excel_date(47119.0));
        range.set_value((1, 1), Data::String("CHAMADOS".to_string()));
        // orphan value without a client name
        range.set_value((2, 1), Data::Float(99.0));
        range.set_value((3, 0), Data::String("Acme".to_string()));
        for (offset, v) in [12.0, 3.0, 9.0, 10.0, 2.0].iter().enumerate() {
            range.set_value((3, 1 + offset as u32), Data::Float(*v));
        }

        let records = verticalize(&Grid::from_range(&range), now());
        // 2025-02-01 is kept, 2029-01-01 is a placeholder
        assert_eq!(records.len(), 5);
        assert!(records.iter().all(|r| r.client == "Acme" && r.year == 2025 && r.month == 2));
        assert_eq!(records[0].month_label, "FEVEREIRO");
        let values: Vec<f64> = records.iter().map(|r| r.value).collect();
        assert_eq!(values, vec![12.0, 3.0, 9.0, 10.0, 2.0]);
    }

    #[test]
    fn verticalizing_twice_is_identical() {
        let mut rows = header_rows(&[CellValue::date(2025, 1, 1), CellValue::date(2025, 2, 1)]);
        rows.push(data_row("Acme", &[10.0, 2.0, 8.0, 9.0, 1.0, 20.0, 4.0, 16.0, 18.0, 2.0]));
        let grid = Grid::new(rows);
        assert_eq!(verticalize(&grid, now()), verticalize(&grid, now()));
    }
}
