pub mod clients;
pub mod columns;
pub mod processor;
pub mod types;
pub mod utils;
pub mod verticalizer;

pub use processor::{ExcelProcessor, SheetLayout, WorkbookSource, XlsxWorkbook};
pub use types::{CellValue, Grid};
