// Import module - broker account statement parsers

pub mod etoro_excel;

pub use etoro_excel::{import_etoro, parse_action, EtoroExport, ImportOptions};
