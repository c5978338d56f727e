//! Search and cross-referencing over the QC registers (sample approvals, drawing registries and
//! the reliability test log).
//!
//! [`SearchEngine`] resolves a register by source id from memory, then the persistent
//! [`ByteStore`](qcsheet_store::ByteStore), then the network, parsing each workbook once per
//! process. [`cross_reference`] joins the hits of the three register kinds by part number and
//! decides whether a part is due for testing; [`lookup_part`] runs the whole flow for both
//! product lines.

mod cache;
mod config;
mod engine;
mod fetch;
mod join;
mod lookup;
mod parse;
pub mod registry;
pub mod serial_date;
mod table;

pub use cache::{TableCache, TableCacheStats};
pub use config::{ConfigError, EngineConfig, StoreBackend};
pub use engine::{EngineError, RefreshSummary, Result, RetrievalError, SearchEngine};
pub use fetch::{HttpFetcher, SourceFetcher};
pub use join::{cross_reference, part_numbers_match, MatchedRecord, TestRequirement};
pub use lookup::{lookup_part, LookupError, PartLookupReport, ProductLine, RegistryCatalog};
pub use parse::{ParseError, TableParser, XlsxParser};
pub use table::{CellValue, ParsedTable, SearchRow, Sheet, SheetRange};

pub use qcsheet_net::FetchError;
