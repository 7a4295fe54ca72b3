//! FILENAME: core/grid-engine/src/lib.rs
//! Editable grid core.
//!
//! Holds a row set where some rows are unsaved, keeps per-cell edits in a
//! draft overlay, projects the rows onto a visible column subset, and keeps a
//! totals row and grouped-count series in step with the rows. No I/O happens
//! here; loading and persistence belong to the host.
//!
//! Layers:
//! - `value` / `row`: Field values, row identity and records
//! - `mapping`: Configured fields and their report kinds
//! - `row_store` / `draft`: Canonical rows and the pending edits on top of them
//! - `columns`: Full column set, visible subset, display rows
//! - `aggregate`: Totals row and chart series (WHAT we summarize)
//! - `export`: Save payload (WHAT persistence receives)
//! - `session`: All of the above behind one handle

pub mod value;
pub mod row;
pub mod mapping;
pub mod row_store;
pub mod draft;
pub mod columns;
pub mod aggregate;
pub mod export;
pub mod session;

pub use value::{format_number, FieldValue};
pub use row::{FieldMap, Row, RowId, TEMP_ID_PREFIX, TOTALS_ROW_KEY};
pub use mapping::{ChartStyle, FieldMapping, ReportKind};
pub use row_store::RowStore;
pub use draft::{DraftEntry, DraftOverlay, EditCommand};
pub use columns::*;
pub use aggregate::*;
pub use export::*;
pub use session::{DisplayTable, DraftRetention, GridSession, SessionOptions};
