//! Output projections of the records selected for delivery
//!
//! Three independent shapes are produced from the same slice:
//! - Encoder entries for the binary artifact
//! - A structured document keyed by timestamp
//! - Tabular ledger rows
//!
//! All three borrow the records and never reorder them; none does I/O.

mod document;
mod encoder;
mod table;

pub use document::{DocumentEntry, StructuredDocument, WEIGHT_UNIT};
pub use encoder::{encoder_entries, EncoderEntry, WeightScaleEntry};
pub use table::{table_rows, LedgerRow};

use crate::models::EnrichedRecord;

/// Every rendering of one run's deliverable records
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Renderings {
    pub encoder_entries: Vec<EncoderEntry>,
    pub document: StructuredDocument,
    pub rows: Vec<LedgerRow>,
}

/// Render all three shapes
pub fn render_all(records: &[EnrichedRecord]) -> Renderings {
    Renderings {
        encoder_entries: encoder_entries(records),
        document: StructuredDocument::from_records(records),
        rows: table_rows(records),
    }
}
