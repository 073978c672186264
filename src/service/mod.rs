pub mod archive;
pub mod export;
pub mod invoice;
pub mod money;
pub mod paid_audit;
pub mod sequence;

pub use archive::{archive_old_invoices, ArchiveOutcome};
pub use export::{CsvExporter, ExportCursor, PAGE_SIZE};
pub use invoice::InvoiceService;
pub use sequence::{InMemorySequences, SequenceAllocator};
