pub mod audit;
pub mod export;
pub mod invoice;
pub mod item;
pub mod sequence;

pub use audit::{AuditLogFilter, AuditLogRecord, Paginated, PaidTransition};
pub use export::{ExportFilter, ExportInvoiceRow, ExportItemRow, EXPORT_HEADERS};
pub use invoice::{
    CustomFieldEntry, Customer, Invoice, InvoiceRow, InvoiceStatus, NewInvoice, NewTax,
    PaidStatus, TaxRow,
};
pub use item::{CustomFieldValueRow, InvoiceItem, InvoiceItemRow, NewInvoiceItem};
pub use sequence::{SequencePair, SequenceScope};
