//! Ledger consistency engine for an invoicing and accounting store.
//!
//! Every mutation of a financial document runs inside one database
//! transaction that keeps item stock, party balances, invoice payment
//! status and the document history consistent with each other. Edits are
//! always a full reversal of the stored document followed by a full
//! application of the new one.

pub use commands::{
    Actor, AdjustStockCmd, CreditNoteCmd, EstimateCmd, InvoiceCmd, ItemCmd, LineInput, LoanCmd,
    LoanPaymentCmd, PartyCmd, PaymentCmd,
};
pub use credit_notes::CreditNote;
pub use document::DocumentType;
pub use error::EngineError;
pub use estimates::{Estimate, EstimateStatus};
pub use history::{HistoryAction, HistoryEntry};
pub use invoices::{Invoice, InvoiceKind};
pub use item_history::{ItemHistoryEntry, StockSource};
pub use items::{Item, ItemKind};
pub use lines::{DocumentTotals, Line, LineAmounts, compute_totals, line_amounts};
pub use loan_payments::LoanPayment;
pub use loans::{Loan, LoanStatus};
pub use money::{Money, Percent, Quantity};
pub use ops::{Engine, EngineBuilder, ItemAudit, PartyAudit};
pub use parties::{Party, PartyType};
pub use payments::{Payment, PaymentKind};
pub use sequences::{SequenceCounter, format_number};
pub use snapshot::{
    CreditNoteSnapshot, EstimateSnapshot, InvoiceSnapshot, LineSnapshot, LoanPaymentSnapshot,
    LoanSnapshot, PaymentSnapshot, SNAPSHOT_VERSION, Snapshot, SnapshotBody,
};
pub use status::InvoiceStatus;

mod commands;
mod credit_notes;
mod document;
mod error;
mod estimates;
mod history;
mod invoices;
mod item_history;
mod items;
mod lines;
mod loan_payments;
mod loans;
mod money;
mod ops;
mod parties;
mod payments;
mod sequences;
mod snapshot;
mod status;
mod util;

pub type ResultEngine<T> = Result<T, EngineError>;
