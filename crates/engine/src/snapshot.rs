//! Versioned history snapshots.
//!
//! `old_values` / `new_values` of a history entry hold one [`Snapshot`]
//! serialized as a tagged JSON object:
//!
//! ```json
//! {"version":1,"document":"invoice","number":"INV-00001","total":16000,...}
//! ```
//!
//! Decoding ignores fields it does not know, so entries written by a newer
//! engine stay readable. Collections default to empty when absent.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    CreditNote, Estimate, EstimateStatus, Invoice, InvoiceKind, InvoiceStatus, Line, Loan,
    LoanPayment, LoanStatus, Money, Payment, PaymentKind, Quantity, ResultEngine,
};

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    #[serde(flatten)]
    pub body: SnapshotBody,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "document", rename_all = "snake_case")]
pub enum SnapshotBody {
    Invoice(InvoiceSnapshot),
    Payment(PaymentSnapshot),
    CreditNote(CreditNoteSnapshot),
    Estimate(EstimateSnapshot),
    Loan(LoanSnapshot),
    LoanPayment(LoanPaymentSnapshot),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineSnapshot {
    pub item_id: Option<Uuid>,
    pub description: String,
    pub quantity: Quantity,
    pub unit_price: Money,
    pub amount: Money,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceSnapshot {
    pub kind: InvoiceKind,
    pub number: String,
    pub party_id: Uuid,
    pub date: NaiveDate,
    pub total: Money,
    pub amount_paid: Money,
    pub amount_due: Money,
    pub status: InvoiceStatus,
    #[serde(default)]
    pub lines: Vec<LineSnapshot>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSnapshot {
    pub kind: PaymentKind,
    pub number: String,
    pub party_id: Uuid,
    pub invoice_id: Option<Uuid>,
    pub amount: Money,
    pub date: NaiveDate,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditNoteSnapshot {
    pub number: String,
    pub party_id: Uuid,
    pub invoice_id: Option<Uuid>,
    pub total: Money,
    #[serde(default)]
    pub lines: Vec<LineSnapshot>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EstimateSnapshot {
    pub number: String,
    pub party_id: Uuid,
    pub status: EstimateStatus,
    pub total: Money,
    pub converted_to_invoice_id: Option<Uuid>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanSnapshot {
    pub lender: String,
    pub principal: Money,
    pub outstanding_amount: Money,
    pub paid_emis: i32,
    pub status: LoanStatus,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanPaymentSnapshot {
    pub loan_id: Uuid,
    pub amount: Money,
    pub principal: Money,
    pub interest: Money,
}

impl Snapshot {
    pub fn new(body: SnapshotBody) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            body,
        }
    }

    pub fn encode(&self) -> ResultEngine<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn decode(raw: &str) -> ResultEngine<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}

fn lines_snapshot(lines: &[Line]) -> Vec<LineSnapshot> {
    lines
        .iter()
        .map(|line| LineSnapshot {
            item_id: line.item_id,
            description: line.description.clone(),
            quantity: line.quantity,
            unit_price: line.unit_price,
            amount: line.amount,
        })
        .collect()
}

impl From<&Invoice> for Snapshot {
    fn from(invoice: &Invoice) -> Self {
        Self::new(SnapshotBody::Invoice(InvoiceSnapshot {
            kind: invoice.kind,
            number: invoice.number.clone(),
            party_id: invoice.party_id,
            date: invoice.date,
            total: invoice.total,
            amount_paid: invoice.amount_paid,
            amount_due: invoice.amount_due,
            status: invoice.status,
            lines: lines_snapshot(&invoice.lines),
        }))
    }
}

impl From<&Payment> for Snapshot {
    fn from(payment: &Payment) -> Self {
        Self::new(SnapshotBody::Payment(PaymentSnapshot {
            kind: payment.kind,
            number: payment.number.clone(),
            party_id: payment.party_id,
            invoice_id: payment.invoice_id,
            amount: payment.amount,
            date: payment.date,
        }))
    }
}

impl From<&CreditNote> for Snapshot {
    fn from(note: &CreditNote) -> Self {
        Self::new(SnapshotBody::CreditNote(CreditNoteSnapshot {
            number: note.number.clone(),
            party_id: note.party_id,
            invoice_id: note.invoice_id,
            total: note.total,
            lines: lines_snapshot(&note.lines),
        }))
    }
}

impl From<&Estimate> for Snapshot {
    fn from(estimate: &Estimate) -> Self {
        Self::new(SnapshotBody::Estimate(EstimateSnapshot {
            number: estimate.number.clone(),
            party_id: estimate.party_id,
            status: estimate.status,
            total: estimate.total,
            converted_to_invoice_id: estimate.converted_to_invoice_id,
        }))
    }
}

impl From<&Loan> for Snapshot {
    fn from(loan: &Loan) -> Self {
        Self::new(SnapshotBody::Loan(LoanSnapshot {
            lender: loan.lender.clone(),
            principal: loan.principal,
            outstanding_amount: loan.outstanding_amount,
            paid_emis: loan.paid_emis,
            status: loan.status,
        }))
    }
}

impl From<&LoanPayment> for Snapshot {
    fn from(payment: &LoanPayment) -> Self {
        Self::new(SnapshotBody::LoanPayment(LoanPaymentSnapshot {
            loan_id: payment.loan_id,
            amount: payment.amount,
            principal: payment.principal,
            interest: payment.interest,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payment_snapshot() -> Snapshot {
        Snapshot::new(SnapshotBody::Payment(PaymentSnapshot {
            kind: PaymentKind::In,
            number: "PIN-00001".to_string(),
            party_id: Uuid::nil(),
            invoice_id: None,
            amount: Money::new(16_000),
            date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
        }))
    }

    #[test]
    fn encodes_version_and_document_tag() {
        let raw = payment_snapshot().encode().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["version"], 1);
        assert_eq!(value["document"], "payment");
        assert_eq!(value["kind"], "in");
        assert_eq!(value["amount"], 16_000);
    }

    #[test]
    fn decode_ignores_unknown_fields() {
        let raw = r#"{
            "version": 2,
            "document": "loan_payment",
            "loan_id": "00000000-0000-0000-0000-000000000000",
            "amount": 1100,
            "principal": 1000,
            "interest": 100,
            "penalty": 25
        }"#;
        let snapshot = Snapshot::decode(raw).unwrap();
        assert_eq!(snapshot.version, 2);
        let SnapshotBody::LoanPayment(body) = snapshot.body else {
            panic!("expected a loan payment snapshot");
        };
        assert_eq!(body.principal, Money::new(1000));
    }

    #[test]
    fn missing_lines_default_to_empty() {
        let raw = r#"{
            "version": 1,
            "document": "credit_note",
            "number": "CN-00001",
            "party_id": "00000000-0000-0000-0000-000000000000",
            "invoice_id": null,
            "total": 500
        }"#;
        let SnapshotBody::CreditNote(body) = Snapshot::decode(raw).unwrap().body else {
            panic!("expected a credit note snapshot");
        };
        assert!(body.lines.is_empty());
    }

    #[test]
    fn unknown_document_is_an_error() {
        let err = Snapshot::decode(r#"{"version":1,"document":"cheque"}"#).unwrap_err();
        assert!(matches!(err, crate::EngineError::Snapshot(_)));
    }
}
