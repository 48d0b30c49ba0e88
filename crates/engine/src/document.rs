//! Document type keys.
//!
//! The same key identifies a document family in the history log, owns the
//! lines in `line_items` and names the sequence counter that numbers it.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::EngineError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    SaleInvoice,
    PurchaseInvoice,
    Estimate,
    CreditNote,
    PaymentIn,
    PaymentOut,
    Loan,
    LoanPayment,
}

impl DocumentType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SaleInvoice => "sale_invoice",
            Self::PurchaseInvoice => "purchase_invoice",
            Self::Estimate => "estimate",
            Self::CreditNote => "credit_note",
            Self::PaymentIn => "payment_in",
            Self::PaymentOut => "payment_out",
            Self::Loan => "loan",
            Self::LoanPayment => "loan_payment",
        }
    }

    /// Human label used in history descriptions.
    pub fn label(self) -> &'static str {
        match self {
            Self::SaleInvoice => "Sale invoice",
            Self::PurchaseInvoice => "Purchase invoice",
            Self::Estimate => "Estimate",
            Self::CreditNote => "Credit note",
            Self::PaymentIn => "Payment in",
            Self::PaymentOut => "Payment out",
            Self::Loan => "Loan",
            Self::LoanPayment => "Loan payment",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for DocumentType {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "sale_invoice" => Ok(Self::SaleInvoice),
            "purchase_invoice" => Ok(Self::PurchaseInvoice),
            "estimate" => Ok(Self::Estimate),
            "credit_note" => Ok(Self::CreditNote),
            "payment_in" => Ok(Self::PaymentIn),
            "payment_out" => Ok(Self::PaymentOut),
            "loan" => Ok(Self::Loan),
            "loan_payment" => Ok(Self::LoanPayment),
            other => Err(EngineError::Validation(format!(
                "invalid document type: {other}"
            ))),
        }
    }
}
