//! Invoice payment status.
//!
//! The status is never set directly: it is derived from `amount_paid` and
//! `total` every time either of them changes. The SQL `CASE` expressions in
//! `ops::status` evaluate the exact same rule inside the `UPDATE` that moves
//! the paid amount, so the two can never disagree.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{EngineError, Money};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Unpaid,
    Partial,
    Paid,
}

impl InvoiceStatus {
    /// Derives the status of an invoice from what was paid against its total.
    ///
    /// ```text
    /// total - amount_paid <= 0  -> paid
    /// amount_paid > 0           -> partial
    /// otherwise                 -> unpaid
    /// ```
    #[must_use]
    pub fn derive(amount_paid: Money, total: Money) -> Self {
        if (total - amount_paid).minor() <= 0 {
            Self::Paid
        } else if amount_paid.is_positive() {
            Self::Partial
        } else {
            Self::Unpaid
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unpaid => "unpaid",
            Self::Partial => "partial",
            Self::Paid => "paid",
        }
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for InvoiceStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "unpaid" => Ok(Self::Unpaid),
            "partial" => Ok(Self::Partial),
            "paid" => Ok(Self::Paid),
            other => Err(EngineError::Validation(format!(
                "invalid invoice status: {other}"
            ))),
        }
    }
}
