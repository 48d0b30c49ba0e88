//! Command structs for engine operations.
//!
//! These types group the parameters of the write operations (documents,
//! catalog entries, loans), keeping call sites readable and avoiding long
//! argument lists. Audit attribution travels separately as an [`Actor`].

use chrono::NaiveDate;
use uuid::Uuid;

use crate::{ItemKind, Money, PartyType, Percent, Quantity};

const UNKNOWN_USER: &str = "Unknown User";

/// Who performed a mutation, as recorded in the history log.
///
/// A missing user is tolerated: it is stored as `NULL` / `"Unknown User"`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Actor {
    pub user_id: Option<String>,
    pub user_name: Option<String>,
}

impl Actor {
    #[must_use]
    pub fn new(user_id: impl Into<String>, user_name: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            user_name: Some(user_name.into()),
        }
    }

    #[must_use]
    pub fn unknown() -> Self {
        Self::default()
    }

    pub(crate) fn display_name(&self) -> &str {
        self.user_name
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(UNKNOWN_USER)
    }
}

/// One requested document line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LineInput {
    pub item_id: Option<Uuid>,
    pub description: String,
    pub quantity: Quantity,
    pub unit_price: Money,
    pub tax: Percent,
    pub discount: Percent,
}

impl LineInput {
    /// A line referencing a catalog item.
    #[must_use]
    pub fn item(item_id: Uuid, quantity: Quantity, unit_price: Money) -> Self {
        Self {
            item_id: Some(item_id),
            description: String::new(),
            quantity,
            unit_price,
            tax: Percent::ZERO,
            discount: Percent::ZERO,
        }
    }

    /// A free text line without stock effects.
    #[must_use]
    pub fn free(description: impl Into<String>, quantity: Quantity, unit_price: Money) -> Self {
        Self {
            item_id: None,
            description: description.into(),
            quantity,
            unit_price,
            tax: Percent::ZERO,
            discount: Percent::ZERO,
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn tax(mut self, tax: Percent) -> Self {
        self.tax = tax;
        self
    }

    #[must_use]
    pub fn discount(mut self, discount: Percent) -> Self {
        self.discount = discount;
        self
    }
}

/// Body of a sale or purchase invoice, used for both create and update.
#[derive(Clone, Debug)]
pub struct InvoiceCmd {
    pub party_id: Uuid,
    pub date: NaiveDate,
    pub notes: Option<String>,
    pub lines: Vec<LineInput>,
}

impl InvoiceCmd {
    #[must_use]
    pub fn new(party_id: Uuid, date: NaiveDate) -> Self {
        Self {
            party_id,
            date,
            notes: None,
            lines: Vec::new(),
        }
    }

    #[must_use]
    pub fn line(mut self, line: LineInput) -> Self {
        self.lines.push(line);
        self
    }

    #[must_use]
    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// Body of an estimate.
#[derive(Clone, Debug)]
pub struct EstimateCmd {
    pub party_id: Uuid,
    pub date: NaiveDate,
    pub valid_until: Option<NaiveDate>,
    pub notes: Option<String>,
    pub lines: Vec<LineInput>,
}

impl EstimateCmd {
    #[must_use]
    pub fn new(party_id: Uuid, date: NaiveDate) -> Self {
        Self {
            party_id,
            date,
            valid_until: None,
            notes: None,
            lines: Vec::new(),
        }
    }

    #[must_use]
    pub fn line(mut self, line: LineInput) -> Self {
        self.lines.push(line);
        self
    }

    #[must_use]
    pub fn valid_until(mut self, date: NaiveDate) -> Self {
        self.valid_until = Some(date);
        self
    }
}

/// Body of a credit note (sales return).
#[derive(Clone, Debug)]
pub struct CreditNoteCmd {
    pub party_id: Uuid,
    pub invoice_id: Option<Uuid>,
    pub date: NaiveDate,
    pub reason: Option<String>,
    pub lines: Vec<LineInput>,
}

impl CreditNoteCmd {
    #[must_use]
    pub fn new(party_id: Uuid, date: NaiveDate) -> Self {
        Self {
            party_id,
            invoice_id: None,
            date,
            reason: None,
            lines: Vec::new(),
        }
    }

    #[must_use]
    pub fn line(mut self, line: LineInput) -> Self {
        self.lines.push(line);
        self
    }

    #[must_use]
    pub fn invoice_id(mut self, invoice_id: Uuid) -> Self {
        self.invoice_id = Some(invoice_id);
        self
    }

    #[must_use]
    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

/// Body of a payment-in or payment-out.
#[derive(Clone, Debug)]
pub struct PaymentCmd {
    pub party_id: Uuid,
    pub invoice_id: Option<Uuid>,
    pub amount: Money,
    pub date: NaiveDate,
    pub method: Option<String>,
    pub note: Option<String>,
}

impl PaymentCmd {
    #[must_use]
    pub fn new(party_id: Uuid, amount: Money, date: NaiveDate) -> Self {
        Self {
            party_id,
            invoice_id: None,
            amount,
            date,
            method: None,
            note: None,
        }
    }

    #[must_use]
    pub fn invoice_id(mut self, invoice_id: Uuid) -> Self {
        self.invoice_id = Some(invoice_id);
        self
    }

    #[must_use]
    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    #[must_use]
    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// Create a party.
#[derive(Clone, Debug)]
pub struct PartyCmd {
    pub name: String,
    pub party_type: PartyType,
    pub opening_balance: Money,
}

impl PartyCmd {
    #[must_use]
    pub fn new(name: impl Into<String>, party_type: PartyType) -> Self {
        Self {
            name: name.into(),
            party_type,
            opening_balance: Money::ZERO,
        }
    }

    #[must_use]
    pub fn opening_balance(mut self, balance: Money) -> Self {
        self.opening_balance = balance;
        self
    }
}

/// Create a catalog item.
#[derive(Clone, Debug)]
pub struct ItemCmd {
    pub name: String,
    pub sku: Option<String>,
    pub kind: ItemKind,
    pub sale_price: Money,
    pub purchase_price: Money,
    pub opening_stock: Quantity,
    pub low_stock_alert: Quantity,
    pub expiry_date: Option<NaiveDate>,
}

impl ItemCmd {
    #[must_use]
    pub fn product(name: impl Into<String>, sale_price: Money, purchase_price: Money) -> Self {
        Self {
            name: name.into(),
            sku: None,
            kind: ItemKind::Product,
            sale_price,
            purchase_price,
            opening_stock: Quantity::ZERO,
            low_stock_alert: Quantity::ZERO,
            expiry_date: None,
        }
    }

    #[must_use]
    pub fn service(name: impl Into<String>, sale_price: Money) -> Self {
        Self {
            kind: ItemKind::Service,
            ..Self::product(name, sale_price, Money::ZERO)
        }
    }

    #[must_use]
    pub fn sku(mut self, sku: impl Into<String>) -> Self {
        self.sku = Some(sku.into());
        self
    }

    #[must_use]
    pub fn opening_stock(mut self, quantity: Quantity) -> Self {
        self.opening_stock = quantity;
        self
    }

    #[must_use]
    pub fn low_stock_alert(mut self, quantity: Quantity) -> Self {
        self.low_stock_alert = quantity;
        self
    }

    #[must_use]
    pub fn expiry_date(mut self, date: NaiveDate) -> Self {
        self.expiry_date = Some(date);
        self
    }
}

/// Manual stock correction of either sign.
#[derive(Clone, Debug)]
pub struct AdjustStockCmd {
    pub item_id: Uuid,
    pub delta: Quantity,
    pub reason: String,
}

impl AdjustStockCmd {
    #[must_use]
    pub fn new(item_id: Uuid, delta: Quantity, reason: impl Into<String>) -> Self {
        Self {
            item_id,
            delta,
            reason: reason.into(),
        }
    }
}

/// Create a loan.
#[derive(Clone, Debug)]
pub struct LoanCmd {
    pub lender: String,
    pub principal: Money,
    pub interest_rate: Percent,
    pub emi_count: i32,
    pub start_date: NaiveDate,
}

impl LoanCmd {
    #[must_use]
    pub fn new(
        lender: impl Into<String>,
        principal: Money,
        emi_count: i32,
        start_date: NaiveDate,
    ) -> Self {
        Self {
            lender: lender.into(),
            principal,
            interest_rate: Percent::ZERO,
            emi_count,
            start_date,
        }
    }

    #[must_use]
    pub fn interest_rate(mut self, rate: Percent) -> Self {
        self.interest_rate = rate;
        self
    }
}

/// Record (or rewrite) one loan installment.
///
/// Only `principal` reduces the outstanding amount; `interest` is recorded
/// as part of the amount paid.
#[derive(Clone, Debug)]
pub struct LoanPaymentCmd {
    pub date: NaiveDate,
    pub principal: Money,
    pub interest: Money,
}

impl LoanPaymentCmd {
    #[must_use]
    pub fn new(date: NaiveDate, principal: Money, interest: Money) -> Self {
        Self {
            date,
            principal,
            interest,
        }
    }
}
