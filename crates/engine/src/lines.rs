//! Document lines.
//!
//! Invoices, estimates and credit notes store their lines in one
//! `line_items` table keyed by `(document_type, document_id)`.
//!
//! A line amount is computed as:
//!
//! ```text
//! gross    = quantity * unit_price
//! discount = gross * discount%
//! tax      = (gross - discount) * tax%
//! amount   = gross - discount + tax
//! ```
//!
//! each step rounded to the cent.

use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    DocumentType, EngineError, LineInput, Money, Percent, Quantity, ResultEngine,
    util::{normalize_optional_text, parse_optional_uuid, parse_uuid},
};

/// Computed amounts of a single line.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LineAmounts {
    pub gross: Money,
    pub discount: Money,
    pub tax: Money,
    pub amount: Money,
}

/// Header totals of a document.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentTotals {
    pub subtotal: Money,
    pub discount_amount: Money,
    pub tax_amount: Money,
    pub total: Money,
}

impl DocumentTotals {
    /// Totals with one more line (returns `None` on overflow).
    fn add_line(self, line: &LineAmounts) -> Option<Self> {
        Some(Self {
            subtotal: self.subtotal.checked_add(line.gross)?,
            discount_amount: self.discount_amount.checked_add(line.discount)?,
            tax_amount: self.tax_amount.checked_add(line.tax)?,
            total: self.total.checked_add(line.amount)?,
        })
    }
}

fn too_large() -> EngineError {
    EngineError::Validation("amount too large".to_string())
}

pub fn line_amounts(line: &LineInput) -> ResultEngine<LineAmounts> {
    let gross = line.unit_price.times(line.quantity).ok_or_else(too_large)?;
    let discount = gross.percent(line.discount).ok_or_else(too_large)?;
    let net = gross.checked_sub(discount).ok_or_else(too_large)?;
    let tax = net.percent(line.tax).ok_or_else(too_large)?;
    Ok(LineAmounts {
        gross,
        discount,
        tax,
        amount: net.checked_add(tax).ok_or_else(too_large)?,
    })
}

fn validate_line(index: usize, line: &LineInput) -> ResultEngine<()> {
    let position = index + 1;
    if !line.quantity.is_positive() {
        return Err(EngineError::Validation(format!(
            "line {position}: quantity must be > 0"
        )));
    }
    if line.unit_price.is_negative() {
        return Err(EngineError::Validation(format!(
            "line {position}: unit price must be >= 0"
        )));
    }
    if line.discount < Percent::ZERO || line.discount > Percent::HUNDRED {
        return Err(EngineError::Validation(format!(
            "line {position}: discount must be between 0% and 100%"
        )));
    }
    if line.tax < Percent::ZERO {
        return Err(EngineError::Validation(format!(
            "line {position}: tax must be >= 0%"
        )));
    }
    if line.item_id.is_none() && line.description.trim().is_empty() {
        return Err(EngineError::Validation(format!(
            "line {position}: a line without item needs a description"
        )));
    }
    Ok(())
}

/// Validates the requested lines and computes per-line amounts and totals.
///
/// Runs before any transaction is opened.
pub fn compute_totals(lines: &[LineInput]) -> ResultEngine<(Vec<LineAmounts>, DocumentTotals)> {
    if lines.is_empty() {
        return Err(EngineError::Validation(
            "a document needs at least one line".to_string(),
        ));
    }

    let mut amounts = Vec::with_capacity(lines.len());
    let mut totals = DocumentTotals::default();
    for (index, line) in lines.iter().enumerate() {
        validate_line(index, line)?;
        let computed = line_amounts(line)?;
        totals = totals.add_line(&computed).ok_or_else(too_large)?;
        amounts.push(computed);
    }
    Ok((amounts, totals))
}

/// A stored document line.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Line {
    pub id: Uuid,
    pub document_id: Uuid,
    pub document_type: DocumentType,
    pub position: i32,
    pub item_id: Option<Uuid>,
    pub description: String,
    pub quantity: Quantity,
    pub unit_price: Money,
    pub tax: Percent,
    pub discount: Percent,
    pub amount: Money,
}

impl Line {
    /// Turn a stored line back into an input, as when an estimate is converted.
    pub fn to_input(&self) -> LineInput {
        LineInput {
            item_id: self.item_id,
            description: self.description.clone(),
            quantity: self.quantity,
            unit_price: self.unit_price,
            tax: self.tax,
            discount: self.discount,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "line_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub document_id: String,
    pub document_type: String,
    pub position: i32,
    pub item_id: Option<String>,
    pub description: String,
    pub quantity: i64,
    pub unit_price: i64,
    pub tax_bps: i64,
    pub discount_bps: i64,
    pub amount: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::items::Entity",
        from = "Column::ItemId",
        to = "super::items::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Items,
}

impl Related<super::items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl ActiveModel {
    /// Build the row for line number `position` of a document.
    pub(crate) fn for_document(
        document_type: DocumentType,
        document_id: Uuid,
        position: usize,
        input: &LineInput,
        amounts: &LineAmounts,
    ) -> Self {
        let description = normalize_optional_text(Some(input.description.as_str()))
            .unwrap_or_default();
        Self {
            id: ActiveValue::Set(Uuid::new_v4().to_string()),
            document_id: ActiveValue::Set(document_id.to_string()),
            document_type: ActiveValue::Set(document_type.as_str().to_string()),
            position: ActiveValue::Set(position as i32),
            item_id: ActiveValue::Set(input.item_id.map(|id| id.to_string())),
            description: ActiveValue::Set(description),
            quantity: ActiveValue::Set(input.quantity.hundredths()),
            unit_price: ActiveValue::Set(input.unit_price.minor()),
            tax_bps: ActiveValue::Set(input.tax.basis_points()),
            discount_bps: ActiveValue::Set(input.discount.basis_points()),
            amount: ActiveValue::Set(amounts.amount.minor()),
        }
    }
}

impl TryFrom<Model> for Line {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "line")?,
            document_id: parse_uuid(&model.document_id, "document")?,
            document_type: DocumentType::try_from(model.document_type.as_str())?,
            position: model.position,
            item_id: parse_optional_uuid(model.item_id.as_deref(), "item")?,
            description: model.description,
            quantity: Quantity::new(model.quantity),
            unit_price: Money::new(model.unit_price),
            tax: Percent::from_basis_points(model.tax_bps),
            discount: Percent::from_basis_points(model.discount_bps),
            amount: Money::new(model.amount),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_applies_discount_before_tax() {
        // 2 x 50.00, 10% off, 18% tax: 100.00 - 10.00 + 16.20
        let line = LineInput::free("Widget", Quantity::units(2), Money::from_major(50))
            .discount(Percent::whole(10))
            .tax(Percent::whole(18));
        let amounts = line_amounts(&line).unwrap();
        assert_eq!(amounts.gross, Money::from_major(100));
        assert_eq!(amounts.discount, Money::from_major(10));
        assert_eq!(amounts.tax, Money::new(1620));
        assert_eq!(amounts.amount, Money::new(10_620));
    }

    #[test]
    fn totals_sum_rounded_lines() {
        let lines = vec![
            LineInput::free("A", Quantity::new(150), Money::new(333)),
            LineInput::free("B", Quantity::units(1), Money::new(999)).tax(Percent::whole(18)),
        ];
        let (amounts, totals) = compute_totals(&lines).unwrap();
        assert_eq!(amounts[0].amount, Money::new(500));
        assert_eq!(amounts[1].amount, Money::new(1179));
        assert_eq!(totals.subtotal, Money::new(1499));
        assert_eq!(totals.tax_amount, Money::new(180));
        assert_eq!(totals.discount_amount, Money::ZERO);
        assert_eq!(totals.total, Money::new(1679));
    }

    #[test]
    fn rejects_empty_documents_and_bad_lines() {
        assert!(matches!(
            compute_totals(&[]),
            Err(EngineError::Validation(_))
        ));
        let zero_qty = LineInput::free("A", Quantity::ZERO, Money::new(100));
        assert_eq!(
            compute_totals(&[zero_qty]).unwrap_err(),
            EngineError::Validation("line 1: quantity must be > 0".to_string())
        );
        let no_description = LineInput::free("  ", Quantity::units(1), Money::new(100));
        assert!(compute_totals(&[no_description]).is_err());
        let over_discount = LineInput::free("A", Quantity::units(1), Money::new(100))
            .discount(Percent::whole(101));
        assert!(compute_totals(&[over_discount]).is_err());
    }

    #[test]
    fn oversized_amounts_are_rejected() {
        let too_large = EngineError::Validation("amount too large".to_string());

        let huge_line = LineInput::free("A", Quantity::units(100), Money::new(i64::MAX / 2));
        assert_eq!(compute_totals(&[huge_line]).unwrap_err(), too_large);

        let lines = vec![
            LineInput::free("A", Quantity::units(1), Money::new(i64::MAX - 10)),
            LineInput::free("B", Quantity::units(1), Money::new(100)),
        ];
        assert_eq!(compute_totals(&lines).unwrap_err(), too_large);

        let taxed = LineInput::free("A", Quantity::units(1), Money::new(i64::MAX - 10))
            .tax(Percent::whole(10));
        assert_eq!(compute_totals(&[taxed]).unwrap_err(), too_large);
    }
}
