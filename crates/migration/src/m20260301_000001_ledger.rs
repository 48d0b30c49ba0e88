//! Ledger schema.
//!
//! - `parties`: customers and suppliers sharing one signed running balance
//! - `items`: catalog entries, products carry a stock level
//! - `sequence_counters`: per document type number generator
//! - `invoices`: sale and purchase invoice headers
//! - `estimates`, `credit_notes`: quotation and sales return headers
//! - `line_items`: lines of invoices, estimates and credit notes
//! - `payments`: payment-in / payment-out, optionally linked to an invoice
//! - `loans`, `loan_payments`: borrowed principal and its EMIs
//! - `invoice_history`: append-only audit trail of document mutations
//! - `item_history`: append-only audit trail of stock changes
//!
//! Money and quantities are stored as signed integers with 2 implied decimals.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// ─────────────────────────────────────────────────────────────────────────────
// Table identifiers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Iden)]
enum Parties {
    Table,
    Id,
    Name,
    PartyType,
    OpeningBalance,
    CurrentBalance,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Items {
    Table,
    Id,
    Name,
    Sku,
    Kind,
    SalePrice,
    PurchasePrice,
    OpeningStock,
    StockQuantity,
    LowStockAlert,
    IsActive,
    ExpiryDate,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum SequenceCounters {
    Table,
    Id,
    Prefix,
    NextNumber,
    Padding,
}

#[derive(Iden)]
enum Invoices {
    Table,
    Id,
    Kind,
    Number,
    PartyId,
    Date,
    Status,
    Subtotal,
    TaxAmount,
    DiscountAmount,
    Total,
    AmountPaid,
    AmountDue,
    EstimateId,
    Notes,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Estimates {
    Table,
    Id,
    Number,
    PartyId,
    Date,
    ValidUntil,
    Status,
    Subtotal,
    TaxAmount,
    DiscountAmount,
    Total,
    ConvertedToInvoiceId,
    Notes,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum CreditNotes {
    Table,
    Id,
    Number,
    PartyId,
    InvoiceId,
    Date,
    Subtotal,
    TaxAmount,
    DiscountAmount,
    Total,
    Reason,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum LineItems {
    Table,
    Id,
    DocumentId,
    DocumentType,
    Position,
    ItemId,
    Description,
    Quantity,
    UnitPrice,
    TaxBps,
    DiscountBps,
    Amount,
}

#[derive(Iden)]
enum Payments {
    Table,
    Id,
    Kind,
    Number,
    PartyId,
    InvoiceId,
    Amount,
    Date,
    Method,
    Note,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Loans {
    Table,
    Id,
    Lender,
    Principal,
    InterestBps,
    EmiCount,
    PaidEmis,
    OutstandingAmount,
    Status,
    StartDate,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum LoanPayments {
    Table,
    Id,
    LoanId,
    Date,
    Amount,
    Principal,
    Interest,
    CreatedAt,
}

#[derive(Iden)]
enum InvoiceHistory {
    Table,
    Id,
    DocumentId,
    DocumentType,
    Action,
    Description,
    OldValues,
    NewValues,
    UserId,
    UserName,
    CreatedAt,
}

#[derive(Iden)]
enum ItemHistory {
    Table,
    Id,
    ItemId,
    Action,
    Delta,
    OldQuantity,
    NewQuantity,
    Source,
    ReferenceId,
    Description,
    UserId,
    CreatedAt,
}

// ─────────────────────────────────────────────────────────────────────────────
// Migration implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ───────────────────────────────────────────────────────────────────
        // 1. Parties
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Parties::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Parties::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Parties::Name).string().not_null())
                    .col(ColumnDef::new(Parties::PartyType).string().not_null())
                    .col(
                        ColumnDef::new(Parties::OpeningBalance)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Parties::CurrentBalance)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Parties::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Parties::UpdatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 2. Items
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Items::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Items::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Items::Name).string().not_null())
                    .col(ColumnDef::new(Items::Sku).string())
                    .col(
                        ColumnDef::new(Items::Kind)
                            .string()
                            .not_null()
                            .default("product"),
                    )
                    .col(ColumnDef::new(Items::SalePrice).big_integer().not_null())
                    .col(ColumnDef::new(Items::PurchasePrice).big_integer().not_null())
                    .col(
                        ColumnDef::new(Items::OpeningStock)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Items::StockQuantity)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Items::LowStockAlert)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Items::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(Items::ExpiryDate).date())
                    .col(ColumnDef::new(Items::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Items::UpdatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-items-sku-unique")
                    .table(Items::Table)
                    .col(Items::Sku)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 3. Sequence counters
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(SequenceCounters::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SequenceCounters::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SequenceCounters::Prefix).string().not_null())
                    .col(
                        ColumnDef::new(SequenceCounters::NextNumber)
                            .big_integer()
                            .not_null()
                            .default(1),
                    )
                    .col(
                        ColumnDef::new(SequenceCounters::Padding)
                            .integer()
                            .not_null()
                            .default(5),
                    )
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 4. Invoices
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Invoices::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Invoices::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Invoices::Kind).string().not_null())
                    .col(ColumnDef::new(Invoices::Number).string().not_null())
                    .col(ColumnDef::new(Invoices::PartyId).string().not_null())
                    .col(ColumnDef::new(Invoices::Date).date().not_null())
                    .col(ColumnDef::new(Invoices::Status).string().not_null())
                    .col(ColumnDef::new(Invoices::Subtotal).big_integer().not_null())
                    .col(ColumnDef::new(Invoices::TaxAmount).big_integer().not_null())
                    .col(
                        ColumnDef::new(Invoices::DiscountAmount)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Invoices::Total).big_integer().not_null())
                    .col(
                        ColumnDef::new(Invoices::AmountPaid)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Invoices::AmountDue).big_integer().not_null())
                    .col(ColumnDef::new(Invoices::EstimateId).string())
                    .col(ColumnDef::new(Invoices::Notes).string())
                    .col(ColumnDef::new(Invoices::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Invoices::UpdatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-invoices-party_id")
                            .from(Invoices::Table, Invoices::PartyId)
                            .to(Parties::Table, Parties::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-invoices-kind-number-unique")
                    .table(Invoices::Table)
                    .col(Invoices::Kind)
                    .col(Invoices::Number)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-invoices-party_id")
                    .table(Invoices::Table)
                    .col(Invoices::PartyId)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 5. Estimates
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Estimates::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Estimates::Id).string().not_null().primary_key())
                    .col(
                        ColumnDef::new(Estimates::Number)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Estimates::PartyId).string().not_null())
                    .col(ColumnDef::new(Estimates::Date).date().not_null())
                    .col(ColumnDef::new(Estimates::ValidUntil).date())
                    .col(ColumnDef::new(Estimates::Status).string().not_null())
                    .col(ColumnDef::new(Estimates::Subtotal).big_integer().not_null())
                    .col(ColumnDef::new(Estimates::TaxAmount).big_integer().not_null())
                    .col(
                        ColumnDef::new(Estimates::DiscountAmount)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Estimates::Total).big_integer().not_null())
                    .col(ColumnDef::new(Estimates::ConvertedToInvoiceId).string())
                    .col(ColumnDef::new(Estimates::Notes).string())
                    .col(ColumnDef::new(Estimates::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Estimates::UpdatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-estimates-party_id")
                            .from(Estimates::Table, Estimates::PartyId)
                            .to(Parties::Table, Parties::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 6. Credit notes
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(CreditNotes::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CreditNotes::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(CreditNotes::Number)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(CreditNotes::PartyId).string().not_null())
                    .col(ColumnDef::new(CreditNotes::InvoiceId).string())
                    .col(ColumnDef::new(CreditNotes::Date).date().not_null())
                    .col(ColumnDef::new(CreditNotes::Subtotal).big_integer().not_null())
                    .col(ColumnDef::new(CreditNotes::TaxAmount).big_integer().not_null())
                    .col(
                        ColumnDef::new(CreditNotes::DiscountAmount)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(CreditNotes::Total).big_integer().not_null())
                    .col(ColumnDef::new(CreditNotes::Reason).string())
                    .col(ColumnDef::new(CreditNotes::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(CreditNotes::UpdatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-credit_notes-party_id")
                            .from(CreditNotes::Table, CreditNotes::PartyId)
                            .to(Parties::Table, Parties::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 7. Line items (invoices, estimates, credit notes)
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(LineItems::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(LineItems::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(LineItems::DocumentId).string().not_null())
                    .col(ColumnDef::new(LineItems::DocumentType).string().not_null())
                    .col(ColumnDef::new(LineItems::Position).integer().not_null())
                    .col(ColumnDef::new(LineItems::ItemId).string())
                    .col(ColumnDef::new(LineItems::Description).string().not_null())
                    .col(ColumnDef::new(LineItems::Quantity).big_integer().not_null())
                    .col(ColumnDef::new(LineItems::UnitPrice).big_integer().not_null())
                    .col(
                        ColumnDef::new(LineItems::TaxBps)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(LineItems::DiscountBps)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(LineItems::Amount).big_integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-line_items-item_id")
                            .from(LineItems::Table, LineItems::ItemId)
                            .to(Items::Table, Items::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-line_items-document")
                    .table(LineItems::Table)
                    .col(LineItems::DocumentType)
                    .col(LineItems::DocumentId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-line_items-item_id")
                    .table(LineItems::Table)
                    .col(LineItems::ItemId)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 8. Payments
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Payments::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Payments::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Payments::Kind).string().not_null())
                    .col(ColumnDef::new(Payments::Number).string().not_null())
                    .col(ColumnDef::new(Payments::PartyId).string().not_null())
                    .col(ColumnDef::new(Payments::InvoiceId).string())
                    .col(ColumnDef::new(Payments::Amount).big_integer().not_null())
                    .col(ColumnDef::new(Payments::Date).date().not_null())
                    .col(ColumnDef::new(Payments::Method).string())
                    .col(ColumnDef::new(Payments::Note).string())
                    .col(ColumnDef::new(Payments::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Payments::UpdatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-payments-party_id")
                            .from(Payments::Table, Payments::PartyId)
                            .to(Parties::Table, Parties::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-payments-invoice_id")
                            .from(Payments::Table, Payments::InvoiceId)
                            .to(Invoices::Table, Invoices::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-payments-invoice_id")
                    .table(Payments::Table)
                    .col(Payments::InvoiceId)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 9. Loans
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Loans::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Loans::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Loans::Lender).string().not_null())
                    .col(ColumnDef::new(Loans::Principal).big_integer().not_null())
                    .col(
                        ColumnDef::new(Loans::InterestBps)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Loans::EmiCount).integer().not_null())
                    .col(
                        ColumnDef::new(Loans::PaidEmis)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Loans::OutstandingAmount)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Loans::Status).string().not_null())
                    .col(ColumnDef::new(Loans::StartDate).date().not_null())
                    .col(ColumnDef::new(Loans::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Loans::UpdatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(LoanPayments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(LoanPayments::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(LoanPayments::LoanId).string().not_null())
                    .col(ColumnDef::new(LoanPayments::Date).date().not_null())
                    .col(ColumnDef::new(LoanPayments::Amount).big_integer().not_null())
                    .col(ColumnDef::new(LoanPayments::Principal).big_integer().not_null())
                    .col(ColumnDef::new(LoanPayments::Interest).big_integer().not_null())
                    .col(ColumnDef::new(LoanPayments::CreatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-loan_payments-loan_id")
                            .from(LoanPayments::Table, LoanPayments::LoanId)
                            .to(Loans::Table, Loans::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 10. Audit trails
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(InvoiceHistory::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(InvoiceHistory::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(InvoiceHistory::DocumentId).string().not_null())
                    .col(
                        ColumnDef::new(InvoiceHistory::DocumentType)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(InvoiceHistory::Action).string().not_null())
                    .col(
                        ColumnDef::new(InvoiceHistory::Description)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(InvoiceHistory::OldValues).text())
                    .col(ColumnDef::new(InvoiceHistory::NewValues).text())
                    .col(ColumnDef::new(InvoiceHistory::UserId).string())
                    .col(ColumnDef::new(InvoiceHistory::UserName).string().not_null())
                    .col(
                        ColumnDef::new(InvoiceHistory::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-invoice_history-document_id")
                    .table(InvoiceHistory::Table)
                    .col(InvoiceHistory::DocumentId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ItemHistory::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(ItemHistory::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(ItemHistory::ItemId).string().not_null())
                    .col(ColumnDef::new(ItemHistory::Action).string().not_null())
                    .col(ColumnDef::new(ItemHistory::Delta).big_integer().not_null())
                    .col(ColumnDef::new(ItemHistory::OldQuantity).big_integer().not_null())
                    .col(ColumnDef::new(ItemHistory::NewQuantity).big_integer().not_null())
                    .col(ColumnDef::new(ItemHistory::Source).string().not_null())
                    .col(ColumnDef::new(ItemHistory::ReferenceId).string())
                    .col(ColumnDef::new(ItemHistory::Description).string().not_null())
                    .col(ColumnDef::new(ItemHistory::UserId).string())
                    .col(ColumnDef::new(ItemHistory::CreatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-item_history-item_id")
                            .from(ItemHistory::Table, ItemHistory::ItemId)
                            .to(Items::Table, Items::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-item_history-item_id")
                    .table(ItemHistory::Table)
                    .col(ItemHistory::ItemId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Drop in reverse order of creation (respecting FK dependencies)
        manager
            .drop_table(Table::drop().table(ItemHistory::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(InvoiceHistory::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(LoanPayments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Loans::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Payments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(LineItems::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(CreditNotes::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Estimates::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Invoices::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SequenceCounters::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Items::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Parties::Table).to_owned())
            .await?;
        Ok(())
    }
}
