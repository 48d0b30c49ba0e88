mod common;

use engine::{EngineError, InvoiceCmd, InvoiceStatus, Money, PaymentCmd, PaymentKind};
use uuid::Uuid;

use common::{
    actor, customer, day, engine_with_db, money, product, purchase_line, sale_line, supplier,
};

#[tokio::test]
async fn partial_payments_walk_through_statuses() {
    let (engine, _db) = engine_with_db().await;
    let customer = customer(&engine).await;
    let rice = product(&engine, "Rice 5kg", 10).await;
    let invoice = engine
        .create_sale_invoice(
            InvoiceCmd::new(customer.id, day(1)).line(sale_line(&rice, 2)),
            &actor(),
        )
        .await
        .unwrap();

    let first = engine
        .create_payment_in(
            PaymentCmd::new(customer.id, money(60), day(2)).invoice_id(invoice.id),
            &actor(),
        )
        .await
        .unwrap();
    assert_eq!(first.number, "PIN-00001");
    let partial = engine.invoice(invoice.id).await.unwrap();
    assert_eq!(partial.status, InvoiceStatus::Partial);
    assert_eq!(partial.amount_due, money(100));

    engine
        .create_payment_in(
            PaymentCmd::new(customer.id, money(100), day(3)).invoice_id(invoice.id),
            &actor(),
        )
        .await
        .unwrap();
    let paid = engine.invoice(invoice.id).await.unwrap();
    assert_eq!(paid.status, InvoiceStatus::Paid);
    assert_eq!(paid.amount_due, Money::ZERO);

    engine.delete_payment(first.id, &actor()).await.unwrap();
    let partial = engine.invoice(invoice.id).await.unwrap();
    assert_eq!(partial.status, InvoiceStatus::Partial);
    assert_eq!(partial.amount_paid, money(100));
    assert_eq!(engine.party(customer.id).await.unwrap().current_balance, money(60));
}

#[tokio::test]
async fn overpayment_marks_paid_with_negative_due() {
    let (engine, _db) = engine_with_db().await;
    let customer = customer(&engine).await;
    let rice = product(&engine, "Rice 5kg", 10).await;
    let invoice = engine
        .create_sale_invoice(
            InvoiceCmd::new(customer.id, day(1)).line(sale_line(&rice, 1)),
            &actor(),
        )
        .await
        .unwrap();

    engine
        .create_payment_in(
            PaymentCmd::new(customer.id, money(100), day(2)).invoice_id(invoice.id),
            &actor(),
        )
        .await
        .unwrap();

    let invoice = engine.invoice(invoice.id).await.unwrap();
    assert_eq!(invoice.status, InvoiceStatus::Paid);
    assert_eq!(invoice.amount_due, -money(20));
    assert_eq!(engine.party(customer.id).await.unwrap().current_balance, -money(20));
}

#[tokio::test]
async fn payment_out_settles_purchase() {
    let (engine, _db) = engine_with_db().await;
    let supplier = supplier(&engine).await;
    let oil = product(&engine, "Olive oil 1l", 0).await;
    let invoice = engine
        .create_purchase_invoice(
            InvoiceCmd::new(supplier.id, day(1)).line(purchase_line(&oil, 2)),
            &actor(),
        )
        .await
        .unwrap();

    let payment = engine
        .create_payment_out(
            PaymentCmd::new(supplier.id, money(120), day(2))
                .invoice_id(invoice.id)
                .method("bank transfer"),
            &actor(),
        )
        .await
        .unwrap();
    assert_eq!(payment.kind, PaymentKind::Out);
    assert_eq!(payment.number, "POUT-00001");
    assert_eq!(payment.method.as_deref(), Some("bank transfer"));
    assert_eq!(engine.invoice(invoice.id).await.unwrap().status, InvoiceStatus::Paid);
    assert_eq!(engine.party(supplier.id).await.unwrap().current_balance, Money::ZERO);
}

#[tokio::test]
async fn unlinked_payment_only_moves_balance() {
    let (engine, _db) = engine_with_db().await;
    let customer = customer(&engine).await;

    engine
        .create_payment_in(PaymentCmd::new(customer.id, money(40), day(1)), &actor())
        .await
        .unwrap();
    assert_eq!(engine.party(customer.id).await.unwrap().current_balance, -money(40));
}

#[tokio::test]
async fn update_moves_payment_between_invoices() {
    let (engine, _db) = engine_with_db().await;
    let customer = customer(&engine).await;
    let rice = product(&engine, "Rice 5kg", 10).await;
    let cmd = InvoiceCmd::new(customer.id, day(1)).line(sale_line(&rice, 1));
    let first = engine.create_sale_invoice(cmd.clone(), &actor()).await.unwrap();
    let second = engine.create_sale_invoice(cmd, &actor()).await.unwrap();

    let payment = engine
        .create_payment_in(
            PaymentCmd::new(customer.id, money(80), day(2)).invoice_id(first.id),
            &actor(),
        )
        .await
        .unwrap();
    let updated = engine
        .update_payment(
            payment.id,
            PaymentCmd::new(customer.id, money(30), day(2)).invoice_id(second.id),
            &actor(),
        )
        .await
        .unwrap();
    assert_eq!(updated.number, payment.number);
    assert_eq!(updated.created_at, payment.created_at);

    let first = engine.invoice(first.id).await.unwrap();
    let second = engine.invoice(second.id).await.unwrap();
    assert_eq!(first.status, InvoiceStatus::Unpaid);
    assert_eq!(first.amount_paid, Money::ZERO);
    assert_eq!(second.status, InvoiceStatus::Partial);
    assert_eq!(second.amount_paid, money(30));
    assert_eq!(engine.party(customer.id).await.unwrap().current_balance, money(130));
}

#[tokio::test]
async fn payment_link_must_match_kind_and_party() {
    let (engine, _db) = engine_with_db().await;
    let customer = customer(&engine).await;
    let other = customer_named(&engine).await;
    let supplier = supplier(&engine).await;
    let rice = product(&engine, "Rice 5kg", 10).await;

    let purchase = engine
        .create_purchase_invoice(
            InvoiceCmd::new(supplier.id, day(1)).line(purchase_line(&rice, 1)),
            &actor(),
        )
        .await
        .unwrap();
    let err = engine
        .create_payment_in(
            PaymentCmd::new(supplier.id, money(10), day(2)).invoice_id(purchase.id),
            &actor(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let sale = engine
        .create_sale_invoice(
            InvoiceCmd::new(customer.id, day(1)).line(sale_line(&rice, 1)),
            &actor(),
        )
        .await
        .unwrap();
    let err = engine
        .create_payment_in(
            PaymentCmd::new(other.id, money(10), day(2)).invoice_id(sale.id),
            &actor(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let ghost = Uuid::new_v4();
    let err = engine
        .create_payment_in(
            PaymentCmd::new(customer.id, money(10), day(2)).invoice_id(ghost),
            &actor(),
        )
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::NotFound(format!("invoice {ghost}")));

    assert_eq!(engine.party(other.id).await.unwrap().current_balance, Money::ZERO);
    assert_eq!(engine.invoice(sale.id).await.unwrap().amount_paid, Money::ZERO);
}

#[tokio::test]
async fn non_positive_amounts_are_rejected() {
    let (engine, _db) = engine_with_db().await;
    let customer = customer(&engine).await;

    let err = engine
        .create_payment_in(PaymentCmd::new(customer.id, Money::ZERO, day(1)), &actor())
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::Validation("payment amount must be > 0".to_string())
    );
}

async fn customer_named(engine: &engine::Engine) -> engine::Party {
    engine
        .create_party(engine::PartyCmd::new(
            "Bianchi Bar",
            engine::PartyType::Customer,
        ))
        .await
        .unwrap()
}
