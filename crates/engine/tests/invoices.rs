mod common;

use engine::{
    CreditNoteCmd, EngineError, HistoryAction, InvoiceCmd, InvoiceStatus, ItemCmd, LineInput, Money, PaymentCmd,
    Percent, Quantity, StockSource,
};
use uuid::Uuid;

use common::{
    actor, customer, day, engine_with_db, money, product, purchase_line, sale_line, supplier,
    units,
};

#[tokio::test]
async fn sale_then_payment_then_payment_deleted() {
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
    assert_eq!(invoice.number, "INV-00001");
    assert_eq!(invoice.total, money(160));
    assert_eq!(invoice.amount_due, money(160));
    assert_eq!(invoice.status, InvoiceStatus::Unpaid);
    assert_eq!(engine.party(customer.id).await.unwrap().current_balance, money(160));
    assert_eq!(engine.item(rice.id).await.unwrap().stock_quantity, units(8));

    let payment = engine
        .create_payment_in(
            PaymentCmd::new(customer.id, money(160), day(2)).invoice_id(invoice.id),
            &actor(),
        )
        .await
        .unwrap();
    let paid = engine.invoice(invoice.id).await.unwrap();
    assert_eq!(paid.amount_paid, money(160));
    assert_eq!(paid.amount_due, Money::ZERO);
    assert_eq!(paid.status, InvoiceStatus::Paid);
    assert_eq!(engine.party(customer.id).await.unwrap().current_balance, Money::ZERO);

    engine.delete_payment(payment.id, &actor()).await.unwrap();
    let reverted = engine.invoice(invoice.id).await.unwrap();
    assert_eq!(reverted.amount_paid, Money::ZERO);
    assert_eq!(reverted.amount_due, money(160));
    assert_eq!(reverted.status, InvoiceStatus::Unpaid);
    assert_eq!(engine.party(customer.id).await.unwrap().current_balance, money(160));
}

#[tokio::test]
async fn purchase_edit_reverses_then_reapplies() {
    let (engine, _db) = engine_with_db().await;
    let supplier = supplier(&engine).await;
    let oil = product(&engine, "Olive oil 1l", 0).await;

    let invoice = engine
        .create_purchase_invoice(
            InvoiceCmd::new(supplier.id, day(1)).line(purchase_line(&oil, 5)),
            &actor(),
        )
        .await
        .unwrap();
    assert_eq!(invoice.number, "PUR-00001");
    assert_eq!(engine.item(oil.id).await.unwrap().stock_quantity, units(5));
    assert_eq!(engine.party(supplier.id).await.unwrap().current_balance, -money(300));

    let updated = engine
        .update_invoice(
            invoice.id,
            InvoiceCmd::new(supplier.id, day(1)).line(purchase_line(&oil, 8)),
            &actor(),
        )
        .await
        .unwrap();
    assert_eq!(updated.total, money(480));
    assert_eq!(engine.item(oil.id).await.unwrap().stock_quantity, units(8));
    assert_eq!(engine.party(supplier.id).await.unwrap().current_balance, -money(480));

    // Full reversal of the 5, then full application of the 8.
    let deltas: Vec<Quantity> = engine
        .item_history(oil.id)
        .await
        .unwrap()
        .into_iter()
        .map(|entry| {
            assert_eq!(entry.source, StockSource::PurchaseInvoice);
            assert_eq!(entry.reference_id, Some(invoice.id));
            entry.delta
        })
        .collect();
    assert_eq!(deltas, vec![units(5), -units(5), units(8)]);
}

#[tokio::test]
async fn failed_update_leaves_everything_untouched() {
    let (engine, _db) = engine_with_db().await;
    let customer = customer(&engine).await;
    let rice = product(&engine, "Rice 5kg", 5).await;
    let pasta = product(&engine, "Pasta 500g", 50).await;

    let invoice = engine
        .create_sale_invoice(
            InvoiceCmd::new(customer.id, day(1)).line(sale_line(&rice, 2)),
            &actor(),
        )
        .await
        .unwrap();
    let balance_before = engine.party(customer.id).await.unwrap().current_balance;

    let err = engine
        .update_invoice(
            invoice.id,
            InvoiceCmd::new(customer.id, day(1))
                .line(sale_line(&pasta, 1))
                .line(sale_line(&rice, 10)),
            &actor(),
        )
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::InsufficientStock {
            item_id: rice.id,
            item_name: rice.name.clone(),
            available: units(5),
            requested: units(10),
        }
    );

    let after = engine.invoice(invoice.id).await.unwrap();
    assert_eq!(after, invoice);
    assert_eq!(engine.item(rice.id).await.unwrap().stock_quantity, units(3));
    assert_eq!(engine.item(pasta.id).await.unwrap().stock_quantity, units(50));
    assert_eq!(
        engine.party(customer.id).await.unwrap().current_balance,
        balance_before
    );
    assert_eq!(engine.history(invoice.id).await.unwrap().len(), 1);
    assert_eq!(engine.item_history(rice.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn identical_edit_is_a_no_op_on_derived_state() {
    let (engine, _db) = engine_with_db().await;
    let customer = customer(&engine).await;
    let rice = product(&engine, "Rice 5kg", 10).await;
    let cmd = InvoiceCmd::new(customer.id, day(1)).line(
        sale_line(&rice, 3)
            .tax(Percent::whole(10))
            .discount(Percent::whole(5)),
    );

    let invoice = engine.create_sale_invoice(cmd.clone(), &actor()).await.unwrap();
    engine
        .create_payment_in(
            PaymentCmd::new(customer.id, money(100), day(2)).invoice_id(invoice.id),
            &actor(),
        )
        .await
        .unwrap();
    let before = engine.invoice(invoice.id).await.unwrap();
    let balance_before = engine.party(customer.id).await.unwrap().current_balance;

    let after = engine.update_invoice(invoice.id, cmd, &actor()).await.unwrap();

    assert_eq!(after.total, before.total);
    assert_eq!(after.amount_paid, before.amount_paid);
    assert_eq!(after.amount_due, before.amount_due);
    assert_eq!(after.status, InvoiceStatus::Partial);
    assert_eq!(engine.item(rice.id).await.unwrap().stock_quantity, units(7));
    assert_eq!(
        engine.party(customer.id).await.unwrap().current_balance,
        balance_before
    );
}

#[tokio::test]
async fn expired_items_block_the_sale() {
    let (engine, _db) = engine_with_db().await;
    let customer = customer(&engine).await;
    let milk = engine
        .create_item(
            ItemCmd::product("Milk 1l", money(2), money(1))
                .opening_stock(units(20))
                .expiry_date(day(10)),
        )
        .await
        .unwrap();

    let err = engine
        .create_sale_invoice(
            InvoiceCmd::new(customer.id, day(11)).line(sale_line(&milk, 1)),
            &actor(),
        )
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::ExpiredItem {
            item_id: milk.id,
            item_name: milk.name.clone(),
            expiry_date: day(10),
        }
    );
    assert_eq!(engine.item(milk.id).await.unwrap().stock_quantity, units(20));
    assert_eq!(engine.party(customer.id).await.unwrap().current_balance, Money::ZERO);

    // The failed attempt did not burn a number.
    let invoice = engine
        .create_sale_invoice(
            InvoiceCmd::new(customer.id, day(10)).line(sale_line(&milk, 1)),
            &actor(),
        )
        .await
        .unwrap();
    assert_eq!(invoice.number, "INV-00001");
}

#[tokio::test]
async fn services_and_free_lines_do_not_touch_stock() {
    let (engine, _db) = engine_with_db().await;
    let customer = customer(&engine).await;
    let delivery = engine
        .create_item(ItemCmd::service("Delivery", money(15)))
        .await
        .unwrap();

    let invoice = engine
        .create_sale_invoice(
            InvoiceCmd::new(customer.id, day(1))
                .line(LineInput::item(delivery.id, units(3), delivery.sale_price))
                .line(LineInput::free("Gift wrapping", units(1), money(5))),
            &actor(),
        )
        .await
        .unwrap();
    assert_eq!(invoice.total, money(50));
    assert_eq!(invoice.lines.len(), 2);
    assert_eq!(engine.item(delivery.id).await.unwrap().stock_quantity, Quantity::ZERO);
    assert!(engine.item_history(delivery.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn delete_reverses_and_logs() {
    let (engine, _db) = engine_with_db().await;
    let customer = customer(&engine).await;
    let rice = product(&engine, "Rice 5kg", 10).await;

    let invoice = engine
        .create_sale_invoice(
            InvoiceCmd::new(customer.id, day(1)).line(sale_line(&rice, 4)),
            &actor(),
        )
        .await
        .unwrap();
    engine.delete_invoice(invoice.id, &actor()).await.unwrap();

    assert_eq!(engine.item(rice.id).await.unwrap().stock_quantity, units(10));
    assert_eq!(engine.party(customer.id).await.unwrap().current_balance, Money::ZERO);
    assert_eq!(
        engine.invoice(invoice.id).await.unwrap_err(),
        EngineError::NotFound(format!("invoice {}", invoice.id))
    );

    let history = engine.history(invoice.id).await.unwrap();
    let actions: Vec<HistoryAction> = history.iter().map(|entry| entry.action).collect();
    assert_eq!(actions, vec![HistoryAction::Created, HistoryAction::Deleted]);
    assert!(history[1].new_values.is_none());
    assert!(history[1].old_values.is_some());
    assert_eq!(history[1].user_name, "Alice");
}

#[tokio::test]
async fn invoice_with_payments_cannot_be_deleted() {
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
            PaymentCmd::new(customer.id, money(20), day(1)).invoice_id(invoice.id),
            &actor(),
        )
        .await
        .unwrap();

    let err = engine.delete_invoice(invoice.id, &actor()).await.unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
    assert_eq!(engine.item(rice.id).await.unwrap().stock_quantity, units(9));
}

#[tokio::test]
async fn edit_can_move_invoice_to_another_party() {
    let (engine, _db) = engine_with_db().await;
    let first = customer(&engine).await;
    let second = customer(&engine).await;
    let rice = product(&engine, "Rice 5kg", 10).await;

    let invoice = engine
        .create_sale_invoice(
            InvoiceCmd::new(first.id, day(1)).line(sale_line(&rice, 1)),
            &actor(),
        )
        .await
        .unwrap();
    engine
        .update_invoice(
            invoice.id,
            InvoiceCmd::new(second.id, day(1)).line(sale_line(&rice, 1)),
            &actor(),
        )
        .await
        .unwrap();

    assert_eq!(engine.party(first.id).await.unwrap().current_balance, Money::ZERO);
    assert_eq!(engine.party(second.id).await.unwrap().current_balance, money(80));
}

#[tokio::test]
async fn paid_invoice_stays_with_its_party() {
    let (engine, _db) = engine_with_db().await;
    let first = customer(&engine).await;
    let second = customer(&engine).await;
    let rice = product(&engine, "Rice 5kg", 10).await;

    let invoice = engine
        .create_sale_invoice(
            InvoiceCmd::new(first.id, day(1)).line(sale_line(&rice, 1)),
            &actor(),
        )
        .await
        .unwrap();
    let payment = engine
        .create_payment_in(
            PaymentCmd::new(first.id, money(80), day(2)).invoice_id(invoice.id),
            &actor(),
        )
        .await
        .unwrap();

    let move_to_second = InvoiceCmd::new(second.id, day(1)).line(sale_line(&rice, 1));
    let err = engine
        .update_invoice(invoice.id, move_to_second.clone(), &actor())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let unchanged = engine.invoice(invoice.id).await.unwrap();
    assert_eq!(unchanged.party_id, first.id);
    assert_eq!(unchanged.status, InvoiceStatus::Paid);
    assert_eq!(engine.party(first.id).await.unwrap().current_balance, Money::ZERO);
    assert_eq!(engine.party(second.id).await.unwrap().current_balance, Money::ZERO);
    assert_eq!(engine.item(rice.id).await.unwrap().stock_quantity, units(9));

    // Same-party edits of a paid invoice are still allowed.
    engine
        .update_invoice(
            invoice.id,
            InvoiceCmd::new(first.id, day(3)).line(sale_line(&rice, 2)),
            &actor(),
        )
        .await
        .unwrap();
    assert_eq!(engine.party(first.id).await.unwrap().current_balance, money(80));

    // A credit note against the invoice pins it as well.
    engine.delete_payment(payment.id, &actor()).await.unwrap();
    engine
        .create_credit_note(
            CreditNoteCmd::new(first.id, day(4))
                .invoice_id(invoice.id)
                .line(sale_line(&rice, 1)),
            &actor(),
        )
        .await
        .unwrap();
    let err = engine
        .update_invoice(invoice.id, move_to_second, &actor())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
    assert_eq!(engine.invoice(invoice.id).await.unwrap().party_id, first.id);
}

#[tokio::test]
async fn unknown_references_are_not_found() {
    let (engine, _db) = engine_with_db().await;
    let customer = customer(&engine).await;
    let ghost = Uuid::new_v4();

    let err = engine
        .create_sale_invoice(
            InvoiceCmd::new(customer.id, day(1)).line(LineInput::item(ghost, units(1), money(1))),
            &actor(),
        )
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::NotFound(format!("item {ghost}")));

    let err = engine
        .create_sale_invoice(
            InvoiceCmd::new(ghost, day(1)).line(LineInput::free("x", units(1), money(1))),
            &actor(),
        )
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::NotFound(format!("party {ghost}")));
}

#[tokio::test]
async fn empty_documents_are_rejected_before_any_write() {
    let (engine, _db) = engine_with_db().await;
    let customer = customer(&engine).await;

    let err = engine
        .create_sale_invoice(InvoiceCmd::new(customer.id, day(1)), &actor())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}
