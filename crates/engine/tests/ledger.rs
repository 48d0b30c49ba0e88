mod common;

use sea_orm::{ConnectionTrait, DatabaseConnection, DbBackend, Statement};
use uuid::Uuid;

use engine::{
    Actor, AdjustStockCmd, CreditNoteCmd, DocumentType, EngineError, HistoryAction, InvoiceCmd,
    InvoiceStatus, ItemCmd, Money, PartyCmd, PartyType, PaymentCmd, SnapshotBody, StockSource,
};

use common::{
    actor, customer, day, engine_with_db, money, product, purchase_line, sale_line, supplier,
    units,
};

#[tokio::test]
async fn numbers_are_never_reused() {
    let (engine, _db) = engine_with_db().await;
    let customer = customer(&engine).await;
    let rice = product(&engine, "Rice 5kg", 10).await;
    let cmd = InvoiceCmd::new(customer.id, day(1)).line(sale_line(&rice, 1));

    let first = engine.create_sale_invoice(cmd.clone(), &actor()).await.unwrap();
    let second = engine.create_sale_invoice(cmd.clone(), &actor()).await.unwrap();
    assert_eq!(first.number, "INV-00001");
    assert_eq!(second.number, "INV-00002");

    engine.delete_invoice(second.id, &actor()).await.unwrap();
    let third = engine.create_sale_invoice(cmd, &actor()).await.unwrap();
    assert_eq!(third.number, "INV-00003");

    assert_eq!(
        engine.allocate_number(DocumentType::SaleInvoice).await.unwrap(),
        "INV-00004"
    );
    assert_eq!(
        engine.sequence(DocumentType::SaleInvoice).await.unwrap().next_number,
        5
    );
}

#[tokio::test]
async fn sequences_can_be_reconfigured_but_not_rewound() {
    let (engine, _db) = engine_with_db().await;

    let counter = engine
        .configure_sequence(DocumentType::PurchaseInvoice, " BILL ", 3, Some(40))
        .await
        .unwrap();
    assert_eq!(counter.prefix, "BILL");
    assert_eq!(counter.padding, 3);
    assert_eq!(counter.next_number, 40);
    assert_eq!(
        engine.allocate_number(DocumentType::PurchaseInvoice).await.unwrap(),
        "BILL-040"
    );

    let counter = engine
        .configure_sequence(DocumentType::PurchaseInvoice, "BILL", 3, Some(2))
        .await
        .unwrap();
    assert_eq!(counter.next_number, 41);

    let err = engine
        .configure_sequence(DocumentType::PurchaseInvoice, "BILL", 13, None)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let err = engine.allocate_number(DocumentType::Loan).await.unwrap_err();
    assert_eq!(
        err,
        EngineError::NotFound(format!("sequence counter {}", DocumentType::Loan))
    );
}

#[tokio::test]
async fn audits_hold_after_mixed_activity() {
    let (engine, _db) = engine_with_db().await;
    let customer = engine
        .create_party(
            PartyCmd::new("Rossi Alimentari", PartyType::Customer).opening_balance(money(50)),
        )
        .await
        .unwrap();
    let supplier = supplier(&engine).await;
    let rice = product(&engine, "Rice 5kg", 10).await;

    let purchase = engine
        .create_purchase_invoice(
            InvoiceCmd::new(supplier.id, day(1)).line(purchase_line(&rice, 6)),
            &actor(),
        )
        .await
        .unwrap();
    let sale = engine
        .create_sale_invoice(
            InvoiceCmd::new(customer.id, day(2)).line(sale_line(&rice, 9)),
            &actor(),
        )
        .await
        .unwrap();
    engine
        .update_invoice(
            sale.id,
            InvoiceCmd::new(customer.id, day(2)).line(sale_line(&rice, 7)),
            &actor(),
        )
        .await
        .unwrap();
    let payment = engine
        .create_payment_in(
            PaymentCmd::new(customer.id, money(200), day(3)).invoice_id(sale.id),
            &actor(),
        )
        .await
        .unwrap();
    engine
        .create_payment_out(
            PaymentCmd::new(supplier.id, money(100), day(3)).invoice_id(purchase.id),
            &actor(),
        )
        .await
        .unwrap();
    engine
        .create_credit_note(
            CreditNoteCmd::new(customer.id, day(4)).line(sale_line(&rice, 2)),
            &actor(),
        )
        .await
        .unwrap();
    engine
        .adjust_stock(AdjustStockCmd::new(rice.id, -units(1), "broken bag"), &actor())
        .await
        .unwrap();
    engine.delete_payment(payment.id, &actor()).await.unwrap();

    // 10 + 6 - 7 + 2 - 1
    let item_audit = engine.audit_item(rice.id).await.unwrap();
    assert!(item_audit.is_consistent());
    assert_eq!(item_audit.recorded_stock, units(10));

    // 50 + 560 - 160
    let customer_audit = engine.audit_party(customer.id).await.unwrap();
    assert!(customer_audit.is_consistent());
    assert_eq!(customer_audit.recorded_balance, money(450));

    // -360 + 100
    let supplier_audit = engine.audit_party(supplier.id).await.unwrap();
    assert!(supplier_audit.is_consistent());
    assert_eq!(supplier_audit.drift(), Money::ZERO);
    assert_eq!(supplier_audit.recorded_balance, -money(260));

    assert_eq!(
        engine.invoice(purchase.id).await.unwrap().status,
        InvoiceStatus::Partial
    );
}

#[tokio::test]
async fn manual_adjustments_are_logged_and_may_go_negative() {
    let (engine, _db) = engine_with_db().await;
    let rice = product(&engine, "Rice 5kg", 2).await;

    let item = engine
        .adjust_stock(AdjustStockCmd::new(rice.id, -units(5), "stocktake"), &actor())
        .await
        .unwrap();
    assert_eq!(item.stock_quantity, units(-3));

    let log = engine.item_history(rice.id).await.unwrap();
    let entry = log.last().unwrap();
    assert_eq!(entry.source, StockSource::Manual);
    assert_eq!(entry.old_quantity, units(2));
    assert_eq!(entry.new_quantity, units(-3));
    assert_eq!(entry.reference_id, None);
    assert!(entry.description.starts_with("stocktake"));

    let low = engine.low_stock_items().await.unwrap();
    assert_eq!(low.len(), 1);
    assert_eq!(low[0].id, rice.id);

    let err = engine
        .adjust_stock(AdjustStockCmd::new(rice.id, units(0), "noop"), &actor())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let delivery = engine
        .create_item(ItemCmd::service("Delivery", money(15)))
        .await
        .unwrap();
    let err = engine
        .adjust_stock(AdjustStockCmd::new(delivery.id, units(1), "oops"), &actor())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}

#[tokio::test]
async fn catalog_rejects_bad_items() {
    let (engine, _db) = engine_with_db().await;

    engine
        .create_item(ItemCmd::product("Rice 5kg", money(80), money(60)).sku("RICE-5"))
        .await
        .unwrap();
    let err = engine
        .create_item(ItemCmd::product("Rice 10kg", money(150), money(110)).sku("RICE-5"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let err = engine
        .create_item(ItemCmd::service("Delivery", money(15)).opening_stock(units(1)))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let err = engine
        .create_item(ItemCmd::product("Oil", -money(1), money(1)))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}

#[tokio::test]
async fn history_keeps_snapshots_and_actor() {
    let (engine, _db) = engine_with_db().await;
    let customer = customer(&engine).await;
    let rice = product(&engine, "Rice 5kg", 10).await;

    let invoice = engine
        .create_sale_invoice(
            InvoiceCmd::new(customer.id, day(1)).line(sale_line(&rice, 2)),
            &Actor::unknown(),
        )
        .await
        .unwrap();
    engine
        .update_invoice(
            invoice.id,
            InvoiceCmd::new(customer.id, day(1)).line(sale_line(&rice, 3)),
            &actor(),
        )
        .await
        .unwrap();

    let log = engine.history(invoice.id).await.unwrap();
    assert_eq!(log.len(), 2);

    let created = &log[0];
    assert_eq!(created.action, HistoryAction::Created);
    assert_eq!(created.document_type, DocumentType::SaleInvoice);
    assert_eq!(created.user_name, "Unknown User");
    assert_eq!(created.user_id, None);
    assert!(created.old_values.is_none());

    let updated = &log[1];
    assert_eq!(updated.user_name, "Alice");
    assert_eq!(updated.user_id.as_deref(), Some("u-1"));
    let Some(SnapshotBody::Invoice(before)) = updated.old_values.as_ref().map(|s| &s.body) else {
        panic!("missing invoice snapshot before the edit");
    };
    let Some(SnapshotBody::Invoice(after)) = updated.new_values.as_ref().map(|s| &s.body) else {
        panic!("missing invoice snapshot after the edit");
    };
    assert_eq!(before.total, money(160));
    assert_eq!(after.total, money(240));
    assert_eq!(after.lines[0].quantity, units(3));
    assert_eq!(after.number, invoice.number);
}

async fn flatten_timestamps(db: &DatabaseConnection, table: &str, column: &str, id: Uuid) {
    let sql = format!(
        "UPDATE {table} SET created_at = \
         (SELECT MIN(created_at) FROM {table} WHERE {column} = ?) WHERE {column} = ?"
    );
    db.execute(Statement::from_sql_and_values(
        DbBackend::Sqlite,
        sql,
        [id.to_string().into(), id.to_string().into()],
    ))
    .await
    .unwrap();
}

#[tokio::test]
async fn logs_keep_write_order_within_one_timestamp() {
    let (engine, db) = engine_with_db().await;
    let customer = customer(&engine).await;
    let rice = product(&engine, "Rice 5kg", 10).await;

    let invoice = engine
        .create_sale_invoice(
            InvoiceCmd::new(customer.id, day(1)).line(sale_line(&rice, 1)),
            &actor(),
        )
        .await
        .unwrap();
    for qty in 2..=5 {
        engine
            .update_invoice(
                invoice.id,
                InvoiceCmd::new(customer.id, day(1)).line(sale_line(&rice, qty)),
                &actor(),
            )
            .await
            .unwrap();
    }
    flatten_timestamps(&db, "invoice_history", "document_id", invoice.id).await;
    flatten_timestamps(&db, "item_history", "item_id", rice.id).await;

    let log = engine.history(invoice.id).await.unwrap();
    assert_eq!(log.len(), 5);
    assert_eq!(log[0].action, HistoryAction::Created);
    let totals: Vec<Money> = log
        .iter()
        .skip(1)
        .map(|entry| match entry.new_values.as_ref().map(|s| &s.body) {
            Some(SnapshotBody::Invoice(after)) => after.total,
            other => panic!("unexpected snapshot {other:?}"),
        })
        .collect();
    assert_eq!(totals, vec![money(160), money(240), money(320), money(400)]);
    assert!(log[1..].iter().all(|e| e.action == HistoryAction::Updated));

    let stock_log = engine.item_history(rice.id).await.unwrap();
    let levels: Vec<_> = stock_log.iter().map(|e| e.new_quantity).collect();
    assert_eq!(levels.last(), Some(&units(5)));
    assert!(
        stock_log
            .windows(2)
            .all(|pair| pair[0].new_quantity == pair[1].old_quantity),
        "stock log out of order: {levels:?}"
    );
}
