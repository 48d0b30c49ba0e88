#![allow(dead_code)]

use chrono::NaiveDate;
use sea_orm::{Database, DatabaseConnection};

use engine::{
    Actor, Engine, Item, ItemCmd, LineInput, Money, Party, PartyCmd, PartyType, Quantity,
};
use migration::MigratorTrait;

pub async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();
    (engine, db)
}

pub fn actor() -> Actor {
    Actor::new("u-1", "Alice")
}

pub fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
}

pub fn units(n: i64) -> Quantity {
    Quantity::units(n)
}

pub fn money(major: i64) -> Money {
    Money::from_major(major)
}

pub async fn customer(engine: &Engine) -> Party {
    engine
        .create_party(PartyCmd::new("Rossi Alimentari", PartyType::Customer))
        .await
        .unwrap()
}

pub async fn supplier(engine: &Engine) -> Party {
    engine
        .create_party(PartyCmd::new("Grossista Nord", PartyType::Supplier))
        .await
        .unwrap()
}

/// A product selling at 80.00 and bought at 60.00.
pub async fn product(engine: &Engine, name: &str, stock: i64) -> Item {
    engine
        .create_item(ItemCmd::product(name, money(80), money(60)).opening_stock(units(stock)))
        .await
        .unwrap()
}

/// A plain line of `quantity` units of `item` at its sale price.
pub fn sale_line(item: &Item, quantity: i64) -> LineInput {
    LineInput::item(item.id, units(quantity), item.sale_price)
}

pub fn purchase_line(item: &Item, quantity: i64) -> LineInput {
    LineInput::item(item.id, units(quantity), item.purchase_price)
}
