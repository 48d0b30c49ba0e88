use chrono::Utc;
use sea_orm::{QueryFilter, QueryOrder, TransactionTrait, prelude::*, sea_query::Expr};
use tracing::info;
use uuid::Uuid;

use crate::{
    EngineError, Item, ItemCmd, ItemKind, Party, PartyCmd, ResultEngine, items, parties,
    util::{normalize_optional_text, normalize_required_text},
};

use super::{Engine, with_tx};

impl Engine {
    /// Add a customer or supplier. Its balance starts at the opening balance.
    pub async fn create_party(&self, cmd: PartyCmd) -> ResultEngine<Party> {
        let name = normalize_required_text(&cmd.name, "party name")?;
        let now = Utc::now();
        let party = Party {
            id: Uuid::new_v4(),
            name,
            party_type: cmd.party_type,
            opening_balance: cmd.opening_balance,
            current_balance: cmd.opening_balance,
            created_at: now,
            updated_at: now,
        };

        with_tx!(self, |db_tx| {
            parties::ActiveModel::from(&party).insert(&db_tx).await?;
            info!(party_id = %party.id, name = %party.name, "party created");
            Ok(party)
        })
    }

    /// Return a party snapshot from DB.
    pub async fn party(&self, party_id: Uuid) -> ResultEngine<Party> {
        with_tx!(self, |db_tx| self.require_party(&db_tx, party_id).await)
    }

    /// Add a product or a service to the catalog.
    ///
    /// Services never carry stock, so their opening stock must be zero.
    pub async fn create_item(&self, cmd: ItemCmd) -> ResultEngine<Item> {
        let name = normalize_required_text(&cmd.name, "item name")?;
        if cmd.sale_price.is_negative() || cmd.purchase_price.is_negative() {
            return Err(EngineError::Validation(
                "prices must be >= 0".to_string(),
            ));
        }
        if cmd.kind == ItemKind::Service && !cmd.opening_stock.is_zero() {
            return Err(EngineError::Validation(
                "a service cannot have opening stock".to_string(),
            ));
        }

        let now = Utc::now();
        let item = Item {
            id: Uuid::new_v4(),
            name,
            sku: normalize_optional_text(cmd.sku.as_deref()),
            kind: cmd.kind,
            sale_price: cmd.sale_price,
            purchase_price: cmd.purchase_price,
            opening_stock: cmd.opening_stock,
            stock_quantity: cmd.opening_stock,
            low_stock_alert: cmd.low_stock_alert,
            is_active: true,
            expiry_date: cmd.expiry_date,
            created_at: now,
            updated_at: now,
        };

        with_tx!(self, |db_tx| {
            if let Some(sku) = item.sku.as_deref() {
                let taken = items::Entity::find()
                    .filter(items::Column::Sku.eq(sku))
                    .one(&db_tx)
                    .await?
                    .is_some();
                if taken {
                    return Err(EngineError::Validation(format!("sku {sku} already in use")));
                }
            }
            items::ActiveModel::from(&item).insert(&db_tx).await?;
            info!(item_id = %item.id, name = %item.name, kind = item.kind.as_str(), "item created");
            Ok(item)
        })
    }

    /// Return an item snapshot from DB.
    pub async fn item(&self, item_id: Uuid) -> ResultEngine<Item> {
        let model = items::Entity::find_by_id(item_id.to_string())
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("item {item_id}")))?;
        Item::try_from(model)
    }

    /// Active products whose stock is at or below their alert level.
    pub async fn low_stock_items(&self) -> ResultEngine<Vec<Item>> {
        items::Entity::find()
            .filter(items::Column::Kind.eq(ItemKind::Product.as_str()))
            .filter(items::Column::IsActive.eq(true))
            .filter(Expr::col(items::Column::StockQuantity).lte(Expr::col(items::Column::LowStockAlert)))
            .order_by_asc(items::Column::Name)
            .all(&self.database)
            .await?
            .into_iter()
            .map(Item::try_from)
            .collect()
    }
}
