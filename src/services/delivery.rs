use crate::{
    entities::delivery_setting,
    errors::ServiceError,
    events::{Event, EventSender},
    wilaya,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use std::{collections::BTreeMap, sync::Arc};
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Flat per-wilaya delivery pricing.
#[derive(Clone)]
pub struct DeliveryService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl DeliveryService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Fee for a wilaya; zero when no price is configured or the wilaya is unknown.
    #[instrument(skip(self))]
    pub async fn fee_for(&self, wilaya_name: &str) -> Result<Decimal, ServiceError> {
        fee_on(&*self.db, wilaya_name).await
    }

    #[instrument(skip(self))]
    pub async fn list_settings(&self) -> Result<Vec<delivery_setting::Model>, ServiceError> {
        Ok(delivery_setting::Entity::find()
            .order_by_asc(delivery_setting::Column::Wilaya)
            .all(&*self.db)
            .await?)
    }

    /// Upserts one price per wilaya in a single transaction.
    #[instrument(skip(self, prices), fields(count = prices.len()))]
    pub async fn save_prices(
        &self,
        prices: &BTreeMap<String, Decimal>,
    ) -> Result<Vec<delivery_setting::Model>, ServiceError> {
        let mut resolved = Vec::with_capacity(prices.len());
        for (name, price) in prices {
            let entry = wilaya::find(name)
                .ok_or_else(|| ServiceError::ValidationError(format!("Unknown wilaya '{}'", name)))?;
            if price.is_sign_negative() && !price.is_zero() {
                return Err(ServiceError::ValidationError(format!(
                    "Delivery price for {} must not be negative",
                    entry.name
                )));
            }
            resolved.push((entry.name, *price));
        }

        let txn = self.db.begin().await?;
        let mut saved = Vec::with_capacity(resolved.len());
        for (name, price) in resolved {
            let existing = delivery_setting::Entity::find()
                .filter(delivery_setting::Column::Wilaya.eq(name))
                .one(&txn)
                .await?;

            let model = match existing {
                Some(row) => {
                    let mut active: delivery_setting::ActiveModel = row.into();
                    active.price = Set(price);
                    active.updated_at = Set(Utc::now());
                    active.update(&txn).await?
                }
                None => {
                    delivery_setting::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        wilaya: Set(name.to_string()),
                        price: Set(price),
                        updated_at: Set(Utc::now()),
                    }
                    .insert(&txn)
                    .await?
                }
            };
            saved.push(model);
        }
        txn.commit().await?;

        self.event_sender.send_or_log(Event::DeliveryPricesUpdated {
            count: saved.len(),
        });
        info!("Saved {} delivery price(s)", saved.len());
        Ok(saved)
    }
}

/// Fee lookup usable inside a transaction.
pub(crate) async fn fee_on<C>(conn: &C, wilaya_name: &str) -> Result<Decimal, ServiceError>
where
    C: ConnectionTrait,
{
    let Some(entry) = wilaya::find(wilaya_name) else {
        warn!("No delivery pricing for unknown wilaya '{}'", wilaya_name);
        return Ok(Decimal::ZERO);
    };

    let setting = delivery_setting::Entity::find()
        .filter(delivery_setting::Column::Wilaya.eq(entry.name))
        .one(conn)
        .await?;
    Ok(setting.map(|s| s.price).unwrap_or(Decimal::ZERO))
}
