use crate::{
    entities::{order, order_item, product, product_variant, OrderStatus},
    errors::ServiceError,
    events::{Event, EventSender},
    pricing::{self, Totals},
    services::delivery,
    validation::{algerian_phone, known_wilaya, not_blank},
    wilaya,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// One line of a checkout: a product, a quantity and optional variant choices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate, ToSchema)]
pub struct OrderLineInput {
    pub product_id: Uuid,
    #[validate(range(min = 1, max = 999))]
    pub quantity: u32,
    /// At most one variant per option group
    #[serde(default)]
    pub variant_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct PlaceOrderInput {
    #[validate(length(max = 120), custom = "not_blank")]
    pub customer_name: String,
    #[validate(custom = "algerian_phone")]
    pub customer_phone: String,
    #[validate(length(max = 500), custom = "not_blank")]
    pub customer_address: String,
    #[validate(custom = "known_wilaya")]
    pub wilaya: String,
    #[validate(length(min = 1))]
    pub items: Vec<OrderLineInput>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct QuoteInput {
    #[validate(custom = "known_wilaya")]
    pub wilaya: String,
    #[validate(length(min = 1))]
    pub items: Vec<OrderLineInput>,
}

/// A checkout line priced from the current catalog.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct PricedLine {
    pub product_id: Uuid,
    pub name: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
    pub variant_label: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Quote {
    pub wilaya: String,
    pub lines: Vec<PricedLine>,
    #[serde(flatten)]
    pub totals: Totals,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OrderItemView {
    #[serde(flatten)]
    pub item: order_item::Model,
    /// `None` once the product has been deleted
    pub product: Option<product::Model>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: order::Model,
    pub status_label: String,
    pub items: Vec<OrderItemView>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
}

fn validate_lines(lines: &[OrderLineInput]) -> Result<(), ServiceError> {
    if lines.is_empty() {
        return Err(ServiceError::ValidationError(
            "order must contain at least one item".into(),
        ));
    }
    for line in lines {
        line.validate()?;
    }
    Ok(())
}

/// Prices every line against current products and variants, with stock checks.
async fn price_lines<C>(conn: &C, lines: &[OrderLineInput]) -> Result<Vec<PricedLine>, ServiceError>
where
    C: ConnectionTrait,
{
    let mut requested: HashMap<Uuid, u32> = HashMap::new();
    let mut priced = Vec::with_capacity(lines.len());

    for line in lines {
        let product = product::Entity::find_by_id(line.product_id)
            .one(conn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Product {} not found", line.product_id))
            })?;

        let total_requested = requested.entry(product.id).or_insert(0);
        *total_requested += line.quantity;
        let available = product.stock.max(0) as u32;
        if *total_requested > available {
            return Err(ServiceError::InsufficientStock(format!(
                "{}: {} requested, {} available",
                product.name, total_requested, available
            )));
        }

        let variants = resolve_variants(conn, &product, &line.variant_ids).await?;
        let unit_price =
            pricing::unit_price(product.price, variants.iter().map(|v| v.price_adjustment));
        let variant_label = (!variants.is_empty()).then(|| {
            variants
                .iter()
                .map(product_variant::Model::label)
                .collect::<Vec<_>>()
                .join(", ")
        });

        priced.push(PricedLine {
            product_id: product.id,
            name: product.name,
            quantity: line.quantity,
            unit_price,
            line_total: pricing::line_total(unit_price, line.quantity),
            variant_label,
        });
    }

    Ok(priced)
}

async fn resolve_variants<C>(
    conn: &C,
    product: &product::Model,
    variant_ids: &[Uuid],
) -> Result<Vec<product_variant::Model>, ServiceError>
where
    C: ConnectionTrait,
{
    if variant_ids.is_empty() {
        return Ok(Vec::new());
    }

    let found = product_variant::Entity::find()
        .filter(product_variant::Column::Id.is_in(variant_ids.to_vec()))
        .filter(product_variant::Column::ProductId.eq(product.id))
        .all(conn)
        .await?;

    let mut ordered = Vec::with_capacity(variant_ids.len());
    let mut groups = HashSet::new();
    for id in variant_ids {
        let variant = found.iter().find(|v| v.id == *id).ok_or_else(|| {
            ServiceError::ValidationError(format!(
                "Variant {} does not belong to {}",
                id, product.name
            ))
        })?;
        if !groups.insert(variant.name.clone()) {
            return Err(ServiceError::ValidationError(format!(
                "Only one '{}' option can be selected",
                variant.name
            )));
        }
        ordered.push(variant.clone());
    }
    Ok(ordered)
}

#[derive(Clone)]
pub struct OrderService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl OrderService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Prices a prospective order without writing anything.
    #[instrument(skip(self, input))]
    pub async fn quote(&self, input: QuoteInput) -> Result<Quote, ServiceError> {
        input.validate()?;
        validate_lines(&input.items)?;
        let wilaya = canonical_wilaya(&input.wilaya)?;

        let lines = price_lines(&*self.db, &input.items).await?;
        let subtotal = lines.iter().map(|l| l.line_total).sum();
        let fee = delivery::fee_on(&*self.db, wilaya).await?;

        Ok(Quote {
            wilaya: wilaya.to_string(),
            lines,
            totals: Totals::new(subtotal, fee),
        })
    }

    /// Creates a `pending` order and its items in one transaction.
    #[instrument(skip(self, input), fields(wilaya = %input.wilaya, lines = input.items.len()))]
    pub async fn place_order(&self, input: PlaceOrderInput) -> Result<OrderWithItems, ServiceError> {
        input.validate()?;
        validate_lines(&input.items)?;
        let wilaya = canonical_wilaya(&input.wilaya)?;

        let txn = self.db.begin().await?;

        let lines = price_lines(&txn, &input.items).await?;
        let subtotal: Decimal = lines.iter().map(|l| l.line_total).sum();
        let fee = delivery::fee_on(&txn, wilaya).await?;
        let totals = Totals::new(subtotal, fee);

        let order_id = Uuid::new_v4();
        let order = order::ActiveModel {
            id: Set(order_id),
            customer_name: Set(input.customer_name.trim().to_string()),
            customer_phone: Set(input.customer_phone.trim().to_string()),
            customer_address: Set(input.customer_address.trim().to_string()),
            wilaya: Set(wilaya.to_string()),
            subtotal: Set(totals.subtotal),
            delivery_fee: Set(totals.delivery_fee),
            total: Set(totals.total),
            status: Set(OrderStatus::Pending),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        }
        .insert(&txn)
        .await?;

        let mut items = Vec::with_capacity(lines.len());
        for line in &lines {
            let item = order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                product_id: Set(line.product_id),
                quantity: Set(line.quantity as i32),
                price: Set(line.unit_price),
                variant_label: Set(line.variant_label.clone()),
            }
            .insert(&txn)
            .await?;
            let product = product::Entity::find_by_id(line.product_id).one(&txn).await?;
            items.push(OrderItemView { item, product });
        }

        txn.commit().await?;

        self.event_sender.send_or_log(Event::OrderPlaced {
            order_id,
            wilaya: wilaya.to_string(),
            total: totals.total,
        });
        info!("Placed order: {} ({})", order_id, pricing::format_dinars(totals.total));

        Ok(OrderWithItems {
            status_label: order.status.label_fr().to_string(),
            order,
            items,
        })
    }

    #[instrument(skip(self))]
    pub async fn get_order(&self, id: Uuid) -> Result<OrderWithItems, ServiceError> {
        let order = order::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", id)))?;

        let mut assembled = self.attach_items(vec![order]).await?;
        assembled
            .pop()
            .ok_or_else(|| ServiceError::InternalError(format!("Order {} vanished", id)))
    }

    /// Newest first, each with its items and their products.
    #[instrument(skip(self))]
    pub async fn list_orders(&self, filter: OrderFilter) -> Result<Vec<OrderWithItems>, ServiceError> {
        let mut select = order::Entity::find().order_by_desc(order::Column::CreatedAt);
        if let Some(status) = filter.status {
            select = select.filter(order::Column::Status.eq(status));
        }
        let orders = select.all(&*self.db).await?;
        self.attach_items(orders).await
    }

    async fn attach_items(
        &self,
        orders: Vec<order::Model>,
    ) -> Result<Vec<OrderWithItems>, ServiceError> {
        if orders.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
        let rows = order_item::Entity::find()
            .filter(order_item::Column::OrderId.is_in(ids))
            .find_also_related(product::Entity)
            .all(&*self.db)
            .await?;

        let mut by_order: HashMap<Uuid, Vec<OrderItemView>> = HashMap::new();
        for (item, product) in rows {
            by_order
                .entry(item.order_id)
                .or_default()
                .push(OrderItemView { item, product });
        }

        Ok(orders
            .into_iter()
            .map(|order| OrderWithItems {
                status_label: order.status.label_fr().to_string(),
                items: by_order.remove(&order.id).unwrap_or_default(),
                order,
            })
            .collect())
    }

    /// The dashboard may move an order to any status.
    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        id: Uuid,
        status: OrderStatus,
    ) -> Result<order::Model, ServiceError> {
        let existing = order::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", id)))?;

        let old_status = existing.status;
        if old_status == status {
            return Ok(existing);
        }

        let mut active: order::ActiveModel = existing.into();
        active.status = Set(status);
        active.updated_at = Set(Some(Utc::now()));
        let updated = active.update(&*self.db).await?;

        self.event_sender.send_or_log(Event::OrderStatusChanged {
            order_id: id,
            old_status,
            new_status: status,
        });
        info!("Order {} moved from {} to {}", id, old_status, status);
        Ok(updated)
    }
}

fn canonical_wilaya(input: &str) -> Result<&'static str, ServiceError> {
    wilaya::find(input)
        .map(|w| w.name)
        .ok_or_else(|| ServiceError::ValidationError(format!("Unknown wilaya '{}'", input)))
}
