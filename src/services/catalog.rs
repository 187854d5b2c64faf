use crate::{
    entities::{product, product_image, product_variant},
    errors::ServiceError,
    events::{Event, EventSender},
    validation::{non_negative_amount, not_blank},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::{Expr, LikeExpr},
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::{str::FromStr, sync::Arc};
use tracing::{info, instrument, warn};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

pub const DEFAULT_CATEGORY: &str = "coques";
/// Search terms shorter than this return nothing.
pub const MIN_SEARCH_CHARS: usize = 3;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum ProductSort {
    /// created_at descending
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
    Name,
}

impl FromStr for ProductSort {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "newest" => Ok(Self::Newest),
            "price-asc" => Ok(Self::PriceAsc),
            "price-desc" => Ok(Self::PriceDesc),
            "name" => Ok(Self::Name),
            other => Err(ServiceError::InvalidInput(format!(
                "Unknown sort '{}'; expected newest, price-asc, price-desc or name",
                other
            ))),
        }
    }
}

/// Listing filters. `category = "all"` means no category filter.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProductQuery {
    pub category: Option<String>,
    #[serde(default)]
    pub sort: ProductSort,
    pub limit: Option<u64>,
}

impl ProductQuery {
    fn category_filter(&self) -> Option<&str> {
        self.category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty() && !c.eq_ignore_ascii_case("all"))
    }
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

/// Create/update payload for the admin product form.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct ProductInput {
    #[validate(length(max = 200), custom = "not_blank")]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[validate(custom = "non_negative_amount")]
    pub price: Decimal,
    #[serde(default)]
    pub image_url: String,
    #[serde(default = "default_category")]
    #[validate(custom = "not_blank")]
    pub category: String,
    #[validate(range(min = 0))]
    pub stock: i32,
    /// Gallery in display order; when present the first image becomes `image_url`.
    #[serde(default)]
    pub images: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct VariantInput {
    #[validate(custom = "not_blank")]
    pub name: String,
    #[validate(custom = "not_blank")]
    pub value: String,
    #[serde(default)]
    pub price_adjustment: Decimal,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub stock: i32,
}

/// Variants sharing one option name, in first-seen order.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct VariantGroup {
    pub name: String,
    pub options: Vec<product_variant::Model>,
}

pub fn group_variants(variants: Vec<product_variant::Model>) -> Vec<VariantGroup> {
    let mut groups: Vec<VariantGroup> = Vec::new();
    for variant in variants {
        match groups.iter_mut().find(|g| g.name == variant.name) {
            Some(group) => group.options.push(variant),
            None => groups.push(VariantGroup {
                name: variant.name.clone(),
                options: vec![variant],
            }),
        }
    }
    groups
}

/// Everything the product page shows.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProductDetail {
    pub product: product::Model,
    pub images: Vec<String>,
    pub variants: Vec<VariantGroup>,
    pub stock_label: Option<String>,
}

fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// Catalog reads for the storefront and product administration for the dashboard.
#[derive(Clone)]
pub struct ProductCatalogService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl ProductCatalogService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self))]
    pub async fn list_products(
        &self,
        query: &ProductQuery,
    ) -> Result<Vec<product::Model>, ServiceError> {
        let mut select = product::Entity::find();

        if let Some(category) = query.category_filter() {
            select = select.filter(product::Column::Category.eq(category));
        }

        select = match query.sort {
            ProductSort::Newest => select.order_by_desc(product::Column::CreatedAt),
            ProductSort::PriceAsc => select.order_by_asc(product::Column::Price),
            ProductSort::PriceDesc => select.order_by_desc(product::Column::Price),
            ProductSort::Name => select.order_by_asc(product::Column::Name),
        };

        if let Some(limit) = query.limit {
            select = select.limit(limit);
        }

        Ok(select.all(&*self.db).await?)
    }

    /// Newest products for the home page.
    #[instrument(skip(self))]
    pub async fn featured_products(&self, limit: u64) -> Result<Vec<product::Model>, ServiceError> {
        self.list_products(&ProductQuery {
            limit: Some(limit),
            ..Default::default()
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn get_product(&self, id: Uuid) -> Result<product::Model, ServiceError> {
        product::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", id)))
    }

    #[instrument(skip(self))]
    pub async fn product_detail(&self, id: Uuid) -> Result<ProductDetail, ServiceError> {
        let product = self.get_product(id).await?;
        let images = self.images_for(&product).await?;
        let variants = group_variants(self.product_variants(id).await?);
        Ok(ProductDetail {
            stock_label: product.stock_label(),
            product,
            images,
            variants,
        })
    }

    /// Same category, excluding the product itself, newest first.
    #[instrument(skip(self))]
    pub async fn related_products(
        &self,
        id: Uuid,
        limit: u64,
    ) -> Result<Vec<product::Model>, ServiceError> {
        let product = self.get_product(id).await?;
        Ok(product::Entity::find()
            .filter(product::Column::Category.eq(product.category))
            .filter(product::Column::Id.ne(id))
            .order_by_desc(product::Column::CreatedAt)
            .limit(limit)
            .all(&*self.db)
            .await?)
    }

    /// Case-insensitive match on name, description or category.
    #[instrument(skip(self))]
    pub async fn search(&self, term: &str, limit: u64) -> Result<Vec<product::Model>, ServiceError> {
        let term = term.trim();
        if term.chars().count() < MIN_SEARCH_CHARS {
            return Ok(Vec::new());
        }

        let pattern = escape_like(&term.to_lowercase());

        Ok(product::Entity::find()
            .filter(
                Expr::col(product::Column::SearchText)
                    .like(LikeExpr::new(pattern).escape('\\')),
            )
            .order_by_desc(product::Column::CreatedAt)
            .limit(limit)
            .all(&*self.db)
            .await?)
    }

    /// Gallery URLs; falls back to the main image when no gallery rows exist.
    #[instrument(skip(self))]
    pub async fn product_images(&self, id: Uuid) -> Result<Vec<String>, ServiceError> {
        let product = self.get_product(id).await?;
        self.images_for(&product).await
    }

    async fn images_for(&self, product: &product::Model) -> Result<Vec<String>, ServiceError> {
        let rows = product_image::Entity::find()
            .filter(product_image::Column::ProductId.eq(product.id))
            .order_by_asc(product_image::Column::DisplayOrder)
            .all(&*self.db)
            .await?;

        if rows.is_empty() {
            return Ok(if product.image_url.trim().is_empty() {
                Vec::new()
            } else {
                vec![product.image_url.clone()]
            });
        }
        Ok(rows.into_iter().map(|r| r.image_url).collect())
    }

    #[instrument(skip(self))]
    pub async fn product_variants(
        &self,
        id: Uuid,
    ) -> Result<Vec<product_variant::Model>, ServiceError> {
        Ok(product_variant::Entity::find()
            .filter(product_variant::Column::ProductId.eq(id))
            .order_by_asc(product_variant::Column::CreatedAt)
            .all(&*self.db)
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn variants_grouped(&self, id: Uuid) -> Result<Vec<VariantGroup>, ServiceError> {
        self.get_product(id).await?;
        Ok(group_variants(self.product_variants(id).await?))
    }

    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_product(
        &self,
        input: ProductInput,
    ) -> Result<product::Model, ServiceError> {
        input.validate()?;
        let id = Uuid::new_v4();
        let images = clean_images(&input.images);
        let image_url = images
            .first()
            .cloned()
            .unwrap_or_else(|| input.image_url.trim().to_string());

        let name = input.name.trim().to_string();
        let category = input.category.trim().to_string();
        let search_text = product::search_text(&name, &input.description, &category);

        let txn = self.db.begin().await?;

        let product = product::ActiveModel {
            id: Set(id),
            name: Set(name),
            description: Set(input.description),
            price: Set(input.price),
            image_url: Set(image_url),
            category: Set(category),
            stock: Set(input.stock),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
            search_text: Set(search_text),
        }
        .insert(&txn)
        .await?;

        replace_images(&txn, id, &images).await?;
        txn.commit().await?;

        self.event_sender.send_or_log(Event::ProductCreated(id));
        info!("Created product: {}", id);
        Ok(product)
    }

    #[instrument(skip(self, input))]
    pub async fn update_product(
        &self,
        id: Uuid,
        input: ProductInput,
    ) -> Result<product::Model, ServiceError> {
        input.validate()?;
        let images = clean_images(&input.images);

        let txn = self.db.begin().await?;

        let existing = product::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", id)))?;

        let image_url = images
            .first()
            .cloned()
            .unwrap_or_else(|| input.image_url.trim().to_string());

        let name = input.name.trim().to_string();
        let category = input.category.trim().to_string();

        let mut active: product::ActiveModel = existing.into();
        active.search_text = Set(product::search_text(&name, &input.description, &category));
        active.name = Set(name);
        active.description = Set(input.description);
        active.price = Set(input.price);
        active.image_url = Set(image_url);
        active.category = Set(category);
        active.stock = Set(input.stock);
        active.updated_at = Set(Some(Utc::now()));
        let product = active.update(&txn).await?;

        if !images.is_empty() {
            replace_images(&txn, id, &images).await?;
        }
        txn.commit().await?;

        self.event_sender.send_or_log(Event::ProductUpdated(id));
        info!("Updated product: {}", id);
        Ok(product)
    }

    #[instrument(skip(self))]
    pub async fn delete_product(&self, id: Uuid) -> Result<(), ServiceError> {
        let txn = self.db.begin().await?;

        product::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", id)))?;

        product_image::Entity::delete_many()
            .filter(product_image::Column::ProductId.eq(id))
            .exec(&txn)
            .await?;
        product_variant::Entity::delete_many()
            .filter(product_variant::Column::ProductId.eq(id))
            .exec(&txn)
            .await?;
        product::Entity::delete_by_id(id).exec(&txn).await?;

        txn.commit().await?;

        self.event_sender.send_or_log(Event::ProductDeleted(id));
        info!("Deleted product: {}", id);
        Ok(())
    }

    #[instrument(skip(self, input))]
    pub async fn create_variant(
        &self,
        product_id: Uuid,
        input: VariantInput,
    ) -> Result<product_variant::Model, ServiceError> {
        input.validate()?;
        self.get_product(product_id).await?;

        let variant = product_variant::ActiveModel {
            id: Set(Uuid::new_v4()),
            product_id: Set(product_id),
            name: Set(input.name.trim().to_string()),
            value: Set(input.value.trim().to_string()),
            price_adjustment: Set(input.price_adjustment),
            stock: Set(input.stock),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.db)
        .await?;

        info!("Added variant {} to product {}", variant.id, product_id);
        Ok(variant)
    }

    #[instrument(skip(self))]
    pub async fn delete_variant(&self, variant_id: Uuid) -> Result<(), ServiceError> {
        let result = product_variant::Entity::delete_by_id(variant_id)
            .exec(&*self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!(
                "Variant {} not found",
                variant_id
            )));
        }
        Ok(())
    }
}

fn clean_images(images: &[String]) -> Vec<String> {
    let cleaned: Vec<String> = images
        .iter()
        .map(|url| url.trim())
        .filter(|url| !url.is_empty())
        .map(str::to_string)
        .collect();
    if cleaned.len() != images.len() {
        warn!("Ignoring {} blank image URL(s)", images.len() - cleaned.len());
    }
    cleaned
}

/// Replaces the gallery of `product_id` with `images`, `display_order` following list order.
async fn replace_images<C>(conn: &C, product_id: Uuid, images: &[String]) -> Result<(), ServiceError>
where
    C: sea_orm::ConnectionTrait,
{
    product_image::Entity::delete_many()
        .filter(product_image::Column::ProductId.eq(product_id))
        .exec(conn)
        .await?;

    if images.is_empty() {
        return Ok(());
    }

    let rows = images
        .iter()
        .enumerate()
        .map(|(idx, url)| product_image::ActiveModel {
            id: Set(Uuid::new_v4()),
            product_id: Set(product_id),
            image_url: Set(url.clone()),
            display_order: Set(idx as i32),
        });
    product_image::Entity::insert_many(rows).exec(conn).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn variant(name: &str, value: &str) -> product_variant::Model {
        product_variant::Model {
            id: Uuid::new_v4(),
            product_id: Uuid::nil(),
            name: name.into(),
            value: value.into(),
            price_adjustment: dec!(0),
            stock: 1,
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn parses_sort_options() {
        assert_eq!("price-asc".parse::<ProductSort>().unwrap(), ProductSort::PriceAsc);
        assert_eq!("".parse::<ProductSort>().unwrap(), ProductSort::Newest);
        assert!("cheapest".parse::<ProductSort>().is_err());
    }

    #[test]
    fn all_category_means_no_filter() {
        let query = ProductQuery {
            category: Some("all".into()),
            ..Default::default()
        };
        assert_eq!(query.category_filter(), None);

        let query = ProductQuery {
            category: Some(" coques ".into()),
            ..Default::default()
        };
        assert_eq!(query.category_filter(), Some("coques"));
    }

    #[test]
    fn groups_variants_by_name_in_first_seen_order() {
        let groups = group_variants(vec![
            variant("Couleur", "Noir"),
            variant("Modèle", "iPhone 13"),
            variant("Couleur", "Rouge"),
        ]);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].name, "Couleur");
        assert_eq!(groups[0].options.len(), 2);
        assert_eq!(groups[1].name, "Modèle");
    }

    #[test]
    fn like_patterns_escape_wildcards() {
        assert_eq!(escape_like("50%"), "%50\\%%");
        assert_eq!(escape_like("usb_c"), "%usb\\_c%");
    }

    #[test]
    fn product_input_validation() {
        let mut input = ProductInput {
            name: "Coque MagSafe".into(),
            description: String::new(),
            price: dec!(2500),
            image_url: String::new(),
            category: default_category(),
            stock: 4,
            images: Vec::new(),
        };
        assert!(input.validate().is_ok());

        input.name = "  ".into();
        assert!(input.validate().is_err());

        input.name = "Coque".into();
        input.price = dec!(-1);
        assert!(input.validate().is_err());

        input.price = dec!(1);
        input.stock = -2;
        assert!(input.validate().is_err());
    }

    #[test]
    fn blank_images_are_dropped() {
        let cleaned = clean_images(&["a.jpg".into(), " ".into(), " b.jpg ".into()]);
        assert_eq!(cleaned, vec!["a.jpg".to_string(), "b.jpg".to_string()]);
    }
}
