//! Client-side cart and favorites.
//!
//! Both live only on the shopper's machine, persisted with
//! [`crate::local_store::Persisted`] under the [`CART_KEY`] and [`FAVORITES_KEY`] keys.

use crate::entities::{product, product_variant};
use crate::local_store::{LocalStore, Persisted};
use crate::services::orders::OrderLineInput;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const CART_KEY: &str = "cart";
pub const FAVORITES_KEY: &str = "favorites";

pub type PersistedCart<S> = Persisted<Cart, S>;
pub type PersistedFavorites<S> = Persisted<Favorites, S>;

pub fn load_cart<S: LocalStore>(store: S) -> PersistedCart<S> {
    Persisted::load(store, CART_KEY)
}

pub fn load_favorites<S: LocalStore>(store: S) -> PersistedFavorites<S> {
    Persisted::load(store, FAVORITES_KEY)
}

/// Chosen options of one product, at most one per option group.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariantSelection {
    variants: Vec<product_variant::Model>,
}

impl VariantSelection {
    pub fn variants(&self) -> &[product_variant::Model] {
        &self.variants
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    /// Selects `variant`, replacing any option already chosen in its group.
    pub fn select(&mut self, variant: product_variant::Model) {
        match self.variants.iter_mut().find(|v| v.name == variant.name) {
            Some(current) => *current = variant,
            None => self.variants.push(variant),
        }
    }

    pub fn ids(&self) -> Vec<Uuid> {
        self.variants.iter().map(|v| v.id).collect()
    }

    pub fn adjustments(&self) -> impl Iterator<Item = Decimal> + '_ {
        self.variants.iter().map(|v| v.price_adjustment)
    }

    /// `Couleur: Noir, Modèle: Galaxy S24`
    pub fn label(&self) -> Option<String> {
        (!self.is_empty()).then(|| {
            self.variants
                .iter()
                .map(product_variant::Model::label)
                .collect::<Vec<_>>()
                .join(", ")
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub product: product::Model,
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "VariantSelection::is_empty")]
    pub variants: VariantSelection,
}

impl CartItem {
    pub fn unit_price(&self) -> Decimal {
        crate::pricing::unit_price(self.product.price, self.variants.adjustments())
    }

    pub fn line_total(&self) -> Decimal {
        crate::pricing::line_total(self.unit_price(), self.quantity)
    }
}

/// Quantity bounds: at least one, and no more than the known stock when the product has any.
fn clamp_quantity(quantity: u32, stock: i32) -> u32 {
    let quantity = quantity.max(1);
    if stock > 0 {
        quantity.min(stock as u32)
    } else {
        quantity
    }
}

/// Ordered cart lines, unique by product id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, product_id: Uuid) -> Option<&CartItem> {
        self.items.iter().find(|i| i.product.id == product_id)
    }

    /// Adds one unit; returns the resulting quantity.
    pub fn add(&mut self, product: product::Model) -> u32 {
        self.add_quantity(product, 1)
    }

    /// Adds `quantity` units, merging with an existing line for that product.
    pub fn add_quantity(&mut self, product: product::Model, quantity: u32) -> u32 {
        self.add_configured(product, None, quantity)
    }

    /// Like [`Cart::add_quantity`]; a given selection replaces the line's current one.
    pub fn add_configured(
        &mut self,
        product: product::Model,
        variants: Option<VariantSelection>,
        quantity: u32,
    ) -> u32 {
        match self.items.iter_mut().find(|i| i.product.id == product.id) {
            Some(item) => {
                // Refresh the snapshot so price and stock follow the catalog.
                item.product = product;
                if let Some(variants) = variants {
                    item.variants = variants;
                }
                item.quantity = clamp_quantity(
                    item.quantity.saturating_add(quantity),
                    item.product.stock,
                );
                item.quantity
            }
            None => {
                let quantity = clamp_quantity(quantity, product.stock);
                self.items.push(CartItem {
                    product,
                    quantity,
                    variants: variants.unwrap_or_default(),
                });
                quantity
            }
        }
    }

    /// Sets the quantity of an existing line. Returns `None` when the product is not in the cart.
    pub fn update_quantity(&mut self, product_id: Uuid, quantity: u32) -> Option<u32> {
        let item = self.items.iter_mut().find(|i| i.product.id == product_id)?;
        item.quantity = clamp_quantity(quantity, item.product.stock);
        Some(item.quantity)
    }

    pub fn increment(&mut self, product_id: Uuid) -> Option<u32> {
        let current = self.get(product_id)?.quantity;
        self.update_quantity(product_id, current.saturating_add(1))
    }

    pub fn decrement(&mut self, product_id: Uuid) -> Option<u32> {
        let current = self.get(product_id)?.quantity;
        self.update_quantity(product_id, current.saturating_sub(1))
    }

    /// Returns whether a line was removed.
    pub fn remove(&mut self, product_id: Uuid) -> bool {
        let before = self.items.len();
        self.items.retain(|i| i.product.id != product_id);
        self.items.len() != before
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Sum of quantities, shown on the header badge.
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    pub fn subtotal(&self) -> Decimal {
        crate::pricing::subtotal(self.items.iter().map(|i| (i.unit_price(), i.quantity)))
    }

    pub fn checkout_lines(&self) -> Vec<OrderLineInput> {
        self.items
            .iter()
            .map(|i| OrderLineInput {
                product_id: i.product.id,
                quantity: i.quantity,
                variant_ids: i.variants.ids(),
            })
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Favorites {
    items: Vec<product::Model>,
}

impl Favorites {
    pub fn items(&self) -> &[product::Model] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_favorite(&self, product_id: Uuid) -> bool {
        self.items.iter().any(|p| p.id == product_id)
    }

    /// No-op when already present.
    pub fn add(&mut self, product: product::Model) {
        if !self.is_favorite(product.id) {
            self.items.push(product);
        }
    }

    pub fn remove(&mut self, product_id: Uuid) -> bool {
        let before = self.items.len();
        self.items.retain(|p| p.id != product_id);
        self.items.len() != before
    }

    /// Returns `true` when the product is a favorite after the call.
    pub fn toggle(&mut self, product: product::Model) -> bool {
        if self.remove(product.id) {
            false
        } else {
            self.items.push(product);
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local_store::MemoryStore;
    use chrono::Utc;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn product(price: Decimal, stock: i32) -> product::Model {
        product::Model {
            id: Uuid::new_v4(),
            name: "Chargeur rapide 20W".into(),
            description: String::new(),
            price,
            image_url: String::new(),
            category: "chargeurs".into(),
            stock,
            created_at: Utc::now(),
            updated_at: None,
            search_text: String::new(),
        }
    }

    #[test]
    fn adding_same_product_increments_quantity() {
        let mut cart = Cart::default();
        let p = product(dec!(2000), 10);
        assert_eq!(cart.add(p.clone()), 1);
        assert_eq!(cart.add(p.clone()), 2);
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.item_count(), 2);
        assert_eq!(cart.subtotal(), dec!(4000));
    }

    #[test]
    fn quantity_is_clamped_to_one_and_stock() {
        let mut cart = Cart::default();
        let p = product(dec!(500), 3);
        cart.add(p.clone());

        assert_eq!(cart.update_quantity(p.id, 0), Some(1));
        assert_eq!(cart.decrement(p.id), Some(1));
        assert_eq!(cart.update_quantity(p.id, 10), Some(3));
        assert_eq!(cart.increment(p.id), Some(3));
        assert_eq!(cart.add_quantity(p.clone(), 5), 3);
    }

    #[test]
    fn unknown_product_updates_are_ignored() {
        let mut cart = Cart::default();
        assert_eq!(cart.update_quantity(Uuid::new_v4(), 2), None);
        assert!(!cart.remove(Uuid::new_v4()));
    }

    #[test]
    fn remove_and_clear() {
        let mut cart = Cart::default();
        let a = product(dec!(100), 5);
        let b = product(dec!(200), 5);
        cart.add(a.clone());
        cart.add(b.clone());
        assert!(cart.remove(a.id));
        assert_eq!(cart.items().len(), 1);
        cart.clear();
        assert!(cart.is_empty());
        assert_eq!(cart.subtotal(), Decimal::ZERO);
    }

    #[test]
    fn checkout_lines_mirror_cart() {
        let mut cart = Cart::default();
        let p = product(dec!(1200), 9);
        cart.add_quantity(p.clone(), 4);
        let lines = cart.checkout_lines();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].product_id, p.id);
        assert_eq!(lines[0].quantity, 4);
        assert!(lines[0].variant_ids.is_empty());
    }

    fn variant(product_id: Uuid, name: &str, value: &str, adjustment: Decimal) -> product_variant::Model {
        product_variant::Model {
            id: Uuid::new_v4(),
            product_id,
            name: name.into(),
            value: value.into(),
            price_adjustment: adjustment,
            stock: 5,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn selecting_in_the_same_group_replaces_the_option() {
        let p = product(dec!(2000), 10);
        let mut selection = VariantSelection::default();
        selection.select(variant(p.id, "Couleur", "Noir", dec!(0)));
        selection.select(variant(p.id, "Modèle", "Galaxy S24", dec!(300)));
        let bleu = variant(p.id, "Couleur", "Bleu", dec!(100));
        selection.select(bleu.clone());

        assert_eq!(selection.variants().len(), 2);
        assert_eq!(selection.variants()[0].id, bleu.id);
        assert_eq!(
            selection.label().as_deref(),
            Some("Couleur: Bleu, Modèle: Galaxy S24")
        );

        let mut cart = Cart::default();
        cart.add_configured(p.clone(), Some(selection.clone()), 2);
        assert_eq!(cart.items()[0].unit_price(), dec!(2400));
        assert_eq!(cart.subtotal(), dec!(4800));
        assert_eq!(cart.checkout_lines()[0].variant_ids, selection.ids());

        // plain adds keep the chosen options
        cart.add(p);
        assert_eq!(cart.items()[0].variants, selection);
        assert_eq!(cart.item_count(), 3);
    }

    #[test]
    fn carts_saved_without_variants_still_load() {
        let p = product(dec!(750), 4);
        let raw = serde_json::json!([{ "product": p, "quantity": 2 }]).to_string();
        let cart: Cart = serde_json::from_str(&raw).unwrap();
        assert!(cart.items()[0].variants.is_empty());
        assert_eq!(cart.subtotal(), dec!(1500));
    }

    #[test]
    fn favorites_toggle_and_idempotent_add() {
        let mut favorites = Favorites::default();
        let p = product(dec!(900), 1);
        favorites.add(p.clone());
        favorites.add(p.clone());
        assert_eq!(favorites.len(), 1);
        assert!(favorites.is_favorite(p.id));

        assert!(!favorites.toggle(p.clone()));
        assert!(!favorites.is_favorite(p.id));
        assert!(favorites.toggle(p.clone()));
        assert!(favorites.is_favorite(p.id));
    }

    #[test]
    fn cart_survives_reload_from_store() {
        let store = Arc::new(MemoryStore::new());
        let p = product(dec!(3500), 2);

        let mut cart = load_cart(store.clone());
        cart.update(|c| c.add(p.clone())).unwrap();

        let reloaded = load_cart(store);
        assert_eq!(reloaded.get().item_count(), 1);
        assert_eq!(reloaded.get().items()[0].product.id, p.id);
    }

    proptest! {
        #[test]
        fn count_and_subtotal_match_lines(
            lines in prop::collection::vec((1i64..100_000, 1u32..20, 0i32..30), 1..10)
        ) {
            let mut cart = Cart::default();
            for (price, qty, stock) in lines {
                cart.add_quantity(product(Decimal::from(price), stock), qty);
            }
            let count: u32 = cart.items().iter().map(|i| i.quantity).sum();
            let subtotal: Decimal = cart.items().iter().map(|i| i.line_total()).sum();
            prop_assert_eq!(cart.item_count(), count);
            prop_assert_eq!(cart.subtotal(), subtotal);
            for item in cart.items() {
                prop_assert!(item.quantity >= 1);
                if item.product.stock > 0 {
                    prop_assert!(item.quantity as i32 <= item.product.stock);
                }
            }
        }
    }
}
