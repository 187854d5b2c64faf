use crate::{entities::category, errors::ServiceError};
use sea_orm::{DatabaseConnection, EntityTrait, PaginatorTrait, QueryOrder, Set};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

const DEFAULT_CATEGORIES: [(&str, &str, &str); 6] = [
    (
        "coques",
        "Coques",
        "https://images.unsplash.com/photo-1601784551446-20c9e07cdbdb?w=600&h=400&fit=crop",
    ),
    (
        "chargeurs",
        "Chargeurs",
        "https://images.unsplash.com/photo-1583863788434-e58a36330cf0?w=600&h=400&fit=crop",
    ),
    (
        "ecouteurs",
        "Écouteurs",
        "https://images.unsplash.com/photo-1590658268037-6bf12165a8df?w=600&h=400&fit=crop",
    ),
    (
        "cables",
        "Câbles",
        "https://images.unsplash.com/photo-1558618666-fcd25c85cd64?w=600&h=400&fit=crop",
    ),
    (
        "protections",
        "Protections d'écran",
        "https://images.unsplash.com/photo-1585060544812-6b45742d762f?w=600&h=400&fit=crop",
    ),
    (
        "supports",
        "Supports",
        "https://images.unsplash.com/photo-1556656793-08538906a9f8?w=600&h=400&fit=crop",
    ),
];

/// Built-in categories, shown while the categories table is empty.
pub fn default_categories() -> Vec<category::Model> {
    DEFAULT_CATEGORIES
        .iter()
        .enumerate()
        .map(|(idx, (slug, name, image_url))| category::Model {
            id: Uuid::from_u128(idx as u128 + 1),
            name: (*name).to_string(),
            slug: (*slug).to_string(),
            image_url: (*image_url).to_string(),
        })
        .collect()
}

#[derive(Clone)]
pub struct CategoryService {
    db: Arc<DatabaseConnection>,
}

impl CategoryService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn list_categories(&self) -> Result<Vec<category::Model>, ServiceError> {
        let categories = category::Entity::find()
            .order_by_asc(category::Column::Name)
            .all(&*self.db)
            .await?;
        if categories.is_empty() {
            return Ok(default_categories());
        }
        Ok(categories)
    }

    /// Inserts the built-in categories when none exist. Returns how many were inserted.
    #[instrument(skip(self))]
    pub async fn seed_defaults(&self) -> Result<usize, ServiceError> {
        if category::Entity::find().count(&*self.db).await? > 0 {
            return Ok(0);
        }

        let defaults = default_categories();
        let count = defaults.len();
        let rows = defaults.into_iter().map(|c| category::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(c.name),
            slug: Set(c.slug),
            image_url: Set(c.image_url),
        });
        category::Entity::insert_many(rows).exec(&*self.db).await?;

        info!("Seeded {} default categories", count);
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_the_storefront_categories() {
        let slugs: Vec<String> = default_categories().into_iter().map(|c| c.slug).collect();
        assert_eq!(
            slugs,
            vec!["coques", "chargeurs", "ecouteurs", "cables", "protections", "supports"]
        );
    }
}
