use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub image_url: String,
    pub image_file: Option<String>,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub sku: String,
    pub category_id: i64,
    pub description: String,
    pub image_url: String,
    pub image_file: Option<String>,
    pub price: Decimal,
    pub stock: i64,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// 匯入或後台寫入商品時使用的欄位集合
#[derive(Debug, Clone, PartialEq)]
pub struct ProductFields {
    pub name: String,
    pub category_id: i64,
    pub description: String,
    pub price: Decimal,
    pub stock: i64,
    pub is_active: bool,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductVariant {
    pub id: i64,
    pub product_id: i64,
    pub name: String,
    pub sort_order: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantImage {
    pub id: i64,
    pub variant_id: i64,
    pub image_url: String,
    pub image_file: Option<String>,
    pub alt_text: String,
    pub is_main: bool,
    pub sort_order: i64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewVariantImage {
    pub image_url: String,
    pub image_file: Option<String>,
    pub alt_text: String,
    pub is_main: bool,
    pub sort_order: i64,
}

/// One direction of a related-products edge. Edges always exist in pairs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelatedProduct {
    pub id: i64,
    pub from_product_id: i64,
    pub to_product_id: i64,
    pub sort_order: i64,
}

/// Site-wide settings. Loaded once from the single `site_config` row and
/// passed explicitly to whatever builds pages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteConfig {
    pub hero_title: String,
    pub hero_subtitle: String,
    pub hero_images: [HeroImageSlot; 3],
    pub show_hero: bool,
    pub show_categories: bool,
    pub show_featured: bool,
    pub contact_email: String,
    pub from_email: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeroImageSlot {
    pub file: Option<String>,
    pub url: String,
}

impl HeroImageSlot {
    pub fn is_empty(&self) -> bool {
        self.file.as_deref().map_or(true, str::is_empty) && self.url.is_empty()
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            hero_title: String::new(),
            hero_subtitle: String::new(),
            hero_images: Default::default(),
            show_hero: true,
            show_categories: true,
            show_featured: true,
            contact_email: String::new(),
            from_email: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeroSlide {
    pub id: i64,
    pub title: String,
    pub subtitle: String,
    pub image_url: String,
    pub image_file: Option<String>,
    pub link_url: String,
    pub sort_order: i64,
    pub is_active: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewHeroSlide {
    pub title: String,
    pub subtitle: String,
    pub image_url: String,
    pub image_file: Option<String>,
    pub link_url: String,
    pub sort_order: i64,
    pub is_active: bool,
}

/// A listing entry returned by an object store.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectInfo {
    pub key: String,
    pub size: u64,
    pub last_modified: Option<DateTime<Utc>>,
}

/// Metadata attached to an uploaded object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PutOptions {
    pub content_type: Option<String>,
    pub cache_control: Option<String>,
}

impl PutOptions {
    pub fn with_content_type(content_type: impl Into<String>) -> Self {
        Self {
            content_type: Some(content_type.into()),
            cache_control: None,
        }
    }

    pub fn cache_control(mut self, value: impl Into<String>) -> Self {
        self.cache_control = Some(value.into());
        self
    }
}
