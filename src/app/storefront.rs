//! Read models behind the public catalog pages.
//!
//! Nothing here renders HTML; each builder returns plain serializable
//! values for whatever front-end is attached. Site settings are passed in
//! explicitly, loaded once by the caller.

use crate::adapters::storage::MediaUrls;
use crate::db::queries::{categories, products, related, site, variants};
use crate::domain::model::{Category, Product, SiteConfig};
use crate::utils::error::Result;
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::Serialize;

pub const HOME_CATEGORIES: usize = 6;
pub const HOME_FEATURED: usize = 8;
pub const PAGE_SIZE: usize = 12;
pub const RELATED_LIMIT: usize = 8;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryCard {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub image_url: Option<String>,
}

impl CategoryCard {
    fn new(category: Category, urls: &MediaUrls) -> Self {
        Self {
            image_url: urls.display_url(category.image_file.as_deref(), &category.image_url),
            id: category.id,
            name: category.name,
            slug: category.slug,
            description: category.description,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductCard {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub sku: String,
    pub category_id: i64,
    pub price: Decimal,
    pub stock: i64,
    pub image_url: Option<String>,
}

impl ProductCard {
    fn new(product: &Product, urls: &MediaUrls) -> Self {
        Self {
            id: product.id,
            name: product.name.clone(),
            slug: product.slug.clone(),
            sku: product.sku.clone(),
            category_id: product.category_id,
            price: product.price,
            stock: product.stock,
            image_url: urls.display_url(product.image_file.as_deref(), &product.image_url),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Slide {
    pub title: String,
    pub subtitle: String,
    pub image_url: Option<String>,
    pub link_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HomePage {
    pub site: SiteConfig,
    pub slides: Vec<Slide>,
    pub categories: Vec<CategoryCard>,
    pub featured: Vec<ProductCard>,
}

/// Carousel slides: active hero slides by sort order, or the three legacy
/// hero image slots when no slide is active.
pub fn effective_slides(conn: &Connection, config: &SiteConfig, urls: &MediaUrls) -> Result<Vec<Slide>> {
    let slides: Vec<Slide> = site::list_hero_slides(conn, true)?
        .into_iter()
        .map(|s| Slide {
            image_url: urls.display_url(s.image_file.as_deref(), &s.image_url),
            title: s.title,
            subtitle: s.subtitle,
            link_url: s.link_url,
        })
        .collect();
    if !slides.is_empty() {
        return Ok(slides);
    }

    Ok(config
        .hero_images
        .iter()
        .filter(|slot| !slot.is_empty())
        .map(|slot| Slide {
            title: config.hero_title.clone(),
            subtitle: config.hero_subtitle.clone(),
            image_url: urls.display_url(slot.file.as_deref(), &slot.url),
            link_url: String::new(),
        })
        .collect())
}

/// Home page: hero slides, first categories by name, newest products.
/// Sections switched off in the site settings come back empty.
pub fn home_page(conn: &Connection, config: &SiteConfig, urls: &MediaUrls) -> Result<HomePage> {
    let slides = if config.show_hero {
        effective_slides(conn, config, urls)?
    } else {
        Vec::new()
    };

    let categories = if config.show_categories {
        categories::list_active_categories(conn, Some(HOME_CATEGORIES))?
            .into_iter()
            .map(|c| CategoryCard::new(c, urls))
            .collect()
    } else {
        Vec::new()
    };

    let featured = if config.show_featured {
        products::newest_active_products(conn, HOME_FEATURED)?
            .iter()
            .map(|p| ProductCard::new(p, urls))
            .collect()
    } else {
        Vec::new()
    };

    Ok(HomePage {
        site: config.clone(),
        slides,
        categories,
        featured,
    })
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductFilter {
    pub category_slug: Option<String>,
    pub query: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    /// 1-based; 0 is treated as 1 and pages past the end show the last page.
    pub page: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductListPage {
    pub categories: Vec<CategoryCard>,
    pub selected_category: Option<CategoryCard>,
    pub products: Vec<ProductCard>,
    pub page: usize,
    pub num_pages: usize,
    pub total: usize,
}

impl ProductFilter {
    fn matches(&self, product: &Product) -> bool {
        if let Some(query) = self.query.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            let query = query.to_lowercase();
            let hit = product.name.to_lowercase().contains(&query)
                || product.description.to_lowercase().contains(&query)
                || product.sku.to_lowercase().contains(&query);
            if !hit {
                return false;
            }
        }
        if self.min_price.is_some_and(|min| product.price < min) {
            return false;
        }
        if self.max_price.is_some_and(|max| product.price > max) {
            return false;
        }
        true
    }
}

/// Active products ordered by name, filtered and paginated. An unknown
/// category slug does not filter.
pub fn product_list(conn: &Connection, filter: &ProductFilter, urls: &MediaUrls) -> Result<ProductListPage> {
    let categories = categories::list_active_categories(conn, None)?
        .into_iter()
        .map(|c| CategoryCard::new(c, urls))
        .collect::<Vec<_>>();

    let selected = match filter.category_slug.as_deref().filter(|s| !s.is_empty()) {
        Some(slug) => categories::get_category_by_slug(conn, slug)?,
        None => None,
    };

    let matching: Vec<Product> = products::list_active_products(conn, selected.as_ref().map(|c| c.id))?
        .into_iter()
        .filter(|p| filter.matches(p))
        .collect();

    let total = matching.len();
    let num_pages = total.div_ceil(PAGE_SIZE).max(1);
    let page = filter.page.clamp(1, num_pages);

    let products = matching
        .iter()
        .skip((page - 1) * PAGE_SIZE)
        .take(PAGE_SIZE)
        .map(|p| ProductCard::new(p, urls))
        .collect();

    Ok(ProductListPage {
        categories,
        selected_category: selected.map(|c| CategoryCard::new(c, urls)),
        products,
        page,
        num_pages,
        total,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageView {
    pub url: Option<String>,
    pub alt_text: String,
    pub is_main: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariantView {
    pub id: i64,
    pub name: String,
    pub images: Vec<ImageView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductDetail {
    pub product: ProductCard,
    pub description: String,
    pub category: Option<CategoryCard>,
    pub variants: Vec<VariantView>,
    pub related: Vec<ProductCard>,
}

/// Product page by slug; `None` when missing or inactive.
///
/// Related products are the curated edges (active targets, by sort order)
/// topped up with other active products of the same category until
/// [`RELATED_LIMIT`] is reached.
pub fn product_detail(conn: &Connection, slug: &str, urls: &MediaUrls) -> Result<Option<ProductDetail>> {
    let Some(product) = products::get_active_product_by_slug(conn, slug)? else {
        return Ok(None);
    };

    let mut variant_views = Vec::new();
    for variant in variants::list_variants(conn, product.id)? {
        let images = variants::list_variant_images(conn, variant.id)?
            .into_iter()
            .map(|img| ImageView {
                url: urls.display_url(img.image_file.as_deref(), &img.image_url),
                alt_text: img.alt_text,
                is_main: img.is_main,
            })
            .collect();
        variant_views.push(VariantView {
            id: variant.id,
            name: variant.name,
            images,
        });
    }

    let curated_ids: Vec<i64> = related::related_edges(conn, product.id)?
        .into_iter()
        .map(|edge| edge.to_product_id)
        .collect();

    let mut related_cards = Vec::new();
    for id in &curated_ids {
        if let Some(p) = products::get_product(conn, *id)?.filter(|p| p.is_active) {
            related_cards.push(ProductCard::new(&p, urls));
        }
    }

    let mut exclude = curated_ids;
    exclude.push(product.id);
    let room = RELATED_LIMIT.saturating_sub(related_cards.len());
    for p in products::active_in_category_excluding(conn, product.category_id, &exclude, room)? {
        related_cards.push(ProductCard::new(&p, urls));
    }

    let category = categories::get_category(conn, product.category_id)?
        .map(|c| CategoryCard::new(c, urls));

    Ok(Some(ProductDetail {
        product: ProductCard::new(&product, urls),
        description: product.description,
        category,
        variants: variant_views,
        related: related_cards,
    }))
}
