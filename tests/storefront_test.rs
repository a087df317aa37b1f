mod common;

use depoauto_ops::app::storefront::{self, ProductFilter, PAGE_SIZE, RELATED_LIMIT};
use depoauto_ops::core::paths::StorageLocation;
use depoauto_ops::db::queries::{products, related, site, variants};
use depoauto_ops::domain::model::{NewHeroSlide, NewVariantImage};
use depoauto_ops::{CatalogDb, MediaUrls};
use rust_decimal::Decimal;

fn urls() -> MediaUrls {
    MediaUrls::new("https://cdn.example.com", StorageLocation::new("media"))
}

fn price(value: i64) -> Decimal {
    Decimal::from(value)
}

#[test]
fn test_home_page_sections() {
    let db = CatalogDb::open_in_memory().unwrap();
    for (i, name) in ["Zapatas", "Aceites", "Bujías", "Correas", "Discos", "Escapes", "Filtros"]
        .iter()
        .enumerate()
    {
        common::add_product(&db, name, &format!("SKU-{}", i), price(10));
    }
    for i in 0..3 {
        common::add_product(&db, "Aceites", &format!("EXTRA-{}", i), price(5));
    }

    let conn = db.conn();
    let config = site::load_site_config(&conn).unwrap();
    site::add_hero_slide(
        &conn,
        &NewHeroSlide {
            title: "Promo".to_string(),
            image_file: Some("hero/promo.webp".to_string()),
            sort_order: 2,
            is_active: true,
            ..Default::default()
        },
    )
    .unwrap();
    site::add_hero_slide(
        &conn,
        &NewHeroSlide {
            title: "Oculto".to_string(),
            is_active: false,
            ..Default::default()
        },
    )
    .unwrap();

    let page = storefront::home_page(&conn, &config, &urls()).unwrap();

    assert_eq!(page.slides.len(), 1);
    assert_eq!(page.slides[0].title, "Promo");
    assert_eq!(
        page.slides[0].image_url.as_deref(),
        Some("https://cdn.example.com/media/hero/promo.webp")
    );

    let names: Vec<&str> = page.categories.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Aceites", "Bujías", "Correas", "Discos", "Escapes", "Filtros"]);

    assert_eq!(page.featured.len(), 8);
}

#[test]
fn test_product_list_filters_and_pagination() {
    let db = CatalogDb::open_in_memory().unwrap();
    for i in 0..15 {
        common::add_product(&db, "Frenos", &format!("FR-{:02}", i), price(10 + i));
    }
    let oil = common::add_product(&db, "Aceites", "AC-1", price(40));
    let hidden = common::add_product(&db, "Aceites", "AC-2", price(40));

    let conn = db.conn();
    products::update_description(&conn, oil.id, "Aceite sintético 5W30").unwrap();
    products::set_product_active(&conn, hidden.id, false).unwrap();

    let all = storefront::product_list(&conn, &ProductFilter::default(), &urls()).unwrap();
    assert_eq!(all.total, 16);
    assert_eq!(all.num_pages, 2);
    assert_eq!(all.page, 1);
    assert_eq!(all.products.len(), PAGE_SIZE);
    assert_eq!(all.products[0].sku, "AC-1");
    assert_eq!(all.categories.len(), 2);

    let last = storefront::product_list(
        &conn,
        &ProductFilter {
            page: 99,
            ..Default::default()
        },
        &urls(),
    )
    .unwrap();
    assert_eq!(last.page, 2);
    assert_eq!(last.products.len(), 4);

    let frenos = storefront::product_list(
        &conn,
        &ProductFilter {
            category_slug: Some("frenos".to_string()),
            min_price: Some(price(20)),
            max_price: Some(price(22)),
            ..Default::default()
        },
        &urls(),
    )
    .unwrap();
    let skus: Vec<&str> = frenos.products.iter().map(|p| p.sku.as_str()).collect();
    assert_eq!(skus, vec!["FR-10", "FR-11", "FR-12"]);
    assert_eq!(frenos.selected_category.unwrap().name, "Frenos");

    let search = storefront::product_list(
        &conn,
        &ProductFilter {
            query: Some("SINTÉTICO".to_string()),
            category_slug: Some("no-such-category".to_string()),
            ..Default::default()
        },
        &urls(),
    )
    .unwrap();
    assert!(search.selected_category.is_none());
    assert_eq!(search.total, 1);
    assert_eq!(search.products[0].sku, "AC-1");

    let empty = storefront::product_list(
        &conn,
        &ProductFilter {
            query: Some("nada".to_string()),
            page: 3,
            ..Default::default()
        },
        &urls(),
    )
    .unwrap();
    assert_eq!(empty.total, 0);
    assert_eq!(empty.num_pages, 1);
    assert_eq!(empty.page, 1);
}

#[test]
fn test_product_detail_related_and_images() {
    let db = CatalogDb::open_in_memory().unwrap();
    let main = common::add_product(&db, "Frenos", "MAIN", price(10));
    let curated_other = common::add_product(&db, "Luces", "LUZ", price(10));
    let curated_inactive = common::add_product(&db, "Luces", "OFF", price(10));
    for i in 0..10 {
        common::add_product(&db, "Frenos", &format!("FR-{:02}", i), price(10));
    }

    let conn = db.conn();
    products::set_product_active(&conn, curated_inactive.id, false).unwrap();
    related::link_products(&conn, main.id, curated_inactive.id, 0).unwrap();
    related::link_products(&conn, main.id, curated_other.id, 1).unwrap();

    let variant = variants::ensure_default_variant(&conn, main.id).unwrap();
    variants::add_variant_image(
        &conn,
        variant.id,
        &NewVariantImage {
            image_url: "https://img.example.com/back.jpg".to_string(),
            alt_text: "back".to_string(),
            sort_order: 0,
            ..Default::default()
        },
    )
    .unwrap();
    variants::add_variant_image(
        &conn,
        variant.id,
        &NewVariantImage {
            image_file: Some("variants/main/front.webp".to_string()),
            image_url: "https://img.example.com/ignored.jpg".to_string(),
            alt_text: "front".to_string(),
            is_main: true,
            sort_order: 1,
        },
    )
    .unwrap();

    let detail = storefront::product_detail(&conn, &main.slug, &urls())
        .unwrap()
        .unwrap();

    assert_eq!(detail.category.as_ref().unwrap().name, "Frenos");
    assert_eq!(detail.variants.len(), 1);
    let images = &detail.variants[0].images;
    assert_eq!(images[0].alt_text, "front");
    assert_eq!(
        images[0].url.as_deref(),
        Some("https://cdn.example.com/media/variants/main/front.webp")
    );
    assert_eq!(images[1].url.as_deref(), Some("https://img.example.com/back.jpg"));

    assert_eq!(detail.related.len(), RELATED_LIMIT);
    assert_eq!(detail.related[0].sku, "LUZ");
    assert!(detail.related.iter().all(|p| p.sku != "OFF" && p.sku != "MAIN"));
    assert!(detail.related[1..].iter().all(|p| p.sku.starts_with("FR-")));

    // 反向關聯也要看得到
    let reverse = storefront::product_detail(&conn, &curated_other.slug, &urls())
        .unwrap()
        .unwrap();
    assert_eq!(reverse.related[0].sku, "MAIN");

    assert!(storefront::product_detail(&conn, "no-such-product", &urls())
        .unwrap()
        .is_none());
}
