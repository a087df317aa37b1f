#![allow(dead_code)]

use depoauto_ops::db::queries::{categories, products};
use depoauto_ops::domain::model::{Product, ProductFields};
use depoauto_ops::CatalogDb;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use rust_decimal::Decimal;
use std::io::Cursor;

pub fn png_with_alpha() -> Vec<u8> {
    let img = RgbaImage::from_fn(16, 16, |x, _| Rgba([200, 40, 40, if x < 8 { 255 } else { 32 }]));
    encode(DynamicImage::ImageRgba8(img), ImageFormat::Png)
}

pub fn opaque_png() -> Vec<u8> {
    let img = RgbImage::from_pixel(16, 16, Rgb([10, 120, 200]));
    encode(DynamicImage::ImageRgb8(img), ImageFormat::Png)
}

pub fn jpeg_rgb() -> Vec<u8> {
    let img = RgbImage::from_fn(16, 16, |x, y| Rgb([(x * 15) as u8, (y * 15) as u8, 90]));
    encode(DynamicImage::ImageRgb8(img), ImageFormat::Jpeg)
}

fn encode(image: DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut out = Vec::new();
    image.write_to(&mut Cursor::new(&mut out), format).unwrap();
    out
}

/// Active product in `category`, named after its SKU.
pub fn add_product(db: &CatalogDb, category: &str, sku: &str, price: Decimal) -> Product {
    let conn = db.conn();
    let (category, _) = categories::get_or_create_category(&conn, category).unwrap();
    let fields = ProductFields {
        name: sku.to_string(),
        category_id: category.id,
        description: String::new(),
        price,
        stock: 5,
        is_active: true,
        image_url: None,
    };
    let slug = products::make_unique_product_slug(&conn, sku, sku, None).unwrap();
    products::create_product(&conn, sku, &slug, &fields).unwrap()
}

pub fn set_product_image_file(db: &CatalogDb, product_id: i64, file: &str) {
    db.conn()
        .execute(
            "UPDATE products SET image_file = ?1 WHERE id = ?2",
            rusqlite::params![file, product_id],
        )
        .unwrap();
}
