use crate::domain::model::{HeroImageSlot, HeroSlide, NewHeroSlide, SiteConfig};
use crate::utils::error::{OpsError, Result};
use rusqlite::{Connection, OptionalExtension};

/// Reads the single site configuration row seeded by the schema.
pub fn load_site_config(conn: &Connection) -> Result<SiteConfig> {
    let config = conn
        .query_row(
            "SELECT hero_title, hero_subtitle,
                    hero_image_1_file, hero_image_1_url,
                    hero_image_2_file, hero_image_2_url,
                    hero_image_3_file, hero_image_3_url,
                    show_hero, show_categories, show_featured,
                    contact_email, from_email
             FROM site_config WHERE id = 1",
            [],
            |row| {
                Ok(SiteConfig {
                    hero_title: row.get(0)?,
                    hero_subtitle: row.get(1)?,
                    hero_images: [
                        HeroImageSlot {
                            file: row.get(2)?,
                            url: row.get(3)?,
                        },
                        HeroImageSlot {
                            file: row.get(4)?,
                            url: row.get(5)?,
                        },
                        HeroImageSlot {
                            file: row.get(6)?,
                            url: row.get(7)?,
                        },
                    ],
                    show_hero: row.get(8)?,
                    show_categories: row.get(9)?,
                    show_featured: row.get(10)?,
                    contact_email: row.get(11)?,
                    from_email: row.get(12)?,
                })
            },
        )
        .optional()?;

    config.ok_or_else(|| OpsError::NotFound {
        entity: "SiteConfig".to_string(),
        key: "1".to_string(),
    })
}

pub fn update_site_config(conn: &Connection, config: &SiteConfig) -> Result<()> {
    let [slot1, slot2, slot3] = &config.hero_images;
    conn.execute(
        "UPDATE site_config SET
            hero_title = :hero_title,
            hero_subtitle = :hero_subtitle,
            hero_image_1_file = :h1_file, hero_image_1_url = :h1_url,
            hero_image_2_file = :h2_file, hero_image_2_url = :h2_url,
            hero_image_3_file = :h3_file, hero_image_3_url = :h3_url,
            show_hero = :show_hero,
            show_categories = :show_categories,
            show_featured = :show_featured,
            contact_email = :contact_email,
            from_email = :from_email,
            updated_at = datetime('now')
         WHERE id = 1",
        rusqlite::named_params! {
            ":hero_title": &config.hero_title,
            ":hero_subtitle": &config.hero_subtitle,
            ":h1_file": &slot1.file,
            ":h1_url": &slot1.url,
            ":h2_file": &slot2.file,
            ":h2_url": &slot2.url,
            ":h3_file": &slot3.file,
            ":h3_url": &slot3.url,
            ":show_hero": config.show_hero,
            ":show_categories": config.show_categories,
            ":show_featured": config.show_featured,
            ":contact_email": &config.contact_email,
            ":from_email": &config.from_email,
        },
    )?;
    Ok(())
}

fn parse_slide_row(row: &rusqlite::Row) -> rusqlite::Result<HeroSlide> {
    Ok(HeroSlide {
        id: row.get(0)?,
        title: row.get(1)?,
        subtitle: row.get(2)?,
        image_url: row.get(3)?,
        image_file: row.get(4)?,
        link_url: row.get(5)?,
        sort_order: row.get(6)?,
        is_active: row.get(7)?,
    })
}

/// Slides by sort order; `active_only` hides disabled ones.
pub fn list_hero_slides(conn: &Connection, active_only: bool) -> Result<Vec<HeroSlide>> {
    let mut stmt = conn.prepare(
        "SELECT id, title, subtitle, image_url, image_file, link_url, sort_order, is_active
         FROM hero_slides
         WHERE (?1 = 0 OR is_active = 1)
         ORDER BY sort_order, id",
    )?;
    let slides = stmt
        .query_map([active_only], parse_slide_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(slides)
}

pub fn add_hero_slide(conn: &Connection, slide: &NewHeroSlide) -> Result<HeroSlide> {
    conn.execute(
        "INSERT INTO hero_slides (title, subtitle, image_url, image_file, link_url, sort_order, is_active)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        rusqlite::params![
            slide.title,
            slide.subtitle,
            slide.image_url,
            slide.image_file,
            slide.link_url,
            slide.sort_order,
            slide.is_active
        ],
    )?;
    let id = conn.last_insert_rowid();
    let slide = conn.query_row(
        "SELECT id, title, subtitle, image_url, image_file, link_url, sort_order, is_active
         FROM hero_slides WHERE id = ?1",
        [id],
        parse_slide_row,
    )?;
    Ok(slide)
}

pub fn delete_hero_slide(conn: &Connection, id: i64) -> Result<bool> {
    Ok(conn.execute("DELETE FROM hero_slides WHERE id = ?1", [id])? > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::CatalogDb;

    #[test]
    fn test_seeded_defaults() {
        let db = CatalogDb::open_in_memory().unwrap();
        let config = load_site_config(&db.conn()).unwrap();
        assert_eq!(config, SiteConfig::default());
        assert!(config.hero_images.iter().all(HeroImageSlot::is_empty));
    }

    #[test]
    fn test_update_round_trips() {
        let db = CatalogDb::open_in_memory().unwrap();
        let conn = db.conn();

        let mut config = load_site_config(&conn).unwrap();
        config.hero_title = "Repuestos al instante".to_string();
        config.hero_images[1] = HeroImageSlot {
            file: Some("hero/banner.webp".to_string()),
            url: String::new(),
        };
        config.show_featured = false;
        config.contact_email = "ventas@example.com".to_string();
        update_site_config(&conn, &config).unwrap();

        assert_eq!(load_site_config(&conn).unwrap(), config);
    }

    #[test]
    fn test_hero_slides_order_and_filter() {
        let db = CatalogDb::open_in_memory().unwrap();
        let conn = db.conn();

        let second = add_hero_slide(
            &conn,
            &NewHeroSlide {
                title: "B".to_string(),
                sort_order: 2,
                is_active: true,
                ..Default::default()
            },
        )
        .unwrap();
        add_hero_slide(
            &conn,
            &NewHeroSlide {
                title: "A".to_string(),
                sort_order: 1,
                is_active: true,
                ..Default::default()
            },
        )
        .unwrap();
        add_hero_slide(
            &conn,
            &NewHeroSlide {
                title: "hidden".to_string(),
                sort_order: 0,
                is_active: false,
                ..Default::default()
            },
        )
        .unwrap();

        let titles: Vec<_> = list_hero_slides(&conn, true)
            .unwrap()
            .into_iter()
            .map(|s| s.title)
            .collect();
        assert_eq!(titles, vec!["A", "B"]);
        assert_eq!(list_hero_slides(&conn, false).unwrap().len(), 3);

        assert!(delete_hero_slide(&conn, second.id).unwrap());
        assert!(!delete_hero_slide(&conn, second.id).unwrap());
    }
}
