// src/db/catalog.rs
//
// Products, variants, categories and tags.

use serde::Deserialize;
use sqlx::{PgConnection, PgPool, Row};
use utoipa::ToSchema;

use crate::models::{Category, Product, ProductDetail, ProductVariant, Tag};

const PRODUCT_COLUMNS: &str =
    "id, name, slug, description, base_price, currency, category_id, is_active, created_at, updated_at";

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct VariantInput {
    pub name: String,
    /// Overrides the product base price (minor units).
    pub price: Option<i64>,
    #[serde(default)]
    pub images: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ProductInput {
    pub name: String,
    pub slug: Option<String>,
    pub description: Option<String>,
    /// Minor units.
    pub base_price: i64,
    pub currency: Option<String>,
    pub category_id: Option<i32>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub variants: Vec<VariantInput>,
    #[serde(default)]
    pub tag_ids: Vec<i32>,
}

fn default_true() -> bool {
    true
}

impl ProductInput {
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("name is required".into());
        }
        if self.base_price < 0 {
            return Err("base_price must not be negative".into());
        }
        if self.slug().is_empty() {
            return Err("slug must contain at least one letter or digit".into());
        }
        if self.variants.is_empty() {
            return Err("at least one variant is required".into());
        }
        for (i, v) in self.variants.iter().enumerate() {
            if v.name.trim().is_empty() {
                return Err(format!("variant {} needs a name", i + 1));
            }
            if v.price.is_some_and(|p| p < 0) {
                return Err(format!("variant {} has a negative price", i + 1));
            }
        }
        Ok(())
    }

    pub fn slug(&self) -> String {
        super::slugify(self.slug.as_deref().unwrap_or(&self.name))
    }

    fn currency(&self) -> String {
        self.currency
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or("INR")
            .to_ascii_uppercase()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductQuery {
    /// Category slug.
    pub category: Option<String>,
    /// Tag slug.
    pub tag: Option<String>,
}

async fn replace_children(conn: &mut PgConnection, product_id: i32, input: &ProductInput) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM product_variants WHERE product_id = $1")
        .bind(product_id)
        .execute(&mut *conn)
        .await?;
    sqlx::query("DELETE FROM product_tags WHERE product_id = $1")
        .bind(product_id)
        .execute(&mut *conn)
        .await?;

    for (pos, variant) in input.variants.iter().enumerate() {
        sqlx::query(
            r#"INSERT INTO product_variants (product_id, name, price, images, position)
               VALUES ($1, $2, $3, $4, $5)"#,
        )
        .bind(product_id)
        .bind(variant.name.trim())
        .bind(variant.price)
        .bind(&variant.images)
        .bind(pos as i32)
        .execute(&mut *conn)
        .await?;
    }

    if !input.tag_ids.is_empty() {
        sqlx::query(
            r#"INSERT INTO product_tags (product_id, tag_id)
               SELECT $1, UNNEST($2::int[])
               ON CONFLICT DO NOTHING"#,
        )
        .bind(product_id)
        .bind(&input.tag_ids)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

pub async fn create_product(pool: &PgPool, input: &ProductInput) -> Result<i32, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let product_id: i32 = sqlx::query(
        r#"INSERT INTO products (name, slug, description, base_price, currency, category_id, is_active)
           VALUES ($1, $2, $3, $4, $5, $6, $7)
           RETURNING id"#,
    )
    .bind(input.name.trim())
    .bind(input.slug())
    .bind(&input.description)
    .bind(input.base_price)
    .bind(input.currency())
    .bind(input.category_id)
    .bind(input.is_active)
    .fetch_one(&mut *tx)
    .await?
    .get("id");

    replace_children(&mut tx, product_id, input).await?;
    tx.commit().await?;
    Ok(product_id)
}

pub async fn update_product(pool: &PgPool, product_id: i32, input: &ProductInput) -> Result<bool, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let updated = sqlx::query(
        r#"UPDATE products
           SET name = $1, slug = $2, description = $3, base_price = $4, currency = $5,
               category_id = $6, is_active = $7, updated_at = NOW()
           WHERE id = $8"#,
    )
    .bind(input.name.trim())
    .bind(input.slug())
    .bind(&input.description)
    .bind(input.base_price)
    .bind(input.currency())
    .bind(input.category_id)
    .bind(input.is_active)
    .bind(product_id)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    if updated == 0 {
        tx.rollback().await?;
        return Ok(false);
    }

    replace_children(&mut tx, product_id, input).await?;
    tx.commit().await?;
    Ok(true)
}

pub async fn delete_product(pool: &PgPool, product_id: i32) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM products WHERE id = $1")
        .bind(product_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn list_products(pool: &PgPool, active_only: bool, query: &ProductQuery) -> Result<Vec<Product>, sqlx::Error> {
    let sql = format!(
        r#"SELECT {PRODUCT_COLUMNS} FROM products p
           WHERE (p.is_active OR NOT $1)
             AND ($2::text IS NULL OR p.category_id = (SELECT id FROM categories WHERE slug = $2))
             AND ($3::text IS NULL OR EXISTS (
                   SELECT 1 FROM product_tags pt JOIN tags t ON t.id = pt.tag_id
                   WHERE pt.product_id = p.id AND t.slug = $3))
           ORDER BY p.created_at DESC"#
    );
    sqlx::query_as::<_, Product>(&sql)
        .bind(active_only)
        .bind(query.category.as_deref())
        .bind(query.tag.as_deref())
        .fetch_all(pool)
        .await
}

pub async fn get_product(pool: &PgPool, product_id: i32) -> Result<Option<Product>, sqlx::Error> {
    let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1");
    sqlx::query_as::<_, Product>(&sql)
        .bind(product_id)
        .fetch_optional(pool)
        .await
}

pub async fn list_variants(pool: &PgPool, product_id: i32) -> Result<Vec<ProductVariant>, sqlx::Error> {
    sqlx::query_as::<_, ProductVariant>(
        "SELECT id, product_id, name, price, images, position FROM product_variants WHERE product_id = $1 ORDER BY position",
    )
    .bind(product_id)
    .fetch_all(pool)
    .await
}

pub async fn get_product_detail(pool: &PgPool, product_id: i32, active_only: bool) -> Result<Option<ProductDetail>, sqlx::Error> {
    let Some(product) = get_product(pool, product_id).await? else {
        return Ok(None);
    };
    if active_only && !product.is_active {
        return Ok(None);
    }

    let category = match product.category_id {
        Some(id) => {
            sqlx::query_as::<_, Category>("SELECT id, name, slug FROM categories WHERE id = $1")
                .bind(id)
                .fetch_optional(pool)
                .await?
        }
        None => None,
    };

    let variants = list_variants(pool, product_id).await?;

    let tags = sqlx::query_as::<_, Tag>(
        r#"SELECT t.id, t.name, t.slug
           FROM tags t JOIN product_tags pt ON pt.tag_id = t.id
           WHERE pt.product_id = $1
           ORDER BY t.name"#,
    )
    .bind(product_id)
    .fetch_all(pool)
    .await?;

    Ok(Some(ProductDetail {
        product,
        category,
        variants,
        tags,
    }))
}

pub async fn list_categories(pool: &PgPool) -> Result<Vec<Category>, sqlx::Error> {
    sqlx::query_as::<_, Category>("SELECT id, name, slug FROM categories ORDER BY name")
        .fetch_all(pool)
        .await
}

pub async fn create_category(pool: &PgPool, name: &str) -> Result<Category, sqlx::Error> {
    sqlx::query_as::<_, Category>("INSERT INTO categories (name, slug) VALUES ($1, $2) RETURNING id, name, slug")
        .bind(name.trim())
        .bind(super::slugify(name))
        .fetch_one(pool)
        .await
}

pub async fn delete_category(pool: &PgPool, category_id: i32) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM categories WHERE id = $1")
        .bind(category_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn list_tags(pool: &PgPool) -> Result<Vec<Tag>, sqlx::Error> {
    sqlx::query_as::<_, Tag>("SELECT id, name, slug FROM tags ORDER BY name")
        .fetch_all(pool)
        .await
}

pub async fn create_tag(pool: &PgPool, name: &str) -> Result<Tag, sqlx::Error> {
    sqlx::query_as::<_, Tag>("INSERT INTO tags (name, slug) VALUES ($1, $2) RETURNING id, name, slug")
        .bind(name.trim())
        .bind(super::slugify(name))
        .fetch_one(pool)
        .await
}

pub async fn delete_tag(pool: &PgPool, tag_id: i32) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM tags WHERE id = $1")
        .bind(tag_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
