use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub affiliate_url: String,
    pub image_url: Option<String>,
    pub tags: Vec<String>,
    pub active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Editable fields of a product row; id and created_at stay server-owned.
#[derive(Debug, Clone)]
pub struct ProductData {
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub affiliate_url: String,
    pub image_url: Option<String>,
    pub tags: Vec<String>,
    pub active: bool,
}

/// Predicate set for `list`. Browse fields are AND-combined; `search`
/// switches the text match to an OR across name/description/category and is
/// mutually exclusive with `name_query` at the call sites.
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub active_only: bool,
    pub category: Option<String>,
    pub name_query: Option<String>,
    pub tags: Vec<String>,
    pub search: Option<String>,
}

const SELECT_COLUMNS: &str = "SELECT id, name, description, category, affiliate_url, \
     image_url, tags, active, created_at FROM products";

/// Appends the WHERE clause for `filter`. User-supplied strings are always
/// parameter-bound; the `%...%` wrapping for substring matches happens here,
/// never at the call site.
fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &ProductFilter) {
    let mut first = true;
    let mut sep = |qb: &mut QueryBuilder<'_, Postgres>| {
        qb.push(if std::mem::take(&mut first) {
            " WHERE "
        } else {
            " AND "
        });
    };

    if filter.active_only {
        sep(qb);
        qb.push("active = TRUE");
    }
    if let Some(category) = &filter.category {
        sep(qb);
        qb.push("category = ");
        qb.push_bind(category.clone());
    }
    if let Some(q) = &filter.name_query {
        sep(qb);
        qb.push("name ILIKE ");
        qb.push_bind(format!("%{q}%"));
    }
    if !filter.tags.is_empty() {
        sep(qb);
        qb.push("tags && ");
        qb.push_bind(filter.tags.clone());
    }
    if let Some(q) = &filter.search {
        let pattern = format!("%{q}%");
        sep(qb);
        qb.push("(name ILIKE ");
        qb.push_bind(pattern.clone());
        qb.push(" OR description ILIKE ");
        qb.push_bind(pattern.clone());
        qb.push(" OR category ILIKE ");
        qb.push_bind(pattern);
        qb.push(")");
    }
}

/// Windowed listing, newest first. The returned total counts the filtered
/// set ignoring the window, so callers can derive page counts.
pub async fn list(
    db: &PgPool,
    filter: &ProductFilter,
    limit: i64,
    offset: i64,
) -> anyhow::Result<(Vec<Product>, i64)> {
    let mut count_qb = QueryBuilder::new("SELECT COUNT(*) FROM products");
    push_filters(&mut count_qb, filter);
    let total: i64 = count_qb.build_query_scalar().fetch_one(db).await?;

    let mut qb = QueryBuilder::new(SELECT_COLUMNS);
    push_filters(&mut qb, filter);
    qb.push(" ORDER BY created_at DESC LIMIT ");
    qb.push_bind(limit);
    qb.push(" OFFSET ");
    qb.push_bind(offset);
    let rows = qb.build_query_as::<Product>().fetch_all(db).await?;

    Ok((rows, total))
}

pub async fn get_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Product>> {
    let row = sqlx::query_as::<_, Product>(
        r#"
        SELECT id, name, description, category, affiliate_url,
               image_url, tags, active, created_at
        FROM products
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(db)
    .await?;
    Ok(row)
}

pub async fn distinct_categories(db: &PgPool, active_only: bool) -> anyhow::Result<Vec<String>> {
    let sql = if active_only {
        "SELECT category FROM products WHERE category IS NOT NULL AND active = TRUE"
    } else {
        "SELECT category FROM products WHERE category IS NOT NULL"
    };
    let rows: Vec<String> = sqlx::query_scalar(sql).fetch_all(db).await?;
    Ok(normalize_categories(rows))
}

/// Dedup and byte-wise ascending sort, dropping empties.
fn normalize_categories(raw: Vec<String>) -> Vec<String> {
    let mut cats: Vec<String> = raw.into_iter().filter(|c| !c.is_empty()).collect();
    cats.sort();
    cats.dedup();
    cats
}

pub async fn insert(db: &PgPool, data: &ProductData) -> anyhow::Result<Product> {
    let row = sqlx::query_as::<_, Product>(
        r#"
        INSERT INTO products (name, description, category, affiliate_url, image_url, tags, active)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id, name, description, category, affiliate_url,
                  image_url, tags, active, created_at
        "#,
    )
    .bind(&data.name)
    .bind(&data.description)
    .bind(&data.category)
    .bind(&data.affiliate_url)
    .bind(&data.image_url)
    .bind(&data.tags)
    .bind(data.active)
    .fetch_one(db)
    .await?;
    Ok(row)
}

pub async fn update(db: &PgPool, id: Uuid, data: &ProductData) -> anyhow::Result<Option<Product>> {
    let row = sqlx::query_as::<_, Product>(
        r#"
        UPDATE products
        SET name = $1, description = $2, category = $3, affiliate_url = $4,
            image_url = $5, tags = $6, active = $7
        WHERE id = $8
        RETURNING id, name, description, category, affiliate_url,
                  image_url, tags, active, created_at
        "#,
    )
    .bind(&data.name)
    .bind(&data.description)
    .bind(&data.category)
    .bind(&data.affiliate_url)
    .bind(&data.image_url)
    .bind(&data.tags)
    .bind(data.active)
    .bind(id)
    .fetch_optional(db)
    .await?;
    Ok(row)
}

pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<bool> {
    let result = sqlx::query("DELETE FROM products WHERE id = $1")
        .bind(id)
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter_sql(filter: &ProductFilter) -> String {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM products");
        push_filters(&mut qb, filter);
        qb.sql().to_string()
    }

    #[test]
    fn no_filters_means_no_where_clause() {
        let sql = filter_sql(&ProductFilter::default());
        assert_eq!(sql, "SELECT COUNT(*) FROM products");
    }

    #[test]
    fn browse_filters_are_and_combined_and_bound() {
        let filter = ProductFilter {
            active_only: true,
            category: Some("boots".into()),
            name_query: Some("leather".into()),
            tags: vec!["winter".into()],
            search: None,
        };
        let sql = filter_sql(&filter);
        assert_eq!(
            sql,
            "SELECT COUNT(*) FROM products WHERE active = TRUE \
             AND category = $1 AND name ILIKE $2 AND tags && $3"
        );
    }

    #[test]
    fn search_mode_or_combines_three_columns() {
        let filter = ProductFilter {
            active_only: true,
            search: Some("boot".into()),
            ..Default::default()
        };
        let sql = filter_sql(&filter);
        assert_eq!(
            sql,
            "SELECT COUNT(*) FROM products WHERE active = TRUE \
             AND (name ILIKE $1 OR description ILIKE $2 OR category ILIKE $3)"
        );
    }

    #[test]
    fn search_input_is_never_spliced_into_sql() {
        let filter = ProductFilter {
            search: Some("'; DROP TABLE products; --".into()),
            ..Default::default()
        };
        let sql = filter_sql(&filter);
        assert!(!sql.contains("DROP TABLE"));
    }

    #[test]
    fn categories_are_sorted_deduped_and_non_empty() {
        let raw = vec![
            "shoes".to_string(),
            "Bags".to_string(),
            "shoes".to_string(),
            "".to_string(),
            "accessories".to_string(),
        ];
        assert_eq!(
            normalize_categories(raw),
            vec!["Bags".to_string(), "accessories".into(), "shoes".into()]
        );
    }
}
