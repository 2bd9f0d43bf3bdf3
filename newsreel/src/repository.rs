use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::model::{Article, StoredArticle};

/// Stores a batch of parsed articles into the database.
/// Returns the IDs of newly inserted rows.
///
/// Articles without a link are skipped (there is nothing to deduplicate
/// against), and an article whose link is already present is left untouched,
/// so re-running a sync is safe.
pub async fn store_articles(pool: &SqlitePool, articles: &[Article]) -> Result<Vec<i64>> {
    let mut new_ids = Vec::new();

    for article in articles {
        let Some(link) = article.link.as_deref() else {
            debug!(title = ?article.title, "skipping article without link");
            continue;
        };

        let existing = sqlx::query_scalar::<_, i64>("SELECT id FROM articles WHERE link = ?")
            .bind(link)
            .fetch_optional(pool)
            .await
            .context("failed to check existing article")?;
        if existing.is_some() {
            continue;
        }

        let id = insert_article(
            pool,
            article.title.as_deref().unwrap_or_default(),
            link,
            article.description.as_deref().unwrap_or_default(),
            article.published_at.unwrap_or_else(Utc::now),
            article.picture_path.as_deref(),
        )
        .await?;
        new_ids.push(id);
    }

    Ok(new_ids)
}

pub async fn insert_article(
    pool: &SqlitePool,
    title: &str,
    link: &str,
    description: &str,
    published_at: DateTime<Utc>,
    picture_path: Option<&str>,
) -> Result<i64> {
    let id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO articles (title, link, description, published_at, picture_path, first_seen_at)
        VALUES (?, ?, ?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(title)
    .bind(link)
    .bind(description)
    .bind(published_at)
    .bind(picture_path)
    .bind(Utc::now())
    .fetch_one(pool)
    .await
    .context("failed to insert article")?;

    Ok(id)
}

pub async fn list_articles(pool: &SqlitePool) -> Result<Vec<StoredArticle>> {
    sqlx::query_as::<_, StoredArticle>(
        "SELECT id, title, link, description, published_at, picture_path FROM articles ORDER BY id",
    )
    .fetch_all(pool)
    .await
    .context("failed to list articles")
}

pub async fn get_article(pool: &SqlitePool, id: i64) -> Result<Option<StoredArticle>> {
    sqlx::query_as::<_, StoredArticle>(
        "SELECT id, title, link, description, published_at, picture_path FROM articles WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("failed to select article")
}

/// Overwrites every field of an existing row. Returns false when no row
/// carries the article's id.
pub async fn update_article(pool: &SqlitePool, article: &StoredArticle) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE articles
        SET title = ?, link = ?, description = ?, published_at = ?, picture_path = ?
        WHERE id = ?
        "#,
    )
    .bind(&article.title)
    .bind(&article.link)
    .bind(&article.description)
    .bind(article.published_at)
    .bind(article.picture_path.as_deref())
    .bind(article.id)
    .execute(pool)
    .await
    .context("failed to update article")?;

    Ok(result.rows_affected() > 0)
}

pub async fn delete_article(pool: &SqlitePool, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM articles WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("failed to delete article")?;

    Ok(result.rows_affected() > 0)
}
