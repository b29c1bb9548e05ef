// src/repo/catalog.rs

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::error::AppError;
use crate::models::catalog::{
    Category, CreateTermRequest, CreateTitleRequest, Genre, TermListParams, Title,
    TitleListParams, UpdateTermRequest, UpdateTitleRequest, round_rating,
};
use crate::repo::{Repository, is_foreign_key_violation, is_unique_violation};

/// Repository for the 'categories' table, keyed by slug.
#[derive(Clone)]
pub struct CategoryRepo {
    pool: PgPool,
}

impl CategoryRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for CategoryRepo {
    type Entity = Category;
    type Key = String;
    type Create = CreateTermRequest;
    type Patch = UpdateTermRequest;
    type Filter = TermListParams;

    async fn create(&self, data: CreateTermRequest) -> Result<Category, AppError> {
        let category = sqlx::query_as::<_, Category>(
            "INSERT INTO categories (name, slug) VALUES ($1, $2) RETURNING id, name, slug",
        )
        .bind(&data.name)
        .bind(&data.slug)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::DuplicateSlug(format!("Slug '{}' is already taken", data.slug))
            } else {
                tracing::error!("Failed to create category: {:?}", e);
                AppError::from(e)
            }
        })?;

        Ok(category)
    }

    async fn get(&self, key: &String) -> Result<Option<Category>, AppError> {
        let category =
            sqlx::query_as::<_, Category>("SELECT id, name, slug FROM categories WHERE slug = $1")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;

        Ok(category)
    }

    async fn update(&self, key: &String, patch: UpdateTermRequest) -> Result<Category, AppError> {
        let mut tx = self.pool.begin().await?;

        let id = sqlx::query_scalar::<_, i64>("SELECT id FROM categories WHERE slug = $1")
            .bind(key)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(AppError::NotFound("Category not found".to_string()))?;

        if let Some(name) = patch.name {
            sqlx::query("UPDATE categories SET name = $1 WHERE id = $2")
                .bind(name)
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }

        if let Some(slug) = patch.slug {
            sqlx::query("UPDATE categories SET slug = $1 WHERE id = $2")
                .bind(&slug)
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    if is_unique_violation(&e) {
                        AppError::DuplicateSlug(format!("Slug '{}' is already taken", slug))
                    } else {
                        AppError::from(e)
                    }
                })?;
        }

        let category =
            sqlx::query_as::<_, Category>("SELECT id, name, slug FROM categories WHERE id = $1")
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;

        tx.commit().await?;

        Ok(category)
    }

    async fn delete(&self, key: &String) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM categories WHERE slug = $1")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_foreign_key_violation(&e) {
                    AppError::Validation(
                        "Category is still referenced by titles".to_string(),
                    )
                } else {
                    tracing::error!("Failed to delete category: {:?}", e);
                    AppError::from(e)
                }
            })?;

        Ok(result.rows_affected() > 0)
    }

    async fn list(&self, filter: &TermListParams) -> Result<Vec<Category>, AppError> {
        let search_pattern = filter.q.as_ref().map(|k| format!("%{}%", k));

        let categories = sqlx::query_as::<_, Category>(
            "SELECT id, name, slug FROM categories \
             WHERE ($1::TEXT IS NULL OR name ILIKE $1) \
             ORDER BY name",
        )
        .bind(search_pattern)
        .fetch_all(&self.pool)
        .await?;

        Ok(categories)
    }
}

/// Repository for the 'genres' table, keyed by slug.
#[derive(Clone)]
pub struct GenreRepo {
    pool: PgPool,
}

impl GenreRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for GenreRepo {
    type Entity = Genre;
    type Key = String;
    type Create = CreateTermRequest;
    type Patch = UpdateTermRequest;
    type Filter = TermListParams;

    async fn create(&self, data: CreateTermRequest) -> Result<Genre, AppError> {
        let genre = sqlx::query_as::<_, Genre>(
            "INSERT INTO genres (name, slug) VALUES ($1, $2) RETURNING id, name, slug",
        )
        .bind(&data.name)
        .bind(&data.slug)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::DuplicateSlug(format!("Slug '{}' is already taken", data.slug))
            } else {
                tracing::error!("Failed to create genre: {:?}", e);
                AppError::from(e)
            }
        })?;

        Ok(genre)
    }

    async fn get(&self, key: &String) -> Result<Option<Genre>, AppError> {
        let genre =
            sqlx::query_as::<_, Genre>("SELECT id, name, slug FROM genres WHERE slug = $1")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;

        Ok(genre)
    }

    async fn update(&self, key: &String, patch: UpdateTermRequest) -> Result<Genre, AppError> {
        let mut tx = self.pool.begin().await?;

        let id = sqlx::query_scalar::<_, i64>("SELECT id FROM genres WHERE slug = $1")
            .bind(key)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(AppError::NotFound("Genre not found".to_string()))?;

        if let Some(name) = patch.name {
            sqlx::query("UPDATE genres SET name = $1 WHERE id = $2")
                .bind(name)
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }

        if let Some(slug) = patch.slug {
            sqlx::query("UPDATE genres SET slug = $1 WHERE id = $2")
                .bind(&slug)
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    if is_unique_violation(&e) {
                        AppError::DuplicateSlug(format!("Slug '{}' is already taken", slug))
                    } else {
                        AppError::from(e)
                    }
                })?;
        }

        let genre = sqlx::query_as::<_, Genre>("SELECT id, name, slug FROM genres WHERE id = $1")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(genre)
    }

    async fn delete(&self, key: &String) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM genres WHERE slug = $1")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to delete genre: {:?}", e);
                AppError::from(e)
            })?;

        Ok(result.rows_affected() > 0)
    }

    async fn list(&self, filter: &TermListParams) -> Result<Vec<Genre>, AppError> {
        let search_pattern = filter.q.as_ref().map(|k| format!("%{}%", k));

        let genres = sqlx::query_as::<_, Genre>(
            "SELECT id, name, slug FROM genres \
             WHERE ($1::TEXT IS NULL OR name ILIKE $1) \
             ORDER BY name",
        )
        .bind(search_pattern)
        .fetch_all(&self.pool)
        .await?;

        Ok(genres)
    }
}

const TITLE_SELECT: &str = "SELECT t.id, t.name, t.year, t.description, \
    c.id AS category_id, c.name AS category_name, c.slug AS category_slug, \
    (SELECT AVG(r.score)::FLOAT8 FROM reviews r WHERE r.title_id = t.id) AS rating \
    FROM titles t \
    JOIN categories c ON c.id = t.category_id";

/// Flat row shape shared by title queries; genres are joined in afterwards.
#[derive(Debug, sqlx::FromRow)]
struct TitleRow {
    id: i64,
    name: String,
    year: i32,
    description: String,
    category_id: i64,
    category_name: String,
    category_slug: String,
    rating: Option<f64>,
}

impl TitleRow {
    fn into_title(self, genre: Vec<Genre>) -> Title {
        Title {
            id: self.id,
            name: self.name,
            year: self.year,
            description: self.description,
            rating: round_rating(self.rating),
            category: Category {
                id: self.category_id,
                name: self.category_name,
                slug: self.category_slug,
            },
            genre,
        }
    }
}

/// Repository for titles. Creation and updates resolve category/genre slugs
/// inside a transaction so a half-written association set is never visible.
#[derive(Clone)]
pub struct TitleRepo {
    pool: PgPool,
}

impl TitleRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn genres_for_titles(&self, ids: &[i64]) -> Result<HashMap<i64, Vec<Genre>>, AppError> {
        #[derive(sqlx::FromRow)]
        struct TitleGenreRow {
            title_id: i64,
            id: i64,
            name: String,
            slug: String,
        }

        let rows = sqlx::query_as::<_, TitleGenreRow>(
            "SELECT tg.title_id, g.id, g.name, g.slug \
             FROM title_genres tg \
             JOIN genres g ON g.id = tg.genre_id \
             WHERE tg.title_id = ANY($1) \
             ORDER BY g.name",
        )
        .bind(ids.to_vec())
        .fetch_all(&self.pool)
        .await?;

        let mut by_title: HashMap<i64, Vec<Genre>> = HashMap::new();
        for row in rows {
            by_title.entry(row.title_id).or_default().push(Genre {
                id: row.id,
                name: row.name,
                slug: row.slug,
            });
        }

        Ok(by_title)
    }
}

#[async_trait]
impl Repository for TitleRepo {
    type Entity = Title;
    type Key = i64;
    type Create = CreateTitleRequest;
    type Patch = UpdateTitleRequest;
    type Filter = TitleListParams;

    async fn create(&self, data: CreateTitleRequest) -> Result<Title, AppError> {
        let mut tx = self.pool.begin().await?;

        let category_id = category_id_by_slug(&mut tx, &data.category).await?;
        let genre_ids = genre_ids_by_slugs(&mut tx, &data.genre).await?;

        let title_id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO titles (name, year, description, category_id) \
             VALUES ($1, $2, $3, $4) RETURNING id",
        )
        .bind(&data.name)
        .bind(data.year)
        .bind(data.description.unwrap_or_default())
        .bind(category_id)
        .fetch_one(&mut *tx)
        .await?;

        link_genres(&mut tx, title_id, &genre_ids).await?;

        tx.commit().await?;

        self.get(&title_id)
            .await?
            .ok_or(AppError::Internal("Title vanished after insert".to_string()))
    }

    async fn get(&self, key: &i64) -> Result<Option<Title>, AppError> {
        let row = sqlx::query_as::<_, TitleRow>(&format!("{TITLE_SELECT} WHERE t.id = $1"))
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut genres = self.genres_for_titles(&[row.id]).await?;
        let genre = genres.remove(&row.id).unwrap_or_default();

        Ok(Some(row.into_title(genre)))
    }

    async fn update(&self, key: &i64, patch: UpdateTitleRequest) -> Result<Title, AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query_scalar::<_, i64>("SELECT id FROM titles WHERE id = $1")
            .bind(key)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(AppError::NotFound("Title not found".to_string()))?;

        let category_id = match &patch.category {
            Some(slug) => Some(category_id_by_slug(&mut tx, slug).await?),
            None => None,
        };

        if patch.name.is_some()
            || patch.year.is_some()
            || patch.description.is_some()
            || category_id.is_some()
        {
            let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE titles SET ");
            let mut separated = builder.separated(", ");

            if let Some(name) = patch.name {
                separated.push("name = ");
                separated.push_bind_unseparated(name);
            }

            if let Some(year) = patch.year {
                separated.push("year = ");
                separated.push_bind_unseparated(year);
            }

            if let Some(description) = patch.description {
                separated.push("description = ");
                separated.push_bind_unseparated(description);
            }

            if let Some(category_id) = category_id {
                separated.push("category_id = ");
                separated.push_bind_unseparated(category_id);
            }

            builder.push(" WHERE id = ");
            builder.push_bind(*key);

            builder.build().execute(&mut *tx).await?;
        }

        // A present genre list replaces the association set wholesale.
        if let Some(slugs) = patch.genre {
            let genre_ids = genre_ids_by_slugs(&mut tx, &slugs).await?;

            sqlx::query("DELETE FROM title_genres WHERE title_id = $1")
                .bind(key)
                .execute(&mut *tx)
                .await?;

            link_genres(&mut tx, *key, &genre_ids).await?;
        }

        tx.commit().await?;

        self.get(key)
            .await?
            .ok_or(AppError::NotFound("Title not found".to_string()))
    }

    async fn delete(&self, key: &i64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM titles WHERE id = $1")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to delete title: {:?}", e);
                AppError::from(e)
            })?;

        Ok(result.rows_affected() > 0)
    }

    async fn list(&self, filter: &TitleListParams) -> Result<Vec<Title>, AppError> {
        let search_pattern = filter.name.as_ref().map(|k| format!("%{}%", k));

        let rows = sqlx::query_as::<_, TitleRow>(&format!(
            "{TITLE_SELECT} \
             WHERE ($1::TEXT IS NULL OR c.slug = $1) \
               AND ($2::TEXT IS NULL OR EXISTS ( \
                     SELECT 1 FROM title_genres tg \
                     JOIN genres g ON g.id = tg.genre_id \
                     WHERE tg.title_id = t.id AND g.slug = $2)) \
               AND ($3::TEXT IS NULL OR t.name ILIKE $3) \
               AND ($4::INT4 IS NULL OR t.year = $4) \
             ORDER BY t.name"
        ))
        .bind(&filter.category)
        .bind(&filter.genre)
        .bind(search_pattern)
        .bind(filter.year)
        .fetch_all(&self.pool)
        .await?;

        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        let mut genres = self.genres_for_titles(&ids).await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let genre = genres.remove(&row.id).unwrap_or_default();
                row.into_title(genre)
            })
            .collect())
    }
}

async fn category_id_by_slug(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    slug: &str,
) -> Result<i64, AppError> {
    sqlx::query_scalar::<_, i64>("SELECT id FROM categories WHERE slug = $1")
        .bind(slug)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| AppError::UnknownReference(format!("Unknown category slug '{}'", slug)))
}

async fn genre_ids_by_slugs(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    slugs: &[String],
) -> Result<Vec<i64>, AppError> {
    let mut ids = Vec::with_capacity(slugs.len());
    for slug in slugs {
        let id = sqlx::query_scalar::<_, i64>("SELECT id FROM genres WHERE slug = $1")
            .bind(slug)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or_else(|| AppError::UnknownReference(format!("Unknown genre slug '{}'", slug)))?;
        ids.push(id);
    }
    Ok(ids)
}

async fn link_genres(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    title_id: i64,
    genre_ids: &[i64],
) -> Result<(), AppError> {
    for genre_id in genre_ids {
        // ON CONFLICT tolerates a repeated slug in the request payload.
        sqlx::query(
            "INSERT INTO title_genres (title_id, genre_id) VALUES ($1, $2) \
             ON CONFLICT DO NOTHING",
        )
        .bind(title_id)
        .bind(genre_id)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}
