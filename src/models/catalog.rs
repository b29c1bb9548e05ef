// src/models/catalog.rs

use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::sync::LazyLock;
use validator::{Validate, ValidationError};

static SLUG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[-a-zA-Z0-9_]+$").unwrap());

/// Represents the 'categories' table in the database.
/// The slug, not the numeric id, is the external identifier.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Category {
    #[serde(skip)]
    pub id: i64,
    pub name: String,
    pub slug: String,
}

/// Represents the 'genres' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Genre {
    #[serde(skip)]
    pub id: i64,
    pub name: String,
    pub slug: String,
}

/// DTO for creating a category or genre.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTermRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be between 1 and 100 characters."))]
    pub name: String,

    #[validate(
        length(min = 1, max = 50, message = "Slug must be between 1 and 50 characters."),
        regex(
            path = *SLUG_RE,
            message = "Slug may only contain letters, digits, hyphens and underscores."
        )
    )]
    pub slug: String,
}

/// DTO for updating a category or genre. Fields are optional.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTermRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,

    #[validate(
        length(min = 1, max = 50),
        regex(
            path = *SLUG_RE,
            message = "Slug may only contain letters, digits, hyphens and underscores."
        )
    )]
    pub slug: Option<String>,
}

/// Query parameters for listing categories or genres.
#[derive(Debug, Deserialize)]
pub struct TermListParams {
    /// Search keyword for name match.
    pub q: Option<String>,
}

/// A title as exposed by the API: category embedded, genres joined in,
/// rating computed from reviews on read.
#[derive(Debug, Serialize)]
pub struct Title {
    pub id: i64,
    pub name: String,
    pub year: i32,
    pub description: String,

    /// Rounded mean of review scores; null while the title has no reviews.
    pub rating: Option<i32>,

    pub category: Category,
    pub genre: Vec<Genre>,
}

/// DTO for creating a title. Category and genres are referenced by slug.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTitleRequest {
    #[validate(length(min = 1, max = 256, message = "Name must be between 1 and 256 characters."))]
    pub name: String,

    pub year: i32,

    pub description: Option<String>,

    #[validate(
        length(min = 1, max = 50),
        regex(path = *SLUG_RE, message = "Not a valid category slug.")
    )]
    pub category: String,

    #[serde(default)]
    #[validate(custom(function = validate_slug_list))]
    pub genre: Vec<String>,
}

/// DTO for updating a title. Fields are optional; a present genre list
/// replaces the whole association set.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTitleRequest {
    #[validate(length(min = 1, max = 256))]
    pub name: Option<String>,

    pub year: Option<i32>,

    pub description: Option<String>,

    #[validate(
        length(min = 1, max = 50),
        regex(path = *SLUG_RE, message = "Not a valid category slug.")
    )]
    pub category: Option<String>,

    #[validate(custom(function = validate_slug_list))]
    pub genre: Option<Vec<String>>,
}

/// Query parameters for listing titles.
#[derive(Debug, Deserialize)]
pub struct TitleListParams {
    /// Category slug filter.
    pub category: Option<String>,
    /// Genre slug filter.
    pub genre: Option<String>,
    /// Search keyword for name match.
    pub name: Option<String>,
    pub year: Option<i32>,
}

fn validate_slug_list(slugs: &Vec<String>) -> Result<(), ValidationError> {
    for slug in slugs {
        if slug.is_empty() || slug.len() > 50 || !SLUG_RE.is_match(slug) {
            return Err(ValidationError::new("slug"));
        }
    }
    Ok(())
}

/// Rounds a mean score half away from zero.
///
/// `None` stays `None`: a title without reviews has no rating, which must
/// never be rendered as 0.
pub fn round_rating(avg: Option<f64>) -> Option<i32> {
    avg.map(|a| a.round() as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mean(scores: &[i32]) -> Option<f64> {
        if scores.is_empty() {
            return None;
        }
        Some(scores.iter().sum::<i32>() as f64 / scores.len() as f64)
    }

    #[test]
    fn no_reviews_means_no_rating() {
        assert_eq!(round_rating(mean(&[])), None);
    }

    #[test]
    fn rating_is_rounded_mean() {
        assert_eq!(round_rating(mean(&[8, 10, 9])), Some(9));
        assert_eq!(round_rating(mean(&[5])), Some(5));
    }

    #[test]
    fn rating_rounds_half_away_from_zero() {
        assert_eq!(round_rating(mean(&[7, 8])), Some(8));
        assert_eq!(round_rating(Some(-7.5)), Some(-8));
    }

    #[test]
    fn slug_list_rejects_bad_slugs() {
        assert!(validate_slug_list(&vec!["sci-fi".into(), "drama_2".into()]).is_ok());
        assert!(validate_slug_list(&vec!["bad slug".into()]).is_err());
        assert!(validate_slug_list(&vec!["".into()]).is_err());
    }
}
