use sea_orm::Order;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::AppError;

/// Default page size for list endpoints.
pub const DEFAULT_LIMIT: u64 = 100;
/// Hard cap on requested page sizes.
pub const MAX_LIMIT: u64 = 500;

/// Common query parameters for search/listing endpoints.
#[derive(Deserialize, utoipa::IntoParams)]
pub struct ListQuery {
    /// Case-insensitive substring match on the name/title column.
    pub search: Option<String>,
    /// Column to sort by; each endpoint accepts a small allow-list.
    pub sort_by: Option<String>,
    /// "asc" or "desc" (default).
    pub sort_order: Option<String>,
    /// Page size, default 100, max 500.
    pub limit: Option<u64>,
    /// Rows to skip, default 0.
    pub offset: Option<u64>,
}

impl ListQuery {
    pub fn limit(&self) -> u64 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }

    pub fn offset(&self) -> u64 {
        self.offset.unwrap_or(0)
    }

    pub fn order(&self) -> Order {
        if self.sort_order.as_deref() == Some("asc") {
            Order::Asc
        } else {
            Order::Desc
        }
    }

    /// Trimmed, lowercased search term, or `None` when absent/blank.
    pub fn search_term(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
    }
}

/// Pagination metadata included in list responses.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ListMeta {
    /// Total number of matching rows across all pages.
    #[schema(example = 47)]
    pub total: u64,
    #[schema(example = 100)]
    pub limit: u64,
    #[schema(example = 0)]
    pub offset: u64,
}

/// Escape LIKE wildcard characters in a search string.
pub fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// LIKE pattern for a substring match on an already-lowercased term.
pub fn like_pattern(term: &str) -> String {
    format!("%{}%", escape_like(term))
}

/// Serde helper for nullable-field updates.
///
/// * JSON field absent  => `None`          (don't update)
/// * JSON field = null  => `Some(None)`    (set to NULL)
/// * JSON field = value => `Some(Some(v))` (set to value)
pub fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Some(Option::deserialize(deserializer)?))
}

/// Validate a trimmed title/name (1-256 Unicode characters).
pub fn validate_title(title: &str) -> Result<(), AppError> {
    let title = title.trim();
    if title.is_empty() || title.chars().count() > 256 {
        return Err(AppError::Validation(
            "Title must be 1-256 characters".into(),
        ));
    }
    Ok(())
}

/// Validate an optional rating against an inclusive range.
pub fn validate_rating(rating: Option<i32>, min: i32, max: i32) -> Result<(), AppError> {
    if let Some(r) = rating
        && !(min..=max).contains(&r)
    {
        return Err(AppError::Validation(format!(
            "Rating must be between {min} and {max}"
        )));
    }
    Ok(())
}

/// Shallow shape check; deliverability is the mail provider's problem.
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.contains(char::is_whitespace)
}
