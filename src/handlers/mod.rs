/// Handler Module Index
///
/// One module per resource. Handlers stay thin: extract, delegate to `BlogService`
/// (or a storage/cache seam), and shape the response. Failures travel as `AppError`.
pub mod categories;
pub mod health;
pub mod post_types;
pub mod posts;
pub mod users;

use crate::error::{AppError, AppResult};

/// parse_id
///
/// Path ids arrive as raw strings so that a malformed id answers 400 with the usual
/// JSON error body instead of the framework's plain-text rejection.
pub fn parse_id(raw: &str) -> AppResult<i32> {
    raw.trim()
        .parse::<i32>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| AppError::validation(format!("Invalid id: {}", raw)))
}

#[cfg(test)]
mod tests {
    use super::parse_id;

    #[test]
    fn parse_id_accepts_positive_integers_only() {
        assert_eq!(parse_id("42").unwrap(), 42);
        assert!(parse_id("0").is_err());
        assert!(parse_id("-3").is_err());
        assert!(parse_id("abc").is_err());
        assert!(parse_id("").is_err());
    }
}
