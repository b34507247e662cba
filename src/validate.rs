use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Error, Result};

static RE_EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap());
static RE_CONDITION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^Ke-[1-9]$").unwrap());

/// Implemented by every create/update payload; called before any write.
pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn non_empty(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::validation(field, "is required"));
    }
    Ok(())
}

pub fn min_len(field: &str, value: &str, min: usize) -> Result<()> {
    if value.trim().chars().count() < min {
        return Err(Error::validation(
            field,
            format!("must be at least {min} characters"),
        ));
    }
    Ok(())
}

pub fn email(field: &str, value: &str) -> Result<()> {
    if !RE_EMAIL.is_match(value.trim()) {
        return Err(Error::validation(field, "must be a valid email address"));
    }
    Ok(())
}

/// Optional links must be absolute http(s) URLs when present.
pub fn link(field: &str, value: Option<&str>) -> Result<()> {
    let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(());
    };
    let parsed = url::Url::parse(value)
        .map_err(|e| Error::validation(field, format!("invalid URL: {e}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(Error::validation(
            field,
            format!("unsupported URL scheme '{other}'"),
        )),
    }
}

/// Migration re-run counter, `Ke-1` through `Ke-9`.
pub fn migration_condition(field: &str, value: Option<&str>) -> Result<()> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) if !RE_CONDITION.is_match(v) => Err(Error::validation(
            field,
            format!("'{v}' is not one of Ke-1..Ke-9"),
        )),
        _ => Ok(()),
    }
}

pub fn positive_id(field: &str, value: i64) -> Result<()> {
    if value <= 0 {
        return Err(Error::validation(field, "must reference an existing record"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_empty() {
        assert!(non_empty("name", "Budi").is_ok());
        assert!(non_empty("name", "   ").is_err());
    }

    #[test]
    fn test_email() {
        assert!(email("email", "budi.santoso@example.com").is_ok());
        assert!(email("email", "budi@").is_err());
        assert!(email("email", "no at sign.com").is_err());
    }

    #[test]
    fn test_link() {
        assert!(link("bug_link", None).is_ok());
        assert!(link("bug_link", Some("")).is_ok());
        assert!(link("bug_link", Some("https://tracker.example.com/issue/12")).is_ok());
        assert!(link("bug_link", Some("ftp://example.com/file")).is_err());
        assert!(link("bug_link", Some("tracker/issue/12")).is_err());
    }

    #[test]
    fn test_migration_condition() {
        assert!(migration_condition("migration_condition", Some("Ke-3")).is_ok());
        assert!(migration_condition("migration_condition", None).is_ok());
        assert!(migration_condition("migration_condition", Some("Ke-10")).is_err());
        assert!(migration_condition("migration_condition", Some("third")).is_err());
    }

    #[test]
    fn test_min_len() {
        assert!(min_len("username", "adi", 3).is_ok());
        assert!(min_len("username", "ad", 3).is_err());
    }
}
