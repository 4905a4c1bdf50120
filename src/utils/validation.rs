use crate::utils::error::{MapperError, Result};
use std::collections::HashSet;
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(MapperError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: "URL cannot be empty".to_string(),
        });
    }

    match Url::parse(url_str) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(MapperError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: url_str.to_string(),
                reason: format!("Unsupported URL scheme: {}", scheme),
            }),
        },
        Err(e) => Err(MapperError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: format!("Invalid URL format: {}", e),
        }),
    }
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(MapperError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(MapperError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

pub fn validate_positive_number(field_name: &str, value: u64, min_value: u64) -> Result<()> {
    if value < min_value {
        return Err(MapperError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(MapperError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

/// 檢查名稱在清單中不重複（例如 CMS 規則名稱）
pub fn validate_unique<'a, I>(field_name: &str, values: I) -> Result<()>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen = HashSet::new();
    for value in values {
        if !seen.insert(value) {
            return Err(MapperError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: value.to_string(),
                reason: "Duplicate entry".to_string(),
            });
        }
    }
    Ok(())
}

pub fn validate_selector(field_name: &str, selector: &str) -> Result<()> {
    scraper::Selector::parse(selector)
        .map(|_| ())
        .map_err(|e| MapperError::ConfigValidationError {
            field: field_name.to_string(),
            message: format!("Invalid CSS selector '{}': {:?}", selector, e),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url() {
        assert!(validate_url("campuses.url", "https://www.yonsei.ac.kr/sc/186/subview.do").is_ok());
        assert!(validate_url("campuses.url", "http://example.com").is_ok());
        assert!(validate_url("campuses.url", "").is_err());
        assert!(validate_url("campuses.url", "invalid-url").is_err());
        assert!(validate_url("campuses.url", "ftp://example.com").is_err());
    }

    #[test]
    fn test_validate_positive_number() {
        assert!(validate_positive_number("http.sitemap_timeout_secs", 5, 1).is_ok());
        assert!(validate_positive_number("http.sitemap_timeout_secs", 0, 1).is_err());
    }

    #[test]
    fn test_validate_unique() {
        assert!(validate_unique("cms_rules.name", ["yonsei", "xe"]).is_ok());
        assert!(validate_unique("cms_rules.name", ["xe", "xe"]).is_err());
    }

    #[test]
    fn test_validate_selector() {
        assert!(validate_selector("hierarchy.heading_selector", "h1").is_ok());
        assert!(validate_selector("hierarchy.heading_selector", "h1[").is_err());
    }
}
