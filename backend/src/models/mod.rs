// src/models/mod.rs

pub mod question;
pub mod quiz;

use url::Url;

/// Validates that a string is a correctly formatted URL.
pub(crate) fn validate_url_string(url: &str) -> Result<(), validator::ValidationError> {
    if Url::parse(url).is_err() {
        return Err(validator::ValidationError::new("invalid_url"));
    }
    Ok(())
}

/// Validates a tag list: at most 20 tags, each 1..=50 characters.
pub(crate) fn validate_tags(tags: &[String]) -> Result<(), validator::ValidationError> {
    if tags.len() > 20 {
        return Err(validator::ValidationError::new("too_many_tags"));
    }
    for tag in tags {
        if tag.is_empty() || tag.len() > 50 {
            return Err(validator::ValidationError::new("invalid_tag_length"));
        }
    }
    Ok(())
}
