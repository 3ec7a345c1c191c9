//! Request field checks shared by the handlers. Each returns the cleaned
//! value or a 400 carrying a message fit for the client.

use std::sync::LazyLock;

use regex::Regex;
use uuid::Uuid;

use murmur_types::models::{Privacy, ReactionKind, TargetKind};

use crate::error::ApiError;

pub const POST_MAX_CHARS: usize = 5000;
pub const COMMENT_MAX_CHARS: usize = 2000;
const PASSWORD_MIN_CHARS: usize = 6;
const PASSWORD_MAX_CHARS: usize = 128;

static EMAIL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\S+@\S+\.\S+$").unwrap());

const DEFAULT_PAGE_SIZE: u32 = 10;
const MAX_PAGE_SIZE: u32 = 50;

/// Trimmed, lowercased email.
pub fn email(raw: &str) -> Result<String, ApiError> {
    let email = raw.trim().to_lowercase();
    if email.is_empty() {
        return Err(ApiError::validation("Email is required"));
    }
    if !EMAIL.is_match(&email) {
        return Err(ApiError::validation("Please provide a valid email address"));
    }
    Ok(email)
}

pub fn password(raw: &str) -> Result<(), ApiError> {
    let len = raw.chars().count();
    if len == 0 {
        return Err(ApiError::validation("Password is required"));
    }
    if len < PASSWORD_MIN_CHARS {
        return Err(ApiError::validation(format!(
            "Password must be at least {PASSWORD_MIN_CHARS} characters"
        )));
    }
    if len > PASSWORD_MAX_CHARS {
        return Err(ApiError::validation(format!(
            "Password cannot exceed {PASSWORD_MAX_CHARS} characters"
        )));
    }
    Ok(())
}

pub fn post_content(raw: &str) -> Result<String, ApiError> {
    content(raw, "Post", POST_MAX_CHARS)
}

pub fn comment_content(raw: &str) -> Result<String, ApiError> {
    content(raw, "Comment", COMMENT_MAX_CHARS)
}

fn content(raw: &str, what: &str, max: usize) -> Result<String, ApiError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ApiError::validation(format!("{what} content is required")));
    }
    if trimmed.chars().count() > max {
        return Err(ApiError::validation(format!(
            "{what} content cannot exceed {max} characters"
        )));
    }
    Ok(trimmed.to_string())
}

pub fn privacy(raw: Option<&str>) -> Result<Privacy, ApiError> {
    match raw {
        None => Ok(Privacy::default()),
        Some(raw) => raw
            .parse()
            .map_err(|_| ApiError::validation("Privacy must be either 'public' or 'private'")),
    }
}

/// Optional image reference: blank means none, otherwise an absolute URL or
/// a path on this server.
pub fn image_url(raw: Option<String>) -> Result<Option<String>, ApiError> {
    let Some(url) = raw.map(|u| u.trim().to_string()).filter(|u| !u.is_empty()) else {
        return Ok(None);
    };
    if url.starts_with("http://") || url.starts_with("https://") || url.starts_with('/') {
        Ok(Some(url))
    } else {
        Err(ApiError::validation("Image must be a valid URL"))
    }
}

pub fn optional_text(raw: Option<String>) -> Option<String> {
    raw.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

pub fn reaction_kind(raw: &str) -> Result<ReactionKind, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::validation("Reaction type must be 'like', 'haha', 'love' or 'angry'"))
}

pub fn target_kind(raw: &str) -> Result<TargetKind, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::validation("Target type must be either 'post' or 'comment'"))
}

/// Parse an id from a path or body. `what` names it in the error.
pub fn id(raw: &str, what: &str) -> Result<Uuid, ApiError> {
    raw.trim()
        .parse()
        .map_err(|_| ApiError::bad_request(format!("Invalid {what} id")))
}

/// `(page, limit)` with defaults applied: page is at least 1 and limit is
/// held to `1..=50`.
pub fn page(page: Option<u32>, limit: Option<u32>) -> (u32, u32) {
    let page = page.unwrap_or(1).max(1);
    let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    (page, limit)
}

pub fn offset(page: u32, limit: u32) -> i64 {
    i64::from(page - 1) * i64::from(limit)
}
