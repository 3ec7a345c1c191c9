use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use axum_extra::extract::cookie::CookieJar;
use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use murmur_db::models::UserRow;
use murmur_types::api::{ApiResponse, AuthResponse, LoginRequest, RegisterRequest, TokenKind};

use crate::error::{ApiError, AppJson};
use crate::middleware::AuthUser;
use crate::state::{AppState, with_db};
use crate::tokens::{self, REFRESH_COOKIE};
use crate::{validate, views};

pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    AppJson(req): AppJson<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = validate::email(&req.email)?;
    validate::password(&req.password)?;
    if req.confirm_password.as_ref().is_some_and(|c| c != &req.password) {
        return Err(ApiError::validation("Passwords do not match"));
    }
    if req.agree_to_terms == Some(false) {
        return Err(ApiError::validation("You must agree to the terms and conditions"));
    }

    let lookup = email.clone();
    if with_db(&state, move |db| db.get_user_by_email(&lookup)).await?.is_some() {
        return Err(ApiError::Conflict("An account with this email already exists".into()));
    }

    // Hash password with Argon2id
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {e}"))?
        .to_string();

    let user_id = Uuid::new_v4();
    let (id, new_email) = (user_id.to_string(), email.clone());
    let row = with_db(&state, move |db| {
        if !db.create_user(&id, &new_email, &password_hash)? {
            return Ok(None);
        }
        db.get_user_by_id(&id)
    })
    .await?
    // Lost a race with a concurrent registration for the same email.
    .ok_or_else(|| ApiError::Conflict("An account with this email already exists".into()))?;

    let pair = tokens::issue_pair(&state.auth, user_id, &email, false)?;
    info!("Registered user {} ({})", email, user_id);

    Ok((
        StatusCode::CREATED,
        tokens::set_session(jar, &state.auth, &pair),
        Json(
            ApiResponse::ok(AuthResponse {
                user: views::user(&row),
            })
            .with_message("Registration successful"),
        ),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    AppJson(req): AppJson<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = validate::email(&req.email)?;
    if req.password.is_empty() {
        return Err(ApiError::validation("Password is required"));
    }

    let lookup = email.clone();
    let user = with_db(&state, move |db| db.get_user_by_email(&lookup))
        .await?
        .ok_or_else(|| {
            warn!("Login attempt for unknown email {}", email);
            invalid_credentials()
        })?;

    check_standing(&user, Utc::now())?;

    let parsed_hash = PasswordHash::new(&user.password)
        .map_err(|e| anyhow::anyhow!("stored hash for {} is unreadable: {e}", user.id))?;
    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| {
            warn!("Wrong password for {}", user.id);
            invalid_credentials()
        })?;

    let user_id = views::uuid(&user.id, "id", &user.id);
    let id = user.id.clone();
    let row = with_db(&state, move |db| {
        db.record_login(&id)?;
        db.get_user_by_id(&id)
    })
    .await?
    .ok_or_else(invalid_credentials)?;

    let pair = tokens::issue_pair(&state.auth, user_id, &row.email, req.remember_me)?;
    info!("User {} logged in", user_id);

    Ok((
        tokens::set_session(jar, &state.auth, &pair),
        Json(
            ApiResponse::ok(AuthResponse {
                user: views::user(&row),
            })
            .with_message("Login successful"),
        ),
    ))
}

fn invalid_credentials() -> ApiError {
    ApiError::Unauthorized("Invalid email or password".into())
}

/// Inactive, deleted and currently banned accounts may not sign in. A ban
/// with no end date is permanent; one whose end date has passed has lapsed.
fn check_standing(user: &UserRow, now: DateTime<Utc>) -> Result<(), ApiError> {
    if !user.is_active || user.deleted_at.is_some() {
        return Err(ApiError::forbidden("This account is inactive or has been deleted"));
    }
    if !user.is_banned {
        return Ok(());
    }

    match user.banned_until.as_deref() {
        None => Err(ApiError::forbidden("This account has been permanently banned")),
        Some(raw) => match parse_ban_end(raw) {
            Some(until) if until <= now => Ok(()),
            Some(until) => Err(ApiError::forbidden(format!(
                "This account is banned until {}",
                until.to_rfc3339()
            ))),
            None => {
                warn!("Unreadable banned_until {:?} for user {}, keeping ban", raw, user.id);
                Err(ApiError::forbidden("This account has been banned"))
            }
        },
    }
}

/// Ban end dates are parsed strictly: an unreadable one never lifts the ban.
fn parse_ban_end(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|dt| dt.and_utc()))
        .ok()
}

pub async fn logout(jar: CookieJar) -> impl IntoResponse {
    (tokens::clear_session(jar), Json(ApiResponse::done("Logout successful")))
}

pub async fn refresh(State(state): State<AppState>, jar: CookieJar) -> Result<impl IntoResponse, ApiError> {
    let token = jar
        .get(REFRESH_COOKIE)
        .map(|c| c.value().to_owned())
        .ok_or_else(|| ApiError::Unauthorized("Refresh token not found".into()))?;

    let claims = tokens::verify(&state.auth, &token, TokenKind::Refresh)
        .ok_or_else(|| ApiError::Unauthorized("Invalid or expired refresh token".into()))?;

    let id = claims.sub.to_string();
    let user = with_db(&state, move |db| db.get_user_by_id(&id))
        .await?
        .filter(|u| u.is_active && u.deleted_at.is_none())
        .ok_or_else(|| ApiError::Unauthorized("User not found or inactive".into()))?;

    let pair = tokens::issue_pair(&state.auth, claims.sub, &user.email, false)?;

    Ok((
        tokens::set_session(jar, &state.auth, &pair),
        Json(ApiResponse::done("Token refreshed successfully")),
    ))
}

pub async fn verify(State(state): State<AppState>, user: AuthUser) -> Result<impl IntoResponse, ApiError> {
    let id = user.id.to_string();
    let row = with_db(&state, move |db| db.get_user_by_id(&id))
        .await?
        .ok_or_else(|| ApiError::Unauthorized("User not found".into()))?;

    Ok(Json(
        ApiResponse::ok(AuthResponse {
            user: views::user(&row),
        })
        .with_message("Token is valid"),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(banned: bool, until: Option<&str>) -> UserRow {
        UserRow {
            id: "u1".into(),
            email: "a@b.co".into(),
            password: String::new(),
            avatar: None,
            is_email_verified: false,
            last_login: None,
            posts_count: 0,
            followers_count: 0,
            following_count: 0,
            is_active: true,
            is_banned: banned,
            banned_until: until.map(str::to_owned),
            deleted_at: None,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    fn now() -> DateTime<Utc> {
        "2026-06-01T00:00:00Z".parse().unwrap()
    }

    #[test]
    fn ban_windows() {
        assert!(check_standing(&user(false, None), now()).is_ok());
        assert!(matches!(
            check_standing(&user(true, None), now()),
            Err(ApiError::Forbidden(_))
        ));
        assert!(matches!(
            check_standing(&user(true, Some("2026-07-01T00:00:00.000Z")), now()),
            Err(ApiError::Forbidden(_))
        ));
        assert!(check_standing(&user(true, Some("2026-05-01T00:00:00.000Z")), now()).is_ok());
        assert!(check_standing(&user(true, Some("2026-05-01 00:00:00")), now()).is_ok());
    }

    #[test]
    fn unreadable_ban_end_keeps_ban() {
        for raw in ["not-a-date", "", "2026-13-45T00:00:00Z"] {
            assert!(
                matches!(check_standing(&user(true, Some(raw)), now()), Err(ApiError::Forbidden(_))),
                "{raw:?} lifted the ban"
            );
        }
        assert!(check_standing(&user(false, Some("not-a-date")), now()).is_ok());
    }

    #[test]
    fn inactive_or_deleted_is_forbidden() {
        let mut inactive = user(false, None);
        inactive.is_active = false;
        assert!(check_standing(&inactive, now()).is_err());

        let mut deleted = user(false, None);
        deleted.deleted_at = Some("2026-01-01T00:00:00.000Z".into());
        assert!(check_standing(&deleted, now()).is_err());
    }
}
