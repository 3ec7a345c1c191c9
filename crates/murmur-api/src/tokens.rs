use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

use murmur_types::api::{Claims, TokenKind};

use crate::state::AuthSettings;

pub const ACCESS_COOKIE: &str = "accessToken";
pub const REFRESH_COOKIE: &str = "refreshToken";

const ACCESS_TTL_SECS: i64 = 15 * 60;
const REMEMBER_ME_TTL_SECS: i64 = 7 * 24 * 60 * 60;
const REFRESH_TTL_SECS: i64 = 7 * 24 * 60 * 60;

pub struct TokenPair {
    pub access: String,
    pub refresh: String,
    access_ttl: i64,
}

/// Sign a fresh access/refresh pair. `remember_me` stretches the access token
/// to the refresh token's lifetime.
pub fn issue_pair(
    settings: &AuthSettings,
    user_id: Uuid,
    email: &str,
    remember_me: bool,
) -> anyhow::Result<TokenPair> {
    let access_ttl = if remember_me { REMEMBER_ME_TTL_SECS } else { ACCESS_TTL_SECS };

    Ok(TokenPair {
        access: sign(&settings.access_secret, user_id, email, TokenKind::Access, access_ttl)?,
        refresh: sign(&settings.refresh_secret, user_id, email, TokenKind::Refresh, REFRESH_TTL_SECS)?,
        access_ttl,
    })
}

fn sign(secret: &str, user_id: Uuid, email: &str, kind: TokenKind, ttl_secs: i64) -> anyhow::Result<String> {
    let now = chrono::Utc::now();
    let claims = Claims {
        sub: user_id,
        email: email.to_string(),
        kind,
        iat: now.timestamp() as usize,
        exp: (now + chrono::Duration::seconds(ttl_secs)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

/// Decode and check a token of the expected kind. Any failure is `None`.
pub fn verify(settings: &AuthSettings, token: &str, kind: TokenKind) -> Option<Claims> {
    let secret = match kind {
        TokenKind::Access => &settings.access_secret,
        TokenKind::Refresh => &settings.refresh_secret,
    };

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .ok()
    .map(|data| data.claims)
    .filter(|claims| claims.kind == kind)
}

/// httpOnly cookies carrying both tokens.
pub fn session_cookies(settings: &AuthSettings, pair: &TokenPair) -> [Cookie<'static>; 2] {
    [
        cookie(ACCESS_COOKIE, pair.access.clone(), pair.access_ttl, settings.secure_cookies),
        cookie(REFRESH_COOKIE, pair.refresh.clone(), REFRESH_TTL_SECS, settings.secure_cookies),
    ]
}

pub fn set_session(jar: CookieJar, settings: &AuthSettings, pair: &TokenPair) -> CookieJar {
    let [access, refresh] = session_cookies(settings, pair);
    jar.add(access).add(refresh)
}

pub fn clear_session(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build(ACCESS_COOKIE).path("/"))
        .remove(Cookie::build(REFRESH_COOKIE).path("/"))
}

fn cookie(name: &'static str, value: String, max_age_secs: i64, secure: bool) -> Cookie<'static> {
    Cookie::build((name, value))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(time::Duration::seconds(max_age_secs))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> AuthSettings {
        AuthSettings {
            access_secret: "access-test-secret".into(),
            refresh_secret: "refresh-test-secret".into(),
            secure_cookies: false,
        }
    }

    #[test]
    fn tokens_only_verify_as_their_own_kind() {
        let settings = settings();
        let user_id = Uuid::new_v4();
        let pair = issue_pair(&settings, user_id, "a@b.co", false).unwrap();

        let claims = verify(&settings, &pair.access, TokenKind::Access).unwrap();
        assert_eq!(claims.sub, user_id);
        assert!(verify(&settings, &pair.access, TokenKind::Refresh).is_none());
        assert!(verify(&settings, &pair.refresh, TokenKind::Access).is_none());
        assert!(verify(&settings, &pair.refresh, TokenKind::Refresh).is_some());
    }

    #[test]
    fn remember_me_extends_access_cookie() {
        let settings = settings();
        let short = issue_pair(&settings, Uuid::new_v4(), "a@b.co", false).unwrap();
        let long = issue_pair(&settings, Uuid::new_v4(), "a@b.co", true).unwrap();

        let [short_access, _] = session_cookies(&settings, &short);
        let [long_access, refresh] = session_cookies(&settings, &long);

        assert_eq!(short_access.max_age(), Some(time::Duration::minutes(15)));
        assert_eq!(long_access.max_age(), Some(time::Duration::days(7)));
        assert_eq!(refresh.http_only(), Some(true));
        assert_eq!(refresh.path(), Some("/"));
    }
}
