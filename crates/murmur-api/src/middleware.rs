use std::convert::Infallible;

use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts, Request, State},
    http::{HeaderValue, header, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};
use tracing::{debug, warn};
use uuid::Uuid;

use murmur_types::api::TokenKind;

use crate::error::ApiError;
use crate::state::{AppState, with_db};
use crate::tokens::{self, ACCESS_COOKIE, REFRESH_COOKIE, TokenPair};

/// The signed-in user, attached to the request by [`authenticate`].
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
}

/// Resolve the caller's session and attach an [`AuthUser`] when it is valid.
///
/// The access token comes from `Authorization: Bearer` or the access cookie.
/// If it is missing or expired but the refresh cookie is good, a new pair is
/// issued and set on the response. Requests without a usable session pass
/// through anonymously; handlers that need a user reject them.
pub async fn authenticate(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let jar = CookieJar::from_headers(req.headers());
    let access = req
        .headers()
        .typed_get::<Authorization<Bearer>>()
        .map(|bearer| bearer.token().to_owned())
        .or_else(|| jar.get(ACCESS_COOKIE).map(|c| c.value().to_owned()));
    let refresh = jar.get(REFRESH_COOKIE).map(|c| c.value().to_owned());

    let session = match resolve_session(&state, access.as_deref(), refresh.as_deref()).await {
        Ok(session) => session,
        Err(e) => return e.into_response(),
    };

    let mut reissued = None;
    if let Some((user, pair)) = session {
        req.extensions_mut().insert(user);
        reissued = pair;
    }

    let mut response = next.run(req).await;

    if let Some(pair) = reissued {
        for cookie in tokens::session_cookies(&state.auth, &pair) {
            match HeaderValue::from_str(&cookie.to_string()) {
                Ok(value) => {
                    response.headers_mut().append(header::SET_COOKIE, value);
                }
                Err(e) => warn!("Unencodable session cookie: {}", e),
            }
        }
    }

    response
}

async fn resolve_session(
    state: &AppState,
    access: Option<&str>,
    refresh: Option<&str>,
) -> Result<Option<(AuthUser, Option<TokenPair>)>, ApiError> {
    let (claims, refreshed) = match access.and_then(|t| tokens::verify(&state.auth, t, TokenKind::Access)) {
        Some(claims) => (claims, false),
        None => match refresh.and_then(|t| tokens::verify(&state.auth, t, TokenKind::Refresh)) {
            Some(claims) => (claims, true),
            None => return Ok(None),
        },
    };

    let user_id = claims.sub.to_string();
    let user = with_db(state, move |db| db.get_user_by_id(&user_id)).await?;
    let Some(user) = user.filter(|u| u.is_active && u.deleted_at.is_none()) else {
        debug!("Session for {} rejected: user missing or inactive", claims.sub);
        return Ok(None);
    };

    let pair = if refreshed {
        debug!("Access token for {} renewed from refresh token", claims.sub);
        Some(tokens::issue_pair(&state.auth, claims.sub, &user.email, false)?)
    } else {
        None
    };

    Ok(Some((
        AuthUser {
            id: claims.sub,
            email: user.email,
        },
        pair,
    )))
}

impl<S: Send + Sync> FromRequestParts<S> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| ApiError::Unauthorized("Please login to continue".into()))
    }
}

impl<S: Send + Sync> OptionalFromRequestParts<S> for AuthUser {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Option<Self>, Self::Rejection> {
        Ok(parts.extensions.get::<AuthUser>().cloned())
    }
}
