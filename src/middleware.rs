use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::CookieJar;
use serde_json::json;

use crate::auth::Session;
use crate::database::AppState;

/// Cookie carrying the session token for page requests
pub const SESSION_COOKIE: &str = "session";

/// The signed-in user, inserted into request extensions by [`auth_middleware`]
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: String,
    pub email: String,
}

impl From<Session> for CurrentUser {
    fn from(session: Session) -> Self {
        Self {
            id: session.user.id,
            email: session.user.email,
        }
    }
}

/// Extracts the session token from `Authorization: Bearer <token>`, falling
/// back to the session cookie.
pub fn session_token(headers: &HeaderMap, jar: &CookieJar) -> Option<String> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty());

    match bearer {
        Some(token) => Some(token.to_string()),
        None => jar.get(SESSION_COOKIE).map(|c| c.value().to_string()),
    }
}

/// Resolves the live session behind a request, if any.
pub fn current_user(state: &AppState, headers: &HeaderMap, jar: &CookieJar) -> Option<CurrentUser> {
    let token = session_token(headers, jar)?;
    match state.auth.get_session(&token) {
        Ok(session) => session.map(CurrentUser::from),
        Err(err) => {
            tracing::error!(error = %err, "Session lookup failed");
            None
        }
    }
}

/// Middleware requiring a live session
///
/// Requests without a valid session token are answered with 401 before they
/// reach a handler. Otherwise the resolved [`CurrentUser`] is attached to the
/// request extensions.
pub async fn auth_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, Response> {
    let unauthorized_response = || {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({
                "error": "Unauthorized",
                "message": "Invalid or missing authorization header"
            })),
        )
            .into_response()
    };

    let Some(user) = current_user(&state, &headers, &jar) else {
        return Err(unauthorized_response());
    };

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}
