//! HTTP request handlers
//!
//! This module implements the JSON API over the template store and the auth
//! service, the preview endpoint, the theme preference endpoints and the
//! page fallback.

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, Uri},
    response::{Html, IntoResponse, Redirect, Response},
    Extension, Json,
};
use axum_extra::extract::cookie::{Cookie, SameSite};
use axum_extra::extract::CookieJar;
use serde::Deserialize;
use serde_json::json;

use crate::auth::welcome_message;
use crate::database::AppState;
use crate::error::{ApiError, ApiResult, AuthError};
use crate::form_editor::TemplateForm;
use crate::list_view::{DeleteOutcome, TemplateList};
use crate::middleware::{current_user, session_token, CurrentUser, SESSION_COOKIE};
use crate::model::{
    Credentials, DeleteParams, ListParams, NewTemplate, PageParams, ResetPasswordRequest,
    TemplatePatch,
};
use crate::pages::{resolve, Page, PageOutcome, TemplateView};
use crate::preview::{escape_html, render_preview};
use crate::store::TemplateStore;
use crate::theme::{Appearance, ThemeMode, PREFERS_COLOR_SCHEME_HEADER};

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

/// `POST /auth/signup`
///
/// - **201 Created** - Account created
/// - **400 Bad Request** - Invalid email or password too short
/// - **409 Conflict** - Email already registered
pub async fn sign_up(
    State(state): State<AppState>,
    Json(payload): Json<Credentials>,
) -> ApiResult<impl IntoResponse> {
    let user = state.auth.sign_up(&payload.email, &payload.password)?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Account created successfully!",
            "user": user
        })),
    ))
}

/// `POST /auth/login`
///
/// Returns the session and also sets it as an http-only cookie so the pages
/// can use it.
pub async fn sign_in(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<Credentials>,
) -> ApiResult<impl IntoResponse> {
    let session = state
        .auth
        .sign_in_with_password(&payload.email, &payload.password)?;

    let cookie = Cookie::build((SESSION_COOKIE, session.token.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build();

    Ok((
        jar.add(cookie),
        Json(json!({
            "message": welcome_message(&session.user.email),
            "token": session.token,
            "user": session.user,
            "expires_at": session.expires_at
        })),
    ))
}

/// `POST /auth/logout`
pub async fn sign_out(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
) -> ApiResult<impl IntoResponse> {
    let token = session_token(&headers, &jar).ok_or(AuthError::NoSession)?;
    state.auth.sign_out(&token)?;

    Ok((
        jar.remove(Cookie::build(SESSION_COOKIE).path("/")),
        Json(json!({ "message": "Signed out successfully" })),
    ))
}

/// `GET /auth/session`
///
/// Always 200; `session` is `null` when there is none.
pub async fn get_session(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
) -> ApiResult<impl IntoResponse> {
    let session = match session_token(&headers, &jar) {
        Some(token) => state.auth.get_session(&token)?,
        None => None,
    };

    Ok(Json(json!({ "session": session })))
}

/// `POST /auth/reset-password`
///
/// Answers the same way whether or not the address is registered.
pub async fn reset_password(
    State(state): State<AppState>,
    Json(payload): Json<ResetPasswordRequest>,
) -> ApiResult<impl IntoResponse> {
    state.auth.reset_password_for_email(&payload.email)?;

    Ok(Json(json!({ "message": "Password reset email sent!" })))
}

// ---------------------------------------------------------------------------
// Templates
// ---------------------------------------------------------------------------

/// `GET /api/templates?include_archived=&search=&tags=`
///
/// Fetches the caller's templates and applies the list filters.
///
/// # Response
///
/// ```json
/// {
///   "data": [...],
///   "tags": ["billing", "hr"],
///   "total_fetched": 12
/// }
/// ```
///
/// `tags` is the tag universe of every fetched template, before search and
/// tag filtering; `total_fetched` counts the same set.
pub async fn list_templates(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(params): Query<ListParams>,
) -> ApiResult<impl IntoResponse> {
    let store = state.store_for(&user.id);

    let mut list = TemplateList::new();
    list.set_search_term(params.search.clone().unwrap_or_default());
    list.set_selected_tags(params.selected_tags());
    list.set_show_archived(&store, params.include_archived).await?;

    Ok(Json(json!({
        "data": list.filtered(),
        "tags": list.all_tags(),
        "total_fetched": list.templates.len()
    })))
}

/// `POST /api/templates`
///
/// - **201 Created** - Template stored; the body is the materialized row
/// - **400 Bad Request** - Blank name or no fields
pub async fn create_template(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(payload): Json<NewTemplate>,
) -> ApiResult<impl IntoResponse> {
    let template = state.store_for(&user.id).create_template(payload).await?;

    Ok((StatusCode::CREATED, Json(template)))
}

/// `GET /api/templates/{id}`
pub async fn get_template(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let template = state.store_for(&user.id).get_template_by_id(&id).await?;

    Ok(Json(template))
}

/// `PATCH /api/templates/{id}`
pub async fn update_template(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(patch): Json<TemplatePatch>,
) -> ApiResult<impl IntoResponse> {
    let template = state.store_for(&user.id).update_template(&id, patch).await?;

    Ok(Json(template))
}

/// `POST /api/templates/{id}/archive`
pub async fn archive_template(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    state.store_for(&user.id).archive_template(&id).await?;

    Ok(Json(json!({
        "message": "Template archived",
        "archived_id": id
    })))
}

/// `DELETE /api/templates/{id}?confirm=true`
///
/// - **200 OK** - Template deleted
/// - **404 Not Found** - No such template for this user
/// - **409 Conflict** - `confirm=true` missing; nothing was deleted
pub async fn delete_template(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    Query(params): Query<DeleteParams>,
) -> ApiResult<Response> {
    let store = state.store_for(&user.id);
    let confirmed = params.confirm;

    let mut list = TemplateList::new();
    let outcome = list.delete(&store, &id, &move |_: &str| confirmed).await?;

    let response = match outcome {
        DeleteOutcome::Cancelled => (
            StatusCode::CONFLICT,
            Json(json!({
                "error": "Deletion must be confirmed with confirm=true",
                "code": "confirmation_required"
            })),
        )
            .into_response(),
        DeleteOutcome::Deleted => (
            StatusCode::OK,
            Json(json!({
                "message": "Template deleted successfully",
                "deleted_id": id
            })),
        )
            .into_response(),
    };
    Ok(response)
}

/// `POST /api/templates/{id}/usage`
///
/// Atomic server-side counter increment.
pub async fn increment_usage(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let store = state.store_for(&user.id);
    store.increment_usage_count(&id).await?;
    let template = store.get_template_by_id(&id).await?;

    Ok(Json(json!({ "id": id, "usage_count": template.usage_count })))
}

/// `GET /api/templates/{id}/preview`
pub async fn preview_template(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<Html<String>> {
    let template = state.store_for(&user.id).get_template_by_id(&id).await?;

    Ok(Html(render_preview(&template)))
}

// ---------------------------------------------------------------------------
// Theme preference
// ---------------------------------------------------------------------------

/// Body of `PUT /api/preferences/theme`
///
/// `system_theme` reports the host appearance when the client cannot send
/// the `Sec-CH-Prefers-Color-Scheme` hint.
#[derive(Deserialize)]
pub struct ThemeRequest {
    pub theme: ThemeMode,
    #[serde(default)]
    pub system_theme: Option<Appearance>,
}

/// Records the host appearance carried by the client hint, if any.
async fn observe_system_theme(state: &AppState, headers: &HeaderMap) {
    let hinted = headers
        .get(PREFERS_COLOR_SCHEME_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(Appearance::from_client_hint);

    if let Some(system) = hinted {
        state.theme.set_system_theme(system).await;
    }
}

/// `GET /api/preferences/theme`
pub async fn get_theme(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    observe_system_theme(&state, &headers).await;
    Json(state.theme.snapshot().await)
}

/// `PUT /api/preferences/theme`
pub async fn put_theme(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<ThemeRequest>,
) -> ApiResult<impl IntoResponse> {
    observe_system_theme(&state, &headers).await;
    if let Some(system) = payload.system_theme {
        state.theme.set_system_theme(system).await;
    }

    let snapshot = state
        .theme
        .set_theme(payload.theme)
        .await
        .map_err(crate::error::StoreError::from)?;

    Ok(Json(snapshot))
}

// ---------------------------------------------------------------------------
// Pages
// ---------------------------------------------------------------------------

/// Fallback for every path outside the API
///
/// Applies the page routing rules, then renders a minimal HTML page. The
/// template pages render the list, the preview overlay and the editor
/// server-side.
pub async fn page_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
    uri: Uri,
    Query(params): Query<PageParams>,
) -> ApiResult<Response> {
    let user = current_user(&state, &headers, &jar);

    let page = match resolve(uri.path(), user.is_some()) {
        PageOutcome::Redirect(to) => return Ok(Redirect::to(&to).into_response()),
        PageOutcome::Render(page) => page,
    };

    let body = match (page, user) {
        (Page::Templates(view), Some(user)) => {
            render_templates_page(&state, &user, view, &params).await?
        }
        (Page::Dashboard, Some(user)) => format!(
            "<p>Signed in as {}.</p>",
            escape_html(&user.email)
        ),
        _ => String::new(),
    };

    observe_system_theme(&state, &headers).await;
    let snapshot = state.theme.snapshot().await;
    let appearance = match snapshot.resolved_theme {
        Appearance::Light => "light",
        Appearance::Dark => "dark",
    };

    // Ask browsers to send the colour-scheme hint on later requests
    Ok((
        [("accept-ch", "Sec-CH-Prefers-Color-Scheme")],
        Html(format!(
            r#"<!DOCTYPE html><html class="{appearance}"><head><meta charset="utf-8"><title>{title}</title></head><body><h1>{title}</h1>{body}</body></html>"#,
            title = page.title(),
        )),
    )
        .into_response())
}

async fn render_templates_page(
    state: &AppState,
    user: &CurrentUser,
    view: TemplateView,
    params: &PageParams,
) -> Result<String, ApiError> {
    let store = state.store_for(&user.id);

    match view {
        TemplateView::List => {
            let mut list = TemplateList::new();
            list.set_search_term(params.search.clone().unwrap_or_default());
            list.set_selected_tags(params.selected_tags());

            // A failed fetch shows the list-level message instead of failing the page
            let _ = list.set_show_archived(&store, params.archived).await;

            let mut html = String::new();
            if let Some(error) = &list.error {
                html.push_str(&format!(r#"<div class="list-error">{}</div>"#, escape_html(error)));
            }
            html.push_str(&list.render_cards());

            if let Some(id) = &params.preview {
                let template = store.get_template_by_id(id).await?;
                html.push_str(&format!(
                    r#"<div class="overlay">{}</div>"#,
                    render_preview(&template)
                ));
            }
            Ok(html)
        }
        TemplateView::Create => Ok(TemplateForm::new(None).render()),
        TemplateView::Edit => {
            let id = params
                .id
                .as_deref()
                .ok_or_else(|| ApiError::BadRequest("missing template id".into()))?;
            let template = store.get_template_by_id(id).await?;
            Ok(TemplateForm::new(Some(&template)).render())
        }
    }
}
