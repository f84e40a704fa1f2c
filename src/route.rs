//! Route definitions for the template manager
//!
//! Maps the auth endpoints, the session-protected template API, the theme
//! preference endpoints and the page fallback to their handlers.

use axum::routing::{get, post};
use axum::{middleware, Router};

use crate::database::AppState;
use crate::handler::{
    archive_template, create_template, delete_template, get_session, get_template, get_theme,
    increment_usage, list_templates, page_handler, preview_template, put_theme, reset_password,
    sign_in, sign_out, sign_up, update_template,
};
use crate::middleware::auth_middleware;

/// Creates the application router
///
/// # Route Definitions
///
/// - `POST /auth/signup`, `/auth/login`, `/auth/logout`, `/auth/reset-password`
/// - `GET /auth/session`
/// - `GET|POST /api/templates` - List / create (session required)
/// - `GET|PATCH|DELETE /api/templates/{id}` - Read / update / delete (session required)
/// - `POST /api/templates/{id}/archive`, `/api/templates/{id}/usage` (session required)
/// - `GET /api/templates/{id}/preview` - Rendered HTML preview (session required)
/// - `GET|PUT /api/preferences/theme` - Theme preference
/// - anything else - page routing
///
/// # Example Usage
///
/// ```no_run
/// # use template_manager::config::Config;
/// # use template_manager::database::{init_db, AppState};
/// # use template_manager::route::create_app;
/// let config = Config::default();
/// let db = init_db(&config.database_url).unwrap();
/// let state = AppState::new(db, config).unwrap();
/// let app = create_app(state);
/// // axum::serve(listener, app).await.unwrap();
/// ```
pub fn create_app(state: AppState) -> Router {
    let auth_routes = Router::new()
        .route("/auth/signup", post(sign_up))
        .route("/auth/login", post(sign_in))
        .route("/auth/logout", post(sign_out))
        .route("/auth/session", get(get_session))
        .route("/auth/reset-password", post(reset_password));

    // Every template route needs a live session
    let template_routes = Router::new()
        .route("/api/templates", get(list_templates).post(create_template))
        .route(
            "/api/templates/{id}",
            get(get_template)
                .patch(update_template)
                .delete(delete_template),
        )
        .route("/api/templates/{id}/archive", post(archive_template))
        .route("/api/templates/{id}/usage", post(increment_usage))
        .route("/api/templates/{id}/preview", get(preview_template))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(auth_routes)
        .merge(template_routes)
        .route("/api/preferences/theme", get(get_theme).put(put_theme))
        .fallback(page_handler)
        .with_state(state)
}
