//! Router configuration.

use super::health::readiness_check;
use super::state::AppState;
use crate::api::{admin, articles, auth, tickets};
use axum::{
    routing::{get, patch, post},
    Router,
};
use helpdesk_web::handlers::health::health_check;
use helpdesk_web::with_request_tracing;

/// Build the complete router.
///
/// Health checks sit at the root; everything else is under `/api` and needs
/// a bearer token, except login.
pub fn build_router(state: AppState) -> Router {
    let auth_routes = Router::new()
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me));

    let ticket_routes = Router::new()
        .route("/", post(tickets::create_ticket).get(tickets::list_tickets))
        .route("/:id", get(tickets::get_ticket).patch(tickets::update_ticket))
        .route("/:id/transition", post(tickets::transition_ticket))
        .route("/:id/assign", post(tickets::assign_ticket))
        .route(
            "/:id/comments",
            post(tickets::create_comment).get(tickets::list_comments),
        )
        .route("/:id/sla", get(tickets::ticket_sla));

    let article_routes = Router::new()
        .route("/", post(articles::create_article).get(articles::list_articles))
        .route(
            "/:id",
            get(articles::get_article)
                .patch(articles::update_article)
                .delete(articles::archive_article),
        )
        .route("/:id/publish", post(articles::publish_article))
        .route("/:id/unpublish", post(articles::unpublish_article));

    let admin_routes = Router::new()
        .route("/users", get(admin::list_users).post(admin::create_user))
        .route("/users/:id", patch(admin::update_user))
        .route("/teams", get(admin::list_teams).post(admin::create_team))
        .route("/teams/:id", patch(admin::update_team))
        .route("/categories", get(admin::list_categories).post(admin::create_category))
        .route("/tags", get(admin::list_tags).post(admin::create_tag))
        .route(
            "/sla-settings",
            get(admin::list_sla_settings).post(admin::create_sla_settings),
        )
        .route("/sla-settings/:id", patch(admin::update_sla_settings))
        .route("/audit-logs", get(admin::list_audit_logs));

    let api_routes = Router::new()
        .nest("/auth", auth_routes)
        .nest("/tickets", ticket_routes)
        .nest("/articles", article_routes)
        .nest("/admin", admin_routes);

    let router = Router::new()
        // Health checks (no authentication)
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .nest("/api", api_routes);

    with_request_tracing(router).with_state(state)
}
