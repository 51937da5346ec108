pub mod profile;
pub mod subscribe;
pub mod subscriptions;

use crate::AppState;
use axum::routing::{get, post};
use axum::Router;
use utoipa::OpenApi;

/// Returns the router for /api/users endpoints (mounted at /api/users)
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/subscriptions", get(subscriptions::list_subscriptions))
        .route("/{id}", get(profile::get_profile))
        .route(
            "/{id}/subscribe",
            post(subscribe::subscribe).delete(subscribe::unsubscribe),
        )
}

#[derive(OpenApi)]
#[openapi(
    paths(
        profile::get_profile,
        subscribe::subscribe,
        subscribe::unsubscribe,
        subscriptions::list_subscriptions,
    ),
    components(schemas(
        subscriptions::SubscriptionView,
        subscriptions::SubscriptionsResponse,
    ))
)]
pub struct ApiDoc;
