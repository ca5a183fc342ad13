//! API routes

use axum::{
    routing::{get, post, MethodRouter},
    Router,
};

use crate::extractors::AppState;
use crate::handlers::catalog::{self, CatalogResource, Equipments, Materials, Ppe, Team};
use crate::handlers::{changes, observations, procedures, reports, services};

/// Create the complete router
pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/api", api_router())
        .route("/order/service/:id", get(reports::report_page))
}

fn api_router() -> Router<AppState> {
    Router::new()
        .route("/team", catalog_routes::<Team>())
        .route("/materials", catalog_routes::<Materials>())
        .route("/equipments", catalog_routes::<Equipments>())
        .route("/epi", catalog_routes::<Ppe>())
        .route("/catalog", get(catalog::pick_lists))
        .route(
            "/procedures",
            get(procedures::read)
                .post(procedures::create)
                .patch(procedures::update)
                .delete(procedures::remove),
        )
        .route(
            "/services",
            get(services::read)
                .post(services::create)
                .put(services::replace)
                .patch(services::update)
                .delete(services::remove),
        )
        .route(
            "/observations",
            get(observations::list).post(observations::create),
        )
        .route("/send_order", post(reports::send_order))
        .route("/changes", get(changes::stream))
}

fn catalog_routes<R: CatalogResource>() -> MethodRouter<AppState> {
    get(catalog::read::<R>)
        .post(catalog::create::<R>)
        .patch(catalog::update::<R>)
        .delete(catalog::remove::<R>)
}
