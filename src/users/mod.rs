use axum::{middleware, routing::get, Router};

use crate::{
    auth::guard,
    factory,
    state::AppState,
};

pub mod handlers;
pub mod model;
pub mod repo;

use model::User;

/// User routes. Everything here sits behind the auth guard; the by-id CRUD
/// additionally requires the admin role.
pub fn router(state: AppState) -> Router<AppState> {
    let admin = Router::new()
        .route(
            "/users",
            get(factory::list_all::<User>).post(factory::create_one::<User>),
        )
        .route(
            "/users/:id",
            get(factory::get_one::<User>)
                .patch(factory::update_one::<User>)
                .delete(factory::delete_one::<User>),
        )
        .route_layer(middleware::from_fn(guard::require_admin));

    let me = Router::new().route(
        "/users/me",
        get(handlers::get_me)
            .patch(handlers::update_me)
            .delete(handlers::delete_me),
    );

    admin
        .merge(me)
        .route_layer(middleware::from_fn_with_state(state, guard::authenticate))
}
