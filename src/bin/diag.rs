use axum::{middleware as axum_middleware, routing::get, Router};
use filevault::AppState;

fn main() {
    let _f: fn(AppState) -> Router<AppState> = |state: AppState| {
        Router::new()
            .route("/projects", axum::routing::post(filevault::handlers::projects::create_project))
            .route_layer(axum_middleware::from_fn_with_state(
                state.clone(),
                filevault::middleware::access::access_control_middleware,
            ))
    };
}
