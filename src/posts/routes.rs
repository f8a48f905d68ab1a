use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use super::views;
use crate::{auth::login_required_middleware, state::WebsiteState};

pub fn routes(state: WebsiteState) -> Router<WebsiteState> {
    let protected = Router::new()
        .route(
            "/create",
            get(views::post_create).post(views::post_create_submit),
        )
        .route(
            "/posts/{post_id}/edit",
            get(views::post_edit).post(views::post_edit_submit),
        )
        .route("/posts/{post_id}/comment", post(views::add_comment))
        .route("/follow", get(views::follow_index))
        .route("/profile/{username}/follow", get(views::profile_follow))
        .route("/profile/{username}/unfollow", get(views::profile_unfollow))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            login_required_middleware,
        ));

    Router::new()
        .route("/", get(views::index))
        .route("/group/{slug}", get(views::group_posts))
        .route("/profile/{username}", get(views::profile))
        .route("/posts/{post_id}", get(views::post_detail))
        .merge(protected)
        .with_state(state)
}
