use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{CONTENT_TYPE, COOKIE, SET_COOKIE},
        HeaderValue, Request,
    },
    middleware::from_fn_with_state,
    response::{IntoResponse, Response},
    Router,
};
use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestId, RequestId},
    sensitive_headers::SetSensitiveRequestHeadersLayer,
    services::ServeDir,
    timeout::TimeoutLayer,
    trace::{
        DefaultOnBodyChunk, DefaultOnEos, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse,
        TraceLayer,
    },
    LatencyUnit, ServiceBuilderExt,
};
use tracing::Level;

use crate::{auth, errors::AppError, media::MEDIA_URL, posts, state::WebsiteState};

/// Every page of the site, behind the sessions middleware.
pub fn website_routes(state: WebsiteState) -> Router<WebsiteState> {
    Router::new()
        .merge(auth::routes(state.clone()))
        .merge(posts::routes(state.clone()))
        .layer(from_fn_with_state(state, auth::sessions_middleware))
}

pub fn get_router(state: WebsiteState, routes: Router<WebsiteState>) -> Router {
    let config = state.config();
    let sensitive_headers: Arc<[_]> = vec![COOKIE, SET_COOKIE].into();
    // Build our middleware stack
    let middleware = ServiceBuilder::new()
        .layer(SetSensitiveRequestHeadersLayer::from_shared(
            sensitive_headers.clone(),
        ))
        .set_x_request_id(CounterRequestId::default())
        .layer(
            TraceLayer::new_for_http()
                .on_request(DefaultOnRequest::new())
                .on_response(
                    DefaultOnResponse::new()
                        .level(Level::INFO)
                        .latency_unit(LatencyUnit::Micros)
                        .include_headers(true),
                )
                .on_body_chunk(DefaultOnBodyChunk::new())
                .on_eos(DefaultOnEos::new().level(Level::INFO))
                .on_failure(DefaultOnFailure::new().level(Level::INFO)),
        )
        .sensitive_response_headers(sensitive_headers)
        .layer(TimeoutLayer::new(Duration::from_secs(10)))
        .compression()
        .propagate_x_request_id()
        // Set a `Content-Type` if there isn't one already.
        .insert_response_header_if_not_present(
            CONTENT_TYPE,
            HeaderValue::from_static("application/octet-stream"),
        );

    Router::new()
        .merge(routes)
        .nest_service(MEDIA_URL, ServeDir::new(&config.media_root))
        .fallback(error_404)
        .layer(DefaultBodyLimit::max(config.max_upload_size))
        .layer(middleware)
        .with_state(state)
}

#[derive(Clone, Default)]
struct CounterRequestId {
    counter: Arc<AtomicU64>,
}

impl MakeRequestId for CounterRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        self.counter
            .fetch_add(1, Ordering::SeqCst)
            .to_string()
            .parse()
            .ok()
            .map(RequestId::new)
    }
}

async fn error_404() -> Response {
    AppError::DoesNotExist.into_response()
}
