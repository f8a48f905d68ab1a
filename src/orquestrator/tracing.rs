use sentry_tracing::EventFilter;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Env;

/// Flushes pending logs and sentry events when dropped, so it has to live
/// as long as the process.
pub struct TracingGuards {
    _writer: WorkerGuard,
    _sentry: Option<sentry::ClientInitGuard>,
}

pub fn init_tracing(env: &Env, sentry_token: Option<&str>) -> TracingGuards {
    let (writer, writer_guard) = tracing_appender::non_blocking(std::io::stdout());
    let registry = tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(writer)
                .log_internal_errors(true)
                .with_file(true)
                .with_line_number(true)
                .with_thread_ids(true)
                .with_thread_names(true)
                .with_current_span(true)
                .with_span_events(FmtSpan::CLOSE)
                .with_span_list(true)
                .with_target(true),
        );

    let Some(token) = sentry_token else {
        registry.init();
        return TracingGuards {
            _writer: writer_guard,
            _sentry: None,
        };
    };

    let sentry_guard = sentry::init((
        token,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: Some(env.to_string().into()),
            debug: matches!(env, Env::Development | Env::Test),
            ..Default::default()
        },
    ));

    let sentry_layer = sentry_tracing::layer().event_filter(|md| match *md.level() {
        tracing::Level::ERROR | tracing::Level::WARN => EventFilter::Event,
        _ => EventFilter::Ignore,
    });

    registry.with(sentry_layer).init();
    TracingGuards {
        _writer: writer_guard,
        _sentry: Some(sentry_guard),
    }
}
