//! HTTP server implementation for the Objectspace API

use axum::{
    http::{
        header::{ACCESS_CONTROL_ALLOW_ORIGIN, AUTHORIZATION, CONTENT_TYPE},
        Method,
    },
    routing::{get, MethodRouter},
    Router,
};
use std::{future::Future, sync::Arc};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::api_handlers;
use objectspace_core::{
    core::{factory::ConfiguredAppState, AppState},
    log_info,
    storage::StorageImpl,
};

/// Build the router for the configured backend
///
/// Matches once on the storage type; each backend contributes its own
/// handlers for the document route.
pub fn create_router(configured_app_state: &ConfiguredAppState) -> Router {
    match configured_app_state {
        ConfiguredAppState::Counter { app_state } => {
            log_info!("Building router with CounterStorage backend");
            let documents = get(api_handlers::list_counter_documents)
                .post(api_handlers::insert_counter_document);
            create_router_impl(app_state.clone(), documents)
        }
        ConfiguredAppState::Keyed { app_state } => {
            log_info!("Building router with KeyedStorage backend");
            let documents = get(api_handlers::list_keyed_documents)
                .post(api_handlers::insert_keyed_document);
            create_router_impl(app_state.clone(), documents)
        }
    }
}

/// Creates the application router with all routes and middleware
fn create_router_impl<S: StorageImpl>(
    app_state: AppState<S>,
    documents: MethodRouter<Arc<AppState<S>>>,
) -> Router {
    // CORS configuration - permissive, the API carries no credentials
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION, ACCESS_CONTROL_ALLOW_ORIGIN])
        .allow_origin(Any)
        .allow_credentials(false);

    let doc_route = app_state.config.server.doc_route.clone();
    let enable_metrics = app_state.config.metrics.enable_prometheus;

    let mut router = Router::new()
        // Root route
        .route("/", get(api_handlers::root_handler::<S>))
        // Document route
        .route(&doc_route, documents)
        // System routes
        .route("/health", get(api_handlers::health_check));

    if enable_metrics {
        router = router.route("/metrics", get(api_handlers::metrics_handler));
    }

    router
        // Apply middleware to ALL routes
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(Arc::new(app_state))
}

/// Serve the API until `shutdown` resolves, then drain in-flight requests
pub async fn start_api_server<F>(
    configured_app_state: &ConfiguredAppState,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let http_addr = configured_app_state.http_addr();
    let doc_route = configured_app_state.config().server.doc_route.clone();
    let app = create_router(configured_app_state);

    let listener = tokio::net::TcpListener::bind(http_addr).await?;

    log_info!("Server listening on http://{}", http_addr);
    log_info!("Documents available at http://{}{}", http_addr, doc_route);
    log_info!("Health check available at http://{}/health", http_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
}
