//! Router builder for the bookshelf HTTP server

use axum::{
    error_handling::HandleErrorLayer,
    extract::Request,
    http::{HeaderValue, StatusCode, Uri},
    response::IntoResponse,
    routing::get,
    BoxError, Json, Router,
};
use std::time::Duration;
use tower::{ServiceBuilder, ServiceExt};
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use uuid::{Timestamp, Uuid};

use bookshelf_kernel::ModuleRegistry;

use crate::error::AppError;

/// Prefix every module router is nested under
pub const API_PREFIX: &str = "/api/v1";

const ROUTE_NOT_FOUND: &str = "Route not found";

/// Builder for constructing the main HTTP router.
///
/// Middleware is recorded and applied in [`RouterBuilder::build`], after every
/// route and the fallback exist, so it wraps all of them.
pub struct RouterBuilder {
    router: Router,
    tracing: bool,
    cors: bool,
    request_id: bool,
    timeout: Option<Duration>,
}

impl RouterBuilder {
    /// Create a new router builder
    pub fn new() -> Self {
        Self {
            router: Router::new(),
            tracing: false,
            cors: false,
            request_id: false,
            timeout: None,
        }
    }

    /// Add a route to the router
    pub fn route(mut self, path: &str, route: axum::routing::MethodRouter) -> Self {
        self.router = self.router.route(path, route);
        self
    }

    /// Mount a module's router under `/api/v1/{module_name}`.
    ///
    /// The module's `/` route answers at the prefix with and without a
    /// trailing slash, and a known path hit with an unrouted verb falls through
    /// to [`route_not_found`].
    pub fn mount_module(mut self, module_name: &str, module_router: Router) -> Self {
        let path = module_path(module_name);
        let module_router = module_router.method_not_allowed_fallback(route_not_found);
        let slash_root = ServiceExt::<Request>::map_request(
            module_router.clone(),
            to_module_root as fn(Request) -> Request,
        );

        self.router = self
            .router
            .nest(&path, module_router)
            .route_service(&format!("{path}/"), slash_root);
        self
    }

    /// Add tracing middleware
    pub fn with_tracing(mut self) -> Self {
        self.tracing = true;
        self
    }

    /// Add CORS middleware allowing any origin
    pub fn with_cors(mut self) -> Self {
        self.cors = true;
        self
    }

    /// Add request ID middleware (`x-request-id`, echoed on the response)
    pub fn with_request_id(mut self) -> Self {
        self.request_id = true;
        self
    }

    /// Add timeout middleware
    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout = Some(Duration::from_millis(timeout_ms));
        self
    }

    /// Add OpenAPI documentation by collecting specs from all modules
    pub fn with_openapi(mut self, registry: &ModuleRegistry) -> Self {
        let openapi_spec = merge_openapi(registry);

        // Deserialize our JSON spec into a proper utoipa OpenApi object
        // This allows SwaggerUI to serve it correctly
        let openapi_obj: utoipa::openapi::OpenApi = serde_json::from_value(openapi_spec.clone())
            .unwrap_or_else(|err| {
                tracing::warn!(%err, "merged OpenAPI document rejected; serving an empty one");
                utoipa::openapi::OpenApiBuilder::new()
                    .info(
                        utoipa::openapi::InfoBuilder::new()
                            .title("Bookshelf API")
                            .version("1.0.0")
                            .build(),
                    )
                    .build()
            });

        self.router = self.router.merge(
            utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
                .url("/api-docs/openapi.json", openapi_obj),
        );

        // Also serve the raw JSON spec at /docs/openapi.json for external consumers
        self.router = self.router.route(
            "/docs/openapi.json",
            get(move || async move { Json(openapi_spec.clone()) }),
        );

        self
    }

    /// Build the final router: fallback first, then middleware from the
    /// innermost (timeout) to the outermost (CORS)
    pub fn build(self) -> Router {
        let mut router = self
            .router
            .method_not_allowed_fallback(route_not_found)
            .fallback(route_not_found);

        if let Some(timeout) = self.timeout {
            router = router.layer(
                ServiceBuilder::new()
                    .layer(HandleErrorLayer::new(middleware_failure))
                    .timeout(timeout),
            );
        }

        if self.tracing {
            router = router.layer(
                TraceLayer::new_for_http()
                    .make_span_with(DefaultMakeSpan::new().include_headers(true))
                    .on_request(DefaultOnRequest::new().level(tracing::Level::INFO))
                    .on_response(DefaultOnResponse::new().level(tracing::Level::INFO)),
            );
        }

        if self.request_id {
            router = router
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7));
        }

        if self.cors {
            router = router.layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            );
        }

        router
    }
}

impl Default for RouterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn module_path(module_name: &str) -> String {
    format!("{}/{}", API_PREFIX, module_name)
}

/// Re-target a `{prefix}/` request at the module's own `/`, keeping the query.
fn to_module_root(mut request: Request) -> Request {
    let root = match request.uri().query() {
        Some(query) => format!("/?{query}"),
        None => "/".to_string(),
    };
    if let Ok(uri) = root.parse::<Uri>() {
        *request.uri_mut() = uri;
    }
    request
}

/// Timeouts and other middleware errors render like any unclassified failure.
async fn middleware_failure(err: BoxError) -> AppError {
    if err.is::<tower::timeout::error::Elapsed>() {
        AppError::Internal(anyhow::anyhow!("request timed out"))
    } else {
        AppError::Internal(anyhow::anyhow!("middleware failure: {err}"))
    }
}

/// Fallback for every unmatched path and every unrouted verb
pub async fn route_not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "message": ROUTE_NOT_FOUND })),
    )
}

/// Merge module OpenAPI fragments into one document, prefixing their paths
fn merge_openapi(registry: &ModuleRegistry) -> serde_json::Value {
    let mut openapi_spec = serde_json::json!({
        "openapi": "3.1.0",
        "info": {
            "title": "Bookshelf API",
            "version": "1.0.0",
            "description": "Book collection REST API"
        },
        "paths": {},
        "components": {
            "schemas": {}
        }
    });

    openapi_spec["components"]["schemas"]["ErrorResponse"] = serde_json::json!({
        "type": "object",
        "properties": {
            "success": { "type": "boolean" },
            "error": {
                "oneOf": [
                    { "type": "string" },
                    { "type": "array", "items": { "type": "string" } }
                ]
            }
        },
        "required": ["success", "error"]
    });

    openapi_spec["paths"]["/healthz"] = serde_json::json!({
        "get": {
            "summary": "Health check",
            "responses": {
                "200": {
                    "description": "OK",
                    "content": {
                        "text/plain": {
                            "schema": { "type": "string" }
                        }
                    }
                }
            }
        }
    });

    for (module_name, module_spec) in registry.openapi_fragments() {
        if let Some(paths) = module_spec.get("paths").and_then(|paths| paths.as_object()) {
            for (path, path_item) in paths {
                // `/` of a module is the bare prefix, matching how nest() routes it
                let prefixed_path = match path.as_str() {
                    "/" => module_path(module_name),
                    other => format!("{}{}", module_path(module_name), other),
                };
                openapi_spec["paths"][prefixed_path] = path_item.clone();
            }
        }

        if let Some(schemas) = module_spec
            .get("components")
            .and_then(|components| components.get("schemas"))
            .and_then(|schemas| schemas.as_object())
        {
            for (schema_name, schema_def) in schemas {
                openapi_spec["components"]["schemas"][schema_name] = schema_def.clone();
            }
        }
    }

    openapi_spec
}

/// Request ID generator producing time-ordered UUIDs
#[derive(Clone, Copy)]
struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let timestamp = Timestamp::now(uuid::NoContext);
        let request_id = Uuid::new_v7(timestamp)
            .to_string()
            .parse::<HeaderValue>()
            .ok()?;
        Some(RequestId::new(request_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, extract::RawQuery, http::Request};
    use bookshelf_kernel::Module;
    use http_body_util::BodyExt;
    use std::sync::Arc;
    use tower::ServiceExt;

    struct ShelvesModule;

    #[async_trait::async_trait]
    impl Module for ShelvesModule {
        fn name(&self) -> &'static str {
            "shelves"
        }

        fn openapi(&self) -> Option<serde_json::Value> {
            Some(serde_json::json!({
                "paths": {
                    "/": { "get": { "summary": "List shelves" } },
                    "/{id}": { "get": { "summary": "Get shelf" } }
                },
                "components": {
                    "schemas": { "Shelf": { "type": "object" } }
                }
            }))
        }
    }

    async fn call(router: Router, uri: &str) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, headers, bytes.to_vec())
    }

    #[tokio::test]
    async fn test_unmatched_route_uses_fallback() {
        let router = RouterBuilder::new()
            .route("/test", get(|| async { "test" }))
            .build();

        let (status, _, body) = call(router, "/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body, serde_json::json!({ "message": "Route not found" }));
    }

    #[tokio::test]
    async fn test_module_mounting() {
        let module_router = Router::new().route("/", get(|| async { "module" }));

        let router = RouterBuilder::new()
            .mount_module("test", module_router)
            .build();

        let (status, _, body) = call(router, "/api/v1/test").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"module");
    }

    #[tokio::test]
    async fn test_module_root_answers_with_trailing_slash() {
        let module_router = Router::new()
            .route(
                "/",
                get(|RawQuery(query): RawQuery| async move { query.unwrap_or_default() }),
            )
            .route("/{id}", get(|| async { "item" }));

        let router = RouterBuilder::new()
            .mount_module("test", module_router)
            .build();

        let (status, _, body) = call(router.clone(), "/api/v1/test/?page=2&limit=5").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"page=2&limit=5");

        let (status, _, body) = call(router, "/api/v1/test/abc").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"item");
    }

    #[tokio::test]
    async fn test_unrouted_verb_is_route_not_found() {
        let module_router = Router::new().route("/{id}", get(|| async { "item" }));
        let router = RouterBuilder::new()
            .route("/test", get(|| async { "test" }))
            .mount_module("test", module_router)
            .build();

        for (method, uri) in [("PATCH", "/api/v1/test/abc"), ("DELETE", "/test")] {
            let response = router
                .clone()
                .oneshot(Request::builder().method(method).uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::NOT_FOUND, "{method} {uri}");
            let bytes = response.into_body().collect().await.unwrap().to_bytes();
            let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
            assert_eq!(body, serde_json::json!({ "message": "Route not found" }));
        }
    }

    #[tokio::test]
    async fn test_timeout_renders_server_error() {
        let router = RouterBuilder::new()
            .with_timeout(20)
            .route(
                "/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_millis(500)).await;
                    "late"
                }),
            )
            .build();

        let (status, _, body) = call(router, "/slow").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            body,
            serde_json::json!({ "success": false, "error": "Server Error" })
        );
    }

    #[tokio::test]
    async fn test_middleware_chain_sets_request_id() {
        let router = RouterBuilder::new()
            .with_tracing()
            .with_cors()
            .with_request_id()
            .with_timeout(5000)
            .route("/health", get(|| async { "ok" }))
            .build();

        let (status, headers, _) = call(router, "/health").await;
        assert_eq!(status, StatusCode::OK);
        let request_id = headers.get("x-request-id").unwrap().to_str().unwrap();
        assert!(Uuid::parse_str(request_id).is_ok());
    }

    #[tokio::test]
    async fn test_openapi_paths_are_prefixed() {
        let mut registry = ModuleRegistry::new();
        registry.register(Arc::new(ShelvesModule)).unwrap();

        let spec = merge_openapi(&registry);
        assert!(spec["paths"].get("/healthz").is_some());
        assert!(spec["paths"].get("/api/v1/shelves").is_some());
        assert!(spec["paths"].get("/api/v1/shelves/{id}").is_some());
        assert!(spec["components"]["schemas"].get("Shelf").is_some());
        assert!(spec["components"]["schemas"].get("ErrorResponse").is_some());

        let router = RouterBuilder::new().with_openapi(&registry).build();
        let (status, _, body) = call(router, "/docs/openapi.json").await;
        assert_eq!(status, StatusCode::OK);
        let served: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(served, spec);
    }
}
