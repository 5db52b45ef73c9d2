//! Router builder for the shelf HTTP server

use axum::{
    extract::Request,
    http::HeaderValue,
    middleware,
    routing::{get, MethodRouter},
    Router,
};
use serde_json::{json, Value};
use std::time::Duration;
use tower_http::{
    cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer},
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use uuid::Uuid;

use shelf_kernel::ModuleRegistry;

use crate::logging::request_logging;

/// Builder for constructing the main HTTP router.
///
/// Middleware is recorded on the builder and applied in [`RouterBuilder::build`],
/// after every route is registered, so it covers module routes regardless of
/// call order.
pub struct RouterBuilder {
    router: Router,
    tracing: bool,
    request_logging: bool,
    request_id: bool,
    cors: Option<CorsLayer>,
    timeout: Option<Duration>,
}

impl RouterBuilder {
    pub fn new() -> Self {
        Self {
            router: Router::new(),
            tracing: false,
            request_logging: false,
            request_id: false,
            cors: None,
            timeout: None,
        }
    }

    /// Add a route to the router
    pub fn route(mut self, path: &str, route: MethodRouter) -> Self {
        self.router = self.router.route(path, route);
        self
    }

    /// Merge a module's router; module routes carry absolute paths
    pub fn mount_module(mut self, module_name: &str, module_router: Router) -> Self {
        tracing::info!(module = module_name, "mounting module routes");
        self.router = self.router.merge(module_router);
        self
    }

    /// Add tracing spans around each request
    pub fn with_tracing(mut self) -> Self {
        self.tracing = true;
        self
    }

    /// Add the method/path/status/duration access log
    pub fn with_request_logging(mut self) -> Self {
        self.request_logging = true;
        self
    }

    /// Allow the listed origins with credentials; methods and headers are
    /// mirrored from the preflight. A `*` entry echoes any origin.
    pub fn with_cors(mut self, allowed_origins: &[String]) -> Self {
        let allow_origin = if allowed_origins.iter().any(|origin| origin == "*") {
            AllowOrigin::mirror_request()
        } else {
            let origins: Vec<HeaderValue> = allowed_origins
                .iter()
                .filter_map(|origin| match origin.parse::<HeaderValue>() {
                    Ok(value) => Some(value),
                    Err(_) => {
                        tracing::warn!(origin = %origin, "ignoring unparsable CORS origin");
                        None
                    }
                })
                .collect();
            AllowOrigin::list(origins)
        };

        self.cors = Some(
            CorsLayer::new()
                .allow_origin(allow_origin)
                .allow_methods(AllowMethods::mirror_request())
                .allow_headers(AllowHeaders::mirror_request())
                .allow_credentials(true),
        );
        self
    }

    /// Add request ID middleware (`x-request-id`, UUID v7, echoed on the response)
    pub fn with_request_id(mut self) -> Self {
        self.request_id = true;
        self
    }

    /// Add timeout middleware
    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout = Some(Duration::from_millis(timeout_ms));
        self
    }

    /// Serve merged OpenAPI fragments from every module at
    /// `/docs/openapi.json`, with Swagger UI at `/swagger-ui`
    pub fn with_openapi(mut self, registry: &ModuleRegistry) -> Self {
        let fragments: Vec<Value> = registry
            .modules()
            .into_iter()
            .filter_map(|module| module.openapi())
            .collect();
        let openapi_spec = merge_openapi(&fragments);

        let openapi_obj: utoipa::openapi::OpenApi = serde_json::from_value(openapi_spec.clone())
            .unwrap_or_else(|err| {
                tracing::warn!(error = %err, "OpenAPI document did not parse; serving empty spec");
                utoipa::openapi::OpenApiBuilder::new()
                    .info(
                        utoipa::openapi::InfoBuilder::new()
                            .title("Shelf API")
                            .version("1.0.0")
                            .build(),
                    )
                    .build()
            });

        self.router = self.router.merge(
            utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
                .url("/api-docs/openapi.json", openapi_obj),
        );

        self.router = self.router.route(
            "/docs/openapi.json",
            get(move || async move { axum::Json(openapi_spec.clone()) }),
        );

        self
    }

    /// Build the final router, wrapping every registered route in the
    /// selected middleware
    pub fn build(self) -> Router {
        let mut router = self.router;

        if let Some(timeout) = self.timeout {
            router = router.layer(TimeoutLayer::new(timeout));
        }
        if let Some(cors) = self.cors {
            router = router.layer(cors);
        }
        // Wraps CORS so preflights answered there are logged too
        if self.request_logging {
            router = router.layer(middleware::from_fn(request_logging));
        }
        if self.tracing {
            router = router.layer(
                TraceLayer::new_for_http()
                    .make_span_with(DefaultMakeSpan::new().include_headers(false))
                    .on_request(DefaultOnRequest::new().level(tracing::Level::DEBUG))
                    .on_response(DefaultOnResponse::new().level(tracing::Level::DEBUG)),
            );
        }
        if self.request_id {
            router = router
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7));
        }

        router
    }
}

impl Default for RouterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Merge module OpenAPI fragments (`paths` and `components.schemas`) into one
/// document with the shared error schema and health endpoint.
pub fn merge_openapi(fragments: &[Value]) -> Value {
    let mut spec = json!({
        "openapi": "3.0.0",
        "info": {
            "title": "Shelf API",
            "version": "1.0.0",
            "description": "Book catalog with bearer-token authentication"
        },
        "paths": {
            "/healthz": {
                "get": {
                    "summary": "Health check",
                    "responses": {
                        "200": {
                            "description": "OK",
                            "content": { "text/plain": { "schema": { "type": "string" } } }
                        }
                    }
                }
            }
        },
        "components": {
            "schemas": {
                "ErrorResponse": {
                    "type": "object",
                    "properties": {
                        "error": {
                            "type": "object",
                            "properties": {
                                "code": { "type": "string" },
                                "message": { "type": "string" },
                                "details": { "type": "array", "items": {} },
                                "trace_id": { "type": "string" },
                                "timestamp": { "type": "string" }
                            },
                            "required": ["code", "message", "trace_id", "timestamp"]
                        }
                    },
                    "required": ["error"]
                }
            },
            "securitySchemes": {
                "bearerAuth": { "type": "http", "scheme": "bearer", "bearerFormat": "JWT" }
            }
        }
    });

    for fragment in fragments {
        if let Some(paths) = fragment.get("paths").and_then(Value::as_object) {
            for (path, item) in paths {
                spec["paths"][path] = item.clone();
            }
        }
        if let Some(schemas) = fragment
            .pointer("/components/schemas")
            .and_then(Value::as_object)
        {
            for (name, schema) in schemas {
                spec["components"]["schemas"][name] = schema.clone();
            }
        }
    }

    spec
}

/// Time-ordered request ids
#[derive(Clone, Copy)]
struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let request_id = Uuid::now_v7().to_string().parse::<HeaderValue>().ok()?;
        Some(RequestId::new(request_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{header, Method, Request as HttpRequest, StatusCode},
    };
    use std::{
        io,
        sync::{Arc, Mutex},
    };
    use tower::ServiceExt;

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn app() -> Router {
        RouterBuilder::new()
            .route("/health", get(|| async { "ok" }))
            .mount_module(
                "demo",
                Router::new().route("/demo/items", get(|| async { "items" })),
            )
            .with_tracing()
            .with_request_logging()
            .with_cors(&["http://localhost:5173".to_string()])
            .with_request_id()
            .with_timeout(5000)
            .build()
    }

    #[tokio::test]
    async fn module_routes_are_merged_at_root() {
        let response = app()
            .oneshot(
                HttpRequest::builder()
                    .uri("/demo/items")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn responses_carry_request_id() {
        let response = app()
            .oneshot(
                HttpRequest::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let id = response.headers().get("x-request-id").unwrap();
        assert!(Uuid::parse_str(id.to_str().unwrap()).is_ok());
    }

    #[tokio::test]
    async fn cors_echoes_configured_origin() {
        let response = app()
            .oneshot(
                HttpRequest::builder()
                    .method(Method::OPTIONS)
                    .uri("/demo/items")
                    .header(header::ORIGIN, "http://localhost:5173")
                    .header(header::ACCESS_CONTROL_REQUEST_METHOD, "DELETE")
                    .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "authorization")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let headers = response.headers();
        assert_eq!(
            headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "http://localhost:5173"
        );
        assert_eq!(
            headers.get(header::ACCESS_CONTROL_ALLOW_METHODS).unwrap(),
            "DELETE"
        );
        assert_eq!(
            headers.get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS).unwrap(),
            "true"
        );
    }

    #[tokio::test]
    async fn preflight_requests_are_logged() {
        let logs = CapturedLogs::default();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_writer({
                let logs = logs.clone();
                move || logs.clone()
            })
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let response = app()
            .oneshot(
                HttpRequest::builder()
                    .method(Method::OPTIONS)
                    .uri("/demo/items")
                    .header(header::ORIGIN, "http://localhost:5173")
                    .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let output = logs.contents();
        assert!(output.contains("request completed"), "{output}");
        assert!(output.contains("method=OPTIONS"), "{output}");
        assert!(output.contains("path=/demo/items"), "{output}");
        assert!(output.contains("status=200"), "{output}");
    }

    #[tokio::test]
    async fn cors_ignores_unknown_origin() {
        let response = app()
            .oneshot(
                HttpRequest::builder()
                    .uri("/health")
                    .header(header::ORIGIN, "http://evil.example")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert!(response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none());
    }

    #[test]
    fn openapi_fragments_are_merged() {
        let fragment = json!({
            "paths": { "/books": { "get": { "summary": "List books" } } },
            "components": { "schemas": { "Book": { "type": "object" } } }
        });
        let spec = merge_openapi(&[fragment]);

        assert_eq!(spec["paths"]["/books"]["get"]["summary"], "List books");
        assert!(spec["paths"]["/healthz"].is_object());
        assert!(spec["components"]["schemas"]["Book"].is_object());
        assert!(spec["components"]["schemas"]["ErrorResponse"].is_object());
    }
}
