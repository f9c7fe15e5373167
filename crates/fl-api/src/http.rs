//! HTTP layer: the GraphQL endpoint, GraphiQL and a health check.

use async_graphql::http::GraphiQLSource;
use async_graphql_axum::{GraphQLRequest, GraphQLResponse};
use axum::extract::State;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderValue, Method};
use axum::response::{Html, IntoResponse};
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::{bearer_token, AuthFailure, JwtValidator};
use crate::config::ServerConfig;
use crate::schema::FlSchema;

#[derive(Clone)]
pub struct AppState {
    pub schema: FlSchema,
    pub validator: JwtValidator,
}

pub fn router(state: AppState, server: &ServerConfig) -> Router {
    let graphql = if server.graphiql {
        post(graphql_handler).get(graphiql)
    } else {
        post(graphql_handler)
    };

    Router::new()
        .route("/graphql", graphql)
        .route("/health", get(health))
        .with_state(state)
        .layer(cors_layer(&server.cors_origins))
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE]);
    if origins.is_empty() {
        return layer.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(allowed))
}

async fn graphql_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    req: GraphQLRequest,
) -> GraphQLResponse {
    let mut request = req.into_inner();

    let token = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(bearer_token);
    if let Some(token) = token {
        request = match state.validator.verify(token) {
            Ok(user) => request.data(user),
            Err(e) => {
                tracing::debug!(error = %e, "Rejected bearer token");
                request.data(AuthFailure(e.to_string()))
            }
        };
    }

    state.schema.execute(request).await.into()
}

async fn graphiql() -> impl IntoResponse {
    Html(GraphiQLSource::build().endpoint("/graphql").finish())
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Bind `addr` and serve until the process is stopped.
pub async fn serve(router: Router, addr: &str) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "FL admin API listening");
    axum::serve(listener, router).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use crate::config::AuthConfig;
    use crate::schema::build_schema;

    fn app(graphiql: bool) -> (Router, JwtValidator) {
        let validator = JwtValidator::new(&AuthConfig {
            jwt_secret: "http-test-secret-that-is-long-enough!!".into(),
            ..Default::default()
        })
        .unwrap();
        let state = AppState {
            schema: build_schema(None),
            validator: validator.clone(),
        };
        let server = ServerConfig {
            graphiql,
            ..Default::default()
        };
        (router(state, &server), validator)
    }

    fn graphql_post(body: &str, auth: Option<&str>) -> Request<Body> {
        let mut req = Request::builder()
            .method("POST")
            .uri("/graphql")
            .header(CONTENT_TYPE, "application/json");
        if let Some(a) = auth {
            req = req.header(AUTHORIZATION, a);
        }
        req.body(Body::from(body.to_string())).unwrap()
    }

    async fn body_json(resp: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _) = app(false);
        let resp = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_graphiql_only_when_enabled() {
        let (enabled, _) = app(true);
        let resp = enabled
            .oneshot(Request::get("/graphql").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let (disabled, _) = app(false);
        let resp = disabled
            .oneshot(Request::get("/graphql").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_bad_token_is_reported() {
        let (app, _) = app(false);
        let resp = app
            .oneshot(graphql_post(r#"{"query":"{ me { id } }"}"#, Some("Bearer not.a.jwt")))
            .await
            .unwrap();
        let json = body_json(resp).await;
        assert_eq!(json["errors"][0]["extensions"]["code"], "UNAUTHENTICATED");
        assert_eq!(json["errors"][0]["message"], "Invalid token");
    }

    #[tokio::test]
    async fn test_valid_token_reaches_permission_check() {
        let (app, validator) = app(false);
        let token = validator.issue("fl|abc", "abc@example.com", &[]).unwrap();
        let resp = app
            .oneshot(graphql_post(
                r#"{"query":"mutation { declineExpense(transactionId: \"x\") { id } }"}"#,
                Some(&format!("Bearer {token}")),
            ))
            .await
            .unwrap();
        let json = body_json(resp).await;
        assert_eq!(json["errors"][0]["extensions"]["code"], "FORBIDDEN");
    }
}
