use std::net::SocketAddr;

use axum::{
    http::{HeaderValue, Method},
    routing::get,
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{auth, state::AppState, users, weather};

pub fn build_app(state: AppState) -> Router {
    let cors = cors_layer(state.config.cors_allowed_origin.as_deref());

    Router::new()
        .merge(auth::router())
        .merge(users::router())
        .merge(weather::router())
        .route("/health", get(|| async { "ok" }))
        .with_state(state)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri, status = tracing::field::Empty)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        let latency_ms = latency.as_millis() as u64;
                        if status.is_server_error() {
                            tracing::error!(%status, latency_ms, "response");
                        } else {
                            tracing::info!(%status, latency_ms, "response");
                        }
                    },
                ),
        )
}

/// Single allowed origin when configured, otherwise permissive.
fn cors_layer(origin: Option<&str>) -> CorsLayer {
    match origin.and_then(|o| HeaderValue::from_str(o).ok()) {
        Some(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_headers(Any)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ]),
        None => CorsLayer::permissive(),
    }
}

pub async fn serve(app: Router, host: &str, port: u16) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{host}:{port}").parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
        response::Response,
    };
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn app() -> Router {
        build_app(AppState::fake())
    }

    fn json_request(method: &str, uri: &str, body: Value, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(t) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {t}"));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn empty_request(method: &str, uri: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(t) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {t}"));
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn body_json(resp: Response) -> Value {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        if bytes.is_empty() {
            return Value::Null;
        }
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn register(app: &Router, email: &str, password: &str) -> Response {
        app.clone()
            .oneshot(json_request(
                "POST",
                "/api/auth/register",
                json!({ "name": "Alice", "email": email, "password": password, "city": "Pune" }),
                None,
            ))
            .await
            .unwrap()
    }

    async fn login(app: &Router, email: &str, password: &str) -> Response {
        app.clone()
            .oneshot(json_request(
                "POST",
                "/api/auth/login",
                json!({ "email": email, "password": password }),
                None,
            ))
            .await
            .unwrap()
    }

    async fn token_for(app: &Router, email: &str, password: &str) -> String {
        let resp = login(app, email, password).await;
        assert_eq!(resp.status(), StatusCode::OK);
        body_json(resp).await["token"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn register_login_scenario() {
        let app = app();

        let resp = register(&app, "alice@x.com", "Secret123!").await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let location = resp.headers()[header::LOCATION].to_str().unwrap().to_string();
        let created = body_json(resp).await;
        assert_eq!(location, format!("/api/user/{}", created["id"]));
        assert_eq!(created["email"], "alice@x.com");
        assert!(created.get("password").is_none());
        assert!(created.get("passwordHash").is_none());

        let resp = register(&app, "ALICE@x.com", "Other1!").await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);

        let resp = login(&app, "alice@x.com", "Secret123!").await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        assert!(!body["token"].as_str().unwrap().is_empty());
        assert_eq!(body["email"], "alice@x.com");
        assert_eq!(body["name"], "Alice");

        let resp = login(&app, "alice@x.com", "wrong").await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn bad_login_responses_are_identical() {
        let app = app();
        register(&app, "alice@x.com", "Secret123!").await;
        let wrong = login(&app, "alice@x.com", "nope").await;
        let unknown = login(&app, "nobody@x.com", "nope").await;
        assert_eq!(wrong.status(), unknown.status());
        assert_eq!(body_json(wrong).await, body_json(unknown).await);
    }

    #[tokio::test]
    async fn register_and_login_reject_blank_fields() {
        let app = app();
        assert_eq!(register(&app, " ", "pw").await.status(), StatusCode::BAD_REQUEST);
        assert_eq!(login(&app, "a@x.com", "").await.status(), StatusCode::BAD_REQUEST);
        let resp = app
            .clone()
            .oneshot(json_request("POST", "/api/auth/register", json!({}), None))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn check_email_is_anonymous() {
        let app = app();
        let resp = app
            .clone()
            .oneshot(empty_request("GET", "/api/auth/checkemail/alice@x.com", None))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        register(&app, "alice@x.com", "Secret123!").await;
        let resp = app
            .clone()
            .oneshot(empty_request("GET", "/api/auth/checkemail/Alice@X.com", None))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn user_routes_require_bearer_token() {
        let app = app();
        for uri in ["/api/user", "/api/user/currentuser", "/api/user/1"] {
            let resp = app.clone().oneshot(empty_request("GET", uri, None)).await.unwrap();
            assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "{uri}");
        }
        let resp = app
            .clone()
            .oneshot(empty_request("GET", "/api/user", Some("not-a-jwt")))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn current_user_profile_lifecycle() {
        let app = app();
        register(&app, "alice@x.com", "Secret123!").await;
        let token = token_for(&app, "alice@x.com", "Secret123!").await;

        let resp = app
            .clone()
            .oneshot(empty_request("GET", "/api/user/currentuser", Some(&token)))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let me = body_json(resp).await;
        assert_eq!(me["city"], "Pune");

        let resp = app
            .clone()
            .oneshot(json_request(
                "PUT",
                "/api/user/currentuser",
                json!({ "country": "IN", "postalCode": "411001" }),
                Some(&token),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let updated = body_json(resp).await;
        assert_eq!(updated["city"], "Pune");
        assert_eq!(updated["country"], "IN");
        assert_eq!(updated["postalCode"], "411001");

        let resp = app
            .clone()
            .oneshot(empty_request("GET", "/api/user", Some(&token)))
            .await
            .unwrap();
        assert_eq!(body_json(resp).await.as_array().unwrap().len(), 1);

        let resp = app
            .clone()
            .oneshot(empty_request("DELETE", "/api/user/currentuser", Some(&token)))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        // Token outlives the row; the profile is gone.
        let resp = app
            .clone()
            .oneshot(empty_request("GET", "/api/user/currentuser", Some(&token)))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn user_by_id_routes() {
        let app = app();
        let created = body_json(register(&app, "alice@x.com", "Secret123!").await).await;
        let id = created["id"].as_i64().unwrap();
        let token = token_for(&app, "alice@x.com", "Secret123!").await;

        let resp = app
            .clone()
            .oneshot(empty_request("GET", &format!("/api/user/{id}"), Some(&token)))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = app
            .clone()
            .oneshot(empty_request("DELETE", "/api/user/9999", Some(&token)))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = app
            .clone()
            .oneshot(json_request(
                "PUT",
                &format!("/api/user/{id}"),
                json!({ "name": "Alicia" }),
                Some(&token),
            ))
            .await
            .unwrap();
        assert_eq!(body_json(resp).await["name"], "Alicia");
    }

    #[tokio::test]
    async fn cannot_write_another_users_profile() {
        let app = app();
        let alice = body_json(register(&app, "alice@x.com", "Secret123!").await).await;
        let alice_id = alice["id"].as_i64().unwrap();
        register(&app, "mallory@x.com", "Mallory1!").await;
        let mallory = token_for(&app, "mallory@x.com", "Mallory1!").await;

        let resp = app
            .clone()
            .oneshot(json_request(
                "PUT",
                &format!("/api/user/{alice_id}"),
                json!({ "password": "pwned!" }),
                Some(&mallory),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = app
            .clone()
            .oneshot(empty_request("DELETE", &format!("/api/user/{alice_id}"), Some(&mallory)))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        assert_eq!(login(&app, "alice@x.com", "pwned!").await.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(login(&app, "alice@x.com", "Secret123!").await.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn malformed_bodies_are_json_bad_requests() {
        let app = app();

        let resp = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/auth/register",
                json!({ "email": 123, "password": "Secret123!" }),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let msg = body_json(resp).await["message"].as_str().unwrap().to_string();
        assert!(!msg.contains("invalid type"), "{msg}");

        let resp = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/auth/login")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("{not json"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(body_json(resp).await["message"].is_string());

        register(&app, "alice@x.com", "Secret123!").await;
        let token = token_for(&app, "alice@x.com", "Secret123!").await;
        let resp = app
            .clone()
            .oneshot(empty_request("GET", "/api/user/abc", Some(&token)))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(body_json(resp).await["message"].is_string());
    }

    #[tokio::test]
    async fn reset_password_flow() {
        let app = app();
        register(&app, "alice@x.com", "Secret123!").await;

        let reset = |body: Value| {
            app.clone()
                .oneshot(json_request("PATCH", "/api/user/resetpassword", body, None))
        };

        let resp = reset(json!({
            "email": "alice@x.com", "newPassword": "Fresh456!", "confirmPassword": "Fresh457!"
        }))
        .await
        .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = reset(json!({
            "email": "ghost@x.com", "newPassword": "Fresh456!", "confirmPassword": "Fresh456!"
        }))
        .await
        .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = reset(json!({
            "email": "alice@x.com", "newPassword": "Fresh456!", "confirmPassword": "Fresh456!"
        }))
        .await
        .unwrap();
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        assert_eq!(body_json(resp).await, Value::Null);

        assert_eq!(login(&app, "alice@x.com", "Secret123!").await.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(login(&app, "alice@x.com", "Fresh456!").await.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn weather_requires_city() {
        let app = app();
        let resp = app
            .clone()
            .oneshot(empty_request("GET", "/api/weather/current?city=%20", None))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let resp = app
            .clone()
            .oneshot(empty_request("GET", "/api/weather/hourly", None))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn health_is_ok() {
        let resp = app().oneshot(empty_request("GET", "/health", None)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[test]
    fn cors_falls_back_to_permissive_on_bad_origin() {
        // Neither call should panic.
        let _ = cors_layer(Some("http://localhost:3000"));
        let _ = cors_layer(Some("bad\norigin"));
    }
}
