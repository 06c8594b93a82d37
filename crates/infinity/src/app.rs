use std::error::Error as StdError;

use axum::{
    body::to_bytes,
    extract::{Request as HttpRequest, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use http_body_util::LengthLimitError;
use tower_http::{services::ServeDir, timeout::TimeoutLayer, trace::TraceLayer};

use crate::{error::AppError, http::Request, state::AppState};

/// Largest request body read into memory.
const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Create the application router: static assets are served directly,
/// everything else goes through the CMS router.
pub fn create_app(state: AppState) -> Router {
    let theme_assets = format!("/themes/{}/assets", state.config.theme.active);
    let timeout = state.config.request_timeout();

    Router::new()
        .nest_service(
            &theme_assets,
            ServeDir::new(state.config.theme_dir().join("assets")),
        )
        .nest_service(
            "/assets/admin",
            ServeDir::new(&state.config.paths.admin_assets),
        )
        .fallback(dispatch)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            timeout,
        ))
        .with_state(state)
}

/// Loads the session, runs the request through the CMS router and persists
/// the session afterwards.
async fn dispatch(
    State(state): State<AppState>,
    jar: CookieJar,
    request: HttpRequest,
) -> Response {
    let cookie_name = state.config.session.cookie_name.clone();
    let session = state
        .sessions
        .load(jar.get(&cookie_name).map(|cookie| cookie.value()))
        .await;

    let (parts, body) = request.into_parts();
    let body = match to_bytes(body, MAX_BODY_BYTES).await {
        Ok(body) => body,
        Err(e) => {
            let status = body_error_status(&e);
            tracing::warn!(error = %e, %status, "failed to read request body");
            let message = if status == StatusCode::PAYLOAD_TOO_LARGE {
                "Request body too large"
            } else {
                "Failed to read request body"
            };
            return (status, message).into_response();
        }
    };

    let request = match Request::new(
        &parts.method,
        &parts.uri,
        parts.headers,
        &body,
        session.clone(),
    ) {
        Ok(request) => request,
        Err(e) => return AppError::from(e).into_response(),
    };

    let response = state.router.dispatch(&state, request).await;

    if state.sessions.save(&session).await {
        let cookie = Cookie::build((cookie_name, session.id().to_string()))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax);
        return (jar.add(cookie), response).into_response();
    }
    response
}

/// `413` when the body hit [`MAX_BODY_BYTES`], `400` for any other read error.
fn body_error_status(error: &axum::Error) -> StatusCode {
    let over_limit = std::iter::successors(Some(error as &dyn StdError), |&e| e.source())
        .any(|e| e.is::<LengthLimitError>());
    if over_limit {
        StatusCode::PAYLOAD_TOO_LARGE
    } else {
        StatusCode::BAD_REQUEST
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{header, Request as HttpRequest, StatusCode},
    };
    use http_body_util::BodyExt;
    use infinity_core::query::Record;
    use tower::ServiceExt;

    use crate::state::testing::{create_admin, test_state, ADMIN_PASSWORD, ADMIN_USERNAME};

    async fn send(app: &Router, request: HttpRequest<Body>) -> Response {
        app.clone().oneshot(request).await.unwrap()
    }

    fn get(uri: &str) -> HttpRequest<Body> {
        HttpRequest::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn text(response: Response) -> String {
        let body = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(body.to_vec()).unwrap()
    }

    fn session_cookie(response: &Response) -> String {
        response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .map(str::to_string)
            .expect("session cookie")
    }

    fn csrf_token(html: &str) -> String {
        let marker = r#"name="_csrf_token" value=""#;
        let start = html.find(marker).expect("csrf field") + marker.len();
        let end = html[start..].find('"').unwrap();
        html[start..start + end].to_string()
    }

    #[tokio::test]
    async fn test_home_page() {
        let app = create_app(test_state().await);

        let response = send(&app, get("/")).await;
        assert_eq!(response.status(), StatusCode::OK);

        let html = text(response).await;
        assert!(html.contains("<html"));
        assert!(html.contains("Infinity CMS"));
    }

    #[tokio::test]
    async fn test_blog_lists_only_published_posts() {
        let state = test_state().await;
        state
            .db
            .table("posts")
            .insert(
                &Record::new()
                    .set("title", "Secret Draft")
                    .set("slug", "secret-draft")
                    .set("content", "Not yet")
                    .set("status", "draft"),
            )
            .await
            .unwrap();
        let app = create_app(state);

        let html = text(send(&app, get("/blog")).await).await;
        assert!(html.contains("Welcome to Infinity CMS"));
        assert!(!html.contains("Secret Draft"));
    }

    #[tokio::test]
    async fn test_single_post_and_missing_post() {
        let app = create_app(test_state().await);

        let response = send(&app, get("/post/welcome-to-infinity-cms")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(text(response).await.contains("Welcome to Infinity CMS"));

        let response = send(&app, get("/post/nope")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(text(response).await.contains("Post not found"));
    }

    #[tokio::test]
    async fn test_unknown_path_is_themed_404() {
        let app = create_app(test_state().await);

        let response = send(&app, get("/does/not/exist")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(text(response).await.contains("Page Not Found"));
    }

    #[tokio::test]
    async fn test_head_is_rejected() {
        let app = create_app(test_state().await);

        let request = HttpRequest::builder()
            .method("HEAD")
            .uri("/")
            .body(Body::empty())
            .unwrap();
        let response = send(&app, request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_latest_posts_fragment() {
        let app = create_app(test_state().await);

        let response = send(&app, get("/api/posts/latest")).await;
        assert_eq!(response.status(), StatusCode::OK);

        let html = text(response).await;
        assert!(html.starts_with(r#"<div class="posts-grid">"#));
        assert!(!html.contains("<html"));
        assert!(html.contains("/post/welcome-to-infinity-cms"));
    }

    #[tokio::test]
    async fn test_htmx_request_renders_without_layout() {
        let app = create_app(test_state().await);

        let request = HttpRequest::builder()
            .uri("/blog")
            .header("HX-Request", "true")
            .body(Body::empty())
            .unwrap();
        let html = text(send(&app, request).await).await;
        assert!(!html.contains("<html"));
        assert!(html.contains("Welcome to Infinity CMS"));
    }

    #[tokio::test]
    async fn test_admin_requires_login() {
        let app = create_app(test_state().await);

        let response = send(&app, get("/admin/dashboard")).await;
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[header::LOCATION], "/login");

        let request = HttpRequest::builder()
            .uri("/admin/dashboard")
            .header("X-Requested-With", "XMLHttpRequest")
            .body(Body::empty())
            .unwrap();
        let response = send(&app, request).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_login_flow_reaches_dashboard() {
        let state = test_state().await;
        create_admin(&state).await;
        let app = create_app(state);

        let response = send(&app, get("/login")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let cookie = session_cookie(&response);
        let token = csrf_token(&text(response).await);

        let form = format!(
            "_csrf_token={token}&username={ADMIN_USERNAME}&password={ADMIN_PASSWORD}"
        );
        let request = HttpRequest::builder()
            .method("POST")
            .uri("/login")
            .header(header::COOKIE, &cookie)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(form))
            .unwrap();
        let response = send(&app, request).await;
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[header::LOCATION], "/admin/dashboard");

        let request = HttpRequest::builder()
            .uri("/admin/dashboard")
            .header(header::COOKIE, &cookie)
            .body(Body::empty())
            .unwrap();
        let response = send(&app, request).await;
        assert_eq!(response.status(), StatusCode::OK);
        let html = text(response).await;
        assert!(html.contains("Welcome back, admin!"));
        assert!(html.contains("Total Posts"));
    }

    #[tokio::test]
    async fn test_login_rejects_bad_password() {
        let state = test_state().await;
        create_admin(&state).await;
        let app = create_app(state);

        let response = send(&app, get("/login")).await;
        let cookie = session_cookie(&response);
        let token = csrf_token(&text(response).await);

        let request = HttpRequest::builder()
            .method("POST")
            .uri("/login")
            .header(header::COOKIE, &cookie)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(format!(
                "_csrf_token={token}&username={ADMIN_USERNAME}&password=wrong"
            )))
            .unwrap();
        let response = send(&app, request).await;
        assert_eq!(response.headers()[header::LOCATION], "/login");

        let request = HttpRequest::builder()
            .uri("/login")
            .header(header::COOKIE, &cookie)
            .body(Body::empty())
            .unwrap();
        let html = text(send(&app, request).await).await;
        assert!(html.contains("Invalid username or password."));
    }

    #[tokio::test]
    async fn test_contact_post_without_token_is_forbidden() {
        let app = create_app(test_state().await);

        let request = HttpRequest::builder()
            .method("POST")
            .uri("/contact")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from("name=Ann&email=ann@example.com&message=Hi"))
            .unwrap();
        let response = send(&app, request).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_maintenance_mode_blocks_visitors() {
        let state = test_state().await;
        state
            .db
            .table("settings")
            .where_eq("setting_key", "maintenance_mode")
            .update(&Record::new().set("setting_value", "1"))
            .await
            .unwrap();
        let app = create_app(state);

        let response = send(&app, get("/blog")).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(text(response).await.contains("Under Maintenance"));

        let response = send(&app, get("/login")).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_body_error_status() {
        let err = to_bytes(Body::from(vec![b'x'; 16]), 8).await.unwrap_err();
        assert_eq!(body_error_status(&err), StatusCode::PAYLOAD_TOO_LARGE);

        let err = axum::Error::new(std::io::Error::other("connection reset"));
        assert_eq!(body_error_status(&err), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_oversized_body_is_rejected() {
        let app = create_app(test_state().await);

        let request = HttpRequest::builder()
            .method("POST")
            .uri("/contact")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(vec![b'a'; MAX_BODY_BYTES + 1]))
            .unwrap();
        let response = send(&app, request).await;
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_theme_assets_are_served() {
        let app = create_app(test_state().await);

        let response = send(&app, get("/themes/infinity/assets/css/style.css")).await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}
