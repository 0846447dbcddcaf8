#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Request, StatusCode, header},
};
use entity::{group, post, user};
use tempfile::TempDir;
use tower::ServiceExt;
use yatube_api::{AppState, Config};
use yatube_service::{Mutation, PostForm, sea_orm::DatabaseConnection};

pub const CSRF_TOKEN: &str = "testcsrftoken";
pub const BOUNDARY: &str = "yatube-test-boundary";

/// A 2x1 GIF.
pub const SMALL_GIF: &[u8] = b"GIF89a\x02\x00\x01\x00\x80\x00\x00\x00\x00\x00\xFF\xFF\xFF\x21\xF9\x04\x00\x00\x00\x00\x00\x2C\x00\x00\x00\x00\x02\x00\x01\x00\x00\x02\x02\x0C\x0A\x00\x3B";

pub struct TestApp {
    pub state: AppState,
    router: Router,
    pub media: TempDir,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl TestResponse {
    pub fn location(&self) -> Option<&str> {
        self.headers
            .get(header::LOCATION)
            .and_then(|value| value.to_str().ok())
    }

    pub fn post_cards(&self) -> usize {
        self.body.matches("<article class=\"post-card\"").count()
    }
}

impl TestApp {
    pub async fn new() -> Self {
        let media = tempfile::tempdir().unwrap();
        let media_root = media.path().to_string_lossy().into_owned();
        let config = Config::from_lookup(|key| match key {
            "DATABASE_URL" => Some("sqlite::memory:".to_owned()),
            "MEDIA_ROOT" => Some(media_root.clone()),
            _ => None,
        })
        .unwrap();

        let conn = yatube_api::connect(&config).await.unwrap();
        let state = AppState::new(conn, config).unwrap();
        let router = yatube_api::router(state.clone());

        Self {
            state,
            router,
            media,
        }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.state.conn
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        TestResponse {
            status,
            headers,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        }
    }

    pub async fn get(&self, uri: &str, user: Option<&str>) -> TestResponse {
        let request = with_identity(Request::get(uri), user)
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }

    /// Url-encoded POST carrying a valid anti-forgery token.
    pub async fn post_form(&self, uri: &str, user: Option<&str>, fields: &[(&str, &str)]) -> TestResponse {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(fields)
            .append_pair("csrfmiddlewaretoken", CSRF_TOKEN)
            .finish();
        let request = with_identity(Request::post(uri), user)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header(header::COOKIE, format!("csrftoken={CSRF_TOKEN}"))
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }

    /// Multipart POST as sent by the post form, with a valid token.
    pub async fn post_multipart(
        &self,
        uri: &str,
        user: Option<&str>,
        fields: &[(&str, &str)],
        image: Option<(&str, &str, &[u8])>,
    ) -> TestResponse {
        let mut fields = fields.to_vec();
        fields.push(("csrfmiddlewaretoken", CSRF_TOKEN));
        let request = with_identity(Request::post(uri), user)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .header(header::COOKIE, format!("csrftoken={CSRF_TOKEN}"))
            .body(Body::from(multipart_body(&fields, image)))
            .unwrap();
        self.send(request).await
    }
}

pub fn with_identity(
    builder: axum::http::request::Builder,
    user: Option<&str>,
) -> axum::http::request::Builder {
    match user {
        Some(username) => builder.header("x-remote-user", username),
        None => builder,
    }
}

pub fn multipart_body(fields: &[(&str, &str)], image: Option<(&str, &str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((file_name, content_type, bytes)) = image {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub async fn create_user(db: &DatabaseConnection, username: &str) -> user::Model {
    Mutation::get_or_create_user(db, username).await.unwrap()
}

pub async fn create_group(db: &DatabaseConnection, slug: &str) -> group::Model {
    Mutation::create_group(db, "Test group", slug, "Test description")
        .await
        .unwrap()
}

pub async fn create_post(
    db: &DatabaseConnection,
    author: &user::Model,
    group: Option<&group::Model>,
    text: &str,
) -> post::Model {
    Mutation::create_post(
        db,
        author,
        PostForm {
            text: text.to_owned(),
            group_id: group.map(|group| group.id),
            image: None,
        },
    )
    .await
    .unwrap()
}
