mod common;

use axum::http::StatusCode;
use common::*;
use pretty_assertions::assert_eq;

#[tokio::test]
async fn public_pages_are_available_to_anyone() {
    let app = TestApp::new().await;
    let author = create_user(app.db(), "auth").await;
    let group = create_group(app.db(), "test-slug").await;
    let post = create_post(app.db(), &author, Some(&group), "Test post").await;

    for uri in [
        "/".to_owned(),
        "/group/test-slug/".to_owned(),
        "/profile/auth/".to_owned(),
        format!("/posts/{}/", post.id),
        "/about/author/".to_owned(),
        "/about/tech/".to_owned(),
        "/static/css/site.css".to_owned(),
    ] {
        let response = app.get(&uri, None).await;
        assert_eq!(response.status, StatusCode::OK, "{uri}");
    }
}

#[tokio::test]
async fn unknown_pages_render_custom_404() {
    let app = TestApp::new().await;
    create_user(app.db(), "auth").await;

    for uri in [
        "/unexisting_page/",
        "/group/no-such-group/",
        "/profile/nobody/",
        "/posts/999/",
        "/posts/not-a-number/",
        "/posts/999/edit/",
    ] {
        let response = app.get(uri, Some("auth")).await;
        assert_eq!(response.status, StatusCode::NOT_FOUND, "{uri}");
        assert!(response.body.contains("Custom 404"), "{uri}");
    }
}

#[tokio::test]
async fn anonymous_writers_are_sent_to_login() {
    let app = TestApp::new().await;
    let author = create_user(app.db(), "auth").await;
    let post = create_post(app.db(), &author, None, "Test post").await;

    let cases = [
        ("/create/".to_owned(), "/auth/login/?next=%2Fcreate%2F".to_owned()),
        ("/follow/".to_owned(), "/auth/login/?next=%2Ffollow%2F".to_owned()),
        (
            format!("/posts/{}/edit/", post.id),
            format!("/auth/login/?next=%2Fposts%2F{}%2Fedit%2F", post.id),
        ),
    ];
    for (uri, login) in cases {
        let response = app.get(&uri, None).await;
        assert_eq!(response.status, StatusCode::SEE_OTHER, "{uri}");
        assert_eq!(response.location(), Some(login.as_str()));
    }
}

#[tokio::test]
async fn authenticated_user_reaches_private_pages() {
    let app = TestApp::new().await;
    let author = create_user(app.db(), "auth").await;
    let post = create_post(app.db(), &author, None, "Test post").await;

    for uri in ["/create/".to_owned(), "/follow/".to_owned(), format!("/posts/{}/edit/", post.id)] {
        let response = app.get(&uri, Some("auth")).await;
        assert_eq!(response.status, StatusCode::OK, "{uri}");
    }
}

#[tokio::test]
async fn non_author_is_sent_back_to_the_post() {
    let app = TestApp::new().await;
    let author = create_user(app.db(), "auth").await;
    create_user(app.db(), "not_author").await;
    let post = create_post(app.db(), &author, None, "Test post").await;

    let response = app
        .get(&format!("/posts/{}/edit/", post.id), Some("not_author"))
        .await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), Some(format!("/posts/{}/", post.id).as_str()));
}

#[tokio::test]
async fn first_visit_issues_csrf_cookie() {
    let app = TestApp::new().await;

    let response = app.get("/", None).await;
    let cookie = response
        .headers
        .get_all(axum::http::header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find(|value| value.starts_with("csrftoken="));
    assert!(cookie.is_some());
}

#[tokio::test]
async fn missing_files_render_custom_404() {
    let app = TestApp::new().await;

    for uri in ["/media/posts/missing.gif", "/static/css/missing.css"] {
        let response = app.get(uri, None).await;
        assert_eq!(response.status, StatusCode::NOT_FOUND, "{uri}");
        assert!(response.body.contains("Custom 404"), "{uri}");
    }
}
