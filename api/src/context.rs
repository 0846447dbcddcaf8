//! Per-request identity and anti-forgery token, passed explicitly to the
//! handlers that need them.

use crate::{AppError, AppState};
use axum::{
    extract::FromRequestParts,
    http::request::Parts,
    response::{IntoResponse, Redirect, Response},
};
use entity::user;
use tower_cookies::{Cookie, Cookies, cookie::SameSite};
use yatube_service::{Access, Mutation};

pub const CSRF_COOKIE_NAME: &str = "csrftoken";
pub const CSRF_FORM_FIELD: &str = "csrfmiddlewaretoken";

pub struct RequestContext {
    /// `None` for anonymous visitors.
    pub user: Option<user::Model>,
    pub csrf_token: String,
    /// Path and query of the request, used as the login `next` target.
    pub location: String,
    login_url: String,
}

impl FromRequestParts<AppState> for RequestContext {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        let cookies = Cookies::from_request_parts(parts, state)
            .await
            .map_err(|rejection| AppError::Internal(format!("{rejection:?}")))?;
        let csrf_token = csrf_token(&cookies);

        let username = parts
            .headers
            .get(&state.config.identity_header)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|username| !username.is_empty());

        let user = match username {
            Some(username) if is_valid_username(username) => {
                Some(Mutation::get_or_create_user(&state.conn, username).await?)
            }
            Some(username) => {
                tracing::warn!(username, "ignoring malformed identity");
                None
            }
            None => None,
        };

        let location = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str().to_owned())
            .unwrap_or_else(|| "/".to_owned());

        Ok(Self {
            user,
            csrf_token,
            location,
            login_url: state.config.login_url.clone(),
        })
    }
}

impl RequestContext {
    pub fn username(&self) -> Option<&str> {
        self.user.as_ref().map(|user| user.username.as_str())
    }

    /// Compare the token echoed by a form against the cookie.
    pub fn verify_csrf(&self, submitted: Option<&str>) -> Result<(), AppError> {
        match submitted {
            None | Some("") => Err(AppError::CsrfFailure("CSRF token missing")),
            Some(token) if token == self.csrf_token => Ok(()),
            Some(_) => Err(AppError::CsrfFailure("CSRF token incorrect")),
        }
    }

    pub fn login_redirect(&self) -> Redirect {
        let next: String = url::form_urlencoded::byte_serialize(self.location.as_bytes()).collect();
        Redirect::to(&format!("{}?next={}", self.login_url, next))
    }

    /// Turn a denied [`Access`] into the matching redirect.
    pub fn deny(&self, access: Access) -> Response {
        match access {
            Access::Login => self.login_redirect().into_response(),
            Access::PostDetail(post_id) => {
                tracing::warn!(user = ?self.username(), post_id, "edit denied");
                Redirect::to(&format!("/posts/{post_id}/")).into_response()
            }
            Access::Granted => Redirect::to(&self.location).into_response(),
        }
    }

    /// Template context every page starts from.
    pub fn template_context(&self) -> tera::Context {
        let mut ctx = tera::Context::new();
        ctx.insert("user", &self.user);
        ctx.insert("csrf_token", &self.csrf_token);
        ctx
    }
}

fn csrf_token(cookies: &Cookies) -> String {
    if let Some(cookie) = cookies.get(CSRF_COOKIE_NAME) {
        let token = cookie.value();
        if !token.is_empty() && token.chars().all(|c| c.is_ascii_alphanumeric()) {
            return token.to_owned();
        }
    }

    let token = uuid::Uuid::new_v4().simple().to_string();
    let mut cookie = Cookie::new(CSRF_COOKIE_NAME, token.clone());
    cookie.set_path("/");
    cookie.set_same_site(SameSite::Lax);
    cookies.add(cookie);
    token
}

/// Letters, digits and `@ . + - _`, at most 150 characters.
pub fn is_valid_username(username: &str) -> bool {
    !username.is_empty()
        && username.chars().count() <= 150
        && username
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
}
