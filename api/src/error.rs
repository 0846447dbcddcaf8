use crate::AppState;
use axum::{
    extract::{Request, State, multipart::MultipartError},
    http::StatusCode,
    middleware::Next,
    response::{Html, IntoResponse, Response},
};
use yatube_service::sea_orm::DbErr;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("anti-forgery check failed: {0}")]
    CsrfFailure(&'static str),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error(transparent)]
    Db(#[from] DbErr),
    #[error(transparent)]
    Template(#[from] tera::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Multipart(#[from] MultipartError),
    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::CsrfFailure(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) | Self::Multipart(_) => StatusCode::BAD_REQUEST,
            Self::Db(_) | Self::Template(_) | Self::Io(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Marks a response produced from an [`AppError`] so that
/// [`render_error_pages`] can swap in the matching template.
#[derive(Clone, Copy, Debug)]
pub struct ErrorPage(pub StatusCode);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::warn!(error = %self, %status, "request rejected");
        }

        let reason = status.canonical_reason().unwrap_or("Error");
        let mut response = (status, reason).into_response();
        response.extensions_mut().insert(ErrorPage(status));
        response
    }
}

/// Render `core/404.html`, `core/403csrf.html` or `core/500.html` for
/// responses marked with [`ErrorPage`].
pub async fn render_error_pages(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_owned();
    let response = next.run(request).await;

    let Some(ErrorPage(status)) = response.extensions().get::<ErrorPage>().copied() else {
        return response;
    };
    let template = match status {
        StatusCode::NOT_FOUND => "core/404.html",
        StatusCode::FORBIDDEN => "core/403csrf.html",
        status if status.is_server_error() => "core/500.html",
        _ => return response,
    };

    let mut ctx = tera::Context::new();
    ctx.insert("path", &path);
    match state.templates.render(template, &ctx) {
        Ok(body) => (status, Html(body)).into_response(),
        Err(err) => {
            tracing::error!(%err, template, "could not render error page");
            response
        }
    }
}
