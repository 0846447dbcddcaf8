mod about;
pub mod cache;
pub mod config;
pub mod context;
mod error;
pub mod forms;
pub mod media;
mod posts;

use axum::{
    Router,
    extract::OriginalUri,
    handler::HandlerWithoutStateExt,
    middleware,
    response::Html,
    routing::{get, post},
};
use migration::{Migrator, MigratorTrait};
use std::sync::Arc;
use tera::Tera;
use tokio::net::TcpListener;
use tower_cookies::CookieManagerLayer;
use tower_http::{services::ServeDir, trace::TraceLayer};
use yatube_service::sea_orm::{Database, DatabaseConnection};

pub use cache::{CacheKey, PageCache};
pub use config::{Config, ConfigError};
pub use context::RequestContext;
pub use error::{AppError, ErrorPage, render_error_pages};

/// Everything a handler may need, cloned into every request.
#[derive(Clone)]
pub struct AppState {
    pub conn: DatabaseConnection,
    pub templates: Arc<Tera>,
    /// Rendered index pages.
    pub cache: PageCache,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(conn: DatabaseConnection, config: Config) -> Result<Self, tera::Error> {
        let templates = Tera::new(concat!(env!("CARGO_MANIFEST_DIR"), "/templates/**/*"))?;
        Ok(Self {
            conn,
            templates: Arc::new(templates),
            cache: PageCache::new(config.index_cache_ttl),
            config: Arc::new(config),
        })
    }

    pub(crate) fn render(&self, template: &str, ctx: &tera::Context) -> Result<String, AppError> {
        Ok(self.templates.render(template, ctx)?)
    }

    pub(crate) fn render_html(
        &self,
        template: &str,
        ctx: &tera::Context,
    ) -> Result<Html<String>, AppError> {
        self.render(template, ctx).map(Html)
    }
}

/// Open the database and bring the schema up to date.
pub async fn connect(config: &Config) -> Result<DatabaseConnection, yatube_service::sea_orm::DbErr> {
    let conn = Database::connect(&config.database_url).await?;
    Migrator::up(&conn, None).await?;
    Ok(conn)
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(posts::index))
        .route("/group/{slug}/", get(posts::group_posts))
        .route("/profile/{username}/", get(posts::profile))
        .route("/profile/{username}/follow/", post(posts::profile_follow))
        .route("/profile/{username}/unfollow/", post(posts::profile_unfollow))
        .route("/follow/", get(posts::follow_index))
        .route("/posts/{post_id}/", get(posts::post_detail))
        .route(
            "/posts/{post_id}/edit/",
            get(posts::post_edit).post(posts::post_update),
        )
        .route("/posts/{post_id}/comment/", post(posts::add_comment))
        .route("/create/", get(posts::post_create).post(posts::post_store))
        .route("/about/author/", get(about::author))
        .route("/about/tech/", get(about::tech))
        .nest_service(
            "/static",
            ServeDir::new(concat!(env!("CARGO_MANIFEST_DIR"), "/static"))
                .not_found_service(page_not_found.into_service()),
        )
        .nest_service(
            "/media",
            ServeDir::new(&state.config.media_root)
                .not_found_service(page_not_found.into_service()),
        )
        .fallback(page_not_found)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            render_error_pages,
        ))
        .layer(CookieManagerLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn page_not_found(OriginalUri(uri): OriginalUri) -> AppError {
    AppError::NotFound(uri.path().to_owned())
}

pub async fn serve(config: Config) -> anyhow::Result<()> {
    let conn = connect(&config).await?;
    let state = AppState::new(conn, config)?;
    let server_url = state.config.server_url();

    let listener = TcpListener::bind(&server_url).await?;
    tracing::info!("listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router(state)).await?;

    Ok(())
}
