//! Static pages about the project.

use crate::{AppError, AppState, RequestContext};
use axum::{extract::State, response::Html};

const AUTHOR_TITLE: &str = "Hi, I'm the author of this project.";
const AUTHOR_TEXT: &str = "I'm a beginner programmer, still learning a little more every day. \
    What drew me to programming is that the work can be done from anywhere in the world.";

const TECH_TITLE: &str = "What is the project built on?";
const TECH_TEXT: &str = "An async Rust web service: axum handles routing, SeaORM talks to the \
    database and Tera renders the pages.";

pub async fn author(
    State(state): State<AppState>,
    rc: RequestContext,
) -> Result<Html<String>, AppError> {
    let mut ctx = rc.template_context();
    ctx.insert("author_title", AUTHOR_TITLE);
    ctx.insert("author_text", AUTHOR_TEXT);
    state.render_html("about/author.html", &ctx)
}

pub async fn tech(
    State(state): State<AppState>,
    rc: RequestContext,
) -> Result<Html<String>, AppError> {
    let mut ctx = rc.template_context();
    ctx.insert("tech_title", TECH_TITLE);
    ctx.insert("tech_text", TECH_TEXT);
    state.render_html("about/tech.html", &ctx)
}
