//! Feeds, post pages, the post form, comments and follows.

use crate::{
    AppError, AppState, CacheKey, RequestContext,
    forms::{CommentFormData, CsrfFormData, FormErrors, PostFormData, PostFormValues},
    media,
};
use axum::{
    extract::{Form, Multipart, Path, State},
    http::Uri,
    response::{Html, IntoResponse, Redirect, Response},
};
use entity::{post, user};
use yatube_service::{
    Mutation as MutationCore, PageRequest, PostForm, Query as QueryCore,
    access::{can_edit, can_write},
};

/// The `?page=` value of a request. A repeated parameter counts by its last
/// occurrence.
fn page_request(uri: &Uri) -> PageRequest {
    let raw = uri.query().and_then(|query| {
        url::form_urlencoded::parse(query.as_bytes())
            .filter(|(key, _)| key == "page")
            .map(|(_, value)| value.into_owned())
            .last()
    });
    PageRequest::parse(raw.as_deref())
}

pub async fn index(
    State(state): State<AppState>,
    uri: Uri,
    rc: RequestContext,
) -> Result<Html<String>, AppError> {
    let request = page_request(&uri);
    let key = CacheKey::new("/", request, rc.username());
    if let Some(body) = state.cache.get(&key) {
        tracing::debug!(?key, "index served from cache");
        return Ok(Html(body));
    }

    let page = QueryCore::index_feed(&state.conn, request).await?;

    let mut ctx = rc.template_context();
    ctx.insert("page_obj", &page);
    let body = state.render("posts/index.html", &ctx)?;
    state.cache.insert(key, body.clone());

    Ok(Html(body))
}

pub async fn group_posts(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    uri: Uri,
    rc: RequestContext,
) -> Result<Html<String>, AppError> {
    let group = QueryCore::find_group_by_slug(&state.conn, &slug)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("group {slug}")))?;
    let page = QueryCore::group_feed(&state.conn, &group, page_request(&uri)).await?;

    let mut ctx = rc.template_context();
    ctx.insert("group", &group);
    ctx.insert("page_obj", &page);
    state.render_html("posts/group_list.html", &ctx)
}

pub async fn profile(
    State(state): State<AppState>,
    Path(username): Path<String>,
    uri: Uri,
    rc: RequestContext,
) -> Result<Html<String>, AppError> {
    let author = find_author(&state, &username).await?;
    let page = QueryCore::profile_feed(&state.conn, &author, page_request(&uri)).await?;
    let following = match &rc.user {
        Some(user) => QueryCore::is_following(&state.conn, user.id, author.id).await?,
        None => false,
    };

    let mut ctx = rc.template_context();
    ctx.insert("author", &author);
    ctx.insert("page_obj", &page);
    ctx.insert("following", &following);
    state.render_html("posts/profile.html", &ctx)
}

pub async fn post_detail(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    rc: RequestContext,
) -> Result<Html<String>, AppError> {
    let id = parse_post_id(&post_id)?;
    let card = QueryCore::find_post_card(&state.conn, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("post {id}")))?;
    let comments = QueryCore::find_comments_for_post(&state.conn, id).await?;
    let posts_count = QueryCore::count_posts_by_author(&state.conn, card.author.id).await?;
    let is_author = rc.user.as_ref().is_some_and(|user| user.id == card.author.id);

    let mut ctx = rc.template_context();
    ctx.insert("post", &card);
    ctx.insert("comments", &comments);
    ctx.insert("posts_count", &posts_count);
    ctx.insert("is_author", &is_author);
    state.render_html("posts/post_detail.html", &ctx)
}

pub async fn post_create(
    State(state): State<AppState>,
    rc: RequestContext,
) -> Result<Response, AppError> {
    let access = can_write(rc.user.as_ref());
    if !access.is_granted() {
        return Ok(rc.deny(access));
    }

    let form = PostFormValues::default();
    render_post_form(&state, &rc, &form, &FormErrors::new(), None).await
}

pub async fn post_store(
    State(state): State<AppState>,
    rc: RequestContext,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let data = PostFormData::read(multipart).await?;
    rc.verify_csrf(data.csrf_token.as_deref())?;

    let access = can_write(rc.user.as_ref());
    let Some(author) = rc.user.as_ref().filter(|_| access.is_granted()) else {
        return Ok(rc.deny(access));
    };

    let values = PostFormValues::from(&data);
    let groups = QueryCore::get_all_groups(&state.conn).await?;
    let valid = match data.validate(&groups) {
        Ok(valid) => valid,
        Err(errors) => return render_post_form(&state, &rc, &values, &errors, None).await,
    };

    let image = match &valid.image {
        Some(image) => Some(media::save_post_image(&state.config.media_root, image).await?),
        None => None,
    };
    let form = PostForm {
        text: valid.text,
        group_id: valid.group_id,
        image: image.clone(),
    };
    let created = MutationCore::create_post(&state.conn, author, form).await;
    if created.is_err() {
        discard_upload(&state, image.as_deref()).await;
    }
    created?;

    Ok(Redirect::to(&profile_url(&author.username)).into_response())
}

pub async fn post_edit(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    rc: RequestContext,
) -> Result<Response, AppError> {
    let post = find_post(&state, &post_id).await?;
    let access = can_edit(rc.user.as_ref(), &post);
    if !access.is_granted() {
        return Ok(rc.deny(access));
    }

    let form = PostFormValues {
        text: post.text.clone(),
        group_id: post.group_id,
    };
    render_post_form(&state, &rc, &form, &FormErrors::new(), Some(&post)).await
}

pub async fn post_update(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    rc: RequestContext,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let data = PostFormData::read(multipart).await?;
    rc.verify_csrf(data.csrf_token.as_deref())?;

    let post = find_post(&state, &post_id).await?;
    let access = can_edit(rc.user.as_ref(), &post);
    if !access.is_granted() {
        return Ok(rc.deny(access));
    }

    let values = PostFormValues::from(&data);
    let groups = QueryCore::get_all_groups(&state.conn).await?;
    let valid = match data.validate(&groups) {
        Ok(valid) => valid,
        Err(errors) => return render_post_form(&state, &rc, &values, &errors, Some(&post)).await,
    };

    let image = match &valid.image {
        Some(image) => Some(media::save_post_image(&state.config.media_root, image).await?),
        None => None,
    };
    let form = PostForm {
        text: valid.text,
        group_id: valid.group_id,
        image: image.clone(),
    };
    let updated = MutationCore::update_post(&state.conn, post, form).await;
    if updated.is_err() {
        discard_upload(&state, image.as_deref()).await;
    }
    let post = updated?;

    Ok(Redirect::to(&post_url(post.id)).into_response())
}

pub async fn add_comment(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    rc: RequestContext,
    Form(form): Form<CommentFormData>,
) -> Result<Response, AppError> {
    rc.verify_csrf(form.csrfmiddlewaretoken.as_deref())?;

    let post = find_post(&state, &post_id).await?;
    let access = can_write(rc.user.as_ref());
    let Some(author) = rc.user.as_ref().filter(|_| access.is_granted()) else {
        return Ok(rc.deny(access));
    };

    match form.text() {
        Some(text) => {
            MutationCore::create_comment(&state.conn, &post, author, text).await?;
        }
        None => tracing::debug!(post = post.id, "ignoring blank comment"),
    }

    Ok(Redirect::to(&post_url(post.id)).into_response())
}

pub async fn follow_index(
    State(state): State<AppState>,
    uri: Uri,
    rc: RequestContext,
) -> Result<Response, AppError> {
    let access = can_write(rc.user.as_ref());
    let Some(user) = rc.user.as_ref().filter(|_| access.is_granted()) else {
        return Ok(rc.deny(access));
    };

    let page = QueryCore::follow_feed(&state.conn, user, page_request(&uri)).await?;

    let mut ctx = rc.template_context();
    ctx.insert("page_obj", &page);
    Ok(state.render_html("posts/follow.html", &ctx)?.into_response())
}

pub async fn profile_follow(
    State(state): State<AppState>,
    Path(username): Path<String>,
    rc: RequestContext,
    Form(form): Form<CsrfFormData>,
) -> Result<Response, AppError> {
    rc.verify_csrf(form.csrfmiddlewaretoken.as_deref())?;

    let access = can_write(rc.user.as_ref());
    let Some(user) = rc.user.as_ref().filter(|_| access.is_granted()) else {
        return Ok(rc.deny(access));
    };

    let author = find_author(&state, &username).await?;
    MutationCore::follow(&state.conn, user, &author).await?;

    Ok(Redirect::to(&profile_url(&author.username)).into_response())
}

pub async fn profile_unfollow(
    State(state): State<AppState>,
    Path(username): Path<String>,
    rc: RequestContext,
    Form(form): Form<CsrfFormData>,
) -> Result<Response, AppError> {
    rc.verify_csrf(form.csrfmiddlewaretoken.as_deref())?;

    let access = can_write(rc.user.as_ref());
    let Some(user) = rc.user.as_ref().filter(|_| access.is_granted()) else {
        return Ok(rc.deny(access));
    };

    let author = find_author(&state, &username).await?;
    MutationCore::unfollow(&state.conn, user, &author).await?;

    Ok(Redirect::to(&profile_url(&author.username)).into_response())
}

async fn render_post_form(
    state: &AppState,
    rc: &RequestContext,
    form: &PostFormValues,
    errors: &FormErrors,
    post: Option<&post::Model>,
) -> Result<Response, AppError> {
    let groups = QueryCore::get_all_groups(&state.conn).await?;

    let mut ctx = rc.template_context();
    ctx.insert("form", form);
    ctx.insert("errors", errors);
    ctx.insert("groups", &groups);
    ctx.insert("is_edit", &post.is_some());
    ctx.insert("post", &post);
    Ok(state.render_html("posts/post_create.html", &ctx)?.into_response())
}

async fn discard_upload(state: &AppState, stored: Option<&str>) {
    if let Some(stored) = stored {
        media::discard_post_image(&state.config.media_root, stored).await;
    }
}

async fn find_post(state: &AppState, raw_id: &str) -> Result<post::Model, AppError> {
    let id = parse_post_id(raw_id)?;
    QueryCore::find_post_by_id(&state.conn, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("post {id}")))
}

async fn find_author(state: &AppState, username: &str) -> Result<user::Model, AppError> {
    QueryCore::find_user_by_username(&state.conn, username)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("user {username}")))
}

fn parse_post_id(raw: &str) -> Result<i32, AppError> {
    raw.parse()
        .map_err(|_| AppError::NotFound(format!("post {raw}")))
}

fn post_url(id: i32) -> String {
    format!("/posts/{id}/")
}

fn profile_url(username: &str) -> String {
    format!("/profile/{username}/")
}
