use crate::Query;
use ::entity::{comment, follow, group, post, prelude::*, user};
use sea_orm::*;
use serde::Deserialize;

/// Fields a user submits when creating or editing a post.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct PostForm {
    pub text: String,
    pub group_id: Option<i32>,
    /// Stored image path; `None` leaves an existing image untouched on edit.
    pub image: Option<String>,
}

pub struct Mutation;

impl Mutation {
    /// Look an identity up by username, creating the row on first sight.
    pub async fn get_or_create_user(db: &DbConn, username: &str) -> Result<user::Model, DbErr> {
        if let Some(user) = Query::find_user_by_username(db, username).await? {
            return Ok(user);
        }

        let inserted = user::ActiveModel {
            username: Set(username.to_owned()),
            ..Default::default()
        }
        .insert(db)
        .await;

        match inserted {
            Ok(user) => {
                tracing::info!(username, id = user.id, "registered user");
                Ok(user)
            }
            // Another request inserted the same username first.
            Err(err) if is_unique_violation(&err) => Query::find_user_by_username(db, username)
                .await?
                .ok_or(err),
            Err(err) => Err(err),
        }
    }

    pub async fn create_group(
        db: &DbConn,
        title: &str,
        slug: &str,
        description: &str,
    ) -> Result<group::Model, DbErr> {
        let group = group::ActiveModel {
            title: Set(title.to_owned()),
            slug: Set(slug.to_owned()),
            description: Set(description.to_owned()),
            ..Default::default()
        }
        .insert(db)
        .await?;

        tracing::info!(slug, id = group.id, "created group");
        Ok(group)
    }

    pub async fn create_post(
        db: &DbConn,
        author: &user::Model,
        form: PostForm,
    ) -> Result<post::Model, DbErr> {
        let post = post::ActiveModel {
            text: Set(form.text),
            author_id: Set(author.id),
            group_id: Set(form.group_id),
            image: Set(form.image),
            ..Default::default()
        }
        .insert(db)
        .await?;

        tracing::info!(id = post.id, author = %author.username, "created post");
        Ok(post)
    }

    /// Rewrite text, group and (when a new one is given) image. The author
    /// and publication date never change.
    pub async fn update_post(
        db: &DbConn,
        post: post::Model,
        form: PostForm,
    ) -> Result<post::Model, DbErr> {
        let id = post.id;
        let mut post: post::ActiveModel = post.into();
        post.text = Set(form.text);
        post.group_id = Set(form.group_id);
        if let Some(image) = form.image {
            post.image = Set(Some(image));
        }

        let post = post.update(db).await?;
        tracing::info!(id, "updated post");
        Ok(post)
    }

    pub async fn create_comment(
        db: &DbConn,
        post: &post::Model,
        author: &user::Model,
        text: &str,
    ) -> Result<comment::Model, DbErr> {
        let comment = comment::ActiveModel {
            post_id: Set(Some(post.id)),
            author_id: Set(author.id),
            text: Set(text.to_owned()),
            ..Default::default()
        }
        .insert(db)
        .await?;

        tracing::info!(id = comment.id, post = post.id, "created comment");
        Ok(comment)
    }

    /// Get-or-create on the (user, author) pair. The flag tells whether a
    /// new subscription was recorded.
    pub async fn follow(
        db: &DbConn,
        user: &user::Model,
        author: &user::Model,
    ) -> Result<(follow::Model, bool), DbErr> {
        if let Some(existing) = Query::find_follow(db, user.id, author.id).await? {
            return Ok((existing, false));
        }

        let inserted = follow::ActiveModel {
            user_id: Set(user.id),
            author_id: Set(author.id),
            ..Default::default()
        }
        .insert(db)
        .await;

        match inserted {
            Ok(follow) => {
                tracing::info!(user = %user.username, author = %author.username, "followed");
                Ok((follow, true))
            }
            Err(err) if is_unique_violation(&err) => Query::find_follow(db, user.id, author.id)
                .await?
                .map(|existing| (existing, false))
                .ok_or(err),
            Err(err) => Err(err),
        }
    }

    /// Remove the exact (user, author) pair; a missing pair is not an error.
    pub async fn unfollow(
        db: &DbConn,
        user: &user::Model,
        author: &user::Model,
    ) -> Result<DeleteResult, DbErr> {
        let result = Follow::delete_many()
            .filter(follow::Column::UserId.eq(user.id))
            .filter(follow::Column::AuthorId.eq(author.id))
            .exec(db)
            .await?;

        tracing::info!(
            user = %user.username,
            author = %author.username,
            rows = result.rows_affected,
            "unfollowed"
        );
        Ok(result)
    }
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}
