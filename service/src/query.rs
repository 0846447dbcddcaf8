use crate::feed::{self, POSTS_PER_PAGE, Page, PageRequest};
use ::entity::{comment, follow, group, post, prelude::*, user};
use sea_orm::*;
use serde::Serialize;

/// A post with the author and group every listing shows next to it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PostCard {
    pub post: post::Model,
    pub author: user::Model,
    pub group: Option<group::Model>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CommentCard {
    pub comment: comment::Model,
    pub author: user::Model,
}

pub struct Query;

impl Query {
    pub async fn find_user_by_username(
        db: &DbConn,
        username: &str,
    ) -> Result<Option<user::Model>, DbErr> {
        User::find()
            .filter(user::Column::Username.eq(username))
            .one(db)
            .await
    }

    pub async fn find_group_by_slug(db: &DbConn, slug: &str) -> Result<Option<group::Model>, DbErr> {
        Group::find()
            .filter(group::Column::Slug.eq(slug))
            .one(db)
            .await
    }

    pub async fn find_group_by_id(db: &DbConn, id: i32) -> Result<Option<group::Model>, DbErr> {
        Group::find_by_id(id).one(db).await
    }

    pub async fn get_all_groups(db: &DbConn) -> Result<Vec<group::Model>, DbErr> {
        Group::find()
            .order_by_asc(group::Column::Title)
            .all(db)
            .await
    }

    pub async fn find_post_by_id(db: &DbConn, id: i32) -> Result<Option<post::Model>, DbErr> {
        Post::find_by_id(id).one(db).await
    }

    pub async fn find_post_card(db: &DbConn, id: i32) -> Result<Option<PostCard>, DbErr> {
        match Post::find_by_id(id).find_also_related(Group).one(db).await? {
            Some(row) => Ok(Self::post_cards(db, vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    pub async fn count_posts_by_author(db: &DbConn, author_id: i32) -> Result<u64, DbErr> {
        Post::find()
            .filter(post::Column::AuthorId.eq(author_id))
            .count(db)
            .await
    }

    /// Comments on a post, newest first.
    pub async fn find_comments_for_post(
        db: &DbConn,
        post_id: i32,
    ) -> Result<Vec<CommentCard>, DbErr> {
        let rows = Comment::find()
            .filter(comment::Column::PostId.eq(post_id))
            .order_by_desc(comment::Column::Created)
            .order_by_desc(comment::Column::Id)
            .find_also_related(User)
            .all(db)
            .await?;

        rows.into_iter()
            .map(|(comment, author)| match author {
                Some(author) => Ok(CommentCard { comment, author }),
                None => Err(DbErr::RecordNotFound(format!(
                    "author {} of comment {}",
                    comment.author_id, comment.id
                ))),
            })
            .collect()
    }

    pub async fn find_follow(
        db: &DbConn,
        user_id: i32,
        author_id: i32,
    ) -> Result<Option<follow::Model>, DbErr> {
        Follow::find()
            .filter(follow::Column::UserId.eq(user_id))
            .filter(follow::Column::AuthorId.eq(author_id))
            .one(db)
            .await
    }

    pub async fn is_following(db: &DbConn, user_id: i32, author_id: i32) -> Result<bool, DbErr> {
        Ok(Self::find_follow(db, user_id, author_id).await?.is_some())
    }

    /// Every post, newest first.
    pub async fn index_feed(db: &DbConn, request: PageRequest) -> Result<Page<PostCard>, DbErr> {
        Self::feed(db, Post::find(), request).await
    }

    pub async fn group_feed(
        db: &DbConn,
        group: &group::Model,
        request: PageRequest,
    ) -> Result<Page<PostCard>, DbErr> {
        let select = Post::find().filter(post::Column::GroupId.eq(group.id));
        Self::feed(db, select, request).await
    }

    pub async fn profile_feed(
        db: &DbConn,
        author: &user::Model,
        request: PageRequest,
    ) -> Result<Page<PostCard>, DbErr> {
        let select = Post::find().filter(post::Column::AuthorId.eq(author.id));
        Self::feed(db, select, request).await
    }

    /// Posts by the authors `user` follows.
    pub async fn follow_feed(
        db: &DbConn,
        user: &user::Model,
        request: PageRequest,
    ) -> Result<Page<PostCard>, DbErr> {
        let followed = Follow::find()
            .select_only()
            .column(follow::Column::AuthorId)
            .filter(follow::Column::UserId.eq(user.id))
            .into_query();
        let select = Post::find().filter(post::Column::AuthorId.in_subquery(followed));
        Self::feed(db, select, request).await
    }

    async fn feed(
        db: &DbConn,
        select: Select<Post>,
        request: PageRequest,
    ) -> Result<Page<PostCard>, DbErr> {
        let newest_first = select
            .order_by_desc(post::Column::PubDate)
            .order_by_desc(post::Column::Id)
            .find_also_related(Group);

        let mut page = feed::fetch_page(newest_first, db, POSTS_PER_PAGE, request).await?;
        let rows = std::mem::take(&mut page.items);
        let cards = Self::post_cards(db, rows).await?;
        Ok(page.with_items(cards))
    }

    async fn post_cards(
        db: &DbConn,
        rows: Vec<(post::Model, Option<group::Model>)>,
    ) -> Result<Vec<PostCard>, DbErr> {
        let (posts, groups): (Vec<_>, Vec<_>) = rows.into_iter().unzip();
        let authors = posts.load_one(User, db).await?;

        posts
            .into_iter()
            .zip(authors)
            .zip(groups)
            .map(|((post, author), group)| match author {
                Some(author) => Ok(PostCard {
                    post,
                    author,
                    group,
                }),
                None => Err(DbErr::RecordNotFound(format!(
                    "author {} of post {}",
                    post.author_id, post.id
                ))),
            })
            .collect()
    }
}
