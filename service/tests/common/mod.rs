#![allow(dead_code)]

use entity::{group, user};
use migration::{Migrator, MigratorTrait};
use yatube_service::sea_orm::{Database, DatabaseConnection};
use yatube_service::{Mutation, PostForm};

pub async fn setup() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    Migrator::up(&db, None).await.unwrap();
    db
}

pub async fn create_user(db: &DatabaseConnection, username: &str) -> user::Model {
    Mutation::get_or_create_user(db, username).await.unwrap()
}

pub async fn create_group(db: &DatabaseConnection, slug: &str) -> group::Model {
    Mutation::create_group(db, "Test group", slug, "Test description")
        .await
        .unwrap()
}

pub async fn create_posts(
    db: &DatabaseConnection,
    author: &user::Model,
    group: Option<&group::Model>,
    count: usize,
) {
    for i in 0..count {
        Mutation::create_post(
            db,
            author,
            PostForm {
                text: format!("Test text {i}"),
                group_id: group.map(|group| group.id),
                image: None,
            },
        )
        .await
        .unwrap();
    }
}
