//! Who may write what. Denials never surface as errors: the caller is sent
//! somewhere else instead.

use ::entity::{post, user};

/// Outcome of a permission check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Access {
    Granted,
    /// Anonymous caller; send them to the login entry point.
    Login,
    /// Authenticated but not allowed; send them back to the post.
    PostDetail(i32),
}

impl Access {
    pub fn is_granted(self) -> bool {
        self == Self::Granted
    }
}

/// Creating posts and comments, following and unfollowing.
pub fn can_write(identity: Option<&user::Model>) -> Access {
    match identity {
        Some(_) => Access::Granted,
        None => Access::Login,
    }
}

/// Only the author of a post may edit it.
pub fn can_edit(identity: Option<&user::Model>, post: &post::Model) -> Access {
    match identity {
        None => Access::Login,
        Some(user) if user.id == post.author_id => Access::Granted,
        Some(_) => Access::PostDetail(post.id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: i32) -> user::Model {
        user::Model {
            id,
            username: format!("user{id}"),
        }
    }

    fn post_by(author_id: i32) -> post::Model {
        post::Model {
            id: 7,
            text: "Test post".to_owned(),
            pub_date: chrono::Utc::now(),
            author_id,
            group_id: None,
            image: None,
        }
    }

    #[test]
    fn anonymous_may_not_write() {
        assert_eq!(can_write(None), Access::Login);
        assert!(can_write(Some(&user(1))).is_granted());
    }

    #[test]
    fn only_author_may_edit() {
        let post = post_by(1);
        assert_eq!(can_edit(Some(&user(1)), &post), Access::Granted);
        assert_eq!(can_edit(Some(&user(2)), &post), Access::PostDetail(7));
        assert_eq!(can_edit(None, &post), Access::Login);
    }
}
