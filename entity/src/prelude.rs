pub use super::comment::Entity as Comment;
pub use super::follow::Entity as Follow;
pub use super::group::Entity as Group;
pub use super::post::Entity as Post;
pub use super::user::Entity as User;
