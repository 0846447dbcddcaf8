//! Data access and the small amount of domain logic behind the site:
//! feed pagination, the write permission policy and the query/mutation
//! services used by the HTTP layer.

pub mod access;
pub mod feed;
mod mutation;
mod query;

pub use access::Access;
pub use feed::{POSTS_PER_PAGE, Page, PageRequest};
pub use mutation::*;
pub use query::*;

pub use sea_orm;
