//! Splitting an ordered post listing into one displayable page.
//!
//! Every feed on the site (index, group, profile, follow) goes through the
//! same policy: pages are 1-indexed, a missing or garbled page number means
//! the first page, anything past the end means the last page, and an empty
//! listing still has one (empty) page. Bad input is normalised, never
//! reported.

use sea_orm::{ConnectionTrait, DbErr, PaginatorTrait, SelectorTrait};
use serde::Serialize;
use std::num::IntErrorKind;

/// Number of posts shown on every feed page.
pub const POSTS_PER_PAGE: u64 = 10;

/// The page a client asked for, normalised from the raw `?page=` value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PageRequest {
    /// A 1-indexed page number, possibly past the end.
    Number(u64),
    /// A number too large to represent; always lands on the last page.
    Last,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::Number(1)
    }
}

impl PageRequest {
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return Self::default();
        };
        match raw.trim().parse::<i64>() {
            Ok(number) if number < 1 => Self::default(),
            Ok(number) => Self::Number(number as u64),
            Err(err) if *err.kind() == IntErrorKind::PosOverflow => Self::Last,
            Err(_) => Self::default(),
        }
    }

    /// Resolve against a page count. The result is within `1..=num_pages`.
    pub fn resolve(self, num_pages: u64) -> u64 {
        let last = num_pages.max(1);
        match self {
            Self::Number(number) => number.clamp(1, last),
            Self::Last => last,
        }
    }
}

/// Number of pages needed for `num_items`; never less than one.
pub fn num_pages(num_items: u64, page_size: u64) -> u64 {
    num_items.div_ceil(page_size.max(1)).max(1)
}

/// One page of a feed plus what the templates need to draw navigation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// The page actually served, after clamping.
    pub number: u64,
    pub num_pages: u64,
    pub num_items: u64,
    pub has_previous: bool,
    pub has_next: bool,
    pub previous_page_number: Option<u64>,
    pub next_page_number: Option<u64>,
}

impl<T> Page<T> {
    fn new(items: Vec<T>, number: u64, num_items: u64, page_size: u64) -> Self {
        let num_pages = num_pages(num_items, page_size);
        let has_previous = number > 1;
        let has_next = number < num_pages;
        Self {
            items,
            number,
            num_pages,
            num_items,
            has_previous,
            has_next,
            previous_page_number: has_previous.then(|| number - 1),
            next_page_number: has_next.then(|| number + 1),
        }
    }

    /// Paginate an in-memory listing that is already filtered and ordered.
    pub fn from_items(mut all: Vec<T>, page_size: u64, request: PageRequest) -> Self {
        let page_size = page_size.max(1);
        let num_items = all.len() as u64;
        let number = request.resolve(num_pages(num_items, page_size));

        let start = ((number - 1) * page_size).min(num_items) as usize;
        let end = (start + page_size as usize).min(all.len());
        let items = all.drain(start..end).collect();

        Self::new(items, number, num_items, page_size)
    }

    /// Swap the items for a transformed version of them, keeping the
    /// navigation data.
    pub fn with_items<U>(self, items: Vec<U>) -> Page<U> {
        Page {
            items,
            number: self.number,
            num_pages: self.num_pages,
            num_items: self.num_items,
            has_previous: self.has_previous,
            has_next: self.has_next,
            previous_page_number: self.previous_page_number,
            next_page_number: self.next_page_number,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }
}

impl<T> IntoIterator for Page<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a Page<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// Paginate an ordered query on the database: count the rows, clamp the
/// request, then fetch only the rows of the chosen page.
pub async fn fetch_page<'db, C, P>(
    query: P,
    db: &'db C,
    page_size: u64,
    request: PageRequest,
) -> Result<Page<<P::Selector as SelectorTrait>::Item>, DbErr>
where
    C: ConnectionTrait,
    P: PaginatorTrait<'db, C>,
{
    let page_size = page_size.max(1);
    let paginator = query.paginate(db, page_size);
    let num_items = paginator.num_items().await?;
    let number = request.resolve(num_pages(num_items, page_size));

    tracing::debug!(num_items, number, page_size, "fetching feed page");

    let items = paginator.fetch_page(number - 1).await?;
    Ok(Page::new(items, number, num_items, page_size))
}
