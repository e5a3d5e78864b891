//! Forward cursor pagination
//!
//! [`paginate`] slices a collection that is already in canonical order
//! (newest first, ties broken by id) and reports Relay-style page metadata.
//! The cursor of an item is its id; [`CursorCodec`] makes it opaque at the
//! GraphQL boundary.

use std::cmp::Ordering;
use std::fmt;

use async_graphql::{InputObject, SimpleObject};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

use crate::task::Task;
use crate::{Result, ServiceError};

/// An item that can be located by a cursor
pub trait Cursored {
    type Cursor: Clone + PartialEq + fmt::Debug + fmt::Display;

    fn cursor(&self) -> Self::Cursor;
}

/// Canonical task order: `created_at` descending, then id descending
pub fn newest_first(a: &Task, b: &Task) -> Ordering {
    b.created_at
        .cmp(&a.created_at)
        .then_with(|| b.id.cmp(&a.id))
}

/// Requested slice of a collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest<C = crate::task::TaskId> {
    /// `None` uses the configured default page size
    pub first: Option<usize>,
    pub after: Option<C>,
}

impl<C> PageRequest<C> {
    pub fn first(first: usize) -> Self {
        Self {
            first: Some(first),
            after: None,
        }
    }

    pub fn after(mut self, cursor: C) -> Self {
        self.after = Some(cursor);
        self
    }
}

impl<C> Default for PageRequest<C> {
    fn default() -> Self {
        Self {
            first: None,
            after: None,
        }
    }
}

/// One page of a collection plus pagination metadata
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T: Cursored> {
    pub items: Vec<T>,
    pub has_next_page: bool,
    pub has_previous_page: bool,
    pub start_cursor: Option<T::Cursor>,
    pub end_cursor: Option<T::Cursor>,
    pub total_count: usize,
}

impl<T: Cursored> Page<T> {
    /// Create empty page
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            has_next_page: false,
            has_previous_page: false,
            start_cursor: None,
            end_cursor: None,
            total_count: 0,
        }
    }

    /// Replace the count with one taken independently of the slice
    pub fn with_total_count(mut self, total_count: usize) -> Self {
        self.total_count = total_count;
        self
    }
}

/// Take up to `first` items following `after` from an ordered collection.
///
/// One extra item is fetched to decide `has_next_page` without a second
/// query. A cursor that matches no item fails with `InvalidCursor`.
/// `has_previous_page` is true whenever a cursor was given.
pub fn paginate<T: Cursored>(ordered: Vec<T>, first: usize, after: Option<&T::Cursor>) -> Result<Page<T>> {
    let total_count = ordered.len();

    let start = match after {
        None => 0,
        Some(cursor) => ordered
            .iter()
            .position(|item| &item.cursor() == cursor)
            .map(|idx| idx + 1)
            .ok_or_else(|| ServiceError::InvalidCursor(cursor.to_string()))?,
    };

    let mut items: Vec<T> = ordered
        .into_iter()
        .skip(start)
        .take(first.saturating_add(1))
        .collect();
    let has_next_page = items.len() > first;
    items.truncate(first);

    let start_cursor = items.first().map(Cursored::cursor);
    let end_cursor = items.last().map(Cursored::cursor);

    Ok(Page {
        items,
        has_next_page,
        has_previous_page: after.is_some(),
        start_cursor,
        end_cursor,
        total_count,
    })
}

/// Page information
#[derive(SimpleObject, Debug, Clone, PartialEq, Eq)]
pub struct PageInfo {
    pub has_next_page: bool,
    pub has_previous_page: bool,
    pub start_cursor: Option<String>,
    pub end_cursor: Option<String>,
}

impl PageInfo {
    pub fn from_page<T: Cursored>(page: &Page<T>) -> Self {
        Self {
            has_next_page: page.has_next_page,
            has_previous_page: page.has_previous_page,
            start_cursor: page.start_cursor.as_ref().map(CursorCodec::encode_cursor),
            end_cursor: page.end_cursor.as_ref().map(CursorCodec::encode_cursor),
        }
    }
}

/// Cursor encoding/decoding
pub struct CursorCodec;

impl CursorCodec {
    /// Encode cursor to base64
    pub fn encode(value: &str) -> String {
        BASE64.encode(value.as_bytes())
    }

    /// Decode cursor from base64
    pub fn decode(cursor: &str) -> Result<String> {
        let bytes = BASE64
            .decode(cursor.as_bytes())
            .map_err(|e| ServiceError::InvalidCursor(e.to_string()))?;
        String::from_utf8(bytes).map_err(|e| ServiceError::InvalidCursor(e.to_string()))
    }

    pub fn encode_cursor<C: fmt::Display>(cursor: &C) -> String {
        Self::encode(&cursor.to_string())
    }

    /// Decode and parse a typed cursor such as a [`TaskId`](crate::task::TaskId)
    pub fn decode_cursor<C>(cursor: &str) -> Result<C>
    where
        C: std::str::FromStr,
        C::Err: fmt::Display,
    {
        Self::decode(cursor)?
            .parse::<C>()
            .map_err(|e| ServiceError::InvalidCursor(e.to_string()))
    }
}

/// Pagination input for GraphQL queries
#[derive(InputObject, Debug, Clone, Default)]
pub struct PaginationInput {
    /// Number of items to return
    pub first: Option<i32>,

    /// Opaque cursor of the last item already seen
    pub after: Option<String>,
}

impl PaginationInput {
    /// Validate and convert into a typed request
    pub fn into_request<C>(self) -> Result<PageRequest<C>>
    where
        C: std::str::FromStr,
        C::Err: fmt::Display,
    {
        let first = match self.first {
            Some(first) if first < 0 => {
                return Err(ServiceError::ValidationFailed(
                    "'first' must be non-negative".to_string(),
                ))
            }
            Some(first) => Some(first as usize),
            None => None,
        };

        let after = self
            .after
            .as_deref()
            .map(CursorCodec::decode_cursor::<C>)
            .transpose()?;

        Ok(PageRequest { first, after })
    }
}
