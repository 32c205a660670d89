//! Cursor-based paging over the employee collection.
//!
//! A [`PageCursor`] is a plain value: every fetch takes the previous cursor
//! and hands back the next one, so callers decide where it lives.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;
use utoipa::ToSchema;

use crate::error::{CursorError, StoreResult};
use crate::model::Employee;
use crate::store::{Anchor, EmployeeStore, PageRequest};

pub const DEFAULT_PAGE_SIZE: usize = 5;

/// Position of a record in `(createdAt, id)` order.
///
/// Rendered as the opaque token `"<createdAt>:<id>"`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Boundary {
    pub created_at: i64,
    pub id: String,
}

impl Boundary {
    pub fn of(employee: &Employee) -> Self {
        Self {
            created_at: employee.created_at,
            id: employee.id.clone(),
        }
    }
}

impl fmt::Display for Boundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.created_at, self.id)
    }
}

impl FromStr for Boundary {
    type Err = CursorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || CursorError(s.to_string());
        let (created_at, id) = s.split_once(':').ok_or_else(malformed)?;
        if id.is_empty() {
            return Err(malformed());
        }
        Ok(Self {
            created_at: created_at.parse().map_err(|_| malformed())?,
            id: id.to_string(),
        })
    }
}

impl TryFrom<String> for Boundary {
    type Error = CursorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Boundary> for String {
    fn from(boundary: Boundary) -> Self {
        boundary.to_string()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Initial,
    Next,
    Prev,
    /// Re-read the current page, e.g. after a mutation.
    Reload,
}

/// Where the displayed page sits in the collection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PageCursor {
    #[schema(value_type = Option<String>)]
    pub first: Option<Boundary>,
    #[schema(value_type = Option<String>)]
    pub last: Option<Boundary>,
    #[serde(rename = "isFirstPage")]
    pub is_first_page: bool,
    #[serde(rename = "isLastPage")]
    pub is_last_page: bool,
}

impl Default for PageCursor {
    fn default() -> Self {
        Self {
            first: None,
            last: None,
            is_first_page: true,
            is_last_page: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PageOutcome {
    /// A new page replaces the displayed records.
    Loaded {
        records: Vec<Employee>,
        cursor: PageCursor,
    },
    /// The displayed records stay as they are; only the flags may move.
    Unchanged { cursor: PageCursor },
}

impl PageOutcome {
    pub fn cursor(&self) -> &PageCursor {
        match self {
            PageOutcome::Loaded { cursor, .. } | PageOutcome::Unchanged { cursor } => cursor,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pager {
    page_size: usize,
}

impl Default for Pager {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl Pager {
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// The read needed to move in `direction`, or `None` when the flags
    /// already rule the move out.
    pub fn request_for(&self, cursor: &PageCursor, direction: Direction) -> Option<PageRequest> {
        let anchor = match direction {
            Direction::Initial => Anchor::Start,
            Direction::Next if cursor.is_last_page => return None,
            Direction::Next => cursor.last.clone().map_or(Anchor::Start, Anchor::After),
            Direction::Prev if cursor.is_first_page => return None,
            Direction::Prev => cursor.first.clone().map_or(Anchor::Start, Anchor::Before),
            Direction::Reload => cursor.first.clone().map_or(Anchor::Start, Anchor::From),
        };
        Some(PageRequest {
            anchor,
            limit: self.page_size,
        })
    }

    pub async fn fetch(
        &self,
        store: &dyn EmployeeStore,
        cursor: &PageCursor,
        direction: Direction,
    ) -> StoreResult<PageOutcome> {
        let Some(request) = self.request_for(cursor, direction) else {
            debug!(?direction, "page move ruled out by cursor flags");
            return Ok(PageOutcome::Unchanged {
                cursor: cursor.clone(),
            });
        };
        let mut records = store.fetch_page(&request).await?;
        // A move with no boundary to leave from reads the first page.
        let mut direction = match direction {
            Direction::Next if cursor.last.is_none() => Direction::Initial,
            Direction::Prev if cursor.first.is_none() => Direction::Initial,
            other => other,
        };

        // Everything on the reloaded page was deleted; start over.
        if records.is_empty() && direction == Direction::Reload && cursor.first.is_some() {
            direction = Direction::Initial;
            records = store
                .fetch_page(&PageRequest {
                    anchor: Anchor::Start,
                    limit: self.page_size,
                })
                .await?;
        }

        debug!(?direction, count = records.len(), "employee page fetched");
        Ok(self.settle(cursor, direction, records))
    }

    /// Derive the next cursor from the records a move returned.
    pub fn settle(
        &self,
        cursor: &PageCursor,
        direction: Direction,
        records: Vec<Employee>,
    ) -> PageOutcome {
        if records.is_empty() {
            return match direction {
                Direction::Next => PageOutcome::Unchanged {
                    cursor: PageCursor {
                        is_last_page: true,
                        ..cursor.clone()
                    },
                },
                Direction::Prev => PageOutcome::Unchanged {
                    cursor: PageCursor {
                        is_first_page: true,
                        ..cursor.clone()
                    },
                },
                Direction::Initial | Direction::Reload => PageOutcome::Loaded {
                    records,
                    cursor: PageCursor {
                        first: None,
                        last: None,
                        is_first_page: true,
                        is_last_page: true,
                    },
                },
            };
        }

        let short = records.len() < self.page_size;
        let (is_first_page, is_last_page) = match direction {
            Direction::Initial => (true, short),
            Direction::Next => (false, short),
            Direction::Prev => (short, false),
            Direction::Reload => (cursor.is_first_page || cursor.first.is_none(), short),
        };
        let cursor = PageCursor {
            first: records.first().map(Boundary::of),
            last: records.last().map(Boundary::of),
            is_first_page,
            is_last_page,
        };
        PageOutcome::Loaded { records, cursor }
    }
}
