/// Request builders for the remote `bookmarks` collection
use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::form_urlencoded;

use crate::bookmark::{Bookmark, NewBookmark};
use crate::error::RequestError;

pub const BOOKMARKS_TABLE: &str = "bookmarks";
pub const BOOKMARK_COLUMNS: &str = "id, title, url, created_at, user_id";
pub const OWNER_COLUMN: &str = "user_id";
pub const CREATED_AT_COLUMN: &str = "created_at";

/// Select every column of one owner's bookmarks, newest first
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListBookmarks {
    pub table: String,
    pub columns: String,
    pub owner_column: String,
    pub owner_id: String,
    pub order_by: String,
    pub ascending: bool,
}

impl ListBookmarks {
    pub fn for_owner(owner_id: &str) -> ListBookmarks {
        ListBookmarks {
            table: BOOKMARKS_TABLE.to_string(),
            columns: BOOKMARK_COLUMNS.to_string(),
            owner_column: OWNER_COLUMN.to_string(),
            owner_id: owner_id.to_string(),
            order_by: CREATED_AT_COLUMN.to_string(),
            ascending: false,
        }
    }
}

/// Create one row. The caller re-fetches to observe it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InsertBookmark {
    pub table: String,
    pub row: NewBookmark,
}

impl InsertBookmark {
    /// `url` must already be normalized
    pub fn new(title: &str, url: &str, owner_id: &str) -> InsertBookmark {
        InsertBookmark {
            table: BOOKMARKS_TABLE.to_string(),
            row: NewBookmark {
                title: title.to_string(),
                url: url.to_string(),
                user_id: owner_id.to_string(),
            },
        }
    }
}

/// Remove the row with the given id.
///
/// No ownership check happens here: the store's row-level policy decides
/// whether the caller may delete it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeleteBookmark {
    pub table: String,
    pub id: String,
}

impl DeleteBookmark {
    pub fn by_id(id: &str) -> DeleteBookmark {
        DeleteBookmark {
            table: BOOKMARKS_TABLE.to_string(),
            id: id.to_string(),
        }
    }
}

fn encode(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

// PostgREST-style renderings, used for debug logging
impl fmt::Display for ListBookmarks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let columns: Vec<&str> = self.columns.split(',').map(str::trim).collect();
        write!(
            f,
            "GET {}?select={}&{}=eq.{}&order={}.{}",
            self.table,
            columns.join(","),
            self.owner_column,
            encode(&self.owner_id),
            self.order_by,
            if self.ascending { "asc" } else { "desc" }
        )
    }
}

impl fmt::Display for InsertBookmark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "POST {} (user_id={})", self.table, encode(&self.row.user_id))
    }
}

impl fmt::Display for DeleteBookmark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DELETE {}?id=eq.{}", self.table, encode(&self.id))
    }
}

/// Error body of a store response
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct StoreErrorBody {
    pub message: String,
}

/// The store's never-throwing `{ data, error }` pair
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct StoreResponse<T> {
    #[serde(default)]
    pub data: Option<T>,
    #[serde(default)]
    pub error: Option<StoreErrorBody>,
}

impl<T> StoreResponse<T> {
    /// An error wins over any data that came with it
    pub fn into_result(self) -> Result<Option<T>, RequestError> {
        match self.error {
            Some(body) => Err(RequestError::new(body.message)),
            None => Ok(self.data),
        }
    }
}

/// Executes bookmark requests against the remote collection
#[async_trait(?Send)]
pub trait BookmarkStore {
    async fn list(&self, query: &ListBookmarks) -> Result<Vec<Bookmark>, RequestError>;

    async fn insert(&self, query: &InsertBookmark) -> Result<(), RequestError>;

    async fn delete(&self, query: &DeleteBookmark) -> Result<(), RequestError>;
}
