mod comments;
mod follows;
mod posts;
mod reactions;
mod users;

pub use follows::FollowChange;
pub use reactions::ToggleResult;

use anyhow::Result;

/// SQL expression for the current time in the format the schema defaults use.
pub(crate) const NOW: &str = "strftime('%Y-%m-%dT%H:%M:%fZ', 'now')";

/// Extension trait for optional query results
pub(crate) trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// `?1, ?2, ...` starting at `first`, for batched `IN (...)` lookups.
pub(crate) fn placeholders(first: usize, count: usize) -> String {
    (first..first + count)
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::Database;
    use crate::models::NewPost;

    pub fn db() -> Database {
        Database::open_in_memory().unwrap()
    }

    pub fn user(db: &Database, id: &str) {
        db.create_user(id, &format!("{}@example.com", id), "hash").unwrap();
    }

    pub fn post(db: &Database, id: &str, author: &str) {
        db.insert_post(&NewPost {
            id,
            author_id: author,
            content: "hello",
            image: None,
            image_public_id: None,
            privacy: "public",
        })
        .unwrap();
    }
}
