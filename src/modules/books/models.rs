use serde::{Deserialize, Serialize};
use serde_json::json;
use time::OffsetDateTime;

use shelf_http::error::AppError;
use shelf_store::NewBook;

/// Earliest publication year accepted for a catalog entry.
const MIN_PUBLICATION_YEAR: i32 = 1000;

/// Request body for creating a book or fully replacing an existing one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookPayload {
    /// Title of the book
    pub title: String,
    /// Author of the book
    pub author: String,
    /// Year the book was published
    pub publication_year: i32,
}

impl BookPayload {
    /// Validate the payload and convert it into a store record.
    ///
    /// Collects every violation into the error's details list so a client
    /// sees all failing fields at once.
    pub fn validate(self) -> Result<NewBook, AppError> {
        let mut details = Vec::new();

        if self.title.trim().is_empty() {
            details.push(json!({"field": "title", "error": "must not be empty"}));
        }
        if self.author.trim().is_empty() {
            details.push(json!({"field": "author", "error": "must not be empty"}));
        }

        let current_year = OffsetDateTime::now_utc().year();
        if self.publication_year < MIN_PUBLICATION_YEAR {
            details.push(json!({
                "field": "publication_year",
                "error": format!("must be {MIN_PUBLICATION_YEAR} or later")
            }));
        } else if self.publication_year > current_year {
            details.push(json!({
                "field": "publication_year",
                "error": format!(
                    "cannot be in the future; current year is {current_year}"
                )
            }));
        }

        if !details.is_empty() {
            return Err(AppError::validation(details, "book payload failed validation"));
        }

        Ok(NewBook {
            title: self.title,
            author: self.author,
            publication_year: self.publication_year,
        })
    }
}
