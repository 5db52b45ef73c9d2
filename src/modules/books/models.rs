use serde::{Deserialize, Serialize};
use shelf_http::{FieldViolation, Validate};

pub const MAX_TITLE_LEN: usize = 255;
pub const MAX_AUTHOR_LEN: usize = 100;

/// Catalog entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub price: f64,
}

/// Body for creating or replacing a book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookInput {
    pub title: String,
    pub author: String,
    pub price: f64,
}

impl Validate for BookInput {
    fn violations(&self) -> Vec<FieldViolation> {
        let mut violations = Vec::new();
        if self.title.chars().count() > MAX_TITLE_LEN {
            violations.push(FieldViolation::new(
                "title",
                format!("must be at most {} characters", MAX_TITLE_LEN),
            ));
        }
        if self.author.chars().count() > MAX_AUTHOR_LEN {
            violations.push(FieldViolation::new(
                "author",
                format!("must be at most {} characters", MAX_AUTHOR_LEN),
            ));
        }
        if !self.price.is_finite() || self.price < 0.0 {
            violations.push(FieldViolation::new("price", "must be greater than or equal to 0"));
        }
        violations
    }
}
