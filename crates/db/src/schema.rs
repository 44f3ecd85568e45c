//! Field constraints for book documents.
//!
//! Every violation is collected, one message per constraint, in field order
//! (title, author, year, genre, rating, isRead), so a caller sees the whole
//! list in one response instead of fixing fields one at a time.

use serde_json::{Map, Value};

use crate::error::StoreError;
use crate::model::{BookPatch, NewBook};

pub const TITLE_MAX_CHARS: usize = 100;
pub const YEAR_MIN: i64 = 0;
pub const RATING_MIN: i64 = 1;
pub const RATING_MAX: i64 = 5;

const TITLE_REQUIRED: &str = "Please add a title";
const TITLE_TOO_LONG: &str = "Title cannot be more than 100 characters";
const AUTHOR_REQUIRED: &str = "Please add an author";
const YEAR_NEGATIVE: &str = "Year must be a positive number";
const RATING_TOO_LOW: &str = "Rating must be at least 1";
const RATING_TOO_HIGH: &str = "Rating cannot be more than 5";

/// Decode a raw request body into a JSON object. An empty body is `{}`.
pub fn decode_body(raw: &[u8]) -> Result<Map<String, Value>, StoreError> {
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Ok(Map::new());
    }
    match serde_json::from_slice::<Value>(raw) {
        Ok(Value::Object(fields)) => Ok(fields),
        Ok(_) => Err(StoreError::Validation(vec![
            "Request body must be a JSON object".to_string(),
        ])),
        Err(err) => Err(StoreError::Validation(vec![format!(
            "Malformed JSON body: {err}"
        )])),
    }
}

impl NewBook {
    /// Validate a creation body. Unknown fields are ignored; `isRead`
    /// defaults to `false`.
    pub fn from_json(body: &Map<String, Value>) -> Result<Self, StoreError> {
        let mut errors = Violations::default();

        let title = errors.text(body, "title");
        let title = errors.title(title);
        let author = errors.text(body, "author");
        let author = errors.required(author, AUTHOR_REQUIRED);
        let year = errors.integer(body, "year").into_option();
        errors.check_year(year);
        let genre = errors.text(body, "genre").into_option();
        let rating = errors.integer(body, "rating").into_option();
        errors.check_rating(rating);
        let is_read = errors.boolean(body, "isRead").into_option();

        errors.finish()?;
        Ok(NewBook {
            title: title.unwrap_or_default(),
            author: author.unwrap_or_default(),
            year,
            genre,
            rating,
            is_read: is_read.unwrap_or(false),
        })
    }
}

impl BookPatch {
    /// Validate an update body. Only fields present in `body` are checked and
    /// applied; `null` clears optional fields, resets `isRead` to `false`, and
    /// violates the required constraint for `title`/`author`.
    pub fn from_json(body: &Map<String, Value>) -> Result<Self, StoreError> {
        let mut errors = Violations::default();
        let mut patch = BookPatch::default();

        let title = errors.text(body, "title");
        if !title.is_missing() {
            patch.title = errors.title(title);
        }
        let author = errors.text(body, "author");
        if !author.is_missing() {
            patch.author = errors.required(author, AUTHOR_REQUIRED);
        }
        let year = errors.integer(body, "year");
        if let Some(year) = year.into_patch() {
            errors.check_year(year);
            patch.year = Some(year);
        }
        patch.genre = errors.text(body, "genre").into_patch();
        let rating = errors.integer(body, "rating");
        if let Some(rating) = rating.into_patch() {
            errors.check_rating(rating);
            patch.rating = Some(rating);
        }
        patch.is_read = errors
            .boolean(body, "isRead")
            .into_patch()
            .map(|is_read| is_read.unwrap_or(false));

        errors.finish()?;
        Ok(patch)
    }
}

/// What a body holds for one field after type coercion.
enum Slot<T> {
    Missing,
    Null,
    Value(T),
    /// Wrong type; already reported.
    Invalid,
}

impl<T> Slot<T> {
    fn is_missing(&self) -> bool {
        matches!(self, Slot::Missing)
    }

    fn into_option(self) -> Option<T> {
        match self {
            Slot::Value(value) => Some(value),
            _ => None,
        }
    }

    /// `None` when the patch leaves the field alone.
    fn into_patch(self) -> Option<Option<T>> {
        match self {
            Slot::Missing | Slot::Invalid => None,
            Slot::Null => Some(None),
            Slot::Value(value) => Some(Some(value)),
        }
    }
}

#[derive(Default)]
struct Violations(Vec<String>);

impl Violations {
    fn finish(self) -> Result<(), StoreError> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(StoreError::Validation(self.0))
        }
    }

    fn cast(&mut self, kind: &str, field: &str, value: &Value) {
        self.0.push(format!(
            "Cast to {kind} failed for value {value} (type {}) at path \"{field}\"",
            json_type(value)
        ));
    }

    fn text(&mut self, body: &Map<String, Value>, field: &str) -> Slot<String> {
        match body.get(field) {
            None => Slot::Missing,
            Some(Value::Null) => Slot::Null,
            Some(Value::String(text)) => Slot::Value(text.trim().to_string()),
            Some(other) => {
                self.cast("string", field, other);
                Slot::Invalid
            }
        }
    }

    fn integer(&mut self, body: &Map<String, Value>, field: &str) -> Slot<i64> {
        let value = match body.get(field) {
            None => return Slot::Missing,
            Some(Value::Null) => return Slot::Null,
            Some(value) => value,
        };
        let parsed = match value {
            Value::Number(number) => number.as_i64().or_else(|| {
                number
                    .as_f64()
                    .filter(|float| float.fract() == 0.0 && float.abs() < i64::MAX as f64)
                    .map(|float| float as i64)
            }),
            Value::String(text) if text.trim().is_empty() => return Slot::Null,
            Value::String(text) => text.trim().parse::<i64>().ok(),
            _ => None,
        };
        match parsed {
            Some(number) => Slot::Value(number),
            None => {
                self.cast("Number", field, value);
                Slot::Invalid
            }
        }
    }

    fn boolean(&mut self, body: &Map<String, Value>, field: &str) -> Slot<bool> {
        match body.get(field) {
            None => Slot::Missing,
            Some(Value::Null) => Slot::Null,
            Some(Value::Bool(flag)) => Slot::Value(*flag),
            Some(Value::String(text)) if text == "true" => Slot::Value(true),
            Some(Value::String(text)) if text == "false" => Slot::Value(false),
            Some(other) => {
                self.cast("Boolean", field, other);
                Slot::Invalid
            }
        }
    }

    /// Present and non-empty after trimming.
    fn required(&mut self, slot: Slot<String>, message: &str) -> Option<String> {
        match slot {
            Slot::Value(text) if !text.is_empty() => Some(text),
            Slot::Invalid => None,
            _ => {
                self.0.push(message.to_string());
                None
            }
        }
    }

    fn title(&mut self, slot: Slot<String>) -> Option<String> {
        let title = self.required(slot, TITLE_REQUIRED)?;
        if title.chars().count() > TITLE_MAX_CHARS {
            self.0.push(TITLE_TOO_LONG.to_string());
            return None;
        }
        Some(title)
    }

    fn check_year(&mut self, year: Option<i64>) {
        if year.is_some_and(|year| year < YEAR_MIN) {
            self.0.push(YEAR_NEGATIVE.to_string());
        }
    }

    fn check_rating(&mut self, rating: Option<i64>) {
        match rating {
            Some(rating) if rating < RATING_MIN => self.0.push(RATING_TOO_LOW.to_string()),
            Some(rating) if rating > RATING_MAX => self.0.push(RATING_TOO_HIGH.to_string()),
            _ => {}
        }
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
