use std::fmt;

use anyhow::Context;
use chrono::{DateTime, SecondsFormat, Utc};
use mongodb::bson::oid::ObjectId;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::StoreError;

/// Store-assigned record identifier (24 hex characters on the wire).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BookId(ObjectId);

impl BookId {
    /// Parse a path segment; anything but a well-formed object id cannot
    /// address a record.
    pub fn parse(raw: &str) -> Result<Self, StoreError> {
        ObjectId::parse_str(raw)
            .map(Self)
            .map_err(|_| StoreError::MalformedId(raw.to_string()))
    }

    pub(crate) fn generate() -> Self {
        Self(ObjectId::new())
    }

    pub(crate) fn object_id(&self) -> ObjectId {
        self.0
    }
}

impl From<ObjectId> for BookId {
    fn from(value: ObjectId) -> Self {
        Self(value)
    }
}

impl fmt::Display for BookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.to_hex())
    }
}

impl Serialize for BookId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_hex())
    }
}

impl<'de> Deserialize<'de> for BookId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// A persisted book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub author: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<i64>,
    #[serde(default)]
    pub is_read: bool,
    #[serde(serialize_with = "millis")]
    pub created_at: DateTime<Utc>,
    #[serde(serialize_with = "millis")]
    pub updated_at: DateTime<Utc>,
}

impl Book {
    /// Build the record a validated creation request turns into.
    pub(crate) fn from_new(id: BookId, new: NewBook, now: DateTime<Utc>) -> Self {
        Self {
            id,
            title: new.title,
            author: new.author,
            year: new.year,
            genre: new.genre,
            rating: new.rating,
            is_read: new.is_read,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply the supplied patch fields; `updated_at` is the caller's concern.
    pub(crate) fn apply(&mut self, patch: BookPatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(author) = patch.author {
            self.author = author;
        }
        if let Some(year) = patch.year {
            self.year = year;
        }
        if let Some(genre) = patch.genre {
            self.genre = genre;
        }
        if let Some(rating) = patch.rating {
            self.rating = rating;
        }
        if let Some(is_read) = patch.is_read {
            self.is_read = is_read;
        }
    }
}

fn millis<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Validated creation request. Built only through [`NewBook::from_json`].
#[derive(Debug, Clone, PartialEq)]
pub struct NewBook {
    pub(crate) title: String,
    pub(crate) author: String,
    pub(crate) year: Option<i64>,
    pub(crate) genre: Option<String>,
    pub(crate) rating: Option<i64>,
    pub(crate) is_read: bool,
}

impl NewBook {
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn author(&self) -> &str {
        &self.author
    }
}

/// Validated partial update. Built only through [`BookPatch::from_json`].
///
/// `None` leaves a field untouched; for the nullable fields `Some(None)`
/// clears the stored value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookPatch {
    pub(crate) title: Option<String>,
    pub(crate) author: Option<String>,
    pub(crate) year: Option<Option<i64>>,
    pub(crate) genre: Option<Option<String>>,
    pub(crate) rating: Option<Option<i64>>,
    pub(crate) is_read: Option<bool>,
}

impl BookPatch {
    /// True when no field would change (only `updatedAt` refreshes).
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Conjunction of optional criteria; an absent criterion matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookFilter {
    /// Exact match
    pub genre: Option<String>,
    /// Case-insensitive literal substring
    pub author: Option<String>,
    /// Inclusive lower bound; records without a rating never match
    pub min_rating: Option<i64>,
    pub is_read: Option<bool>,
}

impl BookFilter {
    /// Regex-escaped author criterion. MongoDB runs it with the `i` option and
    /// [`FilterMatcher`] with a case-insensitive `Regex`, so both adapters fold
    /// case with Unicode simple case folding.
    pub(crate) fn author_pattern(&self) -> Option<String> {
        self.author.as_deref().map(regex::escape)
    }

    /// Compile the criteria once for matching many records in process.
    pub(crate) fn matcher(&self) -> Result<FilterMatcher<'_>, StoreError> {
        let author = self
            .author_pattern()
            .map(|pattern| {
                RegexBuilder::new(&pattern)
                    .case_insensitive(true)
                    .build()
                    .context("author criterion does not compile")
            })
            .transpose()?;
        Ok(FilterMatcher {
            filter: self,
            author,
        })
    }
}

pub(crate) struct FilterMatcher<'a> {
    filter: &'a BookFilter,
    author: Option<Regex>,
}

impl FilterMatcher<'_> {
    pub(crate) fn matches(&self, book: &Book) -> bool {
        if let Some(genre) = &self.filter.genre {
            if book.genre.as_deref() != Some(genre.as_str()) {
                return false;
            }
        }
        if let Some(author) = &self.author {
            if !author.is_match(&book.author) {
                return false;
            }
        }
        if let Some(min_rating) = self.filter.min_rating {
            if !book.rating.is_some_and(|rating| rating >= min_rating) {
                return false;
            }
        }
        if let Some(is_read) = self.filter.is_read {
            if book.is_read != is_read {
                return false;
            }
        }
        true
    }
}

/// Result window of a list query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub limit: u64,
    pub offset: u64,
}

impl Window {
    /// Window for a 1-based page. Callers guarantee `page >= 1` and `limit >= 1`.
    pub fn for_page(page: u64, limit: u64) -> Self {
        Self {
            limit,
            offset: page.saturating_sub(1).saturating_mul(limit),
        }
    }

    /// Number of pages needed for `total` records, `ceil(total / limit)`.
    pub fn page_count(&self, total: u64) -> u64 {
        if self.limit == 0 {
            return 0;
        }
        total.div_ceil(self.limit)
    }
}
