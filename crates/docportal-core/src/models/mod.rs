//! Data models for the document portal.
//!
//! This module contains the wire types returned by the portal API:
//!
//! - `Category`: top-level document categories with item counts
//! - `Page`, `ContentSummary`, `ContentDetails`: paginated content listings and details
//! - `NewContent`, `ContentUpdate`: multipart upload payloads
//! - `Tag`: labels attached to content
//! - `Feedback`: user feedback submissions
//!
//! Most portal responses wrap their payload in a `data` field (`Envelope`);
//! `Wrapped` also accepts the bare payload.

pub mod category;
pub mod content;
pub mod feedback;
pub mod tag;

use serde::{Deserialize, Deserializer, Serialize};

pub use category::Category;
pub use content::{ContentData, ContentDetails, ContentSummary, ContentUpdate, NewContent, Page, Upload};
pub use feedback::Feedback;
pub use tag::Tag;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
}

/// A payload that some endpoints wrap in `{ "data": ... }` and others return bare.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum Wrapped<T> {
    Enveloped { data: T },
    Bare(T),
}

impl<T> Wrapped<T> {
    pub(crate) fn into_inner(self) -> T {
        match self {
            Wrapped::Enveloped { data } => data,
            Wrapped::Bare(inner) => inner,
        }
    }
}

/// Accept an id sent either as a number or as a numeric string.
pub(crate) fn deserialize_opt_id<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Num(i64),
        Text(String),
    }

    Ok(match Option::<Id>::deserialize(deserializer)? {
        Some(Id::Num(n)) => Some(n),
        Some(Id::Text(s)) => s.trim().parse().ok(),
        None => None,
    })
}

/// Accept a single string, a list of strings, or null.
pub(crate) fn deserialize_one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        Some(OneOrMany::One(s)) if s.is_empty() => Vec::new(),
        Some(OneOrMany::One(s)) => vec![s],
        Some(OneOrMany::Many(v)) => v,
        None => Vec::new(),
    })
}
