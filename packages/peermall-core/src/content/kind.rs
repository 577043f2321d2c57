//! Content kinds.
//!
//! One closed set of kinds, each carrying its own required fields. The
//! kind is stored flattened into the content record with a `type` tag:
//!
//! ```text
//! {"id": "content-…", "type": "product", "price": 12.5, "currency": "EUR", …}
//! {"id": "content-…", "type": "event", "startsAt": "2024-06-01T18:00:00.000Z", …}
//! {"id": "content-…", "type": "post", …}
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::time::Timestamp;

/// Lowest review rating
pub const MIN_RATING: u8 = 1;

/// Highest review rating
pub const MAX_RATING: u8 = 5;

/// What a piece of content is, with the fields that kind requires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentKind {
    /// Something for sale
    Product {
        /// Price, finite and not negative
        price: f64,
        /// ISO currency code
        #[serde(default, skip_serializing_if = "Option::is_none")]
        currency: Option<String>,
    },
    /// A showcase piece
    Portfolio,
    /// A bookable service
    Service {
        /// Optional list price
        #[serde(default, skip_serializing_if = "Option::is_none")]
        price: Option<f64>,
    },
    /// Something happening at a given time
    Event {
        /// Start time
        #[serde(rename = "startsAt", with = "crate::time::iso")]
        starts_at: Timestamp,
        /// Where it happens
        #[serde(default, skip_serializing_if = "Option::is_none")]
        location: Option<String>,
    },
    /// A short post
    Post,
    /// A rating of something
    Review {
        /// 1 to 5
        rating: u8,
        /// What is being reviewed
        #[serde(rename = "targetId", default, skip_serializing_if = "Option::is_none")]
        target_id: Option<String>,
    },
    /// A task with an optional reward
    Quest {
        /// Reward description
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reward: Option<String>,
        /// Deadline
        #[serde(
            default,
            with = "crate::time::iso_opt",
            skip_serializing_if = "Option::is_none"
        )]
        deadline: Option<Timestamp>,
    },
    /// A link to something elsewhere
    External {
        /// Target URL
        url: String,
    },
    /// A long-form article
    Article,
    /// A downloadable or linked resource
    Resource {
        /// Where the resource lives
        url: String,
    },
}

impl ContentKind {
    /// The tag of this kind.
    pub fn content_type(&self) -> ContentType {
        match self {
            ContentKind::Product { .. } => ContentType::Product,
            ContentKind::Portfolio => ContentType::Portfolio,
            ContentKind::Service { .. } => ContentType::Service,
            ContentKind::Event { .. } => ContentType::Event,
            ContentKind::Post => ContentType::Post,
            ContentKind::Review { .. } => ContentType::Review,
            ContentKind::Quest { .. } => ContentType::Quest,
            ContentKind::External { .. } => ContentType::External,
            ContentKind::Article => ContentType::Article,
            ContentKind::Resource { .. } => ContentType::Resource,
        }
    }

    /// Check the kind-specific fields.
    pub fn validate(&self) -> Result<()> {
        match self {
            ContentKind::Product { price, .. } => check_price(*price),
            ContentKind::Service { price: Some(price) } => check_price(*price),
            ContentKind::Review { rating, .. } if !(MIN_RATING..=MAX_RATING).contains(rating) => {
                Err(Error::InvalidRecord(format!(
                    "review rating must be between {} and {}, got {}",
                    MIN_RATING, MAX_RATING, rating
                )))
            }
            ContentKind::External { url } | ContentKind::Resource { url }
                if url.trim().is_empty() =>
            {
                Err(Error::InvalidRecord(format!(
                    "{} content requires a url",
                    self.content_type()
                )))
            }
            _ => Ok(()),
        }
    }
}

fn check_price(price: f64) -> Result<()> {
    if !price.is_finite() || price < 0.0 {
        return Err(Error::InvalidRecord(format!(
            "price must be a finite, non-negative number, got {price}"
        )));
    }
    Ok(())
}

/// The bare content tag, for filtering and indexing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    /// Something for sale
    Product,
    /// A showcase piece
    Portfolio,
    /// A bookable service
    Service,
    /// A dated event
    Event,
    /// A short post
    Post,
    /// A rating
    Review,
    /// A task
    Quest,
    /// An outside link
    External,
    /// Long-form writing
    Article,
    /// A linked resource
    Resource,
}

impl ContentType {
    /// Every content type.
    pub const ALL: [ContentType; 10] = [
        ContentType::Product,
        ContentType::Portfolio,
        ContentType::Service,
        ContentType::Event,
        ContentType::Post,
        ContentType::Review,
        ContentType::Quest,
        ContentType::External,
        ContentType::Article,
        ContentType::Resource,
    ];

    /// The stored tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Product => "product",
            ContentType::Portfolio => "portfolio",
            ContentType::Service => "service",
            ContentType::Event => "event",
            ContentType::Post => "post",
            ContentType::Review => "review",
            ContentType::Quest => "quest",
            ContentType::External => "external",
            ContentType::Article => "article",
            ContentType::Resource => "resource",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ContentType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::InvalidRecord(format!("unknown content type '{s}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_serializes_with_type_tag() {
        let kind = ContentKind::Review {
            rating: 4,
            target_id: Some("content-1".into()),
        };
        let value = serde_json::to_value(&kind).unwrap();
        assert_eq!(value, json!({ "type": "review", "rating": 4, "targetId": "content-1" }));

        let unit = serde_json::to_value(ContentKind::Post).unwrap();
        assert_eq!(unit, json!({ "type": "post" }));
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let err = serde_json::from_value::<ContentKind>(json!({ "type": "blog" }));
        assert!(err.is_err());
        assert!("blog".parse::<ContentType>().is_err());
        assert_eq!("Product".parse::<ContentType>().unwrap(), ContentType::Product);
    }

    #[test]
    fn test_required_fields() {
        assert!(serde_json::from_value::<ContentKind>(json!({ "type": "product" })).is_err());
        assert!(serde_json::from_value::<ContentKind>(json!({ "type": "event" })).is_err());
        assert!(serde_json::from_value::<ContentKind>(json!({ "type": "external" })).is_err());
    }

    #[test]
    fn test_validation() {
        assert!(ContentKind::Product { price: 0.0, currency: None }.validate().is_ok());
        assert!(ContentKind::Product { price: -1.0, currency: None }.validate().is_err());
        assert!(ContentKind::Product { price: f64::NAN, currency: None }.validate().is_err());
        assert!(ContentKind::Service { price: None }.validate().is_ok());
        assert!(ContentKind::Review { rating: 0, target_id: None }.validate().is_err());
        assert!(ContentKind::Review { rating: 5, target_id: None }.validate().is_ok());
        assert!(ContentKind::External { url: " ".into() }.validate().is_err());
        assert!(ContentKind::Resource { url: "https://x.io/a.pdf".into() }
            .validate()
            .is_ok());
    }

    #[test]
    fn test_type_tags_round_trip() {
        for t in ContentType::ALL {
            assert_eq!(t.as_str().parse::<ContentType>().unwrap(), t);
            assert_eq!(serde_json::to_value(t).unwrap(), json!(t.as_str()));
        }
    }
}
