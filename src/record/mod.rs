//! Record module: the normalized shape of one extracted listing
//!
//! A [`Record`] has a fixed set of fields. Price, address and the detail block
//! are required on the page; description and agent information are optional
//! and fall back to fixed placeholder text. Bed, bath and square-footage
//! counts are parsed best-effort from the detail block and default to 0.

mod details;

pub use details::{parse_detail_counts, DetailCounts};

use serde::{Deserialize, Serialize};

/// Placeholder used when a listing has no description block
pub const NO_DESCRIPTION: &str = "No description available";

/// Placeholder used when a listing has no agent block
pub const NO_AGENT_INFO: &str = "No agent information available";

/// Separator used when `features` is flattened into a single column
///
/// A literal separator or backslash inside a feature is escaped with a
/// backslash. A list holding one empty feature is written the same way as an
/// empty list and reads back as empty.
pub const FEATURE_SEPARATOR: char = '|';

const FEATURE_ESCAPE: char = '\\';

/// Field names, in snapshot column order
pub const RECORD_FIELDS: [&str; 10] = [
    "price",
    "address",
    "beds",
    "baths",
    "sqft",
    "link",
    "description",
    "features",
    "additional_info",
    "agent_info",
];

/// One listing extracted from a detail page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub price: String,
    pub address: String,
    pub beds: u32,
    pub baths: u32,
    pub sqft: u32,
    /// URL of the detail page; the natural identity of the record
    pub link: String,
    pub description: String,
    #[serde(with = "feature_list")]
    pub features: Vec<String>,
    pub additional_info: String,
    pub agent_info: String,
}

/// Raw text gathered from a detail page, before normalization
#[derive(Debug, Clone, Default)]
pub struct RawListing {
    pub link: String,
    pub price: String,
    pub address: String,
    pub details: String,
    pub description: Option<String>,
    pub features: Vec<String>,
    pub agent_info: Option<String>,
}

impl Record {
    /// Builds a record from raw page text, applying the optional-field
    /// defaults and the count parsing rules
    pub fn from_raw(raw: RawListing) -> Self {
        let counts = parse_detail_counts(&raw.details);
        let additional_info = raw.features.join("\n");

        Self {
            price: raw.price.trim().to_string(),
            address: raw.address.trim().to_string(),
            beds: counts.beds,
            baths: counts.baths,
            sqft: counts.sqft,
            link: raw.link,
            description: raw
                .description
                .filter(|d| !d.trim().is_empty())
                .unwrap_or_else(|| NO_DESCRIPTION.to_string()),
            features: raw.features,
            additional_info,
            agent_info: raw
                .agent_info
                .filter(|a| !a.trim().is_empty())
                .unwrap_or_else(|| NO_AGENT_INFO.to_string()),
        }
    }
}

/// Serializes `features` as one delimited column
mod feature_list {
    use super::{FEATURE_ESCAPE, FEATURE_SEPARATOR};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(features: &[String], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&join(features))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
        let joined = String::deserialize(deserializer)?;
        Ok(split(&joined))
    }

    pub(super) fn join(features: &[String]) -> String {
        let mut joined = String::new();
        for (i, feature) in features.iter().enumerate() {
            if i > 0 {
                joined.push(FEATURE_SEPARATOR);
            }
            for c in feature.chars() {
                if c == FEATURE_SEPARATOR || c == FEATURE_ESCAPE {
                    joined.push(FEATURE_ESCAPE);
                }
                joined.push(c);
            }
        }
        joined
    }

    pub(super) fn split(joined: &str) -> Vec<String> {
        if joined.is_empty() {
            return Vec::new();
        }

        let mut features = Vec::new();
        let mut current = String::new();
        let mut chars = joined.chars();
        while let Some(c) = chars.next() {
            match c {
                FEATURE_ESCAPE => current.extend(chars.next()),
                FEATURE_SEPARATOR => features.push(std::mem::take(&mut current)),
                c => current.push(c),
            }
        }
        features.push(current);
        features
    }
}
