use chrono::{DateTime, FixedOffset};
use serde::Deserialize;

use crate::rfc3339::deserialize_optional;

/// A single deliverable file belonging to a dataset.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub id: String,
    /// `None` if the API sent a timestamp that could not be parsed.
    #[serde(default, deserialize_with = "deserialize_optional")]
    pub created_at: Option<DateTime<FixedOffset>>,
    #[serde(default, deserialize_with = "deserialize_optional")]
    pub updated_at: Option<DateTime<FixedOffset>>,
    /// Identifier of the owning dataset.
    pub dataset: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub format: String,
    #[serde(default)]
    pub roles: Vec<String>,
    /// File size in bytes.
    pub size: u64,
    /// `method:"hash"`
    #[serde(default)]
    pub checksum: String,
}

/// Imagery delivered for an order, either from the archive or a tasking
/// campaign.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    pub id: String,
    #[serde(default, deserialize_with = "deserialize_optional")]
    pub created_at: Option<DateTime<FixedOffset>>,
    #[serde(default, deserialize_with = "deserialize_optional")]
    pub updated_at: Option<DateTime<FixedOffset>>,
    #[serde(rename = "type")]
    pub kind: String,
    pub status: String,
    /// Key of the supplier.
    pub supplier: String,
    #[serde(rename = "orderingID")]
    pub ordering_id: String,
    /// Supplier scene identifier.
    #[serde(rename = "sceneID")]
    pub scene_id: String,
    /// Processing level.
    pub bundle: String,
    /// URL of the licence agreement.
    pub eula: String,
    /// Amounts in US cents.
    pub total: i64,
    pub discount: i64,
    pub tax: i64,
    #[serde(default)]
    pub refunded: Option<i64>,
    /// Identifier of the order this dataset was placed under.
    pub order: String,
    /// Identifier of the tasking campaign that produced it, if any.
    #[serde(default)]
    pub campaign: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional")]
    pub expiration: Option<DateTime<FixedOffset>>,
    /// Empty when the dataset came from a list endpoint.
    #[serde(default)]
    pub resources: Vec<Resource>,
}

/// A purchase, covering archive datasets and any tasking campaigns it placed.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    #[serde(default, deserialize_with = "deserialize_optional")]
    pub created_at: Option<DateTime<FixedOffset>>,
    #[serde(default, deserialize_with = "deserialize_optional")]
    pub updated_at: Option<DateTime<FixedOffset>>,
    pub status: String,
    /// Amounts in US cents.
    pub total: i64,
    pub discount: i64,
    pub tax: i64,
    #[serde(default)]
    pub payment_method: Option<String>,
    /// Identifier of the monitor that placed the order, if any.
    #[serde(default)]
    pub monitor: Option<String>,
    /// Empty when the order came from a list endpoint.
    #[serde(default)]
    pub campaigns: Vec<Campaign>,
    /// Empty when the order came from a list endpoint.
    #[serde(default)]
    pub datasets: Vec<Dataset>,
}

/// A tasking request: a capture window over an area of interest.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Campaign {
    pub id: String,
    #[serde(default, deserialize_with = "deserialize_optional")]
    pub created_at: Option<DateTime<FixedOffset>>,
    #[serde(default, deserialize_with = "deserialize_optional")]
    pub updated_at: Option<DateTime<FixedOffset>>,
    pub status: String,
    #[serde(rename = "orderingID")]
    pub ordering_id: String,
    pub bundle: String,
    #[serde(default)]
    pub license: Option<String>,
    pub priority: String,
    /// Amounts in US cents.
    pub total: i64,
    pub discount: i64,
    pub tax: i64,
    #[serde(default)]
    pub refunded: Option<i64>,
    /// Identifier of the order this campaign was placed under.
    pub order: String,
    #[serde(default)]
    pub site: Option<String>,
    #[serde(default)]
    pub monitor: Option<String>,
    /// Start of the capture window.
    #[serde(default, deserialize_with = "deserialize_optional")]
    pub start: Option<DateTime<FixedOffset>>,
    #[serde(default, deserialize_with = "deserialize_optional")]
    pub end: Option<DateTime<FixedOffset>>,
    /// Polygon rings of `[longitude, latitude]` pairs.
    #[serde(default)]
    pub aoi: Vec<Vec<Vec<f64>>>,
    /// Maximum cloud cover, percent.
    pub cloud: i64,
    /// Maximum off-nadir angle, degrees.
    pub off_nadir: f64,
    pub supplier: String,
    #[serde(default)]
    pub platforms: Vec<String>,
    /// Ground sample distance, metres.
    pub gsd: f64,
    #[serde(default)]
    pub datasets: Vec<Dataset>,
}

impl AsRef<str> for Resource {
    fn as_ref(&self) -> &str {
        &self.id
    }
}

impl AsRef<str> for Dataset {
    fn as_ref(&self) -> &str {
        &self.id
    }
}

impl AsRef<str> for Order {
    fn as_ref(&self) -> &str {
        &self.id
    }
}

impl AsRef<str> for Campaign {
    fn as_ref(&self) -> &str {
        &self.id
    }
}
