//! Dashboard panel generation.
//!
//! A provisioned dashboard ships with a single template panel pointing at a
//! template topic's stream. [`generate_panels`] replaces it with one panel
//! per configured topic, rewriting identity, title, URL and layout position
//! while leaving every unrelated panel and display field untouched.

mod generator;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use generator::{generate_panels, shard_count, DashboardError};

/// Panel placement on the dashboard grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridPos {
    /// Panel height in grid rows.
    pub h: u32,
    /// Panel width in grid columns.
    pub w: u32,
    /// Horizontal offset.
    pub x: u32,
    /// Vertical offset; the generator stacks panels by this coordinate.
    pub y: u32,
}

/// One visualization tile.
///
/// Only the fields the generator rewrites are typed; everything else a
/// template carries is round-tripped verbatim through `extra`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Panel {
    /// Numeric panel id, unique within the dashboard.
    pub id: u64,
    /// Display title.
    pub title: String,
    /// Stream address this panel renders, when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Grid placement.
    #[serde(rename = "gridPos")]
    pub grid_pos: GridPos,
    /// All other display fields, copied verbatim from the template.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A dashboard document: the `panels` array plus whatever else it carries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dashboard {
    /// The panel collection the generator rewrites.
    #[serde(default)]
    pub panels: Vec<Panel>,
    /// Remaining document fields, persisted untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Host substitution and scheme policy applied to every generated URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressRewrite {
    /// Host the panel URLs should point at.
    pub host: String,
    /// Upgrade `http` to `https` (set outside development mode).
    pub https: bool,
}
