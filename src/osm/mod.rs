//! OpenStreetMap data
//!
//! This module keeps the map features used for spawning:
//! - `OsmNode` rows with their tags
//! - `TagQuery` filters parsed from compact strings like `amenity=pub|bar`
//! - `OsmStore` holding nodes and the areas they were fetched for
//!
//! Nodes reach the store either from the Overpass API (see [`overpass`]) or
//! from a saved Overpass JSON file imported at startup.

pub mod overpass;

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::OsmError;
use crate::geo::{BoundingBox, LatLon};

/// A tagged map node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OsmNode {
    pub id: i64,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

impl OsmNode {
    pub fn position(&self) -> LatLon {
        LatLon::raw(self.latitude, self.longitude)
    }

    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }
}

/// One condition of a tag query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagCondition {
    /// `key=value`
    Equals(String, String),
    /// `key=v1|v2`
    OneOf(String, Vec<String>),
    /// `key!=value`
    NotEquals(String, String),
    /// `key`
    Exists(String),
    /// `!key`
    Absent(String),
}

impl TagCondition {
    fn parse(s: &str) -> Result<Self, OsmError> {
        let invalid = || OsmError::InvalidTagQuery(s.to_string());

        if let Some(key) = s.strip_prefix('!') {
            let key = key.trim();
            if key.is_empty() || key.contains('=') {
                return Err(invalid());
            }
            return Ok(TagCondition::Absent(key.to_string()));
        }

        if let Some((key, value)) = s.split_once("!=") {
            let (key, value) = (key.trim(), value.trim());
            if key.is_empty() || value.is_empty() {
                return Err(invalid());
            }
            return Ok(TagCondition::NotEquals(key.to_string(), value.to_string()));
        }

        if let Some((key, value)) = s.split_once('=') {
            let key = key.trim();
            let values: Vec<String> = value.split('|').map(|v| v.trim().to_string()).collect();
            if key.is_empty() || values.iter().any(String::is_empty) {
                return Err(invalid());
            }
            return Ok(match values.len() {
                1 => TagCondition::Equals(key.to_string(), values.into_iter().collect()),
                _ => TagCondition::OneOf(key.to_string(), values),
            });
        }

        let key = s.trim();
        if key.is_empty() {
            return Err(invalid());
        }
        Ok(TagCondition::Exists(key.to_string()))
    }

    pub fn matches(&self, node: &OsmNode) -> bool {
        match self {
            TagCondition::Equals(key, value) => node.tag(key) == Some(value.as_str()),
            TagCondition::OneOf(key, values) => node
                .tag(key)
                .map(|v| values.iter().any(|value| value == v))
                .unwrap_or(false),
            TagCondition::NotEquals(key, value) => node.tag(key) != Some(value.as_str()),
            TagCondition::Exists(key) => node.tags.contains_key(key),
            TagCondition::Absent(key) => !node.tags.contains_key(key),
        }
    }

    /// Overpass QL filter for this condition
    pub fn to_overpass(&self) -> String {
        match self {
            TagCondition::Equals(key, value) => {
                format!("[\"{}\"=\"{}\"]", escape(key), escape(value))
            }
            TagCondition::OneOf(key, values) => {
                let alternatives: Vec<String> = values.iter().map(|v| regex::escape(v)).collect();
                format!(
                    "[\"{}\"~\"^({})$\"]",
                    escape(key),
                    escape(&alternatives.join("|"))
                )
            }
            TagCondition::NotEquals(key, value) => {
                format!("[\"{}\"!=\"{}\"]", escape(key), escape(value))
            }
            TagCondition::Exists(key) => format!("[\"{}\"]", escape(key)),
            TagCondition::Absent(key) => format!("[!\"{}\"]", escape(key)),
        }
    }
}

impl fmt::Display for TagCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagCondition::Equals(key, value) => write!(f, "{}={}", key, value),
            TagCondition::OneOf(key, values) => write!(f, "{}={}", key, values.join("|")),
            TagCondition::NotEquals(key, value) => write!(f, "{}!={}", key, value),
            TagCondition::Exists(key) => write!(f, "{}", key),
            TagCondition::Absent(key) => write!(f, "!{}", key),
        }
    }
}

/// Escape a string for a quoted Overpass QL literal
fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Conjunction of tag conditions, written as `cond;cond;...`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagQuery {
    conditions: Vec<TagCondition>,
}

impl TagQuery {
    pub fn parse(s: &str) -> Result<Self, OsmError> {
        let conditions = s
            .split(';')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(TagCondition::parse)
            .collect::<Result<Vec<_>, _>>()?;

        if conditions.is_empty() {
            return Err(OsmError::InvalidTagQuery(s.to_string()));
        }
        Ok(Self { conditions })
    }

    /// Query with a single `key=value` condition
    pub fn equals(key: &str, value: &str) -> Self {
        Self {
            conditions: vec![TagCondition::Equals(key.to_string(), value.to_string())],
        }
    }

    /// Query with a single `key=v1|v2|...` condition
    pub fn one_of(key: &str, values: &[&str]) -> Self {
        Self {
            conditions: vec![TagCondition::OneOf(
                key.to_string(),
                values.iter().map(|v| v.to_string()).collect(),
            )],
        }
    }

    /// Add another condition
    pub fn and(mut self, condition: TagCondition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn conditions(&self) -> &[TagCondition] {
        &self.conditions
    }

    /// Check whether a node satisfies every condition
    pub fn matches(&self, node: &OsmNode) -> bool {
        self.conditions.iter().all(|c| c.matches(node))
    }

    /// Overpass QL filter chain, e.g. `["amenity"="pub"]["name"]`
    pub fn to_overpass(&self) -> String {
        self.conditions.iter().map(TagCondition::to_overpass).collect()
    }
}

impl FromStr for TagQuery {
    type Err = OsmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for TagQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, condition) in self.conditions.iter().enumerate() {
            if i > 0 {
                f.write_str(";")?;
            }
            write!(f, "{}", condition)?;
        }
        Ok(())
    }
}

/// Map nodes known to the server
#[derive(Default)]
pub struct OsmStore {
    nodes: RwLock<HashMap<i64, OsmNode>>,
    covered: RwLock<Vec<BoundingBox>>,
    /// Areas whose last fetch failed, with the time of the failure
    failed: RwLock<Vec<(BoundingBox, Instant)>>,
}

impl OsmStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace nodes, returning how many were new
    pub fn insert_nodes(&self, nodes: impl IntoIterator<Item = OsmNode>) -> usize {
        let mut table = self.nodes.write();
        let mut added = 0;
        for node in nodes {
            if table.insert(node.id, node).is_none() {
                added += 1;
            }
        }
        debug!(added = added, total = table.len(), "OSM nodes inserted");
        added
    }

    pub fn node(&self, id: i64) -> Option<OsmNode> {
        self.nodes.read().get(&id).cloned()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.read().len()
    }

    /// Nodes inside a box matching a query, ordered by id
    pub fn query(&self, bbox: &BoundingBox, query: &TagQuery) -> Vec<OsmNode> {
        let mut found: Vec<OsmNode> = self
            .nodes
            .read()
            .values()
            .filter(|node| bbox.contains(&node.position()) && query.matches(node))
            .cloned()
            .collect();
        found.sort_by_key(|node| node.id);
        found
    }

    /// Nodes within a radius matching a query, ordered by id
    pub fn query_radius(&self, center: &LatLon, radius_m: f64, query: &TagQuery) -> Vec<OsmNode> {
        let bbox = BoundingBox::around(center, radius_m);
        self.query(&bbox, query)
            .into_iter()
            .filter(|node| center.distance_to(&node.position()) <= radius_m)
            .collect()
    }

    /// Whether data for a box has already been fetched
    pub fn is_covered(&self, bbox: &BoundingBox) -> bool {
        self.covered.read().iter().any(|area| area.covers(bbox))
    }

    pub fn mark_covered(&self, bbox: BoundingBox) {
        self.failed.write().retain(|(area, _)| !bbox.covers(area));
        self.covered.write().push(bbox);
    }

    /// Remember that fetching a box failed just now
    pub fn mark_failed(&self, bbox: BoundingBox) {
        let mut failed = self.failed.write();
        failed.retain(|(area, _)| !bbox.covers(area));
        failed.push((bbox, Instant::now()));
    }

    /// Whether a fetch for a box failed less than `within` ago
    pub fn recently_failed(&self, bbox: &BoundingBox, within: Duration) -> bool {
        self.failed
            .read()
            .iter()
            .any(|(area, at)| area.covers(bbox) && at.elapsed() < within)
    }
}
