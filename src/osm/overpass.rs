//! Overpass API client
//!
//! Fetches tagged nodes for an area from an Overpass interpreter. Responses
//! use the `[out:json]` format; only elements of type `node` are kept.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info, warn};

use super::{OsmNode, OsmStore, TagQuery};
use crate::error::OsmError;
use crate::geo::BoundingBox;

/// Public Overpass interpreter
pub const DEFAULT_ENDPOINT: &str = "https://overpass-api.de/api/interpreter";

#[derive(Debug, Deserialize)]
struct OverpassResponse {
    #[serde(default)]
    elements: Vec<OverpassElement>,
}

#[derive(Debug, Deserialize)]
struct OverpassElement {
    #[serde(rename = "type")]
    element_type: String,
    id: i64,
    lat: Option<f64>,
    lon: Option<f64>,
    #[serde(default)]
    tags: BTreeMap<String, String>,
}

/// HTTP client for an Overpass interpreter
#[derive(Clone)]
pub struct OverpassClient {
    http_client: reqwest::Client,
    endpoint: String,
    timeout_secs: u64,
}

impl OverpassClient {
    pub fn new(endpoint: impl Into<String>, timeout_secs: u64) -> Result<Self, OsmError> {
        let endpoint = endpoint.into();
        info!(endpoint = %endpoint, "Initializing Overpass client");

        Ok(Self {
            http_client: reqwest::Client::builder()
                .timeout(Duration::from_secs(timeout_secs + 5))
                .user_agent(concat!("veripeditus-server/", env!("CARGO_PKG_VERSION")))
                .build()?,
            endpoint,
            timeout_secs,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Build an Overpass QL query for nodes matching any of the tag queries
    pub fn build_query(bbox: &BoundingBox, queries: &[TagQuery], timeout_secs: u64) -> String {
        let area = format!(
            "({:.7},{:.7},{:.7},{:.7})",
            bbox.south, bbox.west, bbox.north, bbox.east
        );

        let mut query = format!("[out:json][timeout:{}];\n(\n", timeout_secs);
        for tag_query in queries {
            query.push_str(&format!("  node{}{};\n", tag_query.to_overpass(), area));
        }
        query.push_str(");\nout body;\n");
        query
    }

    /// Fetch all nodes in a box matching any of the tag queries
    pub async fn fetch(
        &self,
        bbox: &BoundingBox,
        queries: &[TagQuery],
    ) -> Result<Vec<OsmNode>, OsmError> {
        if queries.is_empty() {
            return Ok(Vec::new());
        }

        let query = Self::build_query(bbox, queries, self.timeout_secs);
        debug!(bbox = %bbox, queries = queries.len(), "Querying Overpass");

        let response = self
            .http_client
            .post(&self.endpoint)
            .body(query)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to call Overpass API");
                OsmError::Request(e)
            })?;

        if !response.status().is_success() {
            let status = response.status();
            warn!(status = %status, "Overpass API returned error");
            return Err(OsmError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        let nodes = parse_response(&body)?;
        debug!(bbox = %bbox, nodes = nodes.len(), "Overpass query finished");
        Ok(nodes)
    }
}

/// Parse an Overpass JSON document into nodes
pub fn parse_response(body: &str) -> Result<Vec<OsmNode>, OsmError> {
    let response: OverpassResponse =
        serde_json::from_str(body).map_err(|e| OsmError::MalformedResponse(e.to_string()))?;

    Ok(response
        .elements
        .into_iter()
        .filter(|element| element.element_type == "node")
        .filter_map(|element| match (element.lat, element.lon) {
            (Some(lat), Some(lon)) => Some(OsmNode {
                id: element.id,
                latitude: lat,
                longitude: lon,
                tags: element.tags,
            }),
            _ => None,
        })
        .collect())
}

/// Load a saved Overpass JSON file into the store
pub async fn import_file(store: &OsmStore, path: &Path) -> crate::error::Result<usize> {
    let body = tokio::fs::read_to_string(path).await?;
    let nodes = parse_response(&body)?;
    let added = store.insert_nodes(nodes);

    info!(path = %path.display(), added = added, "Imported OSM data file");
    Ok(added)
}
