use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use topojson::{to_geojson, TopoJson};

use crate::error::GeoError;

/// Latitude whose cosine scales longitude in the flat projection.
const REFERENCE_LATITUDE: f64 = 38.0;

/// Object holding state outlines in a us-atlas topology.
const STATES_OBJECT: &str = "states";

/// One closed ring in projected plane coordinates.
pub type Ring = Vec<[f64; 2]>;

/// State outlines keyed by FIPS code, already projected to the plane.
#[derive(Debug, Clone, Default)]
pub struct StateBoundaries {
    states: BTreeMap<u32, Vec<Ring>>,
}

// -- GeoJSON wire shapes --

#[derive(Deserialize)]
struct FeatureCollection {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Deserialize)]
struct Feature {
    #[serde(default)]
    id: Option<Value>,
    geometry: Option<Geometry>,
}

#[derive(Deserialize)]
#[serde(tag = "type")]
enum Geometry {
    Polygon { coordinates: Vec<Vec<Vec<f64>>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<Vec<f64>>>> },
    #[serde(other)]
    Unsupported,
}

fn fips_of(id: &Value) -> Option<u32> {
    match id {
        Value::Number(n) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Flat projection: longitude scaled by cos(reference latitude).
pub fn project(lon: f64, lat: f64) -> [f64; 2] {
    [lon * REFERENCE_LATITUDE.to_radians().cos(), lat]
}

fn project_ring(ring: &[Vec<f64>]) -> Ring {
    ring.iter()
        .filter(|p| p.len() >= 2)
        .map(|p| project(p[0], p[1]))
        .collect()
}

/// Convert a TopoJSON document to a GeoJSON FeatureCollection value.
/// Reads the `states` object, or the first object when there is none by that name.
fn topology_features(payload: &str) -> Result<Value, GeoError> {
    let topology = match payload.parse::<TopoJson>() {
        Ok(TopoJson::Topology(topology)) => topology,
        Ok(TopoJson::Geometry(_)) => {
            return Err(GeoError::NotAFeatureCollection("Geometry".to_string()))
        }
        Err(err) => return Err(GeoError::Topology(err.to_string())),
    };
    let key = topology
        .objects
        .iter()
        .find(|object| object.name == STATES_OBJECT)
        .or_else(|| topology.objects.first())
        .map(|object| object.name.clone())
        .ok_or(GeoError::NoStates)?;
    log::debug!("converting topology object {key:?}");
    let collection =
        to_geojson(&topology, &key).map_err(|err| GeoError::Topology(err.to_string()))?;
    Ok(serde_json::to_value(&collection)?)
}

impl StateBoundaries {
    /// Parse state outlines from either a TopoJSON topology (us-atlas layout)
    /// or a GeoJSON FeatureCollection. Feature ids are state FIPS codes.
    pub fn from_json_str(payload: &str) -> Result<Self, GeoError> {
        let document: Value = serde_json::from_str(payload)?;
        let document = match document.get("type").and_then(Value::as_str) {
            Some("Topology") => topology_features(payload)?,
            _ => document,
        };
        Self::from_feature_collection(document)
    }

    /// Only outer rings of (Multi)Polygons are kept.
    fn from_feature_collection(document: Value) -> Result<Self, GeoError> {
        let collection: FeatureCollection = serde_json::from_value(document)?;
        if collection.kind != "FeatureCollection" {
            return Err(GeoError::NotAFeatureCollection(collection.kind));
        }

        let mut states: BTreeMap<u32, Vec<Ring>> = BTreeMap::new();
        for (i, feature) in collection.features.into_iter().enumerate() {
            let Some(fips) = feature.id.as_ref().and_then(fips_of) else {
                log::warn!("feature {i} has no numeric id, skipped");
                continue;
            };
            let rings: Vec<Ring> = match feature.geometry {
                Some(Geometry::Polygon { coordinates }) => {
                    coordinates.first().map(|r| project_ring(r)).into_iter().collect()
                }
                Some(Geometry::MultiPolygon { coordinates }) => coordinates
                    .iter()
                    .filter_map(|poly| poly.first().map(|r| project_ring(r)))
                    .collect(),
                Some(Geometry::Unsupported) | None => {
                    log::warn!("feature {i} (FIPS {fips}) has no polygon geometry, skipped");
                    continue;
                }
            };
            states.entry(fips).or_default().extend(rings);
        }

        if states.is_empty() {
            return Err(GeoError::NoStates);
        }
        Ok(Self { states })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let boundaries = Self::from_json_str(&text)
            .with_context(|| format!("parsing {}", path.display()))?;
        log::info!("Loaded {} state outlines from {}", boundaries.len(), path.display());
        Ok(boundaries)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// `(fips, rings)` for every state.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &[Ring])> {
        self.states.iter().map(|(fips, rings)| (*fips, rings.as_slice()))
    }

    /// The state whose outline contains the projected point, if any.
    pub fn state_at(&self, point: [f64; 2]) -> Option<u32> {
        self.states
            .iter()
            .find(|(_, rings)| rings.iter().any(|ring| ring_contains(ring, point)))
            .map(|(fips, _)| *fips)
    }
}

/// Even-odd ray casting test.
fn ring_contains(ring: &[[f64; 2]], [x, y]: [f64; 2]) -> bool {
    let mut inside = false;
    let mut j = ring.len().wrapping_sub(1);
    for i in 0..ring.len() {
        let [xi, yi] = ring[i];
        let [xj, yj] = ring[j];
        if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}
