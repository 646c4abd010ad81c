//! Vector features and GeoJSON output

use geo_types::Geometry;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::error::{Error, Result};

/// Attribute value types
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AttributeValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl AttributeValue {
    fn to_json(&self) -> serde_json::Value {
        match self {
            AttributeValue::Null => serde_json::Value::Null,
            AttributeValue::Bool(b) => serde_json::Value::Bool(*b),
            AttributeValue::Int(i) => serde_json::Value::from(*i),
            AttributeValue::Float(f) => serde_json::Value::from(*f),
            AttributeValue::String(s) => serde_json::Value::from(s.clone()),
        }
    }
}

/// A geographic feature with geometry and attributes
#[derive(Debug, Clone)]
pub struct Feature {
    /// Feature geometry
    pub geometry: Option<Geometry<f64>>,
    /// Feature attributes, ordered by key for stable output
    pub properties: BTreeMap<String, AttributeValue>,
    /// Optional feature ID
    pub id: Option<String>,
}

impl Feature {
    /// Create a new feature with geometry
    pub fn new(geometry: Geometry<f64>) -> Self {
        Self {
            geometry: Some(geometry),
            properties: BTreeMap::new(),
            id: None,
        }
    }

    /// Create a feature with no geometry
    pub fn empty() -> Self {
        Self {
            geometry: None,
            properties: BTreeMap::new(),
            id: None,
        }
    }

    /// Set an attribute
    pub fn set_property(&mut self, key: impl Into<String>, value: AttributeValue) {
        self.properties.insert(key.into(), value);
    }

    /// Get an attribute
    pub fn get_property(&self, key: &str) -> Option<&AttributeValue> {
        self.properties.get(key)
    }
}

/// Collection of features
#[derive(Debug, Clone, Default)]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new() -> Self {
        Self {
            features: Vec::new(),
        }
    }

    pub fn push(&mut self, feature: Feature) {
        self.features.push(feature);
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Feature> {
        self.features.iter()
    }

    /// Serialize as a GeoJSON FeatureCollection
    pub fn to_geojson(&self) -> geojson::FeatureCollection {
        let features = self
            .features
            .iter()
            .map(|f| {
                let geometry = f
                    .geometry
                    .as_ref()
                    .map(|g| geojson::Geometry::new(geojson::Value::from(g)));

                let mut properties = serde_json::Map::new();
                for (key, value) in &f.properties {
                    properties.insert(key.clone(), value.to_json());
                }

                geojson::Feature {
                    bbox: None,
                    geometry,
                    id: f
                        .id
                        .clone()
                        .map(|s| geojson::feature::Id::String(s)),
                    properties: Some(properties),
                    foreign_members: None,
                }
            })
            .collect();

        geojson::FeatureCollection {
            bbox: None,
            features,
            foreign_members: None,
        }
    }
}

impl IntoIterator for FeatureCollection {
    type Item = Feature;
    type IntoIter = std::vec::IntoIter<Feature>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.into_iter()
    }
}

/// Write a feature collection to a GeoJSON file
pub fn write_geojson<P: AsRef<Path>>(collection: &FeatureCollection, path: P) -> Result<()> {
    let geojson = geojson::GeoJson::FeatureCollection(collection.to_geojson());
    let mut file = File::create(path.as_ref())?;
    let text = geojson.to_string();
    file.write_all(text.as_bytes())?;
    Ok(())
}

/// Read a feature collection's raw GeoJSON back (for inspection/testing)
pub fn read_geojson<P: AsRef<Path>>(path: P) -> Result<geojson::GeoJson> {
    let text = std::fs::read_to_string(path.as_ref())?;
    text.parse::<geojson::GeoJson>()
        .map_err(|e| Error::Other(format!("GeoJSON parse error: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{point, polygon};

    #[test]
    fn test_feature_properties() {
        let mut feature = Feature::new(point!(x: 34.5, y: -0.1).into());
        feature.set_property("name", AttributeValue::String("site_01".into()));
        feature.set_property("area_ha", AttributeValue::Float(1.5));

        match feature.get_property("name") {
            Some(AttributeValue::String(s)) => assert_eq!(s, "site_01"),
            other => panic!("unexpected property: {:?}", other),
        }
    }

    #[test]
    fn test_geojson_roundtrip() {
        let poly = polygon![
            (x: 0.0, y: 0.0),
            (x: 1.0, y: 0.0),
            (x: 1.0, y: 1.0),
            (x: 0.0, y: 0.0),
        ];
        let mut feature = Feature::new(poly.into());
        feature.set_property("id", AttributeValue::Int(7));

        let mut collection = FeatureCollection::new();
        collection.push(feature);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("buffers.geojson");
        write_geojson(&collection, &path).unwrap();

        match read_geojson(&path).unwrap() {
            geojson::GeoJson::FeatureCollection(fc) => {
                assert_eq!(fc.features.len(), 1);
                let props = fc.features[0].properties.as_ref().unwrap();
                assert_eq!(props["id"], serde_json::json!(7));
            }
            other => panic!("expected FeatureCollection, got {:?}", other),
        }
    }
}
