//! Raw vector features as delivered by the data-acquisition collaborator
//!
//! A [`Feature`] is an untyped record: a geometry plus a bag of provider
//! attributes. The attribute normalizer turns these into typed records.

use geo_types::Geometry;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Attribute value types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl AttributeValue {
    /// Numeric view of the value. Numeric strings are accepted because
    /// providers are inconsistent about quoting.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttributeValue::Int(v) => Some(*v as f64),
            AttributeValue::Float(v) => Some(*v),
            AttributeValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Textual view of the value. Numbers are rendered, nulls are `None`.
    pub fn as_text(&self) -> Option<String> {
        match self {
            AttributeValue::Null => None,
            AttributeValue::Bool(b) => Some(b.to_string()),
            AttributeValue::Int(v) => Some(v.to_string()),
            AttributeValue::Float(v) => Some(v.to_string()),
            AttributeValue::String(s) => Some(s.clone()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, AttributeValue::Null)
    }
}

impl From<&str> for AttributeValue {
    fn from(s: &str) -> Self {
        AttributeValue::String(s.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(s: String) -> Self {
        AttributeValue::String(s)
    }
}

impl From<i64> for AttributeValue {
    fn from(v: i64) -> Self {
        AttributeValue::Int(v)
    }
}

impl From<f64> for AttributeValue {
    fn from(v: f64) -> Self {
        AttributeValue::Float(v)
    }
}

/// A geographic feature with geometry and attributes
#[derive(Debug, Clone)]
pub struct Feature {
    /// Feature geometry
    pub geometry: Option<Geometry<f64>>,
    /// Feature attributes
    pub properties: HashMap<String, AttributeValue>,
    /// Optional feature ID
    pub id: Option<String>,
}

impl Feature {
    /// Create a new feature with geometry
    pub fn new(geometry: Geometry<f64>) -> Self {
        Self {
            geometry: Some(geometry),
            properties: HashMap::new(),
            id: None,
        }
    }

    /// Create a feature with no geometry
    pub fn empty() -> Self {
        Self {
            geometry: None,
            properties: HashMap::new(),
            id: None,
        }
    }

    /// Builder-style id setter
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Builder-style attribute setter
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.set_property(key, value.into());
        self
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
        Self { features: Vec::new() }
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
}

impl FromIterator<Feature> for FeatureCollection {
    fn from_iter<I: IntoIterator<Item = Feature>>(iter: I) -> Self {
        Self {
            features: iter.into_iter().collect(),
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

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::Point;

    #[test]
    fn test_attribute_numeric_views() {
        assert_eq!(AttributeValue::Int(3).as_f64(), Some(3.0));
        assert_eq!(AttributeValue::from(" 2.5 ").as_f64(), Some(2.5));
        assert_eq!(AttributeValue::from("n/a").as_f64(), None);
        assert_eq!(AttributeValue::Null.as_f64(), None);
    }

    #[test]
    fn test_attribute_text_views() {
        assert_eq!(AttributeValue::Int(2).as_text().as_deref(), Some("2"));
        assert_eq!(AttributeValue::Null.as_text(), None);
        assert!(AttributeValue::Null.is_null());
    }

    #[test]
    fn test_feature_builder() {
        let f = Feature::new(Geometry::Point(Point::new(1.0, 2.0)))
            .with_id("a")
            .with_property("status", "Designated");
        assert_eq!(f.id.as_deref(), Some("a"));
        assert_eq!(
            f.get_property("status"),
            Some(&AttributeValue::String("Designated".to_string()))
        );
    }

    #[test]
    fn test_collection_from_iter() {
        let fc: FeatureCollection = (0..3).map(|_| Feature::empty()).collect();
        assert_eq!(fc.len(), 3);
        assert!(!fc.is_empty());
    }
}
