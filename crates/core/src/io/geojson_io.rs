//! GeoJSON reading and writing
//!
//! Input is a FeatureCollection (or a single Feature). Feature properties
//! become [`AttributeValue`]s untouched; interpreting them is the
//! normalizer's job. Output features carry the typed attributes with
//! unknowns written as JSON `null`.

use crate::audit::AuditLog;
use crate::error::{Error, Result};
use crate::record::ProtectedArea;
use crate::vector::{AttributeValue, Feature, FeatureCollection};
use geo_types::MultiPolygon;
use geojson::{feature::Id, GeoJson, JsonObject, JsonValue};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Read a GeoJSON file into raw features
pub fn read_features<P: AsRef<Path>>(path: P) -> Result<FeatureCollection> {
    let text = fs::read_to_string(path.as_ref())?;
    parse_features(&text)
}

/// Parse GeoJSON text into raw features
pub fn parse_features(text: &str) -> Result<FeatureCollection> {
    let geojson: GeoJson = text.parse()?;
    let features = match geojson {
        GeoJson::FeatureCollection(fc) => fc.features,
        GeoJson::Feature(f) => vec![f],
        GeoJson::Geometry(_) => {
            return Err(Error::GeoJson(
                "expected a Feature or FeatureCollection, found a bare Geometry".to_string(),
            ))
        }
    };

    features.into_iter().map(convert_feature).collect()
}

fn convert_feature(feature: geojson::Feature) -> Result<Feature> {
    let geometry = match feature.geometry {
        Some(g) => Some(geo_types::Geometry::<f64>::try_from(g)?),
        None => None,
    };

    let id = feature.id.map(|id| match id {
        Id::String(s) => s,
        Id::Number(n) => n.to_string(),
    });

    let properties: HashMap<String, AttributeValue> = feature
        .properties
        .unwrap_or_default()
        .into_iter()
        .map(|(k, v)| (k, attribute_from_json(v)))
        .collect();

    Ok(Feature {
        geometry,
        properties,
        id,
    })
}

fn attribute_from_json(value: JsonValue) -> AttributeValue {
    match value {
        JsonValue::Null => AttributeValue::Null,
        JsonValue::Bool(b) => AttributeValue::Bool(b),
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => AttributeValue::Int(i),
            None => AttributeValue::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        JsonValue::String(s) => AttributeValue::String(s),
        other => AttributeValue::String(other.to_string()),
    }
}

fn record_properties(record: &ProtectedArea) -> JsonObject {
    let a = &record.attributes;
    let mut props = JsonObject::new();
    props.insert("id".into(), JsonValue::from(a.id.clone()));
    props.insert("name".into(), JsonValue::from(a.name.clone()));
    props.insert("status".into(), JsonValue::from(a.status.as_str()));
    props.insert(
        "designation_kind".into(),
        JsonValue::from(a.designation_kind.as_str()),
    );
    props.insert(
        "management_category".into(),
        JsonValue::from(a.management_category.map(|c| c.as_str())),
    );
    props.insert("realm".into(), JsonValue::from(a.realm.as_str()));
    props.insert("reported_area_km2".into(), JsonValue::from(a.reported_area_km2));
    props.insert("established_year".into(), JsonValue::from(a.established_year));
    props.insert("region".into(), JsonValue::from(a.region.clone()));
    props.insert(
        "computed_area_km2".into(),
        JsonValue::from(record.computed_area_km2),
    );
    props
}

/// Convert cleaned records into a GeoJSON FeatureCollection
pub fn records_to_geojson(records: &[ProtectedArea]) -> geojson::FeatureCollection {
    let features = records
        .iter()
        .map(|record| geojson::Feature {
            bbox: None,
            geometry: Some(geojson::Geometry::new(geojson::Value::from(&record.geometry))),
            id: Some(Id::String(record.attributes.id.clone())),
            properties: Some(record_properties(record)),
            foreign_members: None,
        })
        .collect();

    geojson::FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

/// Write cleaned records as a GeoJSON FeatureCollection
pub fn write_records<P: AsRef<Path>>(records: &[ProtectedArea], path: P) -> Result<()> {
    let fc = records_to_geojson(records);
    fs::write(path.as_ref(), GeoJson::FeatureCollection(fc).to_string())?;
    Ok(())
}

/// Write a single unattributed geometry (the dissolver's output)
pub fn write_geometry<P: AsRef<Path>>(
    geometry: &MultiPolygon<f64>,
    area_km2: f64,
    path: P,
) -> Result<()> {
    let mut props = JsonObject::new();
    props.insert("area_km2".into(), JsonValue::from(area_km2));
    let feature = geojson::Feature {
        bbox: None,
        geometry: Some(geojson::Geometry::new(geojson::Value::from(geometry))),
        id: None,
        properties: Some(props),
        foreign_members: None,
    };
    let fc = geojson::FeatureCollection {
        bbox: None,
        features: vec![feature],
        foreign_members: None,
    };
    fs::write(path.as_ref(), GeoJson::FeatureCollection(fc).to_string())?;
    Ok(())
}

/// Write the audit log and its summary as pretty JSON
pub fn write_audit<P: AsRef<Path>>(audit: &AuditLog, path: P) -> Result<()> {
    let doc = serde_json::json!({
        "summary": audit.summary(),
        "entries": audit.entries(),
    });
    fs::write(path.as_ref(), serde_json::to_string_pretty(&doc)?)?;
    Ok(())
}
