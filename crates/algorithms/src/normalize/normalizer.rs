//! Attribute normalizer
//!
//! Turns raw provider features into typed records. Sentinel codes become
//! `None`, records outside the retained statuses or with excluded
//! designation kinds are removed, and zero-area placeholders are dropped.
//! Geometry passes through untouched.

use geo::{Area, Geometry};
use paclean_core::{
    Algorithm, AttributeValue, Attributes, AuditEntry, DesignationKind, Error, Feature,
    FeatureCollection, Issue, ManagementCategory, NormalizedRecord, Realm, Result, Stage, Staged,
    Status,
};
use serde::{Deserialize, Serialize};

use super::fields;
use super::SentinelCodes;
use crate::maybe_rayon::*;
use crate::stage::{collect_outcomes, Outcome};

const YEARS: std::ops::RangeInclusive<i64> = 1000..=9999;

/// Parameters for attribute normalization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeParams {
    /// Statuses kept; every other status is excluded
    pub retain_status: Vec<Status>,
    /// Designation kinds without a persistent spatial footprint
    pub exclude_designations: Vec<DesignationKind>,
    pub sentinels: SentinelCodes,
    /// Drop point records whose reported area is exactly zero
    pub exclude_zero_area_points: bool,
    /// Realm assumed when a record carries none. `None` drops such records.
    pub default_realm: Option<Realm>,
}

impl Default for NormalizeParams {
    fn default() -> Self {
        Self {
            retain_status: vec![Status::Designated, Status::Inscribed, Status::Established],
            exclude_designations: vec![DesignationKind::BiosphereReserve],
            sentinels: SentinelCodes::default(),
            exclude_zero_area_points: true,
            default_realm: None,
        }
    }
}

/// Attribute normalizer algorithm
#[derive(Debug, Clone, Default)]
pub struct AttributeNormalizer;

impl Algorithm for AttributeNormalizer {
    type Input = FeatureCollection;
    type Output = Staged<NormalizedRecord>;
    type Params = NormalizeParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "AttributeNormalizer"
    }

    fn description(&self) -> &'static str {
        "Replace provider sentinel codes with unknowns and filter records by status and designation"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        Ok(normalize(input, &params))
    }
}

/// Normalize raw features into typed records.
///
/// # Arguments
/// * `features` - Raw features in input order
/// * `params` - Retained statuses, excluded designations and sentinel codes
///
/// # Returns
/// Retained records in input order, plus one audit entry per drop and per
/// sentinel replacement
pub fn normalize(features: FeatureCollection, params: &NormalizeParams) -> Staged<NormalizedRecord> {
    let outcomes: Vec<_> = features
        .features
        .into_par_iter()
        .enumerate()
        .map(|(index, feature)| normalize_feature(index, feature, params))
        .collect();

    let staged = collect_outcomes(outcomes);
    tracing::info!(
        "normalize: {} records kept, {} audit entries",
        staged.records.len(),
        staged.audit.len()
    );
    staged
}

fn record_id(index: usize, feature: &Feature) -> String {
    feature
        .id
        .clone()
        .filter(|id| !id.trim().is_empty())
        .or_else(|| {
            feature
                .get_property(fields::ID)
                .and_then(AttributeValue::as_text)
                .filter(|id| !id.trim().is_empty())
        })
        .unwrap_or_else(|| format!("#{index}"))
}

fn normalize_feature(index: usize, feature: Feature, params: &NormalizeParams) -> Outcome<NormalizedRecord> {
    let id = record_id(index, &feature);
    let mut reader = FieldReader {
        feature: &feature,
        sentinels: &params.sentinels,
        notes: Vec::new(),
        id: &id,
    };

    let attributes = match read_attributes(&mut reader, params) {
        Ok(attributes) => attributes,
        Err(issue) => return Outcome::Dropped(AuditEntry::new(id.as_str(), Stage::Normalize, issue)),
    };
    let notes = reader.notes;

    let geometry = match feature.geometry {
        Some(geometry) if !is_placeholder(&geometry) => geometry,
        _ => {
            return Outcome::Dropped(AuditEntry::new(id, Stage::Normalize, Issue::ZeroAreaPlaceholder));
        }
    };
    let is_point = matches!(geometry, Geometry::Point(_) | Geometry::MultiPoint(_));
    if is_point && params.exclude_zero_area_points && attributes.reported_area_km2 == Some(0.0) {
        return Outcome::Dropped(AuditEntry::new(id, Stage::Normalize, Issue::ZeroAreaPlaceholder));
    }

    Outcome::Kept(NormalizedRecord::new(attributes, geometry), notes)
}

fn read_attributes(reader: &mut FieldReader<'_>, params: &NormalizeParams) -> std::result::Result<Attributes, Issue> {
    let status = reader
        .category(fields::STATUS, Status::parse)?
        .unwrap_or(Status::NotReported);
    if !params.retain_status.contains(&status) {
        return Err(Issue::UnsupportedStatusExclusion {
            status: status.to_string(),
        });
    }

    let designation_kind = reader
        .category(fields::DESIGNATION_KIND, DesignationKind::parse)?
        .unwrap_or(DesignationKind::NotApplicable);
    if params.exclude_designations.contains(&designation_kind) {
        return Err(Issue::ExcludedDesignation {
            kind: designation_kind.to_string(),
        });
    }

    let realm = match reader.category(fields::REALM, Realm::parse)? {
        Some(realm) => realm,
        None => params.default_realm.ok_or_else(|| Issue::UnrecognisedAttribute {
            field: fields::REALM.to_string(),
            value: "missing".to_string(),
        })?,
    };

    let management_category = reader.category(fields::MANAGEMENT_CATEGORY, ManagementCategory::parse)?;

    Ok(Attributes {
        id: reader.id.to_string(),
        name: reader.text(fields::NAME),
        status,
        designation_kind,
        management_category,
        realm,
        reported_area_km2: reader.reported_area(),
        established_year: reader.established_year(),
        region: reader.text(fields::REGION),
    })
}

/// Whether a geometry is a placeholder with nothing to measure
fn is_placeholder(geometry: &Geometry<f64>) -> bool {
    match geometry {
        Geometry::Polygon(_) | Geometry::MultiPolygon(_) | Geometry::Rect(_) | Geometry::Triangle(_) => {
            geometry.unsigned_area() == 0.0
        }
        Geometry::MultiPoint(mp) => mp.0.is_empty(),
        Geometry::LineString(ls) => ls.0.is_empty(),
        Geometry::MultiLineString(mls) => mls.0.is_empty(),
        Geometry::GeometryCollection(gc) => gc.0.is_empty(),
        Geometry::Point(_) | Geometry::Line(_) => false,
    }
}

/// Reads attributes of one feature and collects sentinel notes
struct FieldReader<'a> {
    feature: &'a Feature,
    sentinels: &'a SentinelCodes,
    notes: Vec<AuditEntry>,
    id: &'a str,
}

impl FieldReader<'_> {
    fn raw(&self, field: &str) -> Option<&AttributeValue> {
        self.feature.get_property(field).filter(|v| !v.is_null())
    }

    fn note(&mut self, field: &str, value: String) {
        self.notes.push(AuditEntry::new(
            self.id,
            Stage::Normalize,
            Issue::SentinelNormalizationSkip {
                field: field.to_string(),
                value,
            },
        ));
    }

    /// Text value, `None` when absent or a sentinel
    fn text(&mut self, field: &str) -> Option<String> {
        let text = self.raw(field).and_then(AttributeValue::as_text)?;
        if self.sentinels.is_text(&text) {
            self.note(field, text);
            return None;
        }
        Some(text.trim().to_string())
    }

    /// Closed-enum value. Unparsable text is an error.
    fn category<T>(&mut self, field: &str, parse: fn(&str) -> Option<T>) -> std::result::Result<Option<T>, Issue> {
        match self.text(field) {
            None => Ok(None),
            Some(text) => parse(&text).map(Some).ok_or(Issue::UnrecognisedAttribute {
                field: field.to_string(),
                value: text,
            }),
        }
    }

    fn reported_area(&mut self) -> Option<f64> {
        let value = self.raw(fields::REPORTED_AREA)?.clone();
        match value.as_f64() {
            Some(area) if area.is_finite() && area >= 0.0 && !self.sentinels.is_area(area) => Some(area),
            _ => {
                self.note(fields::REPORTED_AREA, display(&value));
                None
            }
        }
    }

    fn established_year(&mut self) -> Option<u16> {
        let value = self.raw(fields::ESTABLISHED_YEAR)?.clone();
        let year = value
            .as_f64()
            .filter(|y| y.fract() == 0.0)
            .map(|y| y as i64)
            .filter(|y| YEARS.contains(y) && !self.sentinels.is_year(*y));
        match year {
            Some(y) => u16::try_from(y).ok(),
            None => {
                self.note(fields::ESTABLISHED_YEAR, display(&value));
                None
            }
        }
    }
}

fn display(value: &AttributeValue) -> String {
    value.as_text().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{point, polygon, LineString, MultiPolygon};

    fn square() -> Geometry<f64> {
        Geometry::Polygon(polygon![
            (x: 0.0, y: 0.0),
            (x: 1.0, y: 0.0),
            (x: 1.0, y: 1.0),
            (x: 0.0, y: 1.0),
        ])
    }

    fn feature(id: &str) -> Feature {
        Feature::new(square())
            .with_id(id)
            .with_property("status", "Designated")
            .with_property("designation_kind", "National")
            .with_property("realm", "terrestrial")
    }

    fn run(features: Vec<Feature>) -> Staged<NormalizedRecord> {
        normalize(features.into_iter().collect(), &NormalizeParams::default())
    }

    #[test]
    fn test_year_sentinel_becomes_unknown() {
        let out = run(vec![feature("a").with_property("established_year", 0i64)]);
        assert_eq!(out.records.len(), 1);
        assert_eq!(out.records[0].attributes.established_year, None);

        let notes: Vec<_> = out.audit.for_record("a").collect();
        assert_eq!(notes.len(), 1);
        assert!(!notes[0].issue.is_drop());
    }

    #[test]
    fn test_valid_attributes() {
        let out = run(vec![feature("a")
            .with_property("established_year", 1972i64)
            .with_property("reported_area_km2", 12.5)
            .with_property("management_category", "II")
            .with_property("name", "Lake Park")
            .with_property("region", "CHL")]);
        let attrs = &out.records[0].attributes;
        assert_eq!(attrs.established_year, Some(1972));
        assert_eq!(attrs.reported_area_km2, Some(12.5));
        assert_eq!(attrs.management_category, Some(ManagementCategory::II));
        assert_eq!(attrs.name.as_deref(), Some("Lake Park"));
        assert_eq!(attrs.region.as_deref(), Some("CHL"));
        assert!(out.audit.is_empty());
    }

    #[test]
    fn test_status_filter() {
        let out = run(vec![
            feature("kept"),
            feature("proposed").with_property("status", "Proposed"),
            feature("unreported").with_property("status", "Not Reported"),
        ]);
        assert_eq!(out.records.len(), 1);
        assert_eq!(out.records[0].id(), "kept");
        assert_eq!(out.audit.summary().count(Stage::Normalize, "UnsupportedStatusExclusion"), 2);
    }

    #[test]
    fn test_biosphere_reserve_excluded() {
        let out = run(vec![feature("mab").with_property("designation_kind", "UNESCO-MAB Biosphere Reserve")]);
        assert!(out.records.is_empty());
        assert!(matches!(out.audit.entries()[0].issue, Issue::ExcludedDesignation { .. }));
    }

    #[test]
    fn test_unrecognised_category_dropped() {
        let out = run(vec![
            feature("a").with_property("management_category", "VIII"),
            feature("b").with_property("realm", "lunar"),
        ]);
        assert!(out.records.is_empty());
        assert!(out
            .audit
            .entries()
            .iter()
            .all(|e| matches!(e.issue, Issue::UnrecognisedAttribute { .. })));
    }

    #[test]
    fn test_category_sentinel() {
        let out = run(vec![feature("a").with_property("management_category", "Not Reported")]);
        assert_eq!(out.records.len(), 1);
        assert_eq!(out.records[0].attributes.management_category, None);
        assert_eq!(out.audit.len(), 1);
    }

    #[test]
    fn test_numeric_realm_code() {
        let out = run(vec![feature("a").with_property("realm", 2i64)]);
        assert_eq!(out.records[0].attributes.realm, Realm::Marine);
    }

    #[test]
    fn test_negative_area_unknown() {
        let out = run(vec![feature("a").with_property("reported_area_km2", -1.0)]);
        assert_eq!(out.records[0].attributes.reported_area_km2, None);
        assert_eq!(out.audit.summary().informational, 1);
    }

    #[test]
    fn test_zero_area_placeholders() {
        let mut no_geometry = feature("none");
        no_geometry.geometry = None;

        let mut flat = feature("flat");
        flat.geometry = Some(Geometry::Polygon(polygon![
            (x: 0.0, y: 0.0),
            (x: 1.0, y: 0.0),
            (x: 2.0, y: 0.0),
        ]));

        let mut empty = feature("empty");
        empty.geometry = Some(Geometry::MultiPolygon(MultiPolygon::new(vec![])));

        let mut zero_point = feature("zero-point").with_property("reported_area_km2", 0.0);
        zero_point.geometry = Some(Geometry::Point(point!(x: 1.0, y: 1.0)));

        let out = run(vec![no_geometry, flat, empty, zero_point, feature("ok")]);
        assert_eq!(out.records.len(), 1);
        assert_eq!(out.audit.summary().count(Stage::Normalize, "ZeroAreaPlaceholder"), 4);
    }

    #[test]
    fn test_lines_pass_through() {
        let mut line = feature("line");
        line.geometry = Some(Geometry::LineString(LineString::from(vec![(0.0, 0.0), (1.0, 1.0)])));
        let out = run(vec![line]);
        // rejected later by the point expander
        assert_eq!(out.records.len(), 1);
    }

    #[test]
    fn test_ids() {
        let mut anonymous = feature("x");
        anonymous.id = None;
        let mut from_property = feature("y").with_property("id", 555_123i64);
        from_property.id = None;

        let out = run(vec![anonymous, from_property]);
        assert_eq!(out.records[0].id(), "#0");
        assert_eq!(out.records[1].id(), "555123");
    }

    #[test]
    fn test_missing_realm() {
        let mut f = feature("a");
        f.properties.remove("realm");

        let out = run(vec![f.clone()]);
        assert!(out.records.is_empty());

        let params = NormalizeParams {
            default_realm: Some(Realm::Terrestrial),
            ..Default::default()
        };
        let out = normalize(vec![f].into_iter().collect(), &params);
        assert_eq!(out.records.len(), 1);
    }
}
