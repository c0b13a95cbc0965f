//! Order in which records claim overlapping area

use paclean_core::ProtectedArea;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Precedence key of the overlap resolver. Earlier records keep the
/// overlapping area; ties always fall back to input order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Precedence {
    #[default]
    InputOrder,
    /// Ascending id, numerically when both ids are numbers
    Id,
    /// Earliest establishment year first, unknown years last
    EstablishedYear,
    /// Strictest management category first, then earliest year
    ManagementCategory,
}

impl Precedence {
    pub const ALL: [Precedence; 4] = [
        Precedence::InputOrder,
        Precedence::Id,
        Precedence::EstablishedYear,
        Precedence::ManagementCategory,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Precedence::InputOrder => "input-order",
            Precedence::Id => "id",
            Precedence::EstablishedYear => "established-year",
            Precedence::ManagementCategory => "management-category",
        }
    }

    /// Sort `(input index, record)` pairs into processing order
    pub fn sort(&self, records: &mut [(usize, ProtectedArea)]) {
        records.sort_by_key(|(index, _)| *index);
        match self {
            Precedence::InputOrder => {}
            Precedence::Id => records.sort_by(|(_, a), (_, b)| compare_ids(a.id(), b.id())),
            Precedence::EstablishedYear => records.sort_by_key(|(_, r)| year_key(r)),
            Precedence::ManagementCategory => records.sort_by_key(|(_, r)| {
                let category = r.attributes.management_category;
                ((category.is_none(), category), year_key(r))
            }),
        }
    }
}

fn year_key(record: &ProtectedArea) -> (bool, Option<u16>) {
    let year = record.attributes.established_year;
    (year.is_none(), year)
}

fn compare_ids(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        _ => a.cmp(b),
    }
}

impl fmt::Display for Precedence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Precedence {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase().replace('_', "-");
        Precedence::ALL
            .into_iter()
            .find(|p| p.as_str() == key)
            .ok_or_else(|| {
                let names: Vec<_> = Precedence::ALL.iter().map(|p| p.as_str()).collect();
                format!("unknown precedence `{s}` (expected one of {})", names.join(", "))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::MultiPolygon;
    use paclean_core::{Attributes, ManagementCategory};

    fn record(id: &str, year: Option<u16>, category: Option<ManagementCategory>) -> ProtectedArea {
        let mut attrs = Attributes::new(id);
        attrs.established_year = year;
        attrs.management_category = category;
        ProtectedArea::new(attrs, MultiPolygon::new(vec![]))
    }

    fn order(precedence: Precedence, records: Vec<ProtectedArea>) -> Vec<String> {
        let mut indexed: Vec<_> = records.into_iter().enumerate().collect();
        precedence.sort(&mut indexed);
        indexed.into_iter().map(|(_, r)| r.id().to_string()).collect()
    }

    fn sample() -> Vec<ProtectedArea> {
        vec![
            record("10", Some(1990), Some(ManagementCategory::IV)),
            record("9", None, Some(ManagementCategory::Ia)),
            record("11", Some(1950), None),
            record("12", Some(1950), Some(ManagementCategory::IV)),
        ]
    }

    #[test]
    fn test_input_order() {
        assert_eq!(order(Precedence::InputOrder, sample()), vec!["10", "9", "11", "12"]);
    }

    #[test]
    fn test_numeric_ids() {
        assert_eq!(order(Precedence::Id, sample()), vec!["9", "10", "11", "12"]);
    }

    #[test]
    fn test_year_ties_keep_input_order() {
        assert_eq!(order(Precedence::EstablishedYear, sample()), vec!["11", "12", "10", "9"]);
    }

    #[test]
    fn test_category_then_year() {
        assert_eq!(order(Precedence::ManagementCategory, sample()), vec!["9", "12", "10", "11"]);
    }

    #[test]
    fn test_parse() {
        assert_eq!("established_year".parse::<Precedence>(), Ok(Precedence::EstablishedYear));
        assert_eq!("Input-Order".parse::<Precedence>(), Ok(Precedence::InputOrder));
        assert!("alphabetical".parse::<Precedence>().is_err());
    }
}
