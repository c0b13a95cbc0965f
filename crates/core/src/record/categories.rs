//! Closed categorical attributes of a protected-area record

use serde::{Deserialize, Serialize};
use std::fmt;

fn key(s: &str) -> String {
    s.trim()
        .to_ascii_lowercase()
        .replace(['-', '_'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Lifecycle stage of a protected area
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Status {
    Designated,
    Inscribed,
    Established,
    Adopted,
    Proposed,
    NotReported,
}

impl Status {
    pub fn parse(s: &str) -> Option<Self> {
        match key(s).as_str() {
            "designated" => Some(Status::Designated),
            "inscribed" => Some(Status::Inscribed),
            "established" => Some(Status::Established),
            "adopted" => Some(Status::Adopted),
            "proposed" => Some(Status::Proposed),
            "not reported" => Some(Status::NotReported),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Designated => "Designated",
            Status::Inscribed => "Inscribed",
            Status::Established => "Established",
            Status::Adopted => "Adopted",
            Status::Proposed => "Proposed",
            Status::NotReported => "Not Reported",
        }
    }
}

/// Kind of designation under which an area is protected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DesignationKind {
    National,
    Regional,
    /// UNESCO World Heritage Site
    WorldHeritage,
    /// Ramsar Site, Wetland of International Importance
    Ramsar,
    /// UNESCO-MAB Biosphere Reserve. Zoned landscapes rather than a
    /// persistent protected footprint.
    BiosphereReserve,
    OtherInternational,
    NotApplicable,
}

impl DesignationKind {
    pub fn parse(s: &str) -> Option<Self> {
        let k = key(s);
        match k.as_str() {
            "national" => return Some(DesignationKind::National),
            "regional" => return Some(DesignationKind::Regional),
            "international" => return Some(DesignationKind::OtherInternational),
            "not applicable" => return Some(DesignationKind::NotApplicable),
            _ => {}
        }
        if k.contains("biosphere") {
            Some(DesignationKind::BiosphereReserve)
        } else if k.contains("world heritage") {
            Some(DesignationKind::WorldHeritage)
        } else if k.contains("ramsar") {
            Some(DesignationKind::Ramsar)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DesignationKind::National => "National",
            DesignationKind::Regional => "Regional",
            DesignationKind::WorldHeritage => "World Heritage Site",
            DesignationKind::Ramsar => "Ramsar Site",
            DesignationKind::BiosphereReserve => "UNESCO-MAB Biosphere Reserve",
            DesignationKind::OtherInternational => "International",
            DesignationKind::NotApplicable => "Not Applicable",
        }
    }
}

/// Management category, ordered from the strictest protection to the loosest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ManagementCategory {
    Ia,
    Ib,
    II,
    III,
    IV,
    V,
    VI,
    NotApplicable,
    NotAssigned,
}

impl ManagementCategory {
    pub fn parse(s: &str) -> Option<Self> {
        match key(s).as_str() {
            "ia" => Some(ManagementCategory::Ia),
            "ib" => Some(ManagementCategory::Ib),
            "ii" => Some(ManagementCategory::II),
            "iii" => Some(ManagementCategory::III),
            "iv" => Some(ManagementCategory::IV),
            "v" => Some(ManagementCategory::V),
            "vi" => Some(ManagementCategory::VI),
            "not applicable" => Some(ManagementCategory::NotApplicable),
            "not assigned" => Some(ManagementCategory::NotAssigned),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ManagementCategory::Ia => "Ia",
            ManagementCategory::Ib => "Ib",
            ManagementCategory::II => "II",
            ManagementCategory::III => "III",
            ManagementCategory::IV => "IV",
            ManagementCategory::V => "V",
            ManagementCategory::VI => "VI",
            ManagementCategory::NotApplicable => "Not Applicable",
            ManagementCategory::NotAssigned => "Not Assigned",
        }
    }
}

/// Physical context of a protected area. Records of different realms are
/// never erased against each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Realm {
    Terrestrial,
    Marine,
    Mixed,
}

impl Realm {
    pub const ALL: [Realm; 3] = [Realm::Terrestrial, Realm::Marine, Realm::Mixed];

    /// Provider numeric codes: 0 terrestrial, 1 partially marine, 2 marine
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Realm::Terrestrial),
            1 => Some(Realm::Mixed),
            2 => Some(Realm::Marine),
            _ => None,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let k = key(s);
        if let Ok(code) = k.parse::<i64>() {
            return Self::from_code(code);
        }
        match k.as_str() {
            "terrestrial" => Some(Realm::Terrestrial),
            "marine" => Some(Realm::Marine),
            "mixed" | "partial" | "partially marine" | "coastal" => Some(Realm::Mixed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Realm::Terrestrial => "terrestrial",
            Realm::Marine => "marine",
            Realm::Mixed => "mixed",
        }
    }
}

macro_rules! display_via_as_str {
    ($($t:ty),*) => {
        $(impl fmt::Display for $t {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        })*
    };
}

display_via_as_str!(Status, DesignationKind, ManagementCategory, Realm);
