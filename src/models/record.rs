//! Evidence records and moderation state.

use serde::{Deserialize, Deserializer, Serialize};

use super::vocab::normalize_climate;

/// Scale placeholder for records whose scale has not been entered yet.
pub const AWAITING_DATA: &str = "Awaiting data";

/// Direction of the observed relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Increase,
    Decrease,
}

impl Direction {
    pub const ALL: [Direction; 2] = [Self::Increase, Self::Decrease];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Increase => "Increase",
            Self::Decrease => "Decrease",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim() {
            "Increase" => Some(Self::Increase),
            "Decrease" => Some(Self::Decrease),
            _ => None,
        }
    }
}

/// Moderation state of a record. A missing status is a legacy seed import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    Approved,
    Pending,
    Rejected,
}

impl RecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approved => "approved",
            Self::Pending => "pending",
            Self::Rejected => "rejected",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "approved" => Some(Self::Approved),
            "pending" => Some(Self::Pending),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

/// Which records a read path may see.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    /// Everything except rejected records.
    #[default]
    Public,
    /// Excludes rejected and pending records (vocabulary population).
    Approved,
    /// No filtering; moderation and ownership paths only.
    All,
}

impl Visibility {
    pub fn admits(&self, status: Option<RecordStatus>) -> bool {
        match self {
            Self::Public => status != Some(RecordStatus::Rejected),
            Self::Approved => !matches!(
                status,
                Some(RecordStatus::Rejected) | Some(RecordStatus::Pending)
            ),
            Self::All => true,
        }
    }
}

/// A single piece of evidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: i64,
    pub group_id: Option<i64>,
    pub criteria: String,
    pub energy_method: String,
    pub direction: String,
    pub paragraph: Option<String>,
    pub status: Option<RecordStatus>,
    pub user: Option<String>,
    pub scale: Option<String>,
    pub climate: Option<String>,
    pub location: Option<String>,
    pub building_use: Option<String>,
    pub approach: Option<String>,
    pub sample_size: Option<String>,
    pub created_at: Option<String>,
}

impl Record {
    /// Whether the paragraph carries real text. "", "0" and "0.0" count as empty.
    pub fn has_paragraph(&self) -> bool {
        is_present_paragraph(self.paragraph.as_deref())
    }

    pub fn direction_kind(&self) -> Option<Direction> {
        Direction::from_str(&self.direction)
    }

    /// Climate reduced to its bare code for facet comparison.
    pub fn climate_code(&self) -> Option<String> {
        self.climate
            .as_deref()
            .map(normalize_climate)
            .filter(|c| !c.is_empty())
    }
}

pub fn is_present_paragraph(paragraph: Option<&str>) -> bool {
    match paragraph.map(str::trim) {
        None | Some("") | Some("0") | Some("0.0") => false,
        Some(_) => true,
    }
}

/// A record to insert. The store assigns the id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewRecord {
    #[serde(default)]
    pub group_id: Option<i64>,
    pub criteria: String,
    pub energy_method: String,
    pub direction: String,
    #[serde(default)]
    pub paragraph: Option<String>,
    #[serde(default)]
    pub status: Option<RecordStatus>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub scale: Option<String>,
    #[serde(default)]
    pub climate: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub building_use: Option<String>,
    #[serde(default)]
    pub approach: Option<String>,
    #[serde(default)]
    pub sample_size: Option<String>,
}

impl NewRecord {
    pub fn into_record(self, id: i64, created_at: String) -> Record {
        Record {
            id,
            group_id: self.group_id,
            criteria: self.criteria,
            energy_method: self.energy_method,
            direction: self.direction,
            paragraph: self.paragraph,
            status: self.status,
            user: self.user,
            scale: self.scale,
            climate: self.climate,
            location: self.location,
            building_use: self.building_use,
            approach: self.approach,
            sample_size: self.sample_size,
            created_at: Some(created_at),
        }
    }
}

/// Partial update of a record.
///
/// Outer `None` leaves a field alone; `Some(None)` clears a nullable field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordPatch {
    #[serde(default)]
    pub criteria: Option<String>,
    #[serde(default)]
    pub energy_method: Option<String>,
    #[serde(default)]
    pub direction: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub paragraph: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub status: Option<Option<RecordStatus>>,
    #[serde(default, deserialize_with = "double_option")]
    pub scale: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub climate: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub location: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub building_use: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub approach: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub sample_size: Option<Option<String>>,
}

/// Distinguish an explicit `null` (clear) from an absent key (leave alone).
fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

impl RecordPatch {
    pub fn is_empty(&self) -> bool {
        *self == RecordPatch::default()
    }

    /// Apply the patch to an in-memory record.
    pub fn apply(&self, record: &mut Record) {
        if let Some(v) = &self.criteria {
            record.criteria = v.clone();
        }
        if let Some(v) = &self.energy_method {
            record.energy_method = v.clone();
        }
        if let Some(v) = &self.direction {
            record.direction = v.clone();
        }
        if let Some(v) = &self.paragraph {
            record.paragraph = v.clone();
        }
        if let Some(v) = self.status {
            record.status = v;
        }
        let metadata = [
            (&self.scale, &mut record.scale),
            (&self.climate, &mut record.climate),
            (&self.location, &mut record.location),
            (&self.building_use, &mut record.building_use),
            (&self.approach, &mut record.approach),
            (&self.sample_size, &mut record.sample_size),
        ];
        for (patch, field) in metadata {
            if let Some(v) = patch {
                *field = v.clone();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> Record {
        NewRecord {
            criteria: "Density".to_string(),
            energy_method: "EUI".to_string(),
            direction: "Increase".to_string(),
            paragraph: Some("text".to_string()),
            ..Default::default()
        }
        .into_record(1, "2026-01-01T00:00:00Z".to_string())
    }

    #[test]
    fn test_visibility_predicates() {
        assert!(Visibility::Public.admits(None));
        assert!(Visibility::Public.admits(Some(RecordStatus::Pending)));
        assert!(!Visibility::Public.admits(Some(RecordStatus::Rejected)));
        assert!(Visibility::Approved.admits(None));
        assert!(!Visibility::Approved.admits(Some(RecordStatus::Pending)));
        assert!(Visibility::All.admits(Some(RecordStatus::Rejected)));
    }

    #[test]
    fn test_empty_paragraphs() {
        for p in ["", "0", "0.0", "  "] {
            assert!(!is_present_paragraph(Some(p)), "{p:?} should be empty");
        }
        assert!(!is_present_paragraph(None));
        assert!(is_present_paragraph(Some("0.05 kWh")));
    }

    #[test]
    fn test_patch_apply() {
        let mut r = record();
        let patch = RecordPatch {
            location: Some(Some("Paris, FR".to_string())),
            scale: Some(None),
            ..Default::default()
        };
        assert!(!patch.is_empty());
        patch.apply(&mut r);
        assert_eq!(r.location.as_deref(), Some("Paris, FR"));
        assert_eq!(r.scale, None);
        assert_eq!(r.criteria, "Density");
        assert!(RecordPatch::default().is_empty());
    }

    #[test]
    fn test_status_parse() {
        assert_eq!(RecordStatus::from_str("Rejected"), Some(RecordStatus::Rejected));
        assert_eq!(RecordStatus::from_str("maybe"), None);
    }
}
