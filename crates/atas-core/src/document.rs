use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const DEFAULT_MEETING_TYPE: &str = "cm";
pub const UNKNOWN_MUNICIPALITY: &str = "unknown";

/// Suffix of segment files, stripped to find the matching annotation file.
pub const SEGMENTS_SUFFIX: &str = "_annotations";

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y%m%d", "%d-%m-%Y"];

/// Identity of a minutes document, read from its file name
/// (`<Municipality>_<meeting-type>_<sequence>_<date>.json`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMeta {
    pub filename: String,
    pub municipality: String,
    pub meeting_type: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub document_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parsed_date: Option<NaiveDate>,
}

impl DocumentMeta {
    #[must_use]
    pub fn from_filename(filename: &str) -> Self {
        let stem = filename.strip_suffix(".json").unwrap_or(filename);
        let stem = stem.strip_suffix(SEGMENTS_SUFFIX).unwrap_or(stem);
        let parts: Vec<&str> = stem.split('_').collect();

        let municipality = parts
            .first()
            .filter(|p| !p.is_empty())
            .map_or(UNKNOWN_MUNICIPALITY, |p| *p)
            .to_string();

        if parts.len() < 4 {
            return Self {
                filename: filename.to_string(),
                municipality,
                meeting_type: DEFAULT_MEETING_TYPE.to_string(),
                document_id: String::new(),
                date: String::new(),
                parsed_date: None,
            };
        }

        let date = parts[3].to_string();
        Self {
            filename: filename.to_string(),
            municipality,
            meeting_type: parts[1].to_string(),
            document_id: parts[..3].join("_"),
            parsed_date: parse_date(&date),
            date,
        }
    }

    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::from_filename(&filename)
    }

    /// Document id when the name follows the convention, file stem otherwise.
    #[must_use]
    pub fn key(&self) -> &str {
        if self.document_id.is_empty() {
            self.filename.strip_suffix(".json").unwrap_or(&self.filename)
        } else {
            &self.document_id
        }
    }
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
}

/// Name of the annotation file paired with a segment file, if the segment
/// file carries the `_annotations.json` suffix.
#[must_use]
pub fn annotation_file_name(segments_file_name: &str) -> Option<String> {
    segments_file_name
        .strip_suffix(".json")
        .and_then(|stem| stem.strip_suffix(SEGMENTS_SUFFIX))
        .map(|base| format!("{base}.json"))
}
