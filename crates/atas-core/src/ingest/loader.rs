use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::record::{AnnotationRecord, SofaRecord};
use crate::text::TextBuffer;
use crate::{Error, Result};

/// Where the document text was found, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextSource {
    /// A `uima.cas.Sofa` entry of `%FEATURE_STRUCTURES`.
    FeatureStructures,
    /// The sofa named by a `%VIEWS` entry.
    Views,
    /// Older exports: `views[].sofas[]`.
    LegacyViews,
}

impl TextSource {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FeatureStructures => "feature_structures",
            Self::Views => "views",
            Self::LegacyViews => "legacy_views",
        }
    }
}

/// One decoded annotation payload: the text buffers and the records
/// attached to each of them.
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    pub source: TextSource,
    pub primary_buffer: u64,
    pub total_feature_structures: usize,
    pub sofa_count: usize,
    buffers: BTreeMap<u64, TextBuffer>,
    records: BTreeMap<u64, Vec<AnnotationRecord>>,
}

impl LoadedDocument {
    /// Text of the primary buffer.
    #[must_use]
    pub fn text(&self) -> &TextBuffer {
        &self.buffers[&self.primary_buffer]
    }

    #[must_use]
    pub fn buffer(&self, id: u64) -> Option<&TextBuffer> {
        self.buffers.get(&id)
    }

    pub fn buffer_ids(&self) -> impl Iterator<Item = u64> + '_ {
        self.buffers.keys().copied()
    }

    /// Records attached to the primary buffer, in payload order.
    #[must_use]
    pub fn records(&self) -> &[AnnotationRecord] {
        self.records_for(self.primary_buffer)
    }

    #[must_use]
    pub fn records_for(&self, buffer: u64) -> &[AnnotationRecord] {
        self.records.get(&buffer).map_or(&[], Vec::as_slice)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Loader;

impl Loader {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    pub async fn load_file(&self, path: &Path) -> Result<LoadedDocument> {
        let data = tokio::fs::read(path).await?;
        self.load_bytes(&data)
    }

    pub fn load_bytes(&self, data: &[u8]) -> Result<LoadedDocument> {
        let payload: Value = serde_json::from_slice(data)?;
        self.load_value(&payload)
    }

    pub fn load_value(&self, payload: &Value) -> Result<LoadedDocument> {
        let root = payload
            .as_object()
            .ok_or_else(|| Error::InvalidPayload("top level is not an object".into()))?;

        let structures: &[Value] = root
            .get("%FEATURE_STRUCTURES")
            .and_then(Value::as_array)
            .map_or(&[], Vec::as_slice);

        let mut sofas: Vec<(u64, SofaRecord)> = Vec::new();
        let mut records: BTreeMap<u64, Vec<AnnotationRecord>> = BTreeMap::new();
        let mut detached = 0usize;

        for (index, value) in structures.iter().enumerate() {
            let Some(record) = AnnotationRecord::from_value(value) else {
                detached += 1;
                continue;
            };
            match record {
                AnnotationRecord::Sofa(sofa) => {
                    let key = sofa.id.or(sofa.sofa_num).unwrap_or(index as u64);
                    sofas.push((key, sofa));
                }
                other => match other.sofa() {
                    Some(buffer) => records.entry(buffer).or_default().push(other),
                    None => detached += 1,
                },
            }
        }

        if detached > 0 {
            tracing::debug!(detached, "feature structures not attached to any buffer");
        }

        let (source, primary, text) = select_text(root, &sofas).ok_or(Error::MissingText)?;

        let mut buffers: BTreeMap<u64, TextBuffer> = sofas
            .iter()
            .filter_map(|(key, sofa)| sofa.text.as_deref().map(|t| (*key, TextBuffer::new(t))))
            .collect();
        buffers.insert(primary, TextBuffer::new(text));

        Ok(LoadedDocument {
            source,
            primary_buffer: primary,
            total_feature_structures: structures.len(),
            sofa_count: sofas.len().max(1),
            buffers,
            records,
        })
    }
}

fn select_text(
    root: &serde_json::Map<String, Value>,
    sofas: &[(u64, SofaRecord)],
) -> Option<(TextSource, u64, String)> {
    if let Some((key, text)) = sofas
        .iter()
        .find_map(|(key, sofa)| sofa.usable_text().map(|t| (*key, t)))
    {
        return Some((TextSource::FeatureStructures, key, text.to_string()));
    }

    if let Some(views) = root.get("%VIEWS").and_then(Value::as_object) {
        for view in views.values() {
            let Some(sofa_id) = view.get("%SOFA").and_then(Value::as_u64) else {
                continue;
            };
            let found = sofas
                .iter()
                .filter(|(_, sofa)| sofa.id == Some(sofa_id))
                .find_map(|(key, sofa)| sofa.usable_text().map(|t| (*key, t)));
            if let Some((key, text)) = found {
                return Some((TextSource::Views, key, text.to_string()));
            }
        }
    }

    let legacy = root.get("views").and_then(Value::as_array)?;
    legacy
        .iter()
        .filter_map(|view| view.get("sofas").and_then(Value::as_array))
        .flatten()
        .find_map(|sofa| {
            let text = sofa.get("sofaString").and_then(Value::as_str)?;
            if text.trim().is_empty() {
                return None;
            }
            let key = sofa
                .get("%ID")
                .or_else(|| sofa.get("sofaNum"))
                .and_then(Value::as_u64)
                .unwrap_or(1);
            Some((TextSource::LegacyViews, key, text.to_string()))
        })
}
