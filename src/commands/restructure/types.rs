use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One physical page as handed over by the extractor, numbered from 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPage {
    pub page_number: u32,
    pub text: String,
}

impl RawPage {
    pub fn new(page_number: u32, text: impl Into<String>) -> Self {
        Self {
            page_number,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitKind {
    Section,
    Paragraph,
    Appendix,
}

impl UnitKind {
    pub fn as_str(self) -> &'static str {
        match self {
            UnitKind::Section => "section",
            UnitKind::Paragraph => "paragraph",
            UnitKind::Appendix => "appendix",
        }
    }
}

/// Positional and hierarchical metadata of a [`TextUnit`].
///
/// `section_id`/`paragraph_id` and `appendix_index` are mutually exclusive:
/// appendix units never carry a section or paragraph position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitMetadata {
    pub document_id: String,
    pub kind: UnitKind,
    pub section_id: Option<u32>,
    pub section_label: Option<String>,
    pub section_title: Option<String>,
    pub paragraph_id: Option<u32>,
    pub paragraph_label: Option<String>,
    pub paragraph_title: Option<String>,
    pub appendix_index: Option<u32>,
    pub appendix_label: Option<String>,
    pub appendix_title: Option<String>,
    pub source_pages: BTreeSet<u32>,
}

impl UnitMetadata {
    pub fn new(document_id: &str, kind: UnitKind) -> Self {
        Self {
            document_id: document_id.to_string(),
            kind,
            section_id: None,
            section_label: None,
            section_title: None,
            paragraph_id: None,
            paragraph_label: None,
            paragraph_title: None,
            appendix_index: None,
            appendix_label: None,
            appendix_title: None,
            source_pages: BTreeSet::new(),
        }
    }

    pub fn page_start(&self) -> Option<u32> {
        self.source_pages.first().copied()
    }

    pub fn page_end(&self) -> Option<u32> {
        self.source_pages.last().copied()
    }

    pub fn source_pages_joined(&self) -> String {
        self.source_pages
            .iter()
            .map(|page| page.to_string())
            .collect::<Vec<String>>()
            .join(",")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextUnit {
    pub content: String,
    pub metadata: UnitMetadata,
}

impl TextUnit {
    pub fn unit_id(&self) -> String {
        let meta = &self.metadata;
        match (meta.kind, meta.appendix_index) {
            (UnitKind::Appendix, Some(index)) => {
                format!("{}:appendix:{:02}", meta.document_id, index)
            }
            _ => {
                let mut id = format!(
                    "{}:section:{:02}",
                    meta.document_id,
                    meta.section_id.unwrap_or_default()
                );
                if let Some(paragraph_id) = meta.paragraph_id {
                    id.push_str(&format!(":paragraph:{:03}", paragraph_id));
                }
                id
            }
        }
    }

    /// Scalar-only view of the metadata for key-value stores that reject
    /// nested values.
    pub fn flat_metadata(&self) -> Map<String, Value> {
        let meta = &self.metadata;
        let mut flat = Map::new();
        flat.insert("unit_id".into(), Value::from(self.unit_id()));
        flat.insert("document_id".into(), Value::from(meta.document_id.clone()));
        flat.insert("kind".into(), Value::from(meta.kind.as_str()));
        flat.insert("section_id".into(), optional(meta.section_id));
        flat.insert("section_label".into(), optional(meta.section_label.clone()));
        flat.insert("section_title".into(), optional(meta.section_title.clone()));
        flat.insert("paragraph_id".into(), optional(meta.paragraph_id));
        flat.insert(
            "paragraph_label".into(),
            optional(meta.paragraph_label.clone()),
        );
        flat.insert(
            "paragraph_title".into(),
            optional(meta.paragraph_title.clone()),
        );
        flat.insert("appendix_index".into(), optional(meta.appendix_index));
        flat.insert("appendix_label".into(), optional(meta.appendix_label.clone()));
        flat.insert("appendix_title".into(), optional(meta.appendix_title.clone()));
        flat.insert(
            "source_pages".into(),
            Value::from(meta.source_pages_joined()),
        );
        flat.insert("page_start".into(), optional(meta.page_start()));
        flat.insert("page_end".into(), optional(meta.page_end()));
        flat
    }
}

/// Interchange form of a unit for the embedding step: rendered text plus
/// scalar-only metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnitRecord {
    pub unit_id: String,
    pub content: String,
    pub display_text: String,
    pub metadata: Map<String, Value>,
}

fn optional<T: Into<Value>>(value: Option<T>) -> Value {
    value.map(Into::into).unwrap_or(Value::Null)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Normalize,
    Sections,
    Paragraphs,
    Appendices,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Normalize => "normalize",
            Stage::Sections => "sections",
            Stage::Paragraphs => "paragraphs",
            Stage::Appendices => "appendices",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("document profile field {field} must not be empty")]
    EmptyProfileField { field: &'static str },

    #[error("document profile produces an invalid {field} pattern")]
    InvalidProfile {
        field: &'static str,
        #[source]
        source: regex::Error,
    },

    #[error("{stage} stage: document {document_id} has page number 0 at position {position}")]
    ZeroPageNumber {
        stage: Stage,
        document_id: String,
        position: usize,
    },

    #[error("{stage} stage: document {document_id} page {page} does not follow page {previous}")]
    PageOutOfOrder {
        stage: Stage,
        document_id: String,
        page: u32,
        previous: u32,
    },
}

/// Pages must be numbered from 1 and strictly ascending; anything else means
/// the extractor output was reordered or duplicated.
pub(crate) fn check_page_sequence(
    stage: Stage,
    document_id: &str,
    pages: &[RawPage],
) -> Result<(), PipelineError> {
    let mut previous: Option<u32> = None;
    for (position, page) in pages.iter().enumerate() {
        if page.page_number == 0 {
            return Err(PipelineError::ZeroPageNumber {
                stage,
                document_id: document_id.to_string(),
                position,
            });
        }
        if let Some(previous) = previous {
            if page.page_number <= previous {
                return Err(PipelineError::PageOutOfOrder {
                    stage,
                    document_id: document_id.to_string(),
                    page: page.page_number,
                    previous,
                });
            }
        }
        previous = Some(page.page_number);
    }
    Ok(())
}
