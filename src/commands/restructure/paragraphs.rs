use regex::Regex;
use tracing::debug;

use super::profile::{DocumentProfile, compile_pattern};
use super::sections::first_nonblank_line;
use super::types::{PipelineError, TextUnit, UnitKind};

/// Splits section units at `Rozdział <n>` markers. Paragraph ids restart at 0
/// in every section.
#[derive(Debug, Clone)]
pub struct ParagraphSegmenter {
    marker_regex: Regex,
    keyword: String,
}

struct ParagraphBoundary {
    start: usize,
    heading_end: usize,
    label: Option<String>,
}

impl ParagraphSegmenter {
    pub fn new(profile: &DocumentProfile) -> Result<Self, PipelineError> {
        Ok(Self {
            marker_regex: compile_pattern("paragraph marker", &profile.paragraph_pattern())?,
            keyword: profile.paragraph_keyword.trim().to_string(),
        })
    }

    pub fn segment(&self, sections: Vec<TextUnit>) -> Vec<TextUnit> {
        let mut paragraphs = Vec::with_capacity(sections.len());
        for section in sections {
            paragraphs.extend(self.split_section(section));
        }
        paragraphs
    }

    fn split_section(&self, section: TextUnit) -> Vec<TextUnit> {
        let content = section.content.as_str();
        let mut boundaries = vec![ParagraphBoundary {
            start: 0,
            heading_end: 0,
            label: None,
        }];

        for captures in self.marker_regex.captures_iter(content) {
            let Some(whole) = captures.get(0) else {
                continue;
            };
            let number = captures.get(1).map(|value| value.as_str()).unwrap_or("");
            boundaries.push(ParagraphBoundary {
                start: whole.start(),
                heading_end: whole.end(),
                label: Some(format!("{} {}", self.keyword, number)),
            });
        }

        let mut paragraphs = Vec::new();
        let mut next_id = 0u32;
        for (index, boundary) in boundaries.iter().enumerate() {
            let end = boundaries
                .get(index + 1)
                .map(|next| next.start)
                .unwrap_or(content.len());
            let segment = content[boundary.start..end].trim();
            if segment.is_empty() {
                continue;
            }

            let mut metadata = section.metadata.clone();
            metadata.kind = UnitKind::Paragraph;
            metadata.paragraph_id = Some(next_id);
            metadata.paragraph_label = boundary.label.clone();
            metadata.paragraph_title = boundary
                .label
                .as_ref()
                .and_then(|_| first_nonblank_line(&content[boundary.heading_end..end]));

            paragraphs.push(TextUnit {
                content: segment.to_string(),
                metadata,
            });
            next_id += 1;
        }

        debug!(
            document_id = %section.metadata.document_id,
            section_id = section.metadata.section_id.unwrap_or_default(),
            paragraphs = paragraphs.len(),
            "paragraph segmentation finished"
        );

        paragraphs
    }
}
