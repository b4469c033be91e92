use serde::Serialize;
use tracing::info;

use super::appendix::AppendixExtractor;
use super::normalize::{NormalizeStats, Normalizer};
use super::paragraphs::ParagraphSegmenter;
use super::profile::DocumentProfile;
use super::sections::SectionSegmenter;
use super::types::{PipelineError, RawPage, Stage, TextUnit, UnitKind, UnitRecord};

#[derive(Debug, Clone, Default, Serialize)]
pub struct RestructureStats {
    pub normalize: NormalizeStats,
    pub section_units: usize,
    pub paragraph_units: usize,
    pub appendix_units: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RestructuredDocument {
    pub document_id: String,
    pub page_count: usize,
    pub units: Vec<TextUnit>,
    pub stats: RestructureStats,
    pub warnings: Vec<String>,
}

/// Raw pages in, ordered text units out:
/// normalize -> sections -> paragraphs -> appendices.
#[derive(Debug, Clone)]
pub struct Restructurer {
    normalizer: Normalizer,
    sections: SectionSegmenter,
    paragraphs: ParagraphSegmenter,
    appendices: AppendixExtractor,
    appendix_group_label: String,
}

impl Restructurer {
    pub fn new(profile: &DocumentProfile) -> Result<Self, PipelineError> {
        profile.validate()?;

        Ok(Self {
            normalizer: Normalizer::new(profile)?,
            sections: SectionSegmenter::new(profile)?,
            paragraphs: ParagraphSegmenter::new(profile)?,
            appendices: AppendixExtractor::new(profile)?,
            appendix_group_label: profile.appendix_group_label.trim().to_string(),
        })
    }

    pub fn restructure(
        &self,
        document_id: &str,
        pages: Vec<RawPage>,
    ) -> Result<RestructuredDocument, PipelineError> {
        let page_count = pages.len();
        let mut stats = RestructureStats::default();

        let (pages, normalize_stats) = self.normalizer.normalize_pages(document_id, pages)?;
        stats.normalize = normalize_stats;
        info!(
            document_id = %document_id,
            stage = %Stage::Normalize,
            pages = page_count,
            headers = normalize_stats.headers_removed,
            footers = normalize_stats.footers_wrapped,
            merges = normalize_stats.hyphen_merges,
            "pages normalized"
        );

        let section_outcome = self.sections.segment(document_id, &pages)?;
        stats.section_units = section_outcome.units.len();
        info!(
            document_id = %document_id,
            stage = %Stage::Sections,
            sections = stats.section_units,
            "sections segmented"
        );

        let paragraphs = self.paragraphs.segment(section_outcome.units);
        info!(
            document_id = %document_id,
            stage = %Stage::Paragraphs,
            paragraphs = paragraphs.len(),
            "paragraphs segmented"
        );

        let (units, appendix_count) = self.appendices.extract(paragraphs);
        stats.appendix_units = appendix_count;
        stats.paragraph_units = units.len() - appendix_count;
        info!(
            document_id = %document_id,
            stage = %Stage::Appendices,
            appendices = appendix_count,
            "appendices extracted"
        );

        Ok(RestructuredDocument {
            document_id: document_id.to_string(),
            page_count,
            units,
            stats,
            warnings: section_outcome.warnings,
        })
    }

    /// Content prefixed with the XML-like heading block used as embedding
    /// input. A unit whose text already opens with a section marker keeps
    /// its own heading; segmented units never do, since the marker is cut
    /// off, so this only applies to units built elsewhere.
    pub fn display_text(&self, unit: &TextUnit) -> String {
        let meta = &unit.metadata;
        if meta.kind == UnitKind::Appendix {
            return format!(
                "<dział>\n  <nazwa>{}</nazwa>\n</dział>\n{}",
                self.appendix_group_label, unit.content
            );
        }
        if self.sections.starts_with_marker(&unit.content) {
            return unit.content.clone();
        }

        let label = meta
            .section_label
            .clone()
            .unwrap_or_else(|| self.sections.label_for(meta.section_id.unwrap_or_default()));
        let mut header = format!("<dział>\n  <nazwa>{label}</nazwa>\n");
        if let Some(title) = &meta.section_title {
            header.push_str(&format!("  <tytuł>{title}</tytuł>\n"));
        }
        header.push_str("</dział>\n");

        format!("{header}{}", unit.content)
    }

    pub fn interchange_record(&self, unit: &TextUnit) -> UnitRecord {
        UnitRecord {
            unit_id: unit.unit_id(),
            content: unit.content.clone(),
            display_text: self.display_text(unit),
            metadata: unit.flat_metadata(),
        }
    }
}
