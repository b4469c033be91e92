use regex::Regex;
use serde::{Deserialize, Serialize};

use super::types::PipelineError;

/// Fixed textual landmarks of one document family. The default describes the
/// consolidated "Warunki Techniczne" text published as Dz.U. 2019 poz. 1065.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentProfile {
    pub publisher: String,
    pub gazette_position: String,
    pub boilerplate_prefix: String,
    pub section_keyword: String,
    pub paragraph_keyword: String,
    pub appendix_phrase: String,
    pub preamble_label: String,
    pub appendix_group_label: String,
    pub footer_tag: String,
    pub annotation_tag: String,
}

impl Default for DocumentProfile {
    fn default() -> Self {
        Self {
            publisher: "Dziennik Ustaw".to_string(),
            gazette_position: "1065".to_string(),
            boilerplate_prefix: "Załącznik do obwieszczenia Ministra Inwestycji i Rozwoju \
                                 z dnia 8 kwietnia 2019 r. (poz. 1065)"
                .to_string(),
            section_keyword: "DZIAŁ".to_string(),
            paragraph_keyword: "Rozdział".to_string(),
            appendix_phrase: "Załącznik nr".to_string(),
            preamble_label: "WSTĘP".to_string(),
            appendix_group_label: "ZAŁĄCZNIKI".to_string(),
            footer_tag: "przypisy".to_string(),
            annotation_tag: "przypis".to_string(),
        }
    }
}

impl DocumentProfile {
    pub fn validate(&self) -> Result<(), PipelineError> {
        let required = [
            ("publisher", &self.publisher),
            ("gazette_position", &self.gazette_position),
            ("section_keyword", &self.section_keyword),
            ("paragraph_keyword", &self.paragraph_keyword),
            ("appendix_phrase", &self.appendix_phrase),
            ("footer_tag", &self.footer_tag),
            ("annotation_tag", &self.annotation_tag),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(PipelineError::EmptyProfileField { field });
            }
        }
        Ok(())
    }

    pub(crate) fn header_pattern(&self) -> String {
        format!(
            r"\s*{}\s*[–—-]\s*\d+\s*[–—-]\s*Poz\.\s*{}\s*",
            tolerant_phrase(&self.publisher),
            regex::escape(self.gazette_position.trim())
        )
    }

    pub(crate) fn prefix_pattern(&self) -> String {
        format!(r"\A\s*{}\s*", tolerant_phrase(&self.boilerplate_prefix))
    }

    pub(crate) fn section_pattern(&self) -> String {
        format!(r"{}\s+([IVXLCDM]+)", spaced_keyword(&self.section_keyword))
    }

    pub(crate) fn paragraph_pattern(&self) -> String {
        format!(r"{}\s+(\d+[a-z]?)", spaced_keyword(&self.paragraph_keyword))
    }

    pub(crate) fn appendix_pattern(&self) -> String {
        format!(
            r"(?m){}\s*(\d+)[ \t]*\r?\n[ \t]*(\p{{Lu}}[^\n\p{{Ll}}]*)$",
            tolerant_phrase(&self.appendix_phrase)
        )
    }
}

/// Literal phrase whose words may be separated by any run of whitespace,
/// including none at all.
pub(crate) fn tolerant_phrase(phrase: &str) -> String {
    phrase
        .split_whitespace()
        .map(regex::escape)
        .collect::<Vec<String>>()
        .join(r"\s*")
}

/// Keyword tolerant of whitespace inserted between any two letters, as
/// produced by letter-spaced headings in the PDF text layer.
pub(crate) fn spaced_keyword(keyword: &str) -> String {
    keyword
        .chars()
        .filter(|character| !character.is_whitespace())
        .map(|character| regex::escape(&character.to_string()))
        .collect::<Vec<String>>()
        .join(r"\s*")
}

pub(crate) fn compile_pattern(field: &'static str, pattern: &str) -> Result<Regex, PipelineError> {
    Regex::new(pattern).map_err(|source| PipelineError::InvalidProfile { field, source })
}
