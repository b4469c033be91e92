use regex::Regex;
use serde::Serialize;

use super::profile::{DocumentProfile, compile_pattern};
use super::types::{PipelineError, RawPage, Stage, check_page_sequence};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NormalizeStats {
    pub pages: usize,
    pub headers_removed: usize,
    pub prefixes_stripped: usize,
    pub footers_wrapped: usize,
    pub annotations_linked: usize,
    pub hyphen_merges: usize,
}

/// Per-page cleanup of the raw text layer. Every transform is a pure
/// function of its input and degrades to the identity when its pattern is
/// absent.
#[derive(Debug, Clone)]
pub struct Normalizer {
    header_regex: Regex,
    prefix_regex: Regex,
    footer_regex: Regex,
    annotation_regex: Regex,
    annotation_replacement: String,
    stray_paren_regex: Regex,
    hyphen_regex: Regex,
    footer_open: String,
    footer_close: String,
}

impl Normalizer {
    pub fn new(profile: &DocumentProfile) -> Result<Self, PipelineError> {
        let footer_tag = profile.footer_tag.trim();
        let annotation_tag = profile.annotation_tag.trim();

        Ok(Self {
            header_regex: compile_pattern("header", &profile.header_pattern())?,
            prefix_regex: compile_pattern("prefix", &profile.prefix_pattern())?,
            footer_regex: compile_pattern("footer", r"(?s)\A(.*)(\n\s*\n[ \t]*)(\S.*)\z")?,
            annotation_regex: compile_pattern("annotation", r"\b(\p{L}+)(\d+)\)")?,
            annotation_replacement: format!("${{1}} <{annotation_tag}>${{2}}</{annotation_tag}>"),
            stray_paren_regex: compile_pattern("stray parenthesis", r"(\d+)\)")?,
            hyphen_regex: compile_pattern("hyphenation", r"(\w+)-\s*\n\s*(\w+)")?,
            footer_open: format!("<{footer_tag}>"),
            footer_close: format!("</{footer_tag}>"),
        })
    }

    /// Drops every running header, leaving a single newline in its place.
    pub fn remove_header(&self, text: &str) -> String {
        self.header_regex.replace_all(text, "\n").into_owned()
    }

    /// Removes the publication boilerplate only when the page starts with it.
    pub fn strip_prefix(&self, text: &str) -> String {
        match self.prefix_regex.find(text) {
            Some(found) => text[found.end()..].trim().to_string(),
            None => text.to_string(),
        }
    }

    /// Tags the block after the last blank line as footnote material.
    pub fn wrap_footer(&self, text: &str) -> String {
        let Some(captures) = self.footer_regex.captures(text) else {
            return text.to_string();
        };

        let body = captures.get(1).map(|value| value.as_str()).unwrap_or("");
        let gap = captures.get(2).map(|value| value.as_str()).unwrap_or("");
        let footer = captures.get(3).map(|value| value.as_str()).unwrap_or("");

        format!(
            "{body}{gap}{}\n{footer}\n{}\n",
            self.footer_open, self.footer_close
        )
    }

    /// `słowo12)` becomes `słowo <przypis>12</przypis>`; leftover `12)` becomes `12`.
    pub fn link_annotations(&self, text: &str) -> String {
        let linked = self
            .annotation_regex
            .replace_all(text, self.annotation_replacement.as_str());
        self.stray_paren_regex
            .replace_all(&linked, "${1}")
            .into_owned()
    }

    /// Joins `wyra-\nzu` into `wyrazu`. Runs to a fixpoint so chained
    /// fragments collapse in one call.
    pub fn merge_newline_divided_words(&self, text: &str) -> String {
        self.merge_with_count(text).0
    }

    fn merge_with_count(&self, text: &str) -> (String, usize) {
        let mut merged = text.to_string();
        let mut merges = 0usize;
        loop {
            let found = self.hyphen_regex.find_iter(&merged).count();
            if found == 0 {
                break;
            }
            merges += found;
            merged = self
                .hyphen_regex
                .replace_all(&merged, "${1}${2}")
                .into_owned();
        }
        (merged, merges)
    }

    pub fn normalize_page(&self, text: &str, stats: &mut NormalizeStats) -> String {
        stats.pages += 1;

        stats.headers_removed += self.header_regex.find_iter(text).count();
        let text = self.remove_header(text);

        if self.prefix_regex.is_match(&text) {
            stats.prefixes_stripped += 1;
        }
        let text = self.strip_prefix(&text);

        if self.footer_regex.is_match(&text) {
            stats.footers_wrapped += 1;
        }
        let text = self.wrap_footer(&text);

        stats.annotations_linked += self.annotation_regex.find_iter(&text).count();
        let text = self.link_annotations(&text);

        let (text, merges) = self.merge_with_count(&text);
        stats.hyphen_merges += merges;

        text.trim().to_string()
    }

    /// Normalizes the extractor's pages in place and returns them.
    pub fn normalize_pages(
        &self,
        document_id: &str,
        mut pages: Vec<RawPage>,
    ) -> Result<(Vec<RawPage>, NormalizeStats), PipelineError> {
        check_page_sequence(Stage::Normalize, document_id, &pages)?;

        let mut stats = NormalizeStats::default();
        for page in &mut pages {
            page.text = self.normalize_page(&page.text, &mut stats);
        }

        Ok((pages, stats))
    }
}
