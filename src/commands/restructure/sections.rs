use std::collections::BTreeSet;

use regex::Regex;
use tracing::{debug, warn};

use super::profile::{DocumentProfile, compile_pattern};
use super::types::{
    PipelineError, RawPage, Stage, TextUnit, UnitKind, UnitMetadata, check_page_sequence,
};

const ROMAN_VALUES: [(u32, &str); 13] = [
    (1000, "M"),
    (900, "CM"),
    (500, "D"),
    (400, "CD"),
    (100, "C"),
    (90, "XC"),
    (50, "L"),
    (40, "XL"),
    (10, "X"),
    (9, "IX"),
    (5, "V"),
    (4, "IV"),
    (1, "I"),
];

pub fn to_roman(mut value: u32) -> String {
    let mut out = String::new();
    for (step, symbol) in ROMAN_VALUES {
        while value >= step {
            out.push_str(symbol);
            value -= step;
        }
    }
    out
}

/// Parses a canonical Roman numeral. Non-canonical spellings such as `IIII`
/// are rejected so that OCR noise does not pass as a valid section number.
pub fn parse_roman(input: &str) -> Option<u32> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }

    let mut total = 0u32;
    let chars = trimmed.chars().collect::<Vec<char>>();
    let mut index = 0usize;
    while index < chars.len() {
        let current = roman_digit(chars[index])?;
        let next = chars.get(index + 1).and_then(|value| roman_digit(*value));
        match next {
            Some(next) if next > current => {
                total = total.checked_add(next - current)?;
                index += 2;
            }
            _ => {
                total = total.checked_add(current)?;
                index += 1;
            }
        }
    }

    (to_roman(total) == trimmed).then_some(total)
}

fn roman_digit(character: char) -> Option<u32> {
    match character {
        'I' => Some(1),
        'V' => Some(5),
        'X' => Some(10),
        'L' => Some(50),
        'C' => Some(100),
        'D' => Some(500),
        'M' => Some(1000),
        _ => None,
    }
}

#[derive(Debug, Clone, Default)]
pub struct SectionOutcome {
    pub units: Vec<TextUnit>,
    pub warnings: Vec<String>,
}

/// The section being built while pages are traversed. Each step consumes the
/// accumulator and hands back its successor; `finish` turns it into a unit.
#[derive(Debug, Clone)]
struct SectionAccumulator {
    section_id: u32,
    content: String,
    pages: BTreeSet<u32>,
}

impl SectionAccumulator {
    fn preamble() -> Self {
        Self {
            section_id: 0,
            content: String::new(),
            pages: BTreeSet::new(),
        }
    }

    fn open(section_id: u32, page_number: u32) -> Self {
        Self {
            section_id,
            content: String::new(),
            pages: BTreeSet::from([page_number]),
        }
    }

    fn append(self, text: &str, page_number: u32) -> Self {
        let text = if self.content.is_empty() {
            text.trim_start()
        } else {
            text
        };
        if text.is_empty() {
            return self;
        }

        let mut pages = self.pages;
        if !text.trim().is_empty() {
            pages.insert(page_number);
        }

        Self {
            section_id: self.section_id,
            content: self.content + text,
            pages,
        }
    }

    fn touch(self, page_number: u32) -> Self {
        let mut pages = self.pages;
        pages.insert(page_number);
        Self { pages, ..self }
    }

    fn finish(self, document_id: &str, label: String) -> TextUnit {
        let mut metadata = UnitMetadata::new(document_id, UnitKind::Section);
        metadata.section_id = Some(self.section_id);
        metadata.section_label = Some(label);
        if self.section_id > 0 {
            metadata.section_title = first_nonblank_line(&self.content);
        }
        metadata.source_pages = self.pages;

        TextUnit {
            content: self.content,
            metadata,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct SectionMarker<'t> {
    start: usize,
    end: usize,
    numeral: &'t str,
}

/// Longest prefix of `numeral` that can end a section marker, given the text
/// that follows the regex match.
fn marker_numeral_len(numeral: &str, rest: &str) -> Option<usize> {
    (1..=numeral.len()).rev().find(|&length| {
        let mut following = numeral[length..].chars().chain(rest.chars());
        match following.next() {
            None => true,
            Some(first) if !first.is_alphanumeric() => true,
            Some(first) => {
                first.is_uppercase() && following.next().is_some_and(char::is_lowercase)
            }
        }
    })
}

pub(crate) fn first_nonblank_line(text: &str) -> Option<String> {
    text.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(ToOwned::to_owned)
}

/// Splits the normalized page stream at every section marker
/// (`DZIAŁ` + Roman numeral). Section 0 holds whatever precedes the first
/// marker; section `k` starts at the `k`-th marker.
#[derive(Debug, Clone)]
pub struct SectionSegmenter {
    marker_regex: Regex,
    keyword: String,
    preamble_label: String,
}

impl SectionSegmenter {
    pub fn new(profile: &DocumentProfile) -> Result<Self, PipelineError> {
        Ok(Self {
            marker_regex: compile_pattern("section marker", &profile.section_pattern())?,
            keyword: profile.section_keyword.trim().to_string(),
            preamble_label: profile.preamble_label.trim().to_string(),
        })
    }

    pub fn starts_with_marker(&self, text: &str) -> bool {
        self.markers(text.trim_start())
            .first()
            .is_some_and(|marker| marker.start == 0)
    }

    /// Marker occurrences in reading order. A numeral must be followed by a
    /// non-alphanumeric character, the end of the text, or a capitalised word
    /// glued on by the extractor (`DZIAŁ IIPrzepisy`); prose such as
    /// `DZIAŁ Ciepłownictwo` is not a marker.
    fn markers<'t>(&self, text: &'t str) -> Vec<SectionMarker<'t>> {
        self.marker_regex
            .captures_iter(text)
            .filter_map(|captures| {
                let whole = captures.get(0)?;
                let numeral = captures.get(1)?;
                let length = marker_numeral_len(numeral.as_str(), &text[numeral.end()..])?;
                Some(SectionMarker {
                    start: whole.start(),
                    end: numeral.start() + length,
                    numeral: &numeral.as_str()[..length],
                })
            })
            .collect()
    }

    pub fn label_for(&self, section_id: u32) -> String {
        if section_id == 0 {
            self.preamble_label.clone()
        } else {
            format!("{} {}", self.keyword, to_roman(section_id))
        }
    }

    pub fn segment(
        &self,
        document_id: &str,
        pages: &[RawPage],
    ) -> Result<SectionOutcome, PipelineError> {
        check_page_sequence(Stage::Sections, document_id, pages)?;

        let mut outcome = SectionOutcome::default();
        let mut current = SectionAccumulator::preamble();

        for page in pages {
            let text = page.text.as_str();
            let markers = self.markers(text);

            if markers.is_empty() {
                current = current
                    .append(&format!("{text}\n"), page.page_number)
                    .touch(page.page_number);
                continue;
            }

            let mut cursor = 0usize;
            for marker in markers {
                current = current.append(&text[cursor..marker.start], page.page_number);

                let next_id = current.section_id + 1;
                let label = self.label_for(current.section_id);
                outcome.units.push(current.finish(document_id, label));

                let numeral = marker.numeral;
                if parse_roman(numeral) != Some(next_id) {
                    let warning = format!(
                        "{document_id}: section marker numeral '{numeral}' on page {} is section {next_id} in reading order",
                        page.page_number
                    );
                    warn!(
                        document_id = %document_id,
                        page = page.page_number,
                        numeral = %numeral,
                        expected = next_id,
                        "section numeral out of sequence"
                    );
                    outcome.warnings.push(warning);
                }

                current = SectionAccumulator::open(next_id, page.page_number);
                cursor = marker.end;
            }

            current = current.append(&text[cursor..], page.page_number);
        }

        let label = self.label_for(current.section_id);
        outcome.units.push(current.finish(document_id, label));

        debug!(
            document_id = %document_id,
            sections = outcome.units.len(),
            "section segmentation finished"
        );

        Ok(outcome)
    }
}
