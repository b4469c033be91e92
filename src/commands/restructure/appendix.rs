use regex::Regex;

use super::profile::{DocumentProfile, compile_pattern};
use super::types::{PipelineError, TextUnit, UnitKind};

#[derive(Debug, Clone)]
pub struct AppendixExtractor {
    marker_regex: Regex,
    phrase: String,
}

#[derive(Debug, Clone, Default)]
pub struct AppendixSplit {
    /// The pre-marker remainder of the source unit, if any text is left.
    pub main: Option<TextUnit>,
    pub appendices: Vec<TextUnit>,
}

impl AppendixExtractor {
    pub fn new(profile: &DocumentProfile) -> Result<Self, PipelineError> {
        Ok(Self {
            marker_regex: compile_pattern("appendix marker", &profile.appendix_pattern())?,
            phrase: profile.appendix_phrase.split_whitespace().collect::<Vec<&str>>().join(" "),
        })
    }

    /// Splits trailing `Załącznik nr <n>` blocks out of a single unit. Each
    /// appendix keeps its marker and runs to the next marker or the end.
    pub fn split(&self, unit: TextUnit) -> AppendixSplit {
        let markers = self
            .marker_regex
            .captures_iter(&unit.content)
            .filter_map(|captures| {
                let whole = captures.get(0)?;
                let number = captures.get(1).map(|value| value.as_str().to_string());
                let title = captures.get(2).map(|value| value.as_str().trim().to_string());
                Some((whole.start(), number, title))
            })
            .collect::<Vec<_>>();

        if markers.is_empty() {
            return AppendixSplit {
                main: Some(unit),
                appendices: Vec::new(),
            };
        }

        let mut appendices = Vec::with_capacity(markers.len());
        for (index, (start, number, title)) in markers.iter().enumerate() {
            let end = markers
                .get(index + 1)
                .map(|next| next.0)
                .unwrap_or(unit.content.len());

            let mut metadata = unit.metadata.clone();
            metadata.kind = UnitKind::Appendix;
            metadata.section_id = None;
            metadata.section_label = None;
            metadata.section_title = None;
            metadata.paragraph_id = None;
            metadata.paragraph_label = None;
            metadata.paragraph_title = None;
            metadata.appendix_index = Some((index + 1) as u32);
            metadata.appendix_label = number
                .as_ref()
                .map(|number| format!("{} {}", self.phrase, number));
            metadata.appendix_title = title.clone().filter(|value| !value.is_empty());

            appendices.push(TextUnit {
                content: unit.content[*start..end].trim().to_string(),
                metadata,
            });
        }

        let head = unit.content[..markers[0].0].trim();
        let main = if head.is_empty() {
            None
        } else {
            Some(TextUnit {
                content: head.to_string(),
                metadata: unit.metadata,
            })
        };

        AppendixSplit { main, appendices }
    }

    /// Runs [`Self::split`] on the last unit only and splices the result back.
    pub fn extract(&self, mut units: Vec<TextUnit>) -> (Vec<TextUnit>, usize) {
        let Some(last) = units.pop() else {
            return (units, 0);
        };

        let split = self.split(last);
        let appendix_count = split.appendices.len();
        units.extend(split.main);
        units.extend(split.appendices);
        (units, appendix_count)
    }
}
