use std::collections::BTreeSet;

use rusqlite::Connection;

use super::appendix::AppendixExtractor;
use super::extract::split_form_feed_pages;
use super::normalize::{NormalizeStats, Normalizer};
use super::paragraphs::ParagraphSegmenter;
use super::pipeline::Restructurer;
use super::profile::DocumentProfile;
use super::sections::{SectionSegmenter, parse_roman, to_roman};
use super::store::{
    DocumentRecord, count_rows, count_units_by_kind, ensure_schema, replace_document_units,
};
use super::types::{PipelineError, RawPage, Stage, TextUnit, UnitKind, UnitMetadata, UnitRecord};

const DOC: &str = "D20191065.pdf";
const PREFIX: &str = "Załącznik do obwieszczenia Ministra Inwestycji i Rozwoju z dnia 8 kwietnia 2019 r. (poz. 1065)";

fn normalizer() -> Normalizer {
    Normalizer::new(&DocumentProfile::default()).expect("default profile compiles")
}

fn section_segmenter() -> SectionSegmenter {
    SectionSegmenter::new(&DocumentProfile::default()).expect("default profile compiles")
}

fn paragraph_segmenter() -> ParagraphSegmenter {
    ParagraphSegmenter::new(&DocumentProfile::default()).expect("default profile compiles")
}

fn appendix_extractor() -> AppendixExtractor {
    AppendixExtractor::new(&DocumentProfile::default()).expect("default profile compiles")
}

fn restructurer() -> Restructurer {
    Restructurer::new(&DocumentProfile::default()).expect("default profile compiles")
}

fn pages(texts: &[&str]) -> Vec<RawPage> {
    texts
        .iter()
        .enumerate()
        .map(|(index, text)| RawPage::new((index + 1) as u32, *text))
        .collect()
}

fn unit(content: &str, section_id: u32) -> TextUnit {
    let mut metadata = UnitMetadata::new(DOC, UnitKind::Paragraph);
    metadata.section_id = Some(section_id);
    metadata.section_label = Some(format!("DZIAŁ {}", to_roman(section_id)));
    metadata.paragraph_id = Some(3);
    metadata.source_pages = BTreeSet::from([7, 8]);
    TextUnit {
        content: content.to_string(),
        metadata,
    }
}

fn squash(text: &str) -> String {
    text.split_whitespace().collect::<Vec<&str>>().join(" ")
}

#[test]
fn strip_prefix_only_applies_at_page_start() {
    let normalizer = normalizer();

    assert_eq!(normalizer.strip_prefix("random text"), "random text");
    assert_eq!(normalizer.strip_prefix(&format!("{PREFIX}X")), "X");
    assert_eq!(
        normalizer.strip_prefix(&format!("  \n{PREFIX}\n\n  Treść strony  ")),
        "Treść strony"
    );

    let spread = "Załącznik do\nobwieszczenia  Ministra Inwestycji i Rozwoju\nz dnia 8 kwietnia 2019 r.\n(poz. 1065)\nDZIAŁ I";
    assert_eq!(normalizer.strip_prefix(spread), "DZIAŁ I");

    let embedded = format!("Tekst przed {PREFIX} tekst po");
    assert_eq!(normalizer.strip_prefix(&embedded), embedded);
}

#[test]
fn remove_header_collapses_running_header_to_single_newline() {
    let normalizer = normalizer();

    assert_eq!(
        normalizer.remove_header("Treść\n\nDziennik Ustaw – 12 – Poz. 1065\n\nDalej"),
        "Treść\nDalej"
    );
    assert_eq!(
        normalizer.remove_header("Dziennik  Ustaw –\n7\n– Poz. 1065\nStart"),
        "\nStart"
    );
    assert_eq!(
        normalizer.remove_header("A\nDziennik Ustaw – 3 – Poz. 1065\nB\nDziennik Ustaw – 4 – Poz. 1065\nC"),
        "A\nB\nC"
    );
}

#[test]
fn remove_header_is_identity_without_header() {
    let normalizer = normalizer();

    for text in [
        "",
        "Dziennik Ustaw bez numeru strony",
        "Poz. 1065 w treści",
        "Dziennik Ustaw – 3 – Poz. 999\nInny akt",
        "zwykły tekst\n\nz pustą linią",
    ] {
        assert_eq!(normalizer.remove_header(text), text);
    }
}

#[test]
fn wrap_footer_tags_block_after_last_blank_line() {
    let normalizer = normalizer();

    assert_eq!(
        normalizer.wrap_footer("Treść główna\n\nPierwszy akapit\n\n1) Przypis"),
        "Treść główna\n\nPierwszy akapit\n\n<przypisy>\n1) Przypis\n</przypisy>\n"
    );
    assert_eq!(normalizer.wrap_footer("a\nb"), "a\nb");
    assert_eq!(normalizer.wrap_footer("a\nb\n\n"), "a\nb\n\n");
}

#[test]
fn link_annotations_tags_inline_references_and_drops_stray_parens() {
    let normalizer = normalizer();

    assert_eq!(
        normalizer.link_annotations("zgodnie z ustawą1) oraz"),
        "zgodnie z ustawą <przypis>1</przypis> oraz"
    );
    assert_eq!(
        normalizer.link_annotations("budynku12) i 3) dalej"),
        "budynku <przypis>12</przypis> i 3 dalej"
    );
    assert_eq!(
        normalizer.link_annotations("bez odnośników"),
        "bez odnośników"
    );
}

#[test]
fn merge_newline_divided_words_joins_fragments() {
    let normalizer = normalizer();

    assert_eq!(normalizer.merge_newline_divided_words("wy-\nraz"), "wyraz");
    assert_eq!(normalizer.merge_newline_divided_words("po-  \n  dział"), "podział");
    assert_eq!(normalizer.merge_newline_divided_words("a-\nb-\nc"), "abc");
    assert_eq!(
        normalizer.merge_newline_divided_words("biało-czerwony"),
        "biało-czerwony"
    );
}

#[test]
fn merge_newline_divided_words_is_idempotent() {
    let normalizer = normalizer();

    for text in [
        "wy-\nraz",
        "a-\nb-\nc-\nd",
        "prze-\n  strzeń i po-\nmieszczenie",
        "słowo -\nnie",
        "bez zmian",
    ] {
        let once = normalizer.merge_newline_divided_words(text);
        let twice = normalizer.merge_newline_divided_words(&once);
        assert_eq!(once, twice, "input: {text:?}");
    }
}

#[test]
fn normalize_page_applies_transforms_in_order() {
    let normalizer = normalizer();
    let mut stats = NormalizeStats::default();

    let raw = format!(
        "Dziennik Ustaw – 2 – Poz. 1065\n{PREFIX}\nTreść bu-\ndynku1)\n\n1) Przypis dolny"
    );
    let normalized = normalizer.normalize_page(&raw, &mut stats);

    assert_eq!(
        normalized,
        "Treść budynku <przypis>1</przypis>\n\n<przypisy>\n1 Przypis dolny\n</przypisy>"
    );
    assert_eq!(
        stats,
        NormalizeStats {
            pages: 1,
            headers_removed: 1,
            prefixes_stripped: 1,
            footers_wrapped: 1,
            annotations_linked: 1,
            hyphen_merges: 1,
        }
    );
}

#[test]
fn normalize_pages_rejects_out_of_order_pages() {
    let normalizer = normalizer();

    let duplicated = vec![RawPage::new(1, "a"), RawPage::new(1, "b")];
    let err = normalizer
        .normalize_pages(DOC, duplicated)
        .expect_err("duplicate page must fail");
    assert!(matches!(
        err,
        PipelineError::PageOutOfOrder {
            stage: Stage::Normalize,
            page: 1,
            previous: 1,
            ..
        }
    ));
    assert!(err.to_string().contains(DOC));

    let zero = vec![RawPage::new(0, "a")];
    let err = normalizer
        .normalize_pages(DOC, zero)
        .expect_err("page 0 must fail");
    assert!(matches!(
        err,
        PipelineError::ZeroPageNumber {
            stage: Stage::Normalize,
            position: 0,
            ..
        }
    ));
}

#[test]
fn sections_follow_the_reference_scenario() {
    let normalizer = normalizer();
    let segmenter = section_segmenter();

    let raw = pages(&[
        "Dziennik Ustaw – 3 – Poz. 1065\nDZIAŁ I\nTytuł wstępny\nTreść A",
        "treść-\nkontynuowana DZIAŁ II\nTytuł drugi\nTreść B",
    ]);
    let (normalized, _) = normalizer
        .normalize_pages(DOC, raw)
        .expect("pages are ordered");
    let outcome = segmenter
        .segment(DOC, &normalized)
        .expect("pages are ordered");
    let sections = outcome.units;

    assert_eq!(sections.len(), 3);
    assert!(outcome.warnings.is_empty());

    assert_eq!(sections[0].metadata.section_id, Some(0));
    assert_eq!(sections[0].metadata.section_label.as_deref(), Some("WSTĘP"));
    assert!(sections[0].content.trim().is_empty());

    assert_eq!(sections[1].metadata.section_id, Some(1));
    assert!(
        sections[1]
            .content
            .starts_with("Tytuł wstępny\nTreść Atreśćkontynuowana "),
        "got {:?}",
        sections[1].content
    );
    assert_eq!(sections[1].metadata.section_label.as_deref(), Some("DZIAŁ I"));
    assert_eq!(
        sections[1].metadata.section_title.as_deref(),
        Some("Tytuł wstępny")
    );
    assert_eq!(sections[1].metadata.source_pages, BTreeSet::from([1, 2]));

    assert_eq!(sections[2].metadata.section_id, Some(2));
    assert!(sections[2].content.starts_with("Tytuł drugi\nTreść B"));
    assert_eq!(sections[2].metadata.source_pages, BTreeSet::from([2]));
    assert!(sections.iter().all(|unit| unit.metadata.document_id == DOC));
}

#[test]
fn section_count_is_markers_plus_preamble_and_pages_are_covered() {
    let segmenter = section_segmenter();
    let input = pages(&[
        "Wstęp do aktu",
        "DZIAŁ I\nPrzepisy ogólne\ntekst",
        "ciąg dalszy",
        "DZIAŁ II\nZabudowa",
        "",
        "DZIAŁ III\nBudynki",
    ]);

    let sections = segmenter.segment(DOC, &input).expect("pages are ordered").units;

    assert_eq!(sections.len(), 4);
    let ids = sections
        .iter()
        .map(|unit| unit.metadata.section_id)
        .collect::<Vec<_>>();
    assert_eq!(ids, vec![Some(0), Some(1), Some(2), Some(3)]);

    let covered = sections
        .iter()
        .flat_map(|unit| unit.metadata.source_pages.iter().copied())
        .collect::<BTreeSet<u32>>();
    assert_eq!(covered, (1..=6).collect::<BTreeSet<u32>>());

    assert_eq!(sections[1].metadata.source_pages, BTreeSet::from([2, 3]));
    assert_eq!(sections[2].metadata.source_pages, BTreeSet::from([4, 5]));
}

#[test]
fn every_marker_on_a_page_opens_a_section() {
    let segmenter = section_segmenter();
    let input = pages(&["Wstęp\nDZIAŁ I\nPierwszy\nDZIAŁ II\nDrugi"]);

    let sections = segmenter.segment(DOC, &input).expect("pages are ordered").units;

    assert_eq!(sections.len(), 3);
    assert_eq!(sections[0].content, "Wstęp\n");
    assert_eq!(sections[1].content, "Pierwszy\n");
    assert_eq!(sections[2].content, "Drugi");
    assert!(
        sections
            .iter()
            .all(|unit| unit.metadata.source_pages == BTreeSet::from([1]))
    );
}

#[test]
fn section_markers_tolerate_letter_spacing_but_need_a_numeral() {
    let segmenter = section_segmenter();

    let spaced = segmenter
        .segment(DOC, &pages(&["D Z I A Ł  I\nTytuł"]))
        .expect("pages are ordered");
    assert_eq!(spaced.units.len(), 2);
    assert_eq!(spaced.units[1].metadata.section_title.as_deref(), Some("Tytuł"));

    let prose = segmenter
        .segment(DOC, &pages(&["DZIAŁ Ciepłownictwo nie jest markerem"]))
        .expect("pages are ordered");
    assert_eq!(prose.units.len(), 1);
}

#[test]
fn section_markers_survive_glued_titles() {
    let segmenter = section_segmenter();

    let outcome = segmenter
        .segment(DOC, &pages(&["Wstęp", "DZIAŁ IIPrzepisy ogólne\nTreść"]))
        .expect("pages are ordered");

    assert_eq!(outcome.units.len(), 2);
    assert_eq!(outcome.units[0].content, "Wstęp\n");
    assert_eq!(outcome.units[1].content, "Przepisy ogólne\nTreść");
    assert_eq!(
        outcome.units[1].metadata.section_title.as_deref(),
        Some("Przepisy ogólne")
    );
    assert_eq!(outcome.warnings.len(), 1);
    assert!(outcome.warnings[0].contains("'II'"));

    let glued_letter = segmenter
        .segment(DOC, &pages(&["DZIAŁ IICiepłownictwo\nTreść"]))
        .expect("pages are ordered");
    assert_eq!(glued_letter.units.len(), 2);
    assert_eq!(glued_letter.units[1].content, "Ciepłownictwo\nTreść");

    for prose in [
        "DZIAŁ Ciepłownictwo",
        "DZIAŁ\nIstota sprawy",
        "DZIAŁ CIEPŁOWNICZY",
    ] {
        let outcome = segmenter
            .segment(DOC, &pages(&[prose]))
            .expect("pages are ordered");
        assert_eq!(outcome.units.len(), 1, "input: {prose:?}");
    }

    assert!(segmenter.starts_with_marker("DZIAŁ IVWymagania"));
    assert!(!segmenter.starts_with_marker("DZIAŁ Ciepłownictwo"));
}

#[test]
fn paragraph_markers_survive_glued_titles() {
    let sections = section_segmenter()
        .segment(
            DOC,
            &pages(&["DZIAŁ I\nT\nRozdział 1Przepisy\nA\nRozdział 2\nB"]),
        )
        .expect("pages are ordered")
        .units;

    let paragraphs = paragraph_segmenter().segment(sections);

    assert_eq!(paragraphs.len(), 3);
    assert_eq!(paragraphs[1].content, "Rozdział 1Przepisy\nA");
    assert_eq!(
        paragraphs[1].metadata.paragraph_label.as_deref(),
        Some("Rozdział 1")
    );
    assert_eq!(
        paragraphs[1].metadata.paragraph_title.as_deref(),
        Some("Przepisy")
    );
    assert_eq!(paragraphs[2].metadata.paragraph_id, Some(2));
}

#[test]
fn out_of_sequence_numerals_are_reported_not_fatal() {
    let segmenter = section_segmenter();

    let outcome = segmenter
        .segment(DOC, &pages(&["DZIAŁ I\nA", "DZIAŁ III\nB"]))
        .expect("pages are ordered");

    assert_eq!(outcome.units.len(), 3);
    assert_eq!(outcome.warnings.len(), 1);
    assert!(outcome.warnings[0].contains("'III'"));
    assert_eq!(
        outcome.units[2].metadata.section_label.as_deref(),
        Some("DZIAŁ II")
    );
}

#[test]
fn paragraphs_split_on_chapter_markers_and_restart_per_section() {
    let sections = section_segmenter()
        .segment(
            DOC,
            &pages(&[
                "DZIAŁ I\nTytuł\nWprowadzenie\nRozdział 1\nPrzepisy ogólne\n§ 1. Tekst\nRozdział 2a\nWymagania\n§ 2. Tekst",
                "DZIAŁ II\nDrugi\nRozdział 1\nZakres\n§ 3. Tekst",
            ]),
        )
        .expect("pages are ordered")
        .units;
    let section_one = sections[1].clone();

    let paragraphs = paragraph_segmenter().segment(sections);

    assert_eq!(paragraphs.len(), 5);
    assert!(paragraphs.iter().all(|unit| unit.metadata.kind == UnitKind::Paragraph));
    assert!(paragraphs.iter().all(|unit| !unit.content.trim().is_empty()));

    let positions = paragraphs
        .iter()
        .map(|unit| (unit.metadata.section_id, unit.metadata.paragraph_id))
        .collect::<Vec<_>>();
    assert_eq!(
        positions,
        vec![
            (Some(1), Some(0)),
            (Some(1), Some(1)),
            (Some(1), Some(2)),
            (Some(2), Some(0)),
            (Some(2), Some(1)),
        ]
    );

    assert_eq!(paragraphs[0].content, "Tytuł\nWprowadzenie");
    assert_eq!(paragraphs[0].metadata.paragraph_label, None);
    assert_eq!(
        paragraphs[1].metadata.paragraph_label.as_deref(),
        Some("Rozdział 1")
    );
    assert_eq!(
        paragraphs[1].metadata.paragraph_title.as_deref(),
        Some("Przepisy ogólne")
    );
    assert_eq!(
        paragraphs[2].metadata.paragraph_label.as_deref(),
        Some("Rozdział 2a")
    );
    assert_eq!(paragraphs[1].metadata.section_title.as_deref(), Some("Tytuł"));
    assert_eq!(
        paragraphs[1].metadata.source_pages,
        section_one.metadata.source_pages
    );

    let rejoined = paragraphs[..3]
        .iter()
        .map(|unit| unit.content.as_str())
        .collect::<Vec<&str>>()
        .join("\n");
    assert_eq!(squash(&rejoined), squash(&section_one.content));
}

#[test]
fn section_without_chapters_becomes_single_paragraph() {
    let sections = section_segmenter()
        .segment(DOC, &pages(&["Preambuła aktu", "DZIAŁ I\nTytuł\n§ 1. Tekst"]))
        .expect("pages are ordered")
        .units;

    let paragraphs = paragraph_segmenter().segment(sections);

    assert_eq!(paragraphs.len(), 2);
    assert_eq!(paragraphs[0].metadata.section_id, Some(0));
    assert_eq!(paragraphs[0].metadata.paragraph_id, Some(0));
    assert_eq!(paragraphs[0].content, "Preambuła aktu");
    assert_eq!(paragraphs[1].metadata.section_id, Some(1));
    assert_eq!(paragraphs[1].metadata.paragraph_id, Some(0));
}

#[test]
fn appendix_extractor_isolates_each_appendix() {
    let source = unit(
        "Ostatni rozdział\nTreść końcowa\nZałącznik nr 1\nWARUNKI OGÓLNE\nTreść pierwsza\nZałącznik nr 2 \nTABELA WSKAŹNIKÓW\nTreść druga",
        12,
    );

    let split = appendix_extractor().split(source.clone());

    let main = split.main.expect("pre-marker text survives");
    assert_eq!(main.content, "Ostatni rozdział\nTreść końcowa");
    assert_eq!(main.metadata, source.metadata);

    assert_eq!(split.appendices.len(), 2);
    for (index, appendix) in split.appendices.iter().enumerate() {
        let meta = &appendix.metadata;
        assert_eq!(meta.kind, UnitKind::Appendix);
        assert_eq!(meta.appendix_index, Some(index as u32 + 1));
        assert_eq!(meta.section_id, None);
        assert_eq!(meta.paragraph_id, None);
        assert_eq!(meta.document_id, DOC);
        assert_eq!(meta.source_pages, source.metadata.source_pages);
    }

    let first = &split.appendices[0];
    assert_eq!(
        first.content,
        "Załącznik nr 1\nWARUNKI OGÓLNE\nTreść pierwsza"
    );
    assert_eq!(first.metadata.appendix_label.as_deref(), Some("Załącznik nr 1"));
    assert_eq!(first.metadata.appendix_title.as_deref(), Some("WARUNKI OGÓLNE"));
    assert_eq!(
        split.appendices[1].metadata.appendix_title.as_deref(),
        Some("TABELA WSKAŹNIKÓW")
    );
    assert!(split.appendices[1].content.ends_with("Treść druga"));
}

#[test]
fn appendix_extractor_is_identity_without_markers() {
    let source = unit("Załącznik nr 3\nopis małymi literami", 4);

    let split = appendix_extractor().split(source.clone());

    assert_eq!(split.main, Some(source));
    assert!(split.appendices.is_empty());
}

#[test]
fn appendix_extraction_only_touches_the_last_unit() {
    let units = vec![
        unit("Załącznik nr 9\nNIE DOTYCZY\nw środku dokumentu", 1),
        unit("Załącznik nr 1\nOSTATNI\nTreść", 2),
    ];

    let (out, appendix_count) = appendix_extractor().extract(units.clone());

    assert_eq!(appendix_count, 1);
    assert_eq!(out.len(), 2);
    assert_eq!(out[0], units[0]);
    assert_eq!(out[1].metadata.kind, UnitKind::Appendix);

    let (empty, count) = appendix_extractor().extract(Vec::new());
    assert!(empty.is_empty());
    assert_eq!(count, 0);
}

#[test]
fn display_text_prefixes_heading_once() {
    let restructurer = restructurer();

    let mut paragraph = unit("Rozdział 1\nTreść", 1);
    paragraph.metadata.section_title = Some("Przepisy ogólne".to_string());
    assert_eq!(
        restructurer.display_text(&paragraph),
        "<dział>\n  <nazwa>DZIAŁ I</nazwa>\n  <tytuł>Przepisy ogólne</tytuł>\n</dział>\nRozdział 1\nTreść"
    );

    let already_headed = unit("DZIAŁ II\nZabudowa\nTreść", 2);
    assert_eq!(
        restructurer.display_text(&already_headed),
        "DZIAŁ II\nZabudowa\nTreść"
    );

    let mut appendix = unit("Załącznik nr 1\nTABELA", 0);
    appendix.metadata.kind = UnitKind::Appendix;
    appendix.metadata.appendix_index = Some(1);
    assert!(
        restructurer
            .display_text(&appendix)
            .starts_with("<dział>\n  <nazwa>ZAŁĄCZNIKI</nazwa>\n</dział>\n")
    );
}

#[test]
fn restructure_runs_every_stage_deterministically() {
    let restructurer = restructurer();
    let input = pages(&[
        format!("{PREFIX}\nPrzepisy wprowadzające").as_str(),
        "Dziennik Ustaw – 2 – Poz. 1065\nDZIAŁ I\nPrzepisy ogólne\nRozdział 1\nZakres\n§ 1. Roz-\nporządzenie określa",
        "Dziennik Ustaw – 3 – Poz. 1065\nDZIAŁ II\nZagospodarowanie\nRozdział 1\nUsytuowanie\n§ 2. Tekst\nZałącznik nr 1\nWYMAGANIA SZCZEGÓŁOWE\nTreść załącznika",
    ]);

    let first = restructurer
        .restructure(DOC, input.clone())
        .expect("pipeline succeeds");
    let second = restructurer
        .restructure(DOC, input)
        .expect("pipeline succeeds");
    assert_eq!(first.units, second.units);

    let kinds = first
        .units
        .iter()
        .map(|unit| unit.metadata.kind)
        .collect::<Vec<_>>();
    assert_eq!(
        kinds,
        vec![
            UnitKind::Paragraph,
            UnitKind::Paragraph,
            UnitKind::Paragraph,
            UnitKind::Paragraph,
            UnitKind::Paragraph,
            UnitKind::Appendix,
        ]
    );

    assert_eq!(first.page_count, 3);
    assert_eq!(first.stats.section_units, 3);
    assert_eq!(first.stats.paragraph_units, 5);
    assert_eq!(first.stats.appendix_units, 1);
    assert_eq!(first.stats.normalize.headers_removed, 2);
    assert_eq!(first.stats.normalize.prefixes_stripped, 1);
    assert_eq!(first.stats.normalize.hyphen_merges, 1);

    assert_eq!(first.units[0].content, "Przepisy wprowadzające");
    assert!(first.units[2].content.contains("Rozporządzenie określa"));
    assert!(first.units.iter().all(|unit| !unit.content.trim().is_empty()));
}

#[test]
fn invalid_profiles_are_typed_errors() {
    let profile = DocumentProfile {
        section_keyword: "  ".to_string(),
        ..DocumentProfile::default()
    };

    let err = Restructurer::new(&profile).expect_err("blank keyword must fail");
    assert!(matches!(
        err,
        PipelineError::EmptyProfileField {
            field: "section_keyword"
        }
    ));
}

#[test]
fn profile_overrides_are_honoured() {
    let profile = DocumentProfile {
        publisher: "Monitor Polski".to_string(),
        gazette_position: "42".to_string(),
        ..DocumentProfile::default()
    };
    let normalizer = Normalizer::new(&profile).expect("profile compiles");

    assert_eq!(
        normalizer.remove_header("A\nMonitor Polski – 1 – Poz. 42\nB"),
        "A\nB"
    );
    assert_eq!(
        normalizer.remove_header("A\nDziennik Ustaw – 1 – Poz. 1065\nB"),
        "A\nDziennik Ustaw – 1 – Poz. 1065\nB"
    );

    let parsed: DocumentProfile =
        serde_json::from_str(r#"{"gazette_position": "42"}"#).expect("partial profile parses");
    assert_eq!(parsed.gazette_position, "42");
    assert_eq!(parsed.section_keyword, "DZIAŁ");
}

#[test]
fn roman_numerals_round_trip_canonical_forms() {
    assert_eq!(to_roman(4), "IV");
    assert_eq!(to_roman(9), "IX");
    assert_eq!(to_roman(14), "XIV");
    assert_eq!(to_roman(1994), "MCMXCIV");

    assert_eq!(parse_roman("XIV"), Some(14));
    assert_eq!(parse_roman("XII"), Some(12));
    assert_eq!(parse_roman("IIII"), None);
    assert_eq!(parse_roman("ABC"), None);
    assert_eq!(parse_roman(""), None);
    assert_eq!(parse_roman(&"M".repeat(4_300_000)), None);
}

#[test]
fn flat_metadata_holds_only_scalars() {
    let paragraph = unit("Treść", 2);
    let flat = paragraph.flat_metadata();

    assert!(flat.values().all(|value| !value.is_array() && !value.is_object()));
    assert_eq!(flat["unit_id"], "D20191065.pdf:section:02:paragraph:003");
    assert_eq!(flat["source_pages"], "7,8");
    assert_eq!(flat["page_start"], 7);
    assert_eq!(flat["page_end"], 8);
    assert!(flat["appendix_index"].is_null());

    let mut appendix = unit("Załącznik", 0);
    appendix.metadata.kind = UnitKind::Appendix;
    appendix.metadata.section_id = None;
    appendix.metadata.paragraph_id = None;
    appendix.metadata.appendix_index = Some(2);
    assert_eq!(appendix.unit_id(), "D20191065.pdf:appendix:02");
}

#[test]
fn interchange_records_carry_flat_metadata() {
    let restructurer = restructurer();
    let document = restructurer
        .restructure(DOC, pages(&["DZIAŁ I\nTytuł\nTreść", "ciąg dalszy"]))
        .expect("pipeline succeeds");

    let records = document
        .units
        .iter()
        .map(|unit| restructurer.interchange_record(unit))
        .collect::<Vec<UnitRecord>>();

    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.unit_id, "D20191065.pdf:section:01:paragraph:000");
    assert_eq!(record.content, "Tytuł\nTreśćciąg dalszy");
    assert!(record.display_text.starts_with("<dział>\n  <nazwa>DZIAŁ I</nazwa>"));

    let json = serde_json::to_value(record).expect("record serializes");
    let metadata = json["metadata"].as_object().expect("metadata is an object");
    assert!(metadata.values().all(|value| !value.is_array() && !value.is_object()));
    assert_eq!(metadata["source_pages"], "1,2");
}

#[test]
fn form_feed_split_numbers_pages_and_drops_trailing_blanks() {
    let split = split_form_feed_pages("pierwsza\u{000C}druga\u{0000}\u{000C}\n\u{000C}");

    assert_eq!(
        split,
        vec![RawPage::new(1, "pierwsza"), RawPage::new(2, "druga")]
    );
}

#[test]
fn store_replaces_units_per_document() {
    let restructurer = restructurer();
    let document = restructurer
        .restructure(
            DOC,
            pages(&[
                "DZIAŁ I\nTytuł\nRozdział 1\nA\nRozdział 2\nB\nZałącznik nr 1\nTABELA\nC",
            ]),
        )
        .expect("pipeline succeeds");

    let mut connection = Connection::open_in_memory().expect("in-memory sqlite");
    ensure_schema(&connection).expect("schema");
    let record = DocumentRecord {
        document_id: DOC,
        filename: Some(DOC),
        sha256: Some("abc"),
        restructured_at: "2026-01-01T00:00:00Z",
    };

    let first = replace_document_units(&mut connection, &record, &document, &restructurer)
        .expect("first insert");
    let second = replace_document_units(&mut connection, &record, &document, &restructurer)
        .expect("replacement");

    assert_eq!(first, document.units.len());
    assert_eq!(second, first);
    assert_eq!(
        count_rows(&connection, "SELECT COUNT(*) FROM units").expect("count"),
        first as i64
    );
    assert_eq!(
        count_rows(&connection, "SELECT COUNT(*) FROM documents").expect("count"),
        1
    );

    let by_kind = count_units_by_kind(&connection).expect("kinds");
    assert_eq!(
        by_kind,
        vec![("appendix".to_string(), 1), ("paragraph".to_string(), 3)]
    );

    let display: String = connection
        .query_row(
            "SELECT display_text FROM units WHERE kind = 'paragraph' ORDER BY unit_seq LIMIT 1",
            [],
            |row| row.get(0),
        )
        .expect("row");
    assert!(display.starts_with("<dział>\n  <nazwa>DZIAŁ I</nazwa>"));
}
