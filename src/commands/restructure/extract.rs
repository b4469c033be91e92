use std::fs;
use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result, bail};

use crate::model::ToolVersions;

use super::types::RawPage;

pub(crate) fn extract_pages_with_pdftotext(
    pdf_path: &Path,
    max_pages_per_doc: Option<usize>,
) -> Result<Vec<RawPage>> {
    let mut command = Command::new("pdftotext");
    command.arg("-enc").arg("UTF-8").arg("-f").arg("1");
    if let Some(max_pages) = max_pages_per_doc {
        command.arg("-l").arg(max_pages.to_string());
    }
    command.arg(pdf_path).arg("-");

    let output = command
        .output()
        .with_context(|| format!("failed to execute pdftotext for {}", pdf_path.display()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!(
            "pdftotext returned non-zero exit status for {}: {}",
            pdf_path.display(),
            stderr.trim()
        );
    }

    let raw = String::from_utf8_lossy(&output.stdout);
    Ok(split_form_feed_pages(&raw))
}

/// pdftotext separates pages with a form feed and ends with one, so trailing
/// blank chunks are not pages.
pub(crate) fn split_form_feed_pages(raw: &str) -> Vec<RawPage> {
    let mut chunks: Vec<String> = raw
        .split('\u{000C}')
        .map(|chunk| chunk.replace('\u{0000}', ""))
        .collect();

    while chunks.last().is_some_and(|last| last.trim().is_empty()) {
        chunks.pop();
    }

    chunks
        .into_iter()
        .enumerate()
        .map(|(index, text)| RawPage::new((index + 1) as u32, text))
        .collect()
}

pub(crate) fn load_pages_json(path: &Path) -> Result<Vec<RawPage>> {
    let raw = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let pages: Vec<RawPage> = serde_json::from_slice(&raw)
        .with_context(|| format!("failed to parse page list {}", path.display()))?;
    Ok(pages)
}

pub(crate) fn collect_tool_versions() -> ToolVersions {
    ToolVersions {
        warunki: env!("CARGO_PKG_VERSION").to_string(),
        pdftotext: command_version_optional("pdftotext", &["-v"]),
    }
}

fn command_version_optional(program: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(program).args(args).output().ok()?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    let source = if stdout.trim().is_empty() {
        stderr.trim()
    } else {
        stdout.trim()
    };

    source
        .lines()
        .next()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| line.to_string())
}
