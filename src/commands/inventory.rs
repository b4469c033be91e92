use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use regex::Regex;
use tracing::{info, warn};

use crate::cli::InventoryArgs;
use crate::model::{PdfEntry, PdfInventoryManifest};
use crate::util::{now_utc_string, sha256_file, write_json_pretty};

pub fn run(args: InventoryArgs) -> Result<()> {
    let manifest = build_manifest(&args.source_root)?;

    if args.dry_run {
        for pdf in &manifest.pdfs {
            info!(
                document_id = %pdf.document_id,
                gazette_year = pdf.gazette_year.unwrap_or_default(),
                gazette_position = pdf.gazette_position.unwrap_or_default(),
                "inventory entry"
            );
        }
        info!(
            pdf_count = manifest.pdf_count,
            source = %manifest.source_directory,
            "inventory dry-run complete"
        );
        return Ok(());
    }

    let manifest_path = args
        .manifest_path
        .unwrap_or_else(|| default_manifest_path(&args.source_root));

    write_json_pretty(&manifest_path, &manifest)?;
    info!(path = %manifest_path.display(), "wrote inventory manifest");
    info!(pdf_count = manifest.pdf_count, "inventory completed");

    Ok(())
}

pub fn default_manifest_path(source_root: &Path) -> PathBuf {
    source_root.join("manifests").join("pdf_inventory.json")
}

pub fn build_manifest(source_root: &Path) -> Result<PdfInventoryManifest> {
    let pattern = gazette_filename_regex()?;

    let mut pdf_paths = discover_pdfs(source_root)?;
    pdf_paths.sort();

    if pdf_paths.is_empty() {
        bail!("no PDFs found in {}", source_root.display());
    }

    let mut pdfs = Vec::with_capacity(pdf_paths.len());
    for path in pdf_paths {
        let filename = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(ToOwned::to_owned)
            .with_context(|| format!("invalid UTF-8 filename: {}", path.display()))?;

        let gazette = parse_gazette_reference(&filename, &pattern);
        if gazette.is_none() {
            warn!(filename = %filename, "filename carries no gazette reference");
        }
        let sha256 = sha256_file(&path)?;

        pdfs.push(PdfEntry {
            document_id: filename.clone(),
            filename,
            sha256,
            gazette_year: gazette.map(|(year, _)| year),
            gazette_position: gazette.map(|(_, position)| position),
        });
    }

    pdfs.sort_by(|a, b| a.document_id.cmp(&b.document_id));

    Ok(PdfInventoryManifest {
        manifest_version: 1,
        generated_at: now_utc_string(),
        source_directory: source_root.display().to_string(),
        pdf_count: pdfs.len(),
        pdfs,
    })
}

pub(crate) fn gazette_filename_regex() -> Result<Regex> {
    Regex::new(r"(?i)^D(\d{4})(\d{1,4})\.pdf$").context("failed to compile gazette filename regex")
}

fn discover_pdfs(source_root: &Path) -> Result<Vec<PathBuf>> {
    let mut pdfs = Vec::new();

    let entries = fs::read_dir(source_root)
        .with_context(|| format!("failed to read {}", source_root.display()))?;

    for entry in entries {
        let entry =
            entry.with_context(|| format!("failed to read entry in {}", source_root.display()))?;
        let path = entry.path();

        if !entry
            .file_type()
            .with_context(|| format!("failed to inspect file type: {}", path.display()))?
            .is_file()
        {
            continue;
        }

        let is_pdf = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("pdf"))
            .unwrap_or(false);

        if is_pdf {
            pdfs.push(path);
        }
    }

    Ok(pdfs)
}

/// `D20191065.pdf` is Dz.U. 2019 poz. 1065.
pub(crate) fn parse_gazette_reference(filename: &str, pattern: &Regex) -> Option<(u32, u32)> {
    let captures = pattern.captures(filename)?;
    let year = captures.get(1)?.as_str().parse::<u32>().ok()?;
    let position = captures.get(2)?.as_str().parse::<u32>().ok()?;
    Some((year, position))
}
