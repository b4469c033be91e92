use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rusqlite::Connection;
use tracing::{info, warn};

use crate::cli::StatusArgs;
use crate::commands::inventory::default_manifest_path;
use crate::commands::restructure::{count_rows, count_units_by_kind, default_db_path};
use crate::model::{PdfInventoryManifest, RestructureRunManifest};
use crate::util::read_json;

pub fn run(args: StatusArgs) -> Result<()> {
    let manifest_dir = args.source_root.join("manifests");
    let inventory_path = default_manifest_path(&args.source_root);
    let db_path = args
        .db_path
        .clone()
        .unwrap_or_else(|| default_db_path(&args.source_root));

    info!(source_root = %args.source_root.display(), "status requested");

    if inventory_path.exists() {
        let inventory: PdfInventoryManifest = read_json(&inventory_path)?;
        info!(
            generated_at = %inventory.generated_at,
            pdf_count = inventory.pdf_count,
            "loaded inventory manifest"
        );
    } else {
        warn!(path = %inventory_path.display(), "inventory manifest missing");
    }

    match latest_run_manifest(&manifest_dir)? {
        Some(path) => {
            let manifest: RestructureRunManifest = read_json(&path)?;
            info!(
                path = %path.display(),
                run_id = %manifest.run_id,
                status = %manifest.status,
                updated_at = %manifest.updated_at,
                documents = manifest.counts.processed_document_count,
                pages = manifest.counts.page_count,
                sections = manifest.counts.section_units,
                paragraphs = manifest.counts.paragraph_units,
                appendices = manifest.counts.appendix_units,
                warnings = manifest.warnings.len(),
                "loaded latest restructure run manifest"
            );
        }
        None => warn!(path = %manifest_dir.display(), "no restructure run manifest found"),
    }

    if db_path.exists() {
        let conn = Connection::open(&db_path)
            .with_context(|| format!("failed to open {}", db_path.display()))?;
        let documents = count_rows(&conn, "SELECT COUNT(*) FROM documents").unwrap_or(0);
        let units = count_rows(&conn, "SELECT COUNT(*) FROM units").unwrap_or(0);

        info!(
            path = %db_path.display(),
            documents = documents,
            units = units,
            "unit store status"
        );
        for (kind, count) in count_units_by_kind(&conn).unwrap_or_default() {
            info!(kind = %kind, units = count, "unit store kind");
        }
    } else {
        warn!(path = %db_path.display(), "unit store missing");
    }

    Ok(())
}

/// Run manifests carry a compact UTC timestamp in their name, so the
/// lexicographically greatest one is the newest.
fn latest_run_manifest(manifest_dir: &Path) -> Result<Option<PathBuf>> {
    if !manifest_dir.exists() {
        return Ok(None);
    }

    let mut latest: Option<PathBuf> = None;
    let entries = fs::read_dir(manifest_dir)
        .with_context(|| format!("failed to read {}", manifest_dir.display()))?;
    for entry in entries {
        let entry = entry
            .with_context(|| format!("failed to read entry in {}", manifest_dir.display()))?;
        let path = entry.path();
        let is_run_manifest = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(|name| name.starts_with("restructure_run_") && name.ends_with(".json"))
            .unwrap_or(false);
        if !is_run_manifest {
            continue;
        }
        if latest.as_ref().is_none_or(|current| path > *current) {
            latest = Some(path);
        }
    }

    Ok(latest)
}
