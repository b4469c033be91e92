use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::Utc;
use rusqlite::Connection;
use tracing::{info, warn};

use crate::cli::RestructureArgs;
use crate::commands::inventory;
use crate::model::{
    DocumentRunSummary, PdfEntry, PdfInventoryManifest, RestructureCounts, RestructurePaths,
    RestructureRunManifest,
};
use crate::util::{
    ensure_directory, file_stem_for, now_utc_string, read_json, utc_compact_string,
    write_json_pretty,
};

use super::extract::{collect_tool_versions, extract_pages_with_pdftotext, load_pages_json};
use super::pipeline::Restructurer;
use super::profile::DocumentProfile;
use super::store::{
    DocumentRecord, STORE_SCHEMA_VERSION, configure_connection, ensure_schema,
    replace_document_units,
};
use super::types::RawPage;

#[derive(Debug, Clone)]
enum PageSource {
    Pdf(PathBuf),
    PagesJson(PathBuf),
}

#[derive(Debug, Clone)]
struct DocumentJob {
    document_id: String,
    filename: Option<String>,
    sha256: Option<String>,
    source: PageSource,
}

pub fn default_db_path(source_root: &Path) -> PathBuf {
    source_root.join("warunki_units.sqlite")
}

pub fn run(args: RestructureArgs) -> Result<()> {
    let started_ts = Utc::now();
    let started_at = now_utc_string();
    let run_id = format!("run-{}", utc_compact_string(started_ts));

    let source_root = args.source_root.clone();
    let manifest_dir = source_root.join("manifests");
    ensure_directory(&manifest_dir)?;

    let units_dir = args
        .units_dir
        .clone()
        .unwrap_or_else(|| source_root.join("units"));
    ensure_directory(&units_dir)?;

    let run_manifest_path = args.run_manifest_path.clone().unwrap_or_else(|| {
        manifest_dir.join(format!(
            "restructure_run_{}.json",
            utc_compact_string(started_ts)
        ))
    });
    let db_path = (!args.skip_store).then(|| {
        args.db_path
            .clone()
            .unwrap_or_else(|| default_db_path(&source_root))
    });

    info!(source_root = %source_root.display(), run_id = %run_id, "starting restructure");

    let profile = load_profile(args.profile.as_deref())?;
    let restructurer = Restructurer::new(&profile).context("invalid document profile")?;

    let mut warnings = Vec::<String>::new();
    let (jobs, inventory_manifest_path, source_hashes) = match &args.pages_json {
        Some(pages_json) => {
            let document_id = args
                .document_id
                .clone()
                .context("--document-id is required with --pages-json")?;
            let job = DocumentJob {
                document_id,
                filename: None,
                sha256: None,
                source: PageSource::PagesJson(pages_json.clone()),
            };
            (vec![job], None, Vec::new())
        }
        None => {
            let inventory_manifest_path = args
                .inventory_manifest_path
                .clone()
                .unwrap_or_else(|| inventory::default_manifest_path(&source_root));
            let inventory = load_or_refresh_inventory(
                &source_root,
                &inventory_manifest_path,
                args.refresh_inventory,
            )?;
            let pdfs = select_documents(&inventory.pdfs, &args.documents, &mut warnings);
            let jobs = pdfs
                .iter()
                .map(|pdf| DocumentJob {
                    document_id: pdf.document_id.clone(),
                    filename: Some(pdf.filename.clone()),
                    sha256: Some(pdf.sha256.clone()),
                    source: PageSource::Pdf(source_root.join(&pdf.filename)),
                })
                .collect::<Vec<DocumentJob>>();
            (jobs, Some(inventory_manifest_path), pdfs)
        }
    };

    let mut connection = match &db_path {
        Some(path) => {
            let connection = Connection::open(path)
                .with_context(|| format!("failed to open {}", path.display()))?;
            configure_connection(&connection)?;
            ensure_schema(&connection)?;
            Some(connection)
        }
        None => None,
    };

    let mut counts = RestructureCounts {
        document_count: jobs.len(),
        ..RestructureCounts::default()
    };
    let mut documents = Vec::<DocumentRunSummary>::new();

    for job in &jobs {
        let pages = match load_job_pages(job, args.max_pages_per_doc) {
            Ok(pages) => pages,
            Err(err) => {
                let warning = format!("failed to extract pages for {}: {err:#}", job.document_id);
                warn!(warning = %warning, "page extraction warning");
                warnings.push(warning);
                continue;
            }
        };

        let document = restructurer
            .restructure(&job.document_id, pages)
            .with_context(|| format!("failed to restructure {}", job.document_id))?;

        let units_path = units_dir.join(format!("{}.json", file_stem_for(&job.document_id)));
        let records = document
            .units
            .iter()
            .map(|unit| restructurer.interchange_record(unit))
            .collect::<Vec<_>>();
        write_json_pretty(&units_path, &records)?;

        if let Some(connection) = connection.as_mut() {
            let restructured_at = now_utc_string();
            let record = DocumentRecord {
                document_id: &job.document_id,
                filename: job.filename.as_deref(),
                sha256: job.sha256.as_deref(),
                restructured_at: &restructured_at,
            };
            counts.units_stored +=
                replace_document_units(connection, &record, &document, &restructurer)?;
        }

        let stats = &document.stats;
        counts.processed_document_count += 1;
        counts.page_count += document.page_count;
        counts.headers_removed += stats.normalize.headers_removed;
        counts.prefixes_stripped += stats.normalize.prefixes_stripped;
        counts.footers_wrapped += stats.normalize.footers_wrapped;
        counts.annotations_linked += stats.normalize.annotations_linked;
        counts.hyphen_merges += stats.normalize.hyphen_merges;
        counts.section_units += stats.section_units;
        counts.paragraph_units += stats.paragraph_units;
        counts.appendix_units += stats.appendix_units;
        warnings.extend(document.warnings.iter().cloned());

        info!(
            document_id = %job.document_id,
            units = document.units.len(),
            path = %units_path.display(),
            "wrote restructured units"
        );

        documents.push(DocumentRunSummary {
            document_id: job.document_id.clone(),
            page_count: document.page_count,
            section_units: stats.section_units,
            paragraph_units: stats.paragraph_units,
            appendix_units: stats.appendix_units,
            units_path: units_path.display().to_string(),
        });
    }

    let manifest = RestructureRunManifest {
        manifest_version: 1,
        run_id,
        store_schema_version: STORE_SCHEMA_VERSION.to_string(),
        status: "completed".to_string(),
        started_at,
        updated_at: now_utc_string(),
        command: render_restructure_command(&args),
        tool_versions: collect_tool_versions(),
        paths: RestructurePaths {
            source_root: source_root.display().to_string(),
            manifest_dir: manifest_dir.display().to_string(),
            units_dir: units_dir.display().to_string(),
            inventory_manifest_path: inventory_manifest_path.map(|path| path.display().to_string()),
            pages_json_path: args.pages_json.as_ref().map(|path| path.display().to_string()),
            db_path: db_path.as_ref().map(|path| path.display().to_string()),
        },
        counts,
        documents,
        source_hashes,
        warnings,
    };

    write_json_pretty(&run_manifest_path, &manifest)?;

    info!(path = %run_manifest_path.display(), "wrote restructure run manifest");
    info!(
        documents = manifest.counts.processed_document_count,
        units = manifest.counts.paragraph_units + manifest.counts.appendix_units,
        "restructure completed"
    );

    Ok(())
}

fn load_profile(path: Option<&Path>) -> Result<DocumentProfile> {
    match path {
        Some(path) => {
            let profile: DocumentProfile = read_json(path)?;
            info!(path = %path.display(), "loaded document profile");
            Ok(profile)
        }
        None => Ok(DocumentProfile::default()),
    }
}

fn load_job_pages(job: &DocumentJob, max_pages_per_doc: Option<usize>) -> Result<Vec<RawPage>> {
    match &job.source {
        PageSource::Pdf(path) => {
            if !path.exists() {
                bail!("missing source PDF: {}", path.display());
            }
            extract_pages_with_pdftotext(path, max_pages_per_doc)
        }
        PageSource::PagesJson(path) => {
            let mut pages = load_pages_json(path)?;
            if let Some(max_pages) = max_pages_per_doc {
                pages.truncate(max_pages);
            }
            Ok(pages)
        }
    }
}

fn select_documents(
    pdfs: &[PdfEntry],
    requested: &[String],
    warnings: &mut Vec<String>,
) -> Vec<PdfEntry> {
    if requested.is_empty() {
        return pdfs.to_vec();
    }

    let requested_set: HashSet<&str> = requested.iter().map(String::as_str).collect();
    let known: HashSet<&str> = pdfs.iter().map(|pdf| pdf.document_id.as_str()).collect();
    for document_id in requested {
        if !known.contains(document_id.as_str()) {
            warnings.push(format!("requested document not in inventory: {document_id}"));
        }
    }

    pdfs.iter()
        .filter(|pdf| requested_set.contains(pdf.document_id.as_str()))
        .cloned()
        .collect()
}

fn load_or_refresh_inventory(
    source_root: &Path,
    inventory_manifest_path: &Path,
    refresh_inventory: bool,
) -> Result<PdfInventoryManifest> {
    if refresh_inventory || !inventory_manifest_path.exists() {
        let manifest = inventory::build_manifest(source_root)?;
        write_json_pretty(inventory_manifest_path, &manifest)?;
        info!(
            path = %inventory_manifest_path.display(),
            pdf_count = manifest.pdf_count,
            "refreshed inventory manifest"
        );
        return Ok(manifest);
    }

    let manifest: PdfInventoryManifest = read_json(inventory_manifest_path)?;
    info!(
        path = %inventory_manifest_path.display(),
        pdf_count = manifest.pdf_count,
        "loaded existing inventory manifest"
    );

    Ok(manifest)
}

fn render_restructure_command(args: &RestructureArgs) -> String {
    let mut command = vec![
        "warunki".to_string(),
        "restructure".to_string(),
        "--source-root".to_string(),
        args.source_root.display().to_string(),
    ];

    if let Some(path) = &args.inventory_manifest_path {
        command.push("--inventory-manifest-path".to_string());
        command.push(path.display().to_string());
    }
    if let Some(path) = &args.run_manifest_path {
        command.push("--run-manifest-path".to_string());
        command.push(path.display().to_string());
    }
    if let Some(path) = &args.units_dir {
        command.push("--units-dir".to_string());
        command.push(path.display().to_string());
    }
    if let Some(path) = &args.db_path {
        command.push("--db-path".to_string());
        command.push(path.display().to_string());
    }
    if args.skip_store {
        command.push("--skip-store".to_string());
    }
    if args.refresh_inventory {
        command.push("--refresh-inventory".to_string());
    }
    for document in &args.documents {
        command.push("--document".to_string());
        command.push(document.clone());
    }
    if let Some(max_pages) = args.max_pages_per_doc {
        command.push("--max-pages-per-doc".to_string());
        command.push(max_pages.to_string());
    }
    if let Some(path) = &args.pages_json {
        command.push("--pages-json".to_string());
        command.push(path.display().to_string());
    }
    if let Some(document_id) = &args.document_id {
        command.push("--document-id".to_string());
        command.push(document_id.clone());
    }
    if let Some(path) = &args.profile {
        command.push("--profile".to_string());
        command.push(path.display().to_string());
    }

    command.join(" ")
}
