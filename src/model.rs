use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdfEntry {
    pub filename: String,
    pub document_id: String,
    pub sha256: String,
    pub gazette_year: Option<u32>,
    pub gazette_position: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdfInventoryManifest {
    pub manifest_version: u32,
    pub generated_at: String,
    pub source_directory: String,
    pub pdf_count: usize,
    pub pdfs: Vec<PdfEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolVersions {
    pub warunki: String,
    pub pdftotext: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestructurePaths {
    pub source_root: String,
    pub manifest_dir: String,
    pub units_dir: String,
    pub inventory_manifest_path: Option<String>,
    pub pages_json_path: Option<String>,
    pub db_path: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RestructureCounts {
    pub document_count: usize,
    pub processed_document_count: usize,
    pub page_count: usize,
    pub headers_removed: usize,
    pub prefixes_stripped: usize,
    pub footers_wrapped: usize,
    pub annotations_linked: usize,
    pub hyphen_merges: usize,
    pub section_units: usize,
    pub paragraph_units: usize,
    pub appendix_units: usize,
    pub units_stored: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRunSummary {
    pub document_id: String,
    pub page_count: usize,
    pub section_units: usize,
    pub paragraph_units: usize,
    pub appendix_units: usize,
    pub units_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestructureRunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub store_schema_version: String,
    pub status: String,
    pub started_at: String,
    pub updated_at: String,
    pub command: String,
    pub tool_versions: ToolVersions,
    pub paths: RestructurePaths,
    pub counts: RestructureCounts,
    pub documents: Vec<DocumentRunSummary>,
    pub source_hashes: Vec<PdfEntry>,
    pub warnings: Vec<String>,
}
