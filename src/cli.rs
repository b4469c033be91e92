use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "warunki",
    version,
    about = "Restructures Polish building-regulation PDFs into hierarchical text units"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Inventory(InventoryArgs),
    Restructure(RestructureArgs),
    Status(StatusArgs),
}

#[derive(Args, Debug, Clone)]
pub struct InventoryArgs {
    #[arg(long, default_value = ".cache/warunki")]
    pub source_root: PathBuf,

    #[arg(long)]
    pub manifest_path: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}

#[derive(Args, Debug, Clone)]
pub struct RestructureArgs {
    #[arg(long, default_value = ".cache/warunki")]
    pub source_root: PathBuf,

    #[arg(long)]
    pub inventory_manifest_path: Option<PathBuf>,

    #[arg(long)]
    pub run_manifest_path: Option<PathBuf>,

    #[arg(long)]
    pub units_dir: Option<PathBuf>,

    #[arg(long)]
    pub db_path: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub skip_store: bool,

    #[arg(long, default_value_t = false)]
    pub refresh_inventory: bool,

    /// Restrict the run to these document ids (PDF filenames).
    #[arg(long = "document")]
    pub documents: Vec<String>,

    #[arg(long)]
    pub max_pages_per_doc: Option<usize>,

    /// Pre-extracted pages (`[{"page_number": 1, "text": "..."}]`) instead of pdftotext.
    #[arg(long, requires = "document_id")]
    pub pages_json: Option<PathBuf>,

    #[arg(long, requires = "pages_json")]
    pub document_id: Option<String>,

    /// JSON document profile overriding the built-in landmarks.
    #[arg(long)]
    pub profile: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[arg(long, default_value = ".cache/warunki")]
    pub source_root: PathBuf,

    #[arg(long)]
    pub db_path: Option<PathBuf>,
}
