mod appendix;
mod extract;
mod normalize;
mod paragraphs;
mod pipeline;
mod profile;
mod run;
mod sections;
mod store;
#[cfg(test)]
mod tests;
mod types;

pub use run::{default_db_path, run};
pub(crate) use store::{count_rows, count_units_by_kind};
