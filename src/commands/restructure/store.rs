use anyhow::{Context, Result};
use rusqlite::{Connection, params};

use super::pipeline::{RestructuredDocument, Restructurer};

pub(crate) const STORE_SCHEMA_VERSION: &str = "0.1.0";

#[derive(Debug, Clone)]
pub(crate) struct DocumentRecord<'a> {
    pub document_id: &'a str,
    pub filename: Option<&'a str>,
    pub sha256: Option<&'a str>,
    pub restructured_at: &'a str,
}

pub(crate) fn configure_connection(connection: &Connection) -> Result<()> {
    connection
        .pragma_update(None, "journal_mode", "WAL")
        .context("failed to set journal_mode=WAL")?;
    connection
        .pragma_update(None, "synchronous", "NORMAL")
        .context("failed to set synchronous=NORMAL")?;
    connection
        .pragma_update(None, "foreign_keys", "ON")
        .context("failed to enable foreign keys")?;
    Ok(())
}

pub(crate) fn ensure_schema(connection: &Connection) -> Result<()> {
    connection
        .execute_batch(
            "
            CREATE TABLE IF NOT EXISTS metadata (
              key TEXT PRIMARY KEY,
              value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS documents (
              document_id TEXT PRIMARY KEY,
              filename TEXT,
              sha256 TEXT,
              page_count INTEGER NOT NULL,
              unit_count INTEGER NOT NULL,
              restructured_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS units (
              unit_id TEXT PRIMARY KEY,
              document_id TEXT NOT NULL,
              unit_seq INTEGER NOT NULL,
              kind TEXT NOT NULL,
              section_id INTEGER,
              section_label TEXT,
              section_title TEXT,
              paragraph_id INTEGER,
              paragraph_label TEXT,
              paragraph_title TEXT,
              appendix_index INTEGER,
              appendix_label TEXT,
              appendix_title TEXT,
              page_start INTEGER,
              page_end INTEGER,
              source_pages TEXT NOT NULL,
              content TEXT NOT NULL,
              display_text TEXT NOT NULL,
              metadata_json TEXT NOT NULL,
              FOREIGN KEY(document_id) REFERENCES documents(document_id)
            );

            CREATE INDEX IF NOT EXISTS idx_units_document_seq ON units(document_id, unit_seq);
            ",
        )
        .context("failed to create store schema")?;

    connection
        .execute(
            "INSERT INTO metadata(key, value) VALUES('schema_version', ?1)
             ON CONFLICT(key) DO UPDATE SET value=excluded.value",
            [STORE_SCHEMA_VERSION],
        )
        .context("failed to record store schema version")?;

    Ok(())
}

/// Replaces every stored unit of one document with the freshly restructured
/// list, inside a single transaction.
pub(crate) fn replace_document_units(
    connection: &mut Connection,
    record: &DocumentRecord<'_>,
    document: &RestructuredDocument,
    restructurer: &Restructurer,
) -> Result<usize> {
    let tx = connection.transaction()?;

    tx.execute(
        "DELETE FROM units WHERE document_id = ?1",
        [record.document_id],
    )?;
    tx.execute(
        "
        INSERT INTO documents(document_id, filename, sha256, page_count, unit_count, restructured_at)
        VALUES(?1, ?2, ?3, ?4, ?5, ?6)
        ON CONFLICT(document_id) DO UPDATE SET
          filename=excluded.filename,
          sha256=excluded.sha256,
          page_count=excluded.page_count,
          unit_count=excluded.unit_count,
          restructured_at=excluded.restructured_at
        ",
        params![
            record.document_id,
            record.filename,
            record.sha256,
            document.page_count as i64,
            document.units.len() as i64,
            record.restructured_at,
        ],
    )
    .with_context(|| format!("failed to upsert document {}", record.document_id))?;

    let mut inserted = 0usize;
    {
        let mut statement = tx.prepare(
            "
            INSERT INTO units(
              unit_id, document_id, unit_seq, kind,
              section_id, section_label, section_title,
              paragraph_id, paragraph_label, paragraph_title,
              appendix_index, appendix_label, appendix_title,
              page_start, page_end, source_pages,
              content, display_text, metadata_json
            )
            VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)
            ",
        )?;

        for (seq, unit) in document.units.iter().enumerate() {
            let meta = &unit.metadata;
            let record = restructurer.interchange_record(unit);
            let unit_id = record.unit_id;
            let metadata_json = serde_json::to_string(&record.metadata)
                .with_context(|| format!("failed to serialize metadata of {unit_id}"))?;

            statement
                .execute(params![
                    unit_id,
                    meta.document_id,
                    seq as i64,
                    meta.kind.as_str(),
                    meta.section_id,
                    meta.section_label,
                    meta.section_title,
                    meta.paragraph_id,
                    meta.paragraph_label,
                    meta.paragraph_title,
                    meta.appendix_index,
                    meta.appendix_label,
                    meta.appendix_title,
                    meta.page_start(),
                    meta.page_end(),
                    meta.source_pages_joined(),
                    record.content,
                    record.display_text,
                    metadata_json,
                ])
                .with_context(|| format!("failed to insert unit {unit_id}"))?;
            inserted += 1;
        }
    }

    tx.commit()
        .with_context(|| format!("failed to commit units of {}", record.document_id))?;
    Ok(inserted)
}

pub(crate) fn count_rows(connection: &Connection, sql: &str) -> Result<i64> {
    let count = connection.query_row(sql, [], |row| row.get(0))?;
    Ok(count)
}

pub(crate) fn count_units_by_kind(connection: &Connection) -> Result<Vec<(String, i64)>> {
    let mut statement =
        connection.prepare("SELECT kind, COUNT(*) FROM units GROUP BY kind ORDER BY kind")?;
    let rows = statement
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
        .collect::<rusqlite::Result<Vec<(String, i64)>>>()?;
    Ok(rows)
}
