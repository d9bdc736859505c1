//! Store Writer — transactional SQLite persistence
//!
//! The backing store is fully recreated at the start of each run: any
//! existing file at the target location is deleted before the DDL is
//! applied, never appended to or merged. All materialized rows are inserted
//! inside a single transaction; a failed insert rolls the whole run's write
//! back. Instruction rows are inserted with their pre-allocated ids so that
//! child foreign keys resolve by source position.

use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::Result;
use crate::model::Row;
use crate::schema;

/// Exclusive writer over one store file for the duration of one run
pub struct StoreWriter {
    conn: Connection,
    path: PathBuf,
}

impl StoreWriter {
    /// Replace any existing store at `path` and apply the full DDL.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        remove_store_files(&path)?;

        let conn = Connection::open(&path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(schema::DDL)?;
        info!(store = %path.display(), "created relational store");

        Ok(Self { conn, path })
    }

    /// The DDL text exactly as persisted, for schema-description use
    pub fn get_schema(&self) -> &'static str {
        schema::DDL
    }

    /// Location of the store file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Insert all rows in one transaction; returns the number of rows written.
    ///
    /// On any failure the transaction is rolled back and the store keeps its
    /// pre-call state.
    pub fn write_rows(&mut self, rows: &[Row]) -> Result<usize> {
        let tx = self.conn.transaction()?;
        for row in rows {
            match row {
                Row::Instruction(r) => {
                    tx.execute(
                        "INSERT INTO instruction_dataset
                         (id, instruction_id, instruction_type, instruction, input_code,
                          output_code, language, user_prompt, timestamp, model_used, created_at)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                        params![
                            r.id,
                            r.instruction_id,
                            r.instruction_type,
                            r.instruction,
                            r.input_code,
                            r.output_code,
                            r.language,
                            r.user_prompt,
                            r.timestamp.to_rfc3339(),
                            r.model_used,
                            r.created_at.to_rfc3339(),
                        ],
                    )?;
                }
                Row::DatasetMetadata(r) => {
                    tx.execute(
                        "INSERT INTO dataset_metadata
                         (version, created_at, sample_count, license, source, updated_at)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                        params![
                            r.version,
                            r.created_at.to_rfc3339(),
                            r.sample_count,
                            r.license,
                            r.source,
                            r.updated_at.to_rfc3339(),
                        ],
                    )?;
                }
                Row::Context(r) => {
                    tx.execute(
                        "INSERT INTO context_metadata
                         (instruction_id, error_message, terminal_output, execution_time,
                          successful_execution, file_path, file_content, file_size,
                          file_line_count, framework, language, anonymized_user_id,
                          skill_level, project_structure, dependencies, runtime_environment,
                          llm_conversation_history, user_interaction_history, linting_errors, tags)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10,
                                 ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20)",
                        params![
                            r.instruction_id,
                            r.error_message,
                            r.terminal_output,
                            r.execution_time,
                            r.successful_execution,
                            r.file_path,
                            r.file_content,
                            r.file_size,
                            r.file_line_count,
                            r.framework,
                            r.language,
                            r.anonymized_user_id,
                            r.skill_level,
                            r.project_structure,
                            r.dependencies,
                            r.runtime_environment,
                            r.llm_conversation_history,
                            r.user_interaction_history,
                            r.linting_errors,
                            r.tags,
                        ],
                    )?;
                }
                Row::Dependency(r) => {
                    tx.execute(
                        "INSERT INTO project_dependencies (instruction_id, name, version)
                         VALUES (?1, ?2, ?3)",
                        params![r.instruction_id, r.name, r.version],
                    )?;
                }
                Row::Lint(r) => {
                    tx.execute(
                        "INSERT INTO linting_errors
                         (instruction_id, line, \"column\", message, severity, rule)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                        params![r.instruction_id, r.line, r.column, r.message, r.severity, r.rule],
                    )?;
                }
                Row::Feedback(r) => {
                    tx.execute(
                        "INSERT INTO user_feedback
                         (instruction_id, rating, comment, was_helpful, helped_solve_problem)
                         VALUES (?1, ?2, ?3, ?4, ?5)",
                        params![
                            r.instruction_id,
                            r.rating,
                            r.comment,
                            r.was_helpful,
                            r.helped_solve_problem,
                        ],
                    )?;
                }
            }
        }
        tx.commit()?;
        Ok(rows.len())
    }

    /// Row count of one table, for verification
    pub fn count(&self, table: &str) -> Result<i64> {
        let sql = format!("SELECT COUNT(*) FROM {}", table);
        Ok(self.conn.query_row(&sql, [], |row| row.get(0))?)
    }
}

fn remove_store_files(path: &Path) -> std::io::Result<()> {
    let mut wal = path.as_os_str().to_owned();
    wal.push("-wal");
    let mut shm = path.as_os_str().to_owned();
    shm.push("-shm");
    for stale in [path.to_path_buf(), PathBuf::from(wal), PathBuf::from(shm)] {
        if stale.exists() {
            std::fs::remove_file(&stale)?;
        }
    }
    Ok(())
}
