//! Relational Materializer — document to ordered, typed rows
//!
//! Consumes the parsed input document and produces the full set of rows
//! across all six tables, preserving source array order for instructions.
//! Foreign keys are wired by pre-allocating each instruction's surrogate id
//! as its 1-based source position; the store writer inserts instruction rows
//! with exactly these ids inside one transaction, which is what keeps the
//! child references valid.

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{RefineryError, Result};
use crate::mapper::{
    json_blob, optional_bool, optional_f64, optional_i64, optional_text, parse_timestamp,
    required_text, Mapped,
};
use crate::model::{
    ContextMetadataRow, DatasetMetadataRow, InstructionRow, LintingErrorRow,
    ProjectDependencyRow, Row, UserFeedbackRow,
};
use crate::schema::SchemaProfile;

/// Context fields that warrant a `context_metadata` row when present.
///
/// `language` and `user_prompt` are lifted onto the instruction row and do
/// not count; a context object carrying only those produces no child row.
const CONTEXT_FIELDS: &[&str] = &[
    "error_message",
    "terminal_output",
    "execution_time",
    "successful_execution",
    "file_path",
    "file_content",
    "file_size",
    "file_line_count",
    "framework",
    "anonymized_user_id",
    "skill_level",
    "project_structure",
    "dependencies",
    "runtime_environment",
    "llm_conversation_history",
    "user_interaction_history",
    "linting_errors",
    "tags",
];

/// Materializes mapped records into an append-only sequence of typed rows
pub struct Materializer {
    profile: SchemaProfile,
}

impl Materializer {
    pub fn new(profile: SchemaProfile) -> Self {
        Self { profile }
    }

    /// Produce all rows for one input document.
    ///
    /// Recognized top-level keys are `dataset_metadata` and
    /// `instruction_dataset`; anything else is ignored.
    pub fn materialize(&self, document: &Value) -> Result<Vec<Row>> {
        if !document.is_object() {
            return Err(RefineryError::InvalidInput(
                "top-level document must be a JSON object".to_string(),
            ));
        }

        let mut rows = Vec::new();

        if let Some(metadata) = document.get("dataset_metadata").filter(|v| v.is_object()) {
            rows.push(Row::DatasetMetadata(self.dataset_metadata_row(metadata)));
        }

        if let Some(records) = document.get("instruction_dataset").and_then(Value::as_array) {
            for (index, record) in records.iter().enumerate() {
                // 1-based source position; must match insert order exactly
                let id = index as i64 + 1;
                self.instruction_rows(id, index, record, &mut rows)?;
            }
        }

        debug!(rows = rows.len(), "materialized document");
        Ok(rows)
    }

    fn dataset_metadata_row(&self, metadata: &Value) -> DatasetMetadataRow {
        let created_at = self.timestamp_with_warning(metadata.get("created_at"), "dataset_metadata");
        DatasetMetadataRow {
            version: optional_text(metadata, "version").unwrap_or_else(|| "1.0.0".to_string()),
            created_at,
            sample_count: optional_i64(metadata, "sample_count").unwrap_or(0),
            license: optional_text(metadata, "license").unwrap_or_else(|| "Unknown".to_string()),
            source: optional_text(metadata, "source").unwrap_or_else(|| "Unknown".to_string()),
            updated_at: Utc::now(),
        }
    }

    fn instruction_rows(
        &self,
        id: i64,
        index: usize,
        record: &Value,
        rows: &mut Vec<Row>,
    ) -> Result<()> {
        let empty = Value::Object(serde_json::Map::new());
        let context = match record.get("context").filter(|v| v.is_object()) {
            Some(context) => context,
            None if self.profile == SchemaProfile::Strict => {
                return Err(RefineryError::Validation {
                    field: "context".to_string(),
                })
            }
            None => &empty,
        };

        let timestamp =
            self.timestamp_with_warning(record.get("timestamp"), &format!("instruction {}", id));

        rows.push(Row::Instruction(InstructionRow {
            id,
            instruction_id: optional_text(record, "id")
                .unwrap_or_else(|| format!("instruction_{}", index)),
            instruction_type: required_text(record, "instruction_type", self.profile, "unknown")?,
            instruction: required_text(record, "instruction", self.profile, "")?,
            input_code: required_text(record, "input", self.profile, "")?,
            output_code: required_text(record, "output", self.profile, "")?,
            language: required_text(context, "language", self.profile, "unknown")?,
            user_prompt: required_text(context, "user_prompt", self.profile, "")?,
            timestamp,
            model_used: optional_text(record, "model_used")
                .unwrap_or_else(|| "unknown".to_string()),
            created_at: Utc::now(),
        }));

        if self.has_context_payload(context) {
            rows.push(Row::Context(self.context_row(id, context)));
        }

        if let Some(dependencies) = context.get("dependencies").and_then(Value::as_array) {
            for dependency in dependencies.iter().filter(|d| d.is_object()) {
                rows.push(Row::Dependency(ProjectDependencyRow {
                    instruction_id: id,
                    name: required_text(dependency, "name", self.profile, "")?,
                    version: optional_text(dependency, "version"),
                }));
            }
        }

        if let Some(findings) = context.get("linting_errors").and_then(Value::as_array) {
            for finding in findings.iter().filter(|f| f.is_object()) {
                rows.push(Row::Lint(LintingErrorRow {
                    instruction_id: id,
                    line: optional_i64(finding, "line"),
                    column: optional_i64(finding, "column"),
                    message: required_text(finding, "message", self.profile, "")?,
                    severity: optional_text(finding, "severity")
                        .unwrap_or_else(|| "error".to_string()),
                    rule: optional_text(finding, "rule"),
                }));
            }
        }

        if let Some(feedback) = context
            .get("user_feedback")
            .filter(|f| f.as_object().is_some_and(|m| !m.is_empty()))
        {
            rows.push(Row::Feedback(UserFeedbackRow {
                instruction_id: id,
                rating: optional_i64(feedback, "rating"),
                comment: optional_text(feedback, "comment"),
                was_helpful: optional_bool(feedback, "was_helpful"),
                helped_solve_problem: optional_bool(feedback, "helped_solve_problem"),
            }));
        }

        Ok(())
    }

    fn has_context_payload(&self, context: &Value) -> bool {
        CONTEXT_FIELDS
            .iter()
            .any(|field| context.get(field).is_some_and(|v| !v.is_null()))
    }

    fn context_row(&self, id: i64, context: &Value) -> ContextMetadataRow {
        ContextMetadataRow {
            instruction_id: id,
            error_message: optional_text(context, "error_message"),
            terminal_output: optional_text(context, "terminal_output"),
            execution_time: optional_f64(context, "execution_time"),
            successful_execution: optional_bool(context, "successful_execution"),
            file_path: optional_text(context, "file_path"),
            file_content: optional_text(context, "file_content"),
            file_size: optional_i64(context, "file_size"),
            file_line_count: optional_i64(context, "file_line_count"),
            framework: optional_text(context, "framework"),
            language: optional_text(context, "language"),
            anonymized_user_id: optional_text(context, "anonymized_user_id"),
            skill_level: optional_text(context, "skill_level"),
            project_structure: json_blob(context, "project_structure"),
            dependencies: json_blob(context, "dependencies"),
            runtime_environment: json_blob(context, "runtime_environment"),
            llm_conversation_history: json_blob(context, "llm_conversation_history"),
            user_interaction_history: json_blob(context, "user_interaction_history"),
            linting_errors: json_blob(context, "linting_errors"),
            tags: json_blob(context, "tags"),
        }
    }

    fn timestamp_with_warning(
        &self,
        raw: Option<&Value>,
        subject: &str,
    ) -> chrono::DateTime<Utc> {
        match parse_timestamp(raw) {
            Mapped::Clean(instant) => instant,
            Mapped::Fallback { value, reason } => {
                warn!(%subject, %reason, "timestamp fallback, substituting current time");
                value
            }
        }
    }
}
