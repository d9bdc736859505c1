//! End-to-end pipeline tests: JSON document in, queryable sealed store out.

use refinery_core::{envelope, Refinery, RefineryConfig};
use rusqlite::Connection;
use serde_json::{json, Value};
use std::fs;
use std::path::Path;

fn test_config(root: &Path) -> RefineryConfig {
    let input_dir = root.join("input");
    let output_dir = root.join("output");
    fs::create_dir_all(&input_dir).unwrap();
    RefineryConfig::new()
        .with_input_dir(&input_dir)
        .with_output_dir(&output_dir)
}

fn write_document(config: &RefineryConfig, name: &str, document: &Value) {
    fs::write(
        config.input_dir.join(name),
        serde_json::to_string_pretty(document).unwrap(),
    )
    .unwrap();
}

fn count(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
        row.get(0)
    })
    .unwrap()
}

fn sample_document() -> Value {
    json!({
        "dataset_metadata": {
            "version": "1.0.0",
            "created_at": "2024-01-15T10:30:00Z",
            "sample_count": 1,
            "license": "MIT",
            "source": "VS Code Extension Data Collection"
        },
        "instruction_dataset": [
            {
                "id": "entry_1755013833461_yxgrdln",
                "instruction_type": "bug_fixing",
                "instruction": "Fix the off-by-one error in the loop bounds",
                "input": "for i in range(len(xs) + 1):\n    print(xs[i])",
                "output": "for i in range(len(xs)):\n    print(xs[i])",
                "timestamp": "2024-01-15T10:30:00Z",
                "model_used": "claude-3-sonnet",
                "context": {
                    "language": "python",
                    "user_prompt": "why does this crash at the end?",
                    "error_message": "IndexError: list index out of range",
                    "linting_errors": [
                        {"line": 2, "column": 11, "message": "possible out-of-range index",
                         "severity": "warning", "rule": "E501"}
                    ],
                    "user_feedback": {"rating": 5, "comment": "worked first try", "was_helpful": true}
                }
            }
        ]
    })
}

#[test]
fn test_end_to_end_refinement() {
    let tmp = tempfile::tempdir().unwrap();
    let config = test_config(tmp.path()).with_encryption_key("test-passphrase");
    write_document(&config, "dataset.json", &sample_document());

    let output = Refinery::new(config.clone()).run().expect("run should succeed");

    assert_eq!(output.schema.dialect, "sqlite");
    assert!(output.schema.schema.contains("CREATE TABLE instruction_dataset"));
    assert!(output.refinement_url.is_none());

    let conn = Connection::open(config.db_path()).unwrap();
    assert_eq!(count(&conn, "instruction_dataset"), 1);
    assert_eq!(count(&conn, "dataset_metadata"), 1);
    assert_eq!(count(&conn, "linting_errors"), 1);
    assert_eq!(count(&conn, "user_feedback"), 1);
    assert_eq!(count(&conn, "context_metadata"), 1);
    assert_eq!(count(&conn, "project_dependencies"), 0);

    // child rows join back to the parent by position
    let (entry_id, message): (String, String) = conn
        .query_row(
            "SELECT i.instruction_id, l.message
             FROM instruction_dataset i
             JOIN linting_errors l ON i.id = l.instruction_id
             WHERE i.language = 'python'",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap();
    assert_eq!(entry_id, "entry_1755013833461_yxgrdln");
    assert_eq!(message, "possible out-of-range index");

    // the timestamp landed as the same instant, offset spelled explicitly
    let timestamp: String = conn
        .query_row("SELECT timestamp FROM instruction_dataset", [], |row| {
            row.get(0)
        })
        .unwrap();
    assert_eq!(timestamp, "2024-01-15T10:30:00+00:00");

    // all three run artifacts exist
    assert!(config.schema_path().exists());
    assert!(config.output_path().exists());
    let schema_json: Value =
        serde_json::from_str(&fs::read_to_string(config.schema_path()).unwrap()).unwrap();
    assert_eq!(schema_json["dialect"], "sqlite");

    // the sealed artifact opens back to the exact store bytes
    let sealed_path = tmp.path().join("output/db.libsql.enc");
    assert!(sealed_path.exists());
    let sealed = fs::read(&sealed_path).unwrap();
    let opened = envelope::open("test-passphrase", &sealed).unwrap();
    assert_eq!(opened, fs::read(config.db_path()).unwrap());
}

#[test]
fn test_rerun_replaces_previous_store() {
    let tmp = tempfile::tempdir().unwrap();
    let config = test_config(tmp.path());

    let five = json!({
        "instruction_dataset": (0..5).map(|i| json!({
            "instruction_type": "code_completion",
            "instruction": format!("complete snippet {}", i),
            "input": "",
            "output": "",
            "context": {"language": "rust", "user_prompt": "finish this"}
        })).collect::<Vec<_>>()
    });
    write_document(&config, "dataset.json", &five);
    Refinery::new(config.clone()).run().unwrap();

    let two = json!({
        "instruction_dataset": (0..2).map(|i| json!({
            "instruction_type": "debugging",
            "instruction": format!("debug snippet {}", i),
            "input": "",
            "output": "",
            "context": {"language": "go", "user_prompt": "trace this"}
        })).collect::<Vec<_>>()
    });
    write_document(&config, "dataset.json", &two);
    Refinery::new(config.clone()).run().unwrap();

    let conn = Connection::open(config.db_path()).unwrap();
    assert_eq!(count(&conn, "instruction_dataset"), 2);
    let kinds: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM instruction_dataset WHERE instruction_type = 'code_completion'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(kinds, 0, "first run's rows must be gone after the rerun");
}

#[test]
fn test_run_without_input_document_fails() {
    let tmp = tempfile::tempdir().unwrap();
    let config = test_config(tmp.path());
    let err = Refinery::new(config).run().unwrap_err();
    assert!(err.to_string().contains("no JSON document"));
}

#[test]
fn test_order_preserved_for_larger_batches() {
    let tmp = tempfile::tempdir().unwrap();
    let config = test_config(tmp.path());

    let document = json!({
        "instruction_dataset": (0..25).map(|i| json!({
            "id": format!("entry_{:03}", i),
            "instruction_type": "algorithm_implementation",
            "instruction": format!("implement step {}", i),
            "input": "",
            "output": "",
            "context": {"language": "python", "user_prompt": "implement"}
        })).collect::<Vec<_>>()
    });
    write_document(&config, "dataset.json", &document);
    Refinery::new(config.clone()).run().unwrap();

    let conn = Connection::open(config.db_path()).unwrap();
    assert_eq!(count(&conn, "instruction_dataset"), 25);

    let mut stmt = conn
        .prepare("SELECT id, instruction_id FROM instruction_dataset ORDER BY id")
        .unwrap();
    let rows: Vec<(i64, String)> = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
        .unwrap()
        .collect::<rusqlite::Result<_>>()
        .unwrap();
    for (index, (id, entry)) in rows.iter().enumerate() {
        assert_eq!(*id, index as i64 + 1);
        assert_eq!(entry, &format!("entry_{:03}", index));
    }
}
