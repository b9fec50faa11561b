//! File tools: read, write with backup, and line-based edits.

use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use super::Tool;

/// Read a UTF-8 file.
pub struct ReadFile;

#[async_trait]
impl Tool for ReadFile {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read the contents of a file. Relative paths resolve against the workspace directory."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Path to the file"
                }
            },
            "required": ["path"]
        })
    }

    async fn execute(&self, args: Value, workspace: &Path) -> anyhow::Result<String> {
        let path = args["path"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("Missing 'path' argument"))?;
        let path = workspace.join(path);

        tracing::info!(path = %path.display(), "Reading file");

        tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| anyhow::anyhow!("Error reading {}: {}", path.display(), e))
    }
}

/// Write a file, backing up any existing contents first.
pub struct WriteFile;

#[async_trait]
impl Tool for WriteFile {
    fn name(&self) -> &str {
        "write_file"
    }

    fn description(&self) -> &str {
        "Write content to a file, creating parent directories. An existing file is first copied to <path>.backup.<timestamp> unless 'backup' is false."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Path to the file"
                },
                "content": {
                    "type": "string",
                    "description": "Content to write"
                },
                "backup": {
                    "type": "boolean",
                    "description": "Back up an existing file before overwriting (default: true)"
                }
            },
            "required": ["path", "content"]
        })
    }

    async fn execute(&self, args: Value, workspace: &Path) -> anyhow::Result<String> {
        let path = args["path"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("Missing 'path' argument"))?;
        let content = args["content"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("Missing 'content' argument"))?;
        let backup = args["backup"].as_bool().unwrap_or(true);

        let path = workspace.join(path);
        tracing::info!(path = %path.display(), "Writing file");

        let mut backup_note = String::new();
        if backup && path.exists() {
            let backup_path = backup_path_for(&path);
            tokio::fs::copy(&path, &backup_path)
                .await
                .map_err(|e| anyhow::anyhow!("Error creating backup: {}", e))?;
            tracing::info!(backup = %backup_path.display(), "Created backup");
            backup_note = format!("\nBackup created at {}", backup_path.display());
        }

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, content)
            .await
            .map_err(|e| anyhow::anyhow!("Error writing {}: {}", path.display(), e))?;

        Ok(format!("Wrote {} bytes to {}{}", content.len(), path.display(), backup_note))
    }
}

fn backup_path_for(path: &Path) -> std::path::PathBuf {
    let ts = chrono::Utc::now().timestamp();
    let mut name = path.as_os_str().to_os_string();
    name.push(format!(".backup.{}", ts));
    std::path::PathBuf::from(name)
}

/// A single line edit.
///
/// Line numbers are 1-based; `replace` and `delete` span `line_start` through
/// `line_end` inclusive, `insert` places content before `line_start`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EditOp {
    Replace {
        line_start: usize,
        line_end: usize,
        content: String,
    },
    Insert {
        line_start: usize,
        content: String,
    },
    Delete {
        line_start: usize,
        line_end: usize,
    },
}

impl EditOp {
    fn line_start(&self) -> usize {
        match self {
            Self::Replace { line_start, .. }
            | Self::Insert { line_start, .. }
            | Self::Delete { line_start, .. } => *line_start,
        }
    }
}

/// Apply a batch of line edits to a file.
pub struct EditFile;

#[async_trait]
impl Tool for EditFile {
    fn name(&self) -> &str {
        "edit_file"
    }

    fn description(&self) -> &str {
        "Apply a list of line edits (replace/insert/delete with 1-based line numbers) to a file. The original file is backed up first."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Path to the file"
                },
                "edits": {
                    "type": "array",
                    "description": "Edit operations to apply",
                    "items": {
                        "type": "object",
                        "properties": {
                            "type": {"type": "string", "enum": ["replace", "insert", "delete"]},
                            "line_start": {"type": "integer"},
                            "line_end": {"type": "integer"},
                            "content": {"type": "string"}
                        },
                        "required": ["type", "line_start"]
                    }
                }
            },
            "required": ["path", "edits"]
        })
    }

    async fn execute(&self, args: Value, workspace: &Path) -> anyhow::Result<String> {
        let path = args["path"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("Missing 'path' argument"))?;
        let edits: Vec<EditOp> = serde_json::from_value(args["edits"].clone())
            .map_err(|e| anyhow::anyhow!("Invalid 'edits' argument: {}", e))?;

        let full_path = workspace.join(path);
        tracing::info!(path = %full_path.display(), edits = edits.len(), "Editing file");

        let content = tokio::fs::read_to_string(&full_path)
            .await
            .map_err(|e| anyhow::anyhow!("Error reading {}: {}", full_path.display(), e))?;

        let lines: Vec<String> = content.lines().map(|l| l.to_string()).collect();
        let edit_count = edits.len();
        let edited = apply_edits(lines, edits);
        let new_content = edited.join("\n");

        let backup_path = backup_path_for(&full_path);
        tokio::fs::copy(&full_path, &backup_path).await?;
        tokio::fs::write(&full_path, &new_content).await?;

        Ok(format!(
            "Applied {} edits to {}\nBackup created at {}",
            edit_count,
            full_path.display(),
            backup_path.display()
        ))
    }
}

/// Apply edits sorted by start line descending, so earlier edits don't shift
/// the line numbers later ones refer to.
pub fn apply_edits(mut lines: Vec<String>, mut edits: Vec<EditOp>) -> Vec<String> {
    edits.sort_by(|a, b| b.line_start().cmp(&a.line_start()));

    for edit in edits {
        match edit {
            EditOp::Replace {
                line_start,
                line_end,
                content,
            } => {
                let start = line_start.max(1) - 1;
                let end = line_end.min(lines.len()).max(start);
                if start >= lines.len() {
                    lines.extend(content.lines().map(|l| l.to_string()));
                } else {
                    lines.splice(start..end, content.lines().map(|l| l.to_string()));
                }
            }
            EditOp::Insert {
                line_start,
                content,
            } => {
                let at = (line_start.max(1) - 1).min(lines.len());
                lines.splice(at..at, content.lines().map(|l| l.to_string()));
            }
            EditOp::Delete {
                line_start,
                line_end,
            } => {
                let start = (line_start.max(1) - 1).min(lines.len());
                let end = line_end.min(lines.len());
                if start < end {
                    lines.drain(start..end);
                }
            }
        }
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(s: &[&str]) -> Vec<String> {
        s.iter().map(|l| l.to_string()).collect()
    }

    #[test]
    fn replace_spans_inclusive_range() {
        let result = apply_edits(
            lines(&["a", "b", "c", "d"]),
            vec![EditOp::Replace {
                line_start: 2,
                line_end: 3,
                content: "X\nY\nZ".to_string(),
            }],
        );
        assert_eq!(result, lines(&["a", "X", "Y", "Z", "d"]));
    }

    #[test]
    fn insert_places_before_line() {
        let result = apply_edits(
            lines(&["a", "b"]),
            vec![EditOp::Insert {
                line_start: 2,
                content: "new".to_string(),
            }],
        );
        assert_eq!(result, lines(&["a", "new", "b"]));
    }

    #[test]
    fn delete_removes_range() {
        let result = apply_edits(
            lines(&["a", "b", "c"]),
            vec![EditOp::Delete {
                line_start: 1,
                line_end: 2,
            }],
        );
        assert_eq!(result, lines(&["c"]));
    }

    #[test]
    fn edits_apply_bottom_up() {
        // Both edits use original line numbers; applying top-down would shift
        // the second one.
        let result = apply_edits(
            lines(&["a", "b", "c", "d"]),
            vec![
                EditOp::Insert {
                    line_start: 2,
                    content: "early".to_string(),
                },
                EditOp::Delete {
                    line_start: 4,
                    line_end: 4,
                },
            ],
        );
        assert_eq!(result, lines(&["a", "early", "b", "c"]));
    }

    #[test]
    fn out_of_range_edits_clamp() {
        let result = apply_edits(
            lines(&["a"]),
            vec![EditOp::Delete {
                line_start: 5,
                line_end: 9,
            }],
        );
        assert_eq!(result, lines(&["a"]));
    }

    #[test]
    fn unknown_edit_type_is_rejected() {
        let parsed: Result<Vec<EditOp>, _> = serde_json::from_str(
            r#"[{"type": "swap", "line_start": 1}]"#,
        );
        assert!(parsed.is_err());
    }

    #[tokio::test]
    async fn write_creates_backup_of_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let workspace = dir.path();
        std::fs::write(workspace.join("f.txt"), "old").unwrap();

        let out = WriteFile
            .execute(
                json!({"path": "f.txt", "content": "new"}),
                workspace,
            )
            .await
            .unwrap();
        assert!(out.contains("Backup created at"));
        assert_eq!(std::fs::read_to_string(workspace.join("f.txt")).unwrap(), "new");

        let backups: Vec<_> = std::fs::read_dir(workspace)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().contains(".backup."))
            .collect();
        assert_eq!(backups.len(), 1);
        assert_eq!(std::fs::read_to_string(backups[0].path()).unwrap(), "old");
    }

    #[tokio::test]
    async fn write_without_backup_leaves_no_copy() {
        let dir = tempfile::tempdir().unwrap();
        let workspace = dir.path();
        std::fs::write(workspace.join("f.txt"), "old").unwrap();

        WriteFile
            .execute(
                json!({"path": "f.txt", "content": "new", "backup": false}),
                workspace,
            )
            .await
            .unwrap();

        let entries = std::fs::read_dir(workspace).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[tokio::test]
    async fn read_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ReadFile
            .execute(json!({"path": "nope.txt"}), dir.path())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Error reading"));
    }

    #[tokio::test]
    async fn edit_file_applies_and_backs_up() {
        let dir = tempfile::tempdir().unwrap();
        let workspace = dir.path();
        std::fs::write(workspace.join("f.txt"), "a\nb\nc").unwrap();

        EditFile
            .execute(
                json!({
                    "path": "f.txt",
                    "edits": [
                        {"type": "replace", "line_start": 2, "line_end": 2, "content": "B"}
                    ]
                }),
                workspace,
            )
            .await
            .unwrap();

        assert_eq!(
            std::fs::read_to_string(workspace.join("f.txt")).unwrap(),
            "a\nB\nc"
        );
    }
}
