use std::path::Path;

use serde_json::Value;

use crate::error::{ConformError, ConformResult};

/// Field of a script item holding the quoted line.
pub const LINE_FIELD: &str = "texto";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptBlock {
    pub name: String,
    pub lines: Vec<String>,
}

impl ScriptBlock {
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Pick the configured blocks out of a script document, in the given order.
///
/// Missing blocks are empty; items without a non-empty line are skipped.
pub fn parse_script(doc: &Value, blocks: &[String]) -> Vec<ScriptBlock> {
    blocks
        .iter()
        .map(|name| {
            let lines = doc
                .get(name)
                .and_then(Value::as_array)
                .map(|items| {
                    items
                        .iter()
                        .filter_map(|item| item.get(LINE_FIELD).and_then(Value::as_str))
                        .filter(|line| !line.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default();
            ScriptBlock {
                name: name.clone(),
                lines,
            }
        })
        .collect()
}

/// Read and parse the script file. Unlike the other inputs a broken
/// script stops the run.
pub fn load_script(path: &Path, blocks: &[String]) -> ConformResult<Vec<ScriptBlock>> {
    let content = std::fs::read_to_string(path).map_err(|e| ConformError::io(path, e))?;
    let doc: Value = serde_json::from_str(&content)?;
    Ok(parse_script(&doc, blocks))
}
