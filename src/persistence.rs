//! Persistence layer for saving/loading evaluation runs as JSON.

use crate::error::{EvalError, Result};
use crate::eval::EvaluationRun;
use std::fs;
use std::path::Path;

/// Save an evaluation run as pretty-printed JSON.
pub fn save_run(run: &EvaluationRun, path: &Path) -> Result<()> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| EvalError::io(parent, e))?;
        }
    }

    let json = serde_json::to_string_pretty(run)
        .map_err(|e| EvalError::Serialization(e.to_string()))?;

    fs::write(path, json).map_err(|e| EvalError::io(path, e))
}

/// Load an evaluation run saved with [`save_run`].
pub fn load_run(path: &Path) -> Result<EvaluationRun> {
    let content = fs::read_to_string(path).map_err(|e| EvalError::io(path, e))?;

    serde_json::from_str(&content).map_err(|e| EvalError::Serialization(e.to_string()))
}
