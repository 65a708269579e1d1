//! Start-command detection from the mounted `package.json`.
//!
//! The manifest is always read back from the sandbox filesystem rather than
//! the in-memory tree, so the decision reflects what was actually mounted.

use serde_json::Value;

use crate::error::{Error, Result};

/// The commands required to bring the project's server up, as npm argv
/// tails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartPlan {
    /// Mandatory build step, present only when no `dev` script exists but a
    /// `build` script does.
    pub build: Option<Vec<String>>,
    /// The long-running server command.
    pub start: Vec<String>,
}

/// Determines the start plan from raw `package.json` text.
///
/// Policy: a `dev` script wins outright and never triggers a build; else a
/// `start` script is used, preceded by `build` when one is declared; with
/// neither, the project cannot be previewed (`NoStartCommand`). Empty input
/// is treated as an empty manifest.
pub fn detect_start_plan(package_json: &str) -> Result<StartPlan> {
    let manifest: Value = if package_json.trim().is_empty() {
        Value::Object(Default::default())
    } else {
        serde_json::from_str(package_json).map_err(|e| Error::ManifestInvalid(e.to_string()))?
    };

    let scripts = manifest.get("scripts").and_then(Value::as_object);
    let has = |name: &str| {
        scripts
            .and_then(|s| s.get(name))
            .and_then(Value::as_str)
            .is_some_and(|s| !s.is_empty())
    };

    if has("dev") {
        return Ok(StartPlan {
            build: None,
            start: vec!["run".to_string(), "dev".to_string()],
        });
    }

    if has("start") {
        let build = has("build").then(|| vec!["run".to_string(), "build".to_string()]);
        return Ok(StartPlan {
            build,
            start: vec!["run".to_string(), "start".to_string()],
        });
    }

    Err(Error::NoStartCommand)
}
