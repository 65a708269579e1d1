//! Bootstrap configuration and validation.
//!
//! Validates configuration before a bootstrap attempt to catch errors early.

use crate::error::{Error, Result};

/// Validation result containing all found issues.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    /// List of validation errors (fatal).
    pub errors: Vec<String>,
    /// List of validation warnings (non-fatal).
    pub warnings: Vec<String>,
}

impl ValidationResult {
    /// Returns true if validation passed (no errors).
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Adds an error to the result.
    pub fn add_error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }

    /// Adds a warning to the result.
    pub fn add_warning(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }

    /// Converts to a Result, failing if there are errors.
    pub fn into_result(self) -> Result<Vec<String>> {
        if self.is_valid() {
            Ok(self.warnings)
        } else {
            Err(Error::RuntimeUnavailable(self.errors.join("; ")))
        }
    }
}

/// Trait for validatable configuration types.
pub trait Validate {
    /// Validates the configuration and returns any issues found.
    fn validate(&self) -> ValidationResult;
}

/// Configuration for the bootstrap pipeline.
#[derive(Debug, Clone)]
pub struct BootstrapConfig {
    /// Package manager binary used for install/build/start commands.
    pub package_manager: String,
    /// Arguments for the dependency-install command.
    pub install_args: Vec<String>,
    /// Stale artifacts removed before installing, relative to the sandbox
    /// root.
    pub clean_paths: Vec<String>,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            package_manager: "npm".to_string(),
            install_args: vec!["install".to_string()],
            clean_paths: vec![
                "node_modules".to_string(),
                "package-lock.json".to_string(),
            ],
        }
    }
}

impl BootstrapConfig {
    /// Sets the package manager binary.
    pub fn with_package_manager(mut self, package_manager: impl Into<String>) -> Self {
        self.package_manager = package_manager.into();
        self
    }

    /// Sets the stale artifacts removed before install.
    pub fn with_clean_paths(mut self, clean_paths: Vec<String>) -> Self {
        self.clean_paths = clean_paths;
        self
    }
}

impl Validate for BootstrapConfig {
    fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        if self.package_manager.trim().is_empty() {
            result.add_error("package_manager cannot be empty");
        }

        if self.install_args.is_empty() {
            result.add_error("install_args cannot be empty");
        }

        for path in &self.clean_paths {
            if path.starts_with('/') || path.contains("..") {
                result.add_error(format!(
                    "clean_path '{}' must stay inside the sandbox root",
                    path
                ));
            }
        }

        if self.clean_paths.is_empty() {
            result.add_warning("no clean_paths configured; stale artifacts may survive installs");
        }

        result
    }
}
