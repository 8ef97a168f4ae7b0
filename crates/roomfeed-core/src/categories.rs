use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// One age-group bucket and the search keywords collected for it.
///
/// The label doubles as the persistence location: every row collected for
/// this category is stored under it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryConfig {
    pub label: String,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CategoriesFile {
    pub categories: Vec<CategoryConfig>,
}

impl CategoriesFile {
    /// Returns `(category, keyword)` pairs in configuration order, truncated
    /// to the first `cap` keywords overall.
    ///
    /// Keywords past the cap are dropped whole; the order is file order for
    /// categories and list order for keywords.
    #[must_use]
    pub fn capped_keywords(&self, cap: usize) -> Vec<(&CategoryConfig, &str)> {
        self.categories
            .iter()
            .flat_map(|c| c.keywords.iter().map(move |k| (c, k.as_str())))
            .take(cap)
            .collect()
    }

    /// Total keyword count across all categories.
    #[must_use]
    pub fn keyword_count(&self) -> usize {
        self.categories.iter().map(|c| c.keywords.len()).sum()
    }
}

/// Load and validate the category configuration from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_categories(path: &Path) -> Result<CategoriesFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::CategoriesFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_categories(&content)
}

/// Parse and validate category YAML already in memory.
///
/// # Errors
///
/// Returns `ConfigError` if the YAML does not parse or fails validation.
pub fn parse_categories(content: &str) -> Result<CategoriesFile, ConfigError> {
    let file: CategoriesFile = serde_yaml::from_str(content)?;
    validate_categories(&file)?;
    Ok(file)
}

fn validate_categories(file: &CategoriesFile) -> Result<(), ConfigError> {
    if file.categories.is_empty() {
        return Err(ConfigError::Validation(
            "at least one category must be configured".to_string(),
        ));
    }

    let mut seen_labels = HashSet::new();

    for category in &file.categories {
        let label = category.label.trim();
        if label.is_empty() {
            return Err(ConfigError::Validation(
                "category label must be non-empty".to_string(),
            ));
        }

        if !seen_labels.insert(label.to_string()) {
            return Err(ConfigError::Validation(format!(
                "duplicate category label: '{label}'"
            )));
        }

        if category.keywords.is_empty() {
            return Err(ConfigError::Validation(format!(
                "category '{label}' has no keywords"
            )));
        }

        if category.keywords.iter().any(|k| k.trim().is_empty()) {
            return Err(ConfigError::Validation(format!(
                "category '{label}' has a blank keyword"
            )));
        }
    }

    Ok(())
}
