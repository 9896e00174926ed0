//! Rule model - extension sets mapped to category folders

mod engine;

pub use engine::RuleSet;

use serde::Serialize;
use std::path::Path;

/// Where a rule came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum RuleOrigin {
    /// One of the configured `fileRules`
    BuiltIn,
    /// A user-defined category
    #[serde(rename_all = "camelCase")]
    Custom { id: String, category_name: String },
}

/// A matching unit: any file whose extension is in `extensions` goes to
/// `target_folder` under the base target folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    /// Lowercase, dot-prefixed, deduplicated, in declaration order
    pub extensions: Vec<String>,

    /// Single folder name, never a path
    pub target_folder: String,

    pub enabled: bool,

    pub origin: RuleOrigin,
}

impl Rule {
    /// Create an enabled built-in rule, normalizing the extensions
    pub fn new<I, S>(target_folder: impl Into<String>, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            extensions: normalize_extensions(extensions),
            target_folder: target_folder.into(),
            enabled: true,
            origin: RuleOrigin::BuiltIn,
        }
    }

    /// Turn this rule into a custom category rule
    pub fn custom(mut self, id: impl Into<String>, category_name: impl Into<String>) -> Self {
        self.origin = RuleOrigin::Custom {
            id: id.into(),
            category_name: category_name.into(),
        };
        self
    }

    /// Custom category name, if any
    pub fn category_name(&self) -> Option<&str> {
        match &self.origin {
            RuleOrigin::Custom { category_name, .. } => Some(category_name),
            RuleOrigin::BuiltIn => None,
        }
    }

    /// Label used in logs and notifications
    pub fn label(&self) -> String {
        match self.category_name() {
            Some(name) => format!("{} ({})", name, self.target_folder),
            None => self.target_folder.clone(),
        }
    }

    /// Whether this rule claims `extension` (already normalized)
    pub fn matches_extension(&self, extension: &str) -> bool {
        self.enabled && self.extensions.iter().any(|e| e == extension)
    }
}

/// Lowercase and dot-prefix an extension. Returns `None` for blank input.
pub fn normalize_extension(raw: &str) -> Option<String> {
    let trimmed = raw.trim().trim_start_matches('.');
    if trimmed.is_empty() {
        return None;
    }
    Some(format!(".{}", trimmed.to_lowercase()))
}

fn normalize_extensions<I, S>(extensions: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut normalized: Vec<String> = Vec::new();
    for ext in extensions {
        if let Some(ext) = normalize_extension(ext.as_ref())
            && !normalized.contains(&ext)
        {
            normalized.push(ext);
        }
    }
    normalized
}

/// Extension of a file name, lowercased and including the dot.
///
/// `photo.JPG` gives `.jpg`; `README`, `.bashrc` and `archive.` give nothing
/// that can match a rule.
pub fn file_extension(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_string_lossy();
    match name.rfind('.') {
        Some(0) | None => None,
        Some(idx) if idx + 1 == name.len() => None,
        Some(idx) => Some(name[idx..].to_lowercase()),
    }
}

/// A folder name is usable if it is a single plain path segment
pub(crate) fn is_valid_folder_name(name: &str) -> bool {
    let name = name.trim();
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains('/')
        && !name.contains('\\')
}
