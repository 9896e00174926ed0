//! Rule set - builds the active rule list and picks a rule for a file

use std::path::Path;
use tracing::{debug, trace, warn};

use super::{Rule, file_extension, is_valid_folder_name};
use crate::config::Config;

/// Active rules in priority order: built-in rules first, then custom
/// categories, each in declaration order.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    /// Create a rule set from rules already in priority order
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    /// Build the active rules from a configuration snapshot.
    ///
    /// Disabled entries are dropped. Entries with an unusable folder name are
    /// kept with no extensions so they match nothing.
    pub fn from_config(config: &Config) -> Self {
        let builtin = config
            .file_rules
            .iter()
            .filter(|r| r.enabled)
            .map(|r| sanitize(Rule::new(r.target_folder.trim(), &r.extensions)));

        let custom = config
            .custom_categories
            .iter()
            .filter(|c| c.enabled)
            .map(|c| {
                sanitize(
                    Rule::new(c.folder_name.trim(), &c.extensions).custom(c.id.clone(), c.name.clone()),
                )
            });

        Self::new(builtin.chain(custom).collect())
    }

    /// First enabled rule claiming the file's extension
    pub fn match_path(&self, path: &Path) -> Option<&Rule> {
        let Some(extension) = file_extension(path) else {
            trace!("No extension: {}", path.display());
            return None;
        };

        let rule = self
            .rules
            .iter()
            .find(|rule| rule.matches_extension(&extension));

        match rule {
            Some(rule) => debug!("Rule '{}' matched: {}", rule.label(), path.display()),
            None => trace!("No rule for {}: {}", extension, path.display()),
        }
        rule
    }

    /// Get all rules
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

fn sanitize(mut rule: Rule) -> Rule {
    if !is_valid_folder_name(&rule.target_folder) {
        warn!(
            "Ignoring rule with invalid folder name '{}' ({})",
            rule.target_folder,
            rule.extensions.join(", ")
        );
        rule.extensions.clear();
    }
    rule
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CustomCategory, FileRule};

    fn file_rule(folder: &str, extensions: &[&str]) -> FileRule {
        FileRule {
            enabled: true,
            extensions: extensions.iter().map(|e| e.to_string()).collect(),
            target_folder: folder.to_string(),
        }
    }

    fn category(id: &str, name: &str, folder: &str, extensions: &[&str]) -> CustomCategory {
        CustomCategory {
            id: id.to_string(),
            name: name.to_string(),
            extensions: extensions.iter().map(|e| e.to_string()).collect(),
            folder_name: folder.to_string(),
            enabled: true,
        }
    }

    #[test]
    fn test_builtin_before_custom() {
        let config = Config {
            file_rules: vec![file_rule("Docs", &[".txt"])],
            custom_categories: vec![category("c1", "Notes", "Notes", &[".txt", ".md"])],
            ..Config::default()
        };

        let rules = RuleSet::from_config(&config);
        assert_eq!(rules.len(), 2);

        let matched = rules.match_path(Path::new("/in/todo.txt")).unwrap();
        assert_eq!(matched.target_folder, "Docs");

        let matched = rules.match_path(Path::new("/in/readme.md")).unwrap();
        assert_eq!(matched.category_name(), Some("Notes"));
    }

    #[test]
    fn test_first_match_wins_in_declaration_order() {
        let config = Config {
            file_rules: vec![file_rule("First", &[".txt"]), file_rule("Second", &[".txt"])],
            custom_categories: vec![category("c1", "Late", "Late", &[".txt"])],
            ..Config::default()
        };

        let rules = RuleSet::from_config(&config);
        let matched = rules.match_path(Path::new("a.txt")).unwrap();
        assert_eq!(matched.target_folder, "First");
    }

    #[test]
    fn test_case_insensitive_match() {
        let config = Config {
            file_rules: vec![file_rule("Images", &[".JPG"])],
            ..Config::default()
        };
        let rules = RuleSet::from_config(&config);

        let upper = rules.match_path(Path::new("FOO.JPG")).unwrap();
        let lower = rules.match_path(Path::new("foo.jpg")).unwrap();
        assert_eq!(upper, lower);
    }

    #[test]
    fn test_disabled_rules_skipped() {
        let mut disabled_rule = file_rule("Images", &[".png"]);
        disabled_rule.enabled = false;
        let mut disabled_category = category("c1", "Code", "Code", &[".rs"]);
        disabled_category.enabled = false;

        let config = Config {
            file_rules: vec![disabled_rule],
            custom_categories: vec![disabled_category],
            ..Config::default()
        };

        let rules = RuleSet::from_config(&config);
        assert!(rules.is_empty());
        assert!(rules.match_path(Path::new("x.png")).is_none());
        assert!(rules.match_path(Path::new("main.rs")).is_none());

        let mut rule = Rule::new("Images", [".png"]);
        rule.enabled = false;
        let rules = RuleSet::new(vec![rule]);
        assert!(rules.match_path(Path::new("x.png")).is_none());
    }

    #[test]
    fn test_no_extension_matches_nothing() {
        let rules = RuleSet::new(vec![Rule::new("Misc", [".txt"])]);
        assert!(rules.match_path(Path::new("Makefile")).is_none());
        assert!(rules.match_path(Path::new(".txt")).is_none());
    }

    #[test]
    fn test_invalid_folder_matches_nothing() {
        let config = Config {
            file_rules: vec![file_rule("", &[".pdf"]), file_rule("../escape", &[".txt"])],
            custom_categories: vec![category("c1", "Empty", "  ", &[".md"])],
            ..Config::default()
        };

        let rules = RuleSet::from_config(&config);
        assert_eq!(rules.len(), 3);
        assert!(rules.match_path(Path::new("a.pdf")).is_none());
        assert!(rules.match_path(Path::new("a.txt")).is_none());
        assert!(rules.match_path(Path::new("a.md")).is_none());
    }
}
