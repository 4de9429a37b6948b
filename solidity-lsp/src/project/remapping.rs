//! Import remappings: `[context:]prefix=target`

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::state::normalize_path;

static REMAPPING: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^\s*(?:([^:=\s]+):)?([^=\s]+)\s*=\s*(\S+)\s*$").ok());

/// One remapping rule, bound to the project root its relative target is relative to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Remapping {
    pub context: Option<String>,
    pub prefix: String,
    pub target: String,
    root: PathBuf,
}

impl Remapping {
    /// Parse a single rule. Returns `None` for lines that are not `[context:]prefix=target`.
    #[must_use]
    pub fn parse(line: &str, root: &Path) -> Option<Self> {
        let captures = REMAPPING.as_ref()?.captures(line)?;
        Some(Self {
            context: captures.get(1).map(|m| m.as_str().to_string()),
            prefix: captures.get(2)?.as_str().to_string(),
            target: captures.get(3)?.as_str().to_string(),
            root: root.to_path_buf(),
        })
    }

    /// Parse one rule per line, skipping malformed lines and comments.
    #[must_use]
    pub fn parse_all(text: &str, root: &Path) -> Vec<Self> {
        text.lines()
            .filter(|line| !line.trim_start().starts_with('#'))
            .filter_map(|line| {
                let remapping = Self::parse(line, root);
                if remapping.is_none() && !line.trim().is_empty() {
                    tracing::debug!(line, "skipping malformed remapping");
                }
                remapping
            })
            .collect()
    }

    /// Absolute directory the target points at.
    #[must_use]
    pub fn target_path(&self) -> PathBuf {
        let target = Path::new(&self.target);
        if target.is_absolute() {
            normalize_path(target)
        } else {
            normalize_path(&self.root.join(target))
        }
    }

    /// Whether this rule rewrites `import` when written in `from_file`.
    #[must_use]
    pub fn is_import_for_this(&self, import: &str, from_file: Option<&Path>) -> bool {
        if !import.starts_with(&self.prefix) {
            return false;
        }
        match (&self.context, from_file) {
            (None, _) => true,
            (Some(context), Some(from_file)) => {
                let context_path = normalize_path(&self.root.join(context));
                from_file.starts_with(&context_path)
                    || from_file
                        .strip_prefix(&self.root)
                        .is_ok_and(|relative| relative.to_string_lossy().starts_with(context.as_str()))
            }
            (Some(_), None) => false,
        }
    }

    /// Resolve `import` to an absolute file path when the rule applies.
    #[must_use]
    pub fn resolve_import(&self, import: &str, from_file: Option<&Path>) -> Option<PathBuf> {
        if !self.is_import_for_this(import, from_file) {
            return None;
        }
        let rest = import.get(self.prefix.len()..)?.trim_start_matches('/');
        Some(normalize_path(&self.target_path().join(rest)))
    }

    /// Whether `path` lives under this rule's target.
    #[must_use]
    pub fn is_file_for_this(&self, path: &Path) -> bool {
        path.starts_with(self.target_path())
    }

    /// The import specifier that resolves to `path` through this rule.
    #[must_use]
    pub fn create_import_from_file(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(self.target_path()).ok()?;
        let relative = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        if self.prefix.ends_with('/') || relative.is_empty() {
            Some(format!("{}{relative}", self.prefix))
        } else {
            Some(format!("{}/{relative}", self.prefix))
        }
    }
}

impl std::fmt::Display for Remapping {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(context) = &self.context {
            write!(f, "{context}:")?;
        }
        write!(f, "{}={}", self.prefix, self.target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case::relative("lib/=node_modules/lib/", "/work/node_modules/lib/Foo.sol")]
    #[case::absolute("lib/=/opt/deps/node_modules/lib/", "/opt/deps/node_modules/lib/Foo.sol")]
    #[allow(clippy::expect_used)]
    fn test_round_trip(#[case] rule: &str, #[case] expected: &str) {
        let remapping = Remapping::parse(rule, Path::new("/work")).expect("valid rule");

        let resolved = remapping.resolve_import("lib/Foo.sol", None);
        assert_eq!(resolved, Some(PathBuf::from(expected)));
        let path = PathBuf::from(expected);
        assert!(remapping.is_file_for_this(&path));
        assert_eq!(
            remapping.create_import_from_file(&path).as_deref(),
            Some("lib/Foo.sol")
        );
    }

    #[test]
    #[allow(clippy::expect_used)]
    fn test_prefix_without_slash() {
        let remapping =
            Remapping::parse("@oz=lib/openzeppelin/contracts", Path::new("/w")).expect("valid rule");
        let path = remapping.resolve_import("@oz/token/ERC20.sol", None);
        assert_eq!(
            path,
            Some(PathBuf::from("/w/lib/openzeppelin/contracts/token/ERC20.sol"))
        );
        assert_eq!(
            remapping
                .create_import_from_file(Path::new("/w/lib/openzeppelin/contracts/token/ERC20.sol"))
                .as_deref(),
            Some("@oz/token/ERC20.sol")
        );
    }

    #[test]
    #[allow(clippy::expect_used)]
    fn test_context_scopes_rule() {
        let remapping =
            Remapping::parse("lib/a:@dep/=lib/a/lib/dep/", Path::new("/w")).expect("valid rule");
        assert_eq!(remapping.context.as_deref(), Some("lib/a"));
        assert!(remapping.is_import_for_this("@dep/X.sol", Some(Path::new("/w/lib/a/src/A.sol"))));
        assert!(!remapping.is_import_for_this("@dep/X.sol", Some(Path::new("/w/src/B.sol"))));
        assert!(!remapping.is_import_for_this("@dep/X.sol", None));
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        let rules = Remapping::parse_all(
            "ds-test/=lib/ds-test/src/\nnot a rule\n\n# comment\nforge-std/=lib/forge-std/src/\n",
            Path::new("/w"),
        );
        let prefixes: Vec<_> = rules.iter().map(|r| r.prefix.as_str()).collect();
        assert_eq!(prefixes, vec!["ds-test/", "forge-std/"]);
        assert_eq!(rules.first().map(ToString::to_string).as_deref(), Some("ds-test/=lib/ds-test/src/"));
    }
}
