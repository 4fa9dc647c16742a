//! Node labels - the unique identity of a graph node.
//!
//! Labels use the `//package/path:name` form, optionally prefixed with an
//! `@repo` for nodes that come from an external repository.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Suffix of every per-node output directory.
pub const OUTPUT_DIR_SUFFIX: &str = ".cargo";

/// Prefix of the output key for labels in an external repository.
const EXTERNAL_KEY_PREFIX: &str = "external~";

/// A parsed node label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Label {
    repo: Option<String>,
    package: String,
    name: String,
}

impl Label {
    /// Create a label from its parts.
    pub fn new(
        repo: Option<&str>,
        package: impl Into<String>,
        name: impl Into<String>,
    ) -> Result<Self, LabelParseError> {
        let label = Label {
            repo: repo.map(str::to_string),
            package: package.into(),
            name: name.into(),
        };
        label.validate()?;
        Ok(label)
    }

    /// The external repository this label lives in, if any.
    pub fn repo(&self) -> Option<&str> {
        self.repo.as_deref()
    }

    /// Package path, empty for the root package.
    pub fn package(&self) -> &str {
        &self.package
    }

    /// Target name within the package.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Relative directory that holds everything generated for this label.
    ///
    /// Distinct labels always map to distinct keys, and no key lies inside
    /// another: package segments and repository names never contain `~` or
    /// `%` and never end in `.cargo`, the name directory is the only
    /// component carrying that suffix, and `/` inside names is escaped.
    pub fn output_key(&self) -> PathBuf {
        let mut key = PathBuf::new();
        if let Some(repo) = &self.repo {
            key.push(format!("{}{}", EXTERNAL_KEY_PREFIX, repo));
        }
        for segment in self.package.split('/').filter(|s| !s.is_empty()) {
            key.push(segment);
        }
        key.push(format!("{}{}", escape_name(&self.name), OUTPUT_DIR_SUFFIX));
        key
    }

    /// Crate name derived from the target name.
    pub fn default_crate_name(&self) -> String {
        self.name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
            .collect()
    }

    fn validate(&self) -> Result<(), LabelParseError> {
        if self.name.is_empty() {
            return Err(LabelParseError::new(self.to_string(), "target name is empty"));
        }
        if self.name.contains(':') {
            return Err(LabelParseError::new(self.to_string(), "target name contains ':'"));
        }
        if let Some(repo) = &self.repo {
            if repo.is_empty() || repo.contains(['/', ':', '\\']) {
                return Err(LabelParseError::new(self.to_string(), "invalid repository name"));
            }
            if repo.ends_with(OUTPUT_DIR_SUFFIX) {
                return Err(LabelParseError::new(
                    self.to_string(),
                    "repository name ends in `.cargo`",
                ));
            }
        }
        if !self.package.is_empty() {
            for segment in self.package.split('/') {
                if segment.is_empty() || segment == "." || segment == ".." {
                    return Err(LabelParseError::new(
                        self.to_string(),
                        "package path has an empty, `.` or `..` segment",
                    ));
                }
                if segment.contains(['~', '%', ':', '\\']) {
                    return Err(LabelParseError::new(
                        self.to_string(),
                        "package path contains a reserved character",
                    ));
                }
                if segment.ends_with(OUTPUT_DIR_SUFFIX) {
                    return Err(LabelParseError::new(
                        self.to_string(),
                        "package segment ends in `.cargo`",
                    ));
                }
            }
        }
        Ok(())
    }
}

fn escape_name(name: &str) -> String {
    name.replace('%', "%25").replace('/', "%2F")
}

impl FromStr for Label {
    type Err = LabelParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (repo, rest) = if let Some(stripped) = s.strip_prefix('@') {
            let stripped = stripped.trim_start_matches('@');
            match stripped.find("//") {
                Some(idx) => (Some(&stripped[..idx]), &stripped[idx..]),
                None => return Err(LabelParseError::new(s, "expected `//` after repository")),
            }
        } else {
            (None, s)
        };

        let rest = rest
            .strip_prefix("//")
            .ok_or_else(|| LabelParseError::new(s, "labels must start with `//` or `@repo//`"))?;

        let (package, name) = match rest.split_once(':') {
            Some((package, name)) => (package, name.to_string()),
            None => {
                let last = rest.rsplit('/').next().unwrap_or_default();
                if last.is_empty() {
                    return Err(LabelParseError::new(s, "missing target name"));
                }
                (rest, last.to_string())
            }
        };

        Label::new(repo, package, name).map_err(|e| LabelParseError::new(s, e.reason))
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(repo) = &self.repo {
            write!(f, "@{}", repo)?;
        }
        write!(f, "//{}:{}", self.package, self.name)
    }
}

impl Serialize for Label {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Label {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Error returned when parsing an invalid label.
#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid label `{label}`: {reason}")]
pub struct LabelParseError {
    pub label: String,
    pub reason: String,
}

impl LabelParseError {
    fn new(label: impl Into<String>, reason: impl Into<String>) -> Self {
        LabelParseError {
            label: label.into(),
            reason: reason.into(),
        }
    }
}
