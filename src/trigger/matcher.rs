// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stagehand contributors

//! Glob include/exclude matching over ref names
//!
//! Compiles a descriptor's `include`/`exclude` glob lists and answers whether
//! a branch or tag name passes the filter. Exclusion always wins.

use glob::Pattern;

use crate::descriptor::RefRules;
use crate::errors::StagehandError;

/// Compiled include/exclude filter over ref names
#[derive(Debug, Clone)]
pub struct RefFilter {
    include: Vec<Pattern>,
    exclude: Vec<Pattern>,
}

impl RefFilter {
    /// Compile the glob lists from a descriptor's rules
    pub fn compile(rules: &RefRules) -> Result<Self, StagehandError> {
        let include = rules
            .include
            .iter()
            .map(|g| Pattern::new(g))
            .collect::<Result<Vec<_>, _>>()?;
        let exclude = rules
            .exclude
            .iter()
            .map(|g| Pattern::new(g))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { include, exclude })
    }

    /// True when the name matches an include glob and no exclude glob.
    ///
    /// An empty include list matches nothing.
    pub fn matches(&self, name: &str) -> bool {
        if self.exclude.iter().any(|p| p.matches(name)) {
            return false;
        }
        self.include.iter().any(|p| p.matches(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules(include: &[&str], exclude: &[&str]) -> RefRules {
        RefRules {
            include: include.iter().map(|s| s.to_string()).collect(),
            exclude: exclude.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_include_all_branches() {
        let filter = RefFilter::compile(&rules(&["*"], &[])).unwrap();
        assert!(filter.matches("main"));
        assert!(filter.matches("feature-x"));
    }

    #[test]
    fn test_exclusion_wins_over_inclusion() {
        let filter = RefFilter::compile(&rules(&["*"], &["*backport*"])).unwrap();
        assert!(filter.matches("main"));
        assert!(!filter.matches("v1.0-backport"));
        assert!(!filter.matches("backport-fix"));
    }

    #[test]
    fn test_release_tag_convention() {
        let filter =
            RefFilter::compile(&rules(&["v*"], &["*dev*", "*pre*", "*post*"])).unwrap();
        assert!(filter.matches("v1.2.3"));
        assert!(filter.matches("v0.1"));
        assert!(!filter.matches("v1.2.3.dev1"));
        assert!(!filter.matches("v1.2.3pre0"));
        assert!(!filter.matches("v1.2.3.post1"));
        assert!(!filter.matches("release-1.2"));
    }

    #[test]
    fn test_empty_include_matches_nothing() {
        let filter = RefFilter::compile(&rules(&[], &[])).unwrap();
        assert!(!filter.matches("main"));
    }

    #[test]
    fn test_invalid_glob() {
        let result = RefFilter::compile(&rules(&["[unclosed"], &[]));
        assert!(matches!(result, Err(StagehandError::GlobPattern { .. })));
    }
}
