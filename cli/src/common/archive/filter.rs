//! # slipstream Path Filter (`common::archive::filter`)
//!
//! File: cli/src/common/archive/filter.rs
//!
//! ## Overview
//!
//! Decides, for every node the walker visits, whether it goes into the
//! archive. Inputs are the node's root-relative path, whether it is a
//! directory, the optional list of VCS-tracked files, and the include and
//! exclude patterns.
//!
//! ## Pattern Syntax
//!
//! - `*` matches anything except `/`
//! - `**` matches anything including `/`
//! - `?` matches a single character (except `/`), `[...]` character classes
//! - Leading `/` anchors to the archive root
//! - Trailing `/` matches only directories
//! - Patterns without an inner `/` also match the bare file name at any depth
//!
//! ## Decision Rules
//!
//! 1. Excludes always win. An excluded directory prunes its whole subtree.
//! 2. A path matching an include, or below a directory matching one, is included.
//! 3. With a tracked list, files must be tracked. Directories are visited only
//!    when something tracked (or includable) can live beneath them.
//! 4. Without a tracked list, a non-empty include list excludes everything else.
//!
//! Directories are never looked up in the tracked list directly; VCS tools list
//! files, so a directory is judged by its tracked descendants instead.
//!
use crate::core::error::ArchiveError;
use std::collections::HashSet;
use tracing::trace;

/// What the walker should do with a visited node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Emit the node (and, for directories, descend into it).
    Include,
    /// Leave the node out. Only produced for non-directories.
    SkipEntry,
    /// Leave the directory out and do not descend into it.
    SkipSubtree,
}

impl Decision {
    fn skip(is_dir: bool) -> Self {
        if is_dir {
            Decision::SkipSubtree
        } else {
            Decision::SkipEntry
        }
    }
}

/// A compiled glob with the markers stripped from its original text.
#[derive(Debug, Clone)]
pub struct FilterPattern {
    pub original: String,
    matcher: globset::GlobMatcher,
    pub dir_only: bool,
    pub anchored: bool,
}

impl FilterPattern {
    pub fn parse(pattern: &str) -> Result<Self, ArchiveError> {
        if pattern.is_empty() {
            return Err(ArchiveError::Config("empty pattern is not allowed".into()));
        }
        let dir_only = pattern.ends_with('/');
        let anchored = pattern.starts_with('/');
        let glob_text = pattern.trim_start_matches('/').trim_end_matches('/');
        if glob_text.is_empty() {
            return Err(ArchiveError::Config(format!(
                "pattern '{}' is empty once the '/' markers are removed",
                pattern
            )));
        }
        let glob = globset::GlobBuilder::new(glob_text)
            .literal_separator(true)
            .build()
            .map_err(|e| ArchiveError::Config(format!("invalid pattern '{}': {}", pattern, e)))?;
        Ok(Self {
            original: pattern.to_string(),
            matcher: glob.compile_matcher(),
            dir_only,
            anchored,
        })
    }

    /// The pattern body with the anchor and directory markers removed.
    fn body(&self) -> &str {
        self.original.trim_start_matches('/').trim_end_matches('/')
    }

    fn is_path_pattern(&self) -> bool {
        self.body().contains('/')
    }

    pub fn matches(&self, relative_path: &str, is_dir: bool) -> bool {
        if self.dir_only && !is_dir {
            return false;
        }
        if self.matcher.is_match(relative_path) {
            return true;
        }
        if self.anchored || self.is_path_pattern() {
            return false;
        }
        file_name(relative_path).is_some_and(|name| self.matcher.is_match(name))
    }

    /// Whether a directory could hold something this pattern matches.
    pub fn could_match_below(&self, dir_path: &str) -> bool {
        if !self.anchored && !self.is_path_pattern() {
            return true;
        }
        let prefix = literal_prefix(self.body());
        if prefix.is_empty() || dir_path.is_empty() {
            return true;
        }
        // dir is an ancestor of (or equal to) the prefix
        if let Some(rest) = prefix.strip_prefix(dir_path) {
            if rest.is_empty() || rest.starts_with('/') {
                return true;
            }
        }
        // dir is below the prefix
        if let Some(rest) = dir_path.strip_prefix(prefix) {
            if rest.is_empty() || rest.starts_with('/') {
                return true;
            }
        }
        false
    }
}

/// Last component of a `/`-separated path.
fn file_name(relative_path: &str) -> Option<&str> {
    relative_path.rsplit('/').next().filter(|s| !s.is_empty())
}

/// The part of a pattern before its first wildcard, cut back to a whole
/// path component: `src/foo/**/*.rs` -> `src/foo`, `**/*.rs` -> ``.
/// Alternations (`{a,b}`) and escapes (`\*`) count as wildcards.
fn literal_prefix(pattern: &str) -> &str {
    let wildcard = pattern.find(['*', '?', '[', '{', '\\']).unwrap_or(pattern.len());
    if wildcard == pattern.len() {
        return pattern;
    }
    match pattern[..wildcard].rfind('/') {
        Some(pos) => &pattern[..pos],
        None => "",
    }
}

/// The tracked-file list, with every ancestor directory precomputed so a
/// directory can be pruned when nothing tracked lives beneath it.
#[derive(Debug, Clone, Default)]
pub struct TrackedFiles {
    files: HashSet<String>,
    dirs: HashSet<String>,
}

impl TrackedFiles {
    pub fn new<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut tracked = Self::default();
        for path in paths {
            let path: String = path.into();
            let path = path.trim_start_matches("./").to_string();
            let mut end = path.len();
            while let Some(pos) = path[..end].rfind('/') {
                if !tracked.dirs.insert(path[..pos].to_string()) {
                    break;
                }
                end = pos;
            }
            tracked.files.insert(path);
        }
        tracked
    }

    pub fn contains(&self, relative_path: &str) -> bool {
        self.files.contains(relative_path)
    }

    pub fn has_descendants(&self, dir_path: &str) -> bool {
        self.dirs.contains(dir_path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Include/exclude patterns plus the optional tracked-file list.
#[derive(Debug, Clone, Default)]
pub struct PathFilter {
    includes: Vec<FilterPattern>,
    excludes: Vec<FilterPattern>,
    tracked: Option<TrackedFiles>,
}

impl PathFilter {
    pub fn new(
        includes: &[String],
        excludes: &[String],
        tracked: Option<TrackedFiles>,
    ) -> Result<Self, ArchiveError> {
        Ok(Self {
            includes: includes
                .iter()
                .map(|p| FilterPattern::parse(p))
                .collect::<Result<_, _>>()?,
            excludes: excludes
                .iter()
                .map(|p| FilterPattern::parse(p))
                .collect::<Result<_, _>>()?,
            tracked,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.includes.is_empty() && self.excludes.is_empty() && self.tracked.is_none()
    }

    pub fn decide(&self, relative_path: &str, is_dir: bool) -> Decision {
        if let Some(pattern) = self
            .excludes
            .iter()
            .find(|p| p.matches(relative_path, is_dir))
        {
            trace!("'{}' excluded by '{}'", relative_path, pattern.original);
            return Decision::skip(is_dir);
        }

        if self.included_by_pattern(relative_path, is_dir) {
            return Decision::Include;
        }

        match &self.tracked {
            Some(tracked) => {
                let keep = if is_dir {
                    tracked.has_descendants(relative_path) || self.includes_could_match(relative_path)
                } else {
                    tracked.contains(relative_path)
                };
                if keep {
                    Decision::Include
                } else {
                    Decision::skip(is_dir)
                }
            }
            None if self.includes.is_empty() => Decision::Include,
            None if is_dir && self.includes_could_match(relative_path) => Decision::Include,
            None => Decision::skip(is_dir),
        }
    }

    /// Direct include match, or an ancestor directory matches an include.
    fn included_by_pattern(&self, relative_path: &str, is_dir: bool) -> bool {
        if self.includes.iter().any(|p| p.matches(relative_path, is_dir)) {
            return true;
        }
        let mut end = relative_path.len();
        while let Some(pos) = relative_path[..end].rfind('/') {
            let ancestor = &relative_path[..pos];
            if self.includes.iter().any(|p| p.matches(ancestor, true)) {
                return true;
            }
            end = pos;
        }
        false
    }

    fn includes_could_match(&self, dir_path: &str) -> bool {
        self.includes.iter().any(|p| p.could_match_below(dir_path))
    }
}
