// src/watch/patterns.rs

use std::fmt;
use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

use crate::config::BuildConfig;
use crate::errors::{AssetpipeError, Result};
use crate::types::TaskKind;

/// Normalize a root-relative path or pattern: forward slashes, no leading
/// `./`, no surrounding whitespace.
pub fn normalize_rel(s: &str) -> String {
    let mut s = s.trim().replace('\\', "/");
    while let Some(rest) = s.strip_prefix("./") {
        s = rest.to_string();
    }
    if s == "." {
        s.clear();
    }
    s
}

/// Compiled include/exclude globs, matched against root-relative paths with
/// forward slashes (e.g. `"src/html/a.html"`).
///
/// `*` does not cross directory boundaries, so `src/js/*.js` only matches
/// top-level scripts while `src/lib/**/*` matches the whole tree.
#[derive(Clone)]
pub struct GlobMatcher {
    patterns: Vec<String>,
    include: GlobSet,
    exclude: Option<GlobSet>,
    base: PathBuf,
}

impl fmt::Debug for GlobMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlobMatcher")
            .field("patterns", &self.patterns)
            .field("base", &self.base)
            .finish_non_exhaustive()
    }
}

impl GlobMatcher {
    pub fn new(include: &[String], exclude: &[String]) -> Result<Self> {
        let include_set = build_globset(include)?;
        let exclude_set = if exclude.is_empty() {
            None
        } else {
            Some(build_globset(exclude)?)
        };

        Ok(Self {
            patterns: include.to_vec(),
            include: include_set,
            exclude: exclude_set,
            base: common_base(include),
        })
    }

    /// Returns true if `rel_path` matches an include pattern and no exclude
    /// pattern.
    pub fn matches(&self, rel_path: &str) -> bool {
        if !self.include.is_match(rel_path) {
            return false;
        }
        if let Some(exclude) = &self.exclude {
            if exclude.is_match(rel_path) {
                return false;
            }
        }
        true
    }

    /// Longest literal directory shared by all include patterns, relative to
    /// the project root. Discovery walks only this directory.
    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }
}

/// Association between a set of watched globs and the transform to re-run.
#[derive(Debug, Clone)]
pub struct WatchBinding {
    task: TaskKind,
    matcher: GlobMatcher,
}

impl WatchBinding {
    pub fn new(task: TaskKind, matcher: GlobMatcher) -> Self {
        Self { task, matcher }
    }

    pub fn task(&self) -> TaskKind {
        self.task
    }

    /// Returns true if this binding is interested in the given path
    /// (relative to project root).
    pub fn matches(&self, rel_path: &str) -> bool {
        self.matcher.matches(rel_path)
    }

    pub fn patterns(&self) -> &[String] {
        self.matcher.patterns()
    }
}

/// Build one watch binding per transform from the path configuration.
///
/// Each binding uses the category's `watch` globs minus its `exclude` globs,
/// and re-triggers that category's own transform.
pub fn build_watch_bindings(cfg: &BuildConfig) -> Result<Vec<WatchBinding>> {
    let mut bindings = Vec::with_capacity(TaskKind::ALL.len());

    for task in TaskKind::ALL {
        let (watch, exclude) = match task {
            TaskKind::Markup => (&cfg.markup.watch, &cfg.markup.exclude),
            TaskKind::Styles => (&cfg.styles.watch, &cfg.styles.exclude),
            TaskKind::Scripts => (&cfg.scripts.watch, &cfg.scripts.exclude),
            TaskKind::Library => (&cfg.library.watch, &cfg.library.exclude),
            TaskKind::Images => (&cfg.images.watch, &cfg.images.exclude),
            TaskKind::Sprite => (&cfg.sprite.watch, &cfg.sprite.exclude),
        };

        let matcher = GlobMatcher::new(watch, exclude)?;
        bindings.push(WatchBinding::new(task, matcher));
    }

    Ok(bindings)
}

/// Build a GlobSet from simple string patterns.
fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = GlobBuilder::new(pat)
            .literal_separator(true)
            .build()
            .map_err(|source| AssetpipeError::GlobError {
                pattern: pat.clone(),
                source,
            })?;
        builder.add(glob);
    }
    builder.build().map_err(|source| AssetpipeError::GlobError {
        pattern: patterns.join(", "),
        source,
    })
}

fn has_glob_meta(component: &str) -> bool {
    component.contains(['*', '?', '[', '{'])
}

/// Literal directory prefix of one pattern.
///
/// `src/html/*.html` → `src/html`, `src/lib/**/*` → `src/lib`,
/// `src/a.html` → `src`.
fn literal_base(pattern: &str) -> PathBuf {
    let components: Vec<&str> = pattern.split('/').filter(|c| !c.is_empty()).collect();
    let literal_len = components
        .iter()
        .position(|c| has_glob_meta(c))
        .unwrap_or(components.len().saturating_sub(1));
    components[..literal_len].iter().collect()
}

fn common_base(patterns: &[String]) -> PathBuf {
    let mut bases = patterns.iter().map(|p| literal_base(p));
    let Some(first) = bases.next() else {
        return PathBuf::new();
    };

    bases.fold(first, |acc, next| {
        acc.components()
            .zip(next.components())
            .take_while(|(a, b)| a == b)
            .map(|(a, _)| a.as_os_str())
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher(include: &[&str], exclude: &[&str]) -> GlobMatcher {
        let include: Vec<String> = include.iter().map(|s| s.to_string()).collect();
        let exclude: Vec<String> = exclude.iter().map(|s| s.to_string()).collect();
        GlobMatcher::new(&include, &exclude).unwrap()
    }

    #[test]
    fn normalizes_relative_paths() {
        assert_eq!(normalize_rel("./src/html/*.html"), "src/html/*.html");
        assert_eq!(normalize_rel(".\\dist\\css"), "dist/css");
        assert_eq!(normalize_rel("."), "");
    }

    #[test]
    fn single_star_stays_in_directory() {
        let m = matcher(&["src/js/*.js"], &[]);
        assert!(m.matches("src/js/app.js"));
        assert!(!m.matches("src/js/sub/app.js"));
        assert!(!m.matches("src/js/app.ts"));
    }

    #[test]
    fn exclude_wins_over_include() {
        let m = matcher(&["src/img/**/*.{png,svg}"], &["src/img/sprite/**"]);
        assert!(m.matches("src/img/a.png"));
        assert!(m.matches("src/img/deep/b.svg"));
        assert!(!m.matches("src/img/sprite/icon.png"));
    }

    #[test]
    fn computes_literal_bases() {
        assert_eq!(literal_base("src/html/*.html"), PathBuf::from("src/html"));
        assert_eq!(literal_base("src/lib/**/*"), PathBuf::from("src/lib"));
        assert_eq!(literal_base("src/a.html"), PathBuf::from("src"));
        assert_eq!(literal_base("**/*.js"), PathBuf::new());
        assert_eq!(
            matcher(&["src/a/*.x", "src/b/*.x"], &[]).base(),
            Path::new("src")
        );
    }

    #[test]
    fn invalid_glob_is_reported_with_pattern() {
        let err = GlobMatcher::new(&["src/[".to_string()], &[]).unwrap_err();
        assert!(err.to_string().contains("src/["));
    }

    #[test]
    fn bindings_route_changes_to_their_own_task() {
        let cfg = BuildConfig::with_defaults("/project").unwrap();
        let bindings = build_watch_bindings(&cfg).unwrap();
        let hits = |rel: &str| -> Vec<TaskKind> {
            bindings
                .iter()
                .filter(|b| b.matches(rel))
                .map(|b| b.task())
                .collect()
        };

        assert_eq!(hits("src/html/partials/nav.html"), vec![TaskKind::Markup]);
        assert_eq!(hits("src/scss/main.scss"), vec![TaskKind::Styles]);
        assert_eq!(hits("src/js/app.js"), vec![TaskKind::Scripts]);
        assert_eq!(hits("src/lib/jquery/jquery.min.js"), vec![TaskKind::Library]);
        assert_eq!(hits("src/img/logo.png"), vec![TaskKind::Images]);
        assert_eq!(hits("src/img/sprite/icon.png"), vec![TaskKind::Sprite]);
        assert!(hits("dist/css/style.min.css").is_empty());
    }
}
