// src/transforms/styles.rs

//! Styles transform: every non-partial `.scss` entry is compiled, minified
//! and vendor-prefixed, then all results are joined into one stylesheet.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{anyhow, Result};
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};
use regex::Regex;
use tracing::{debug, warn};

use crate::config::BuildConfig;
use crate::pipeline::cache::IncrementalCache;
use crate::pipeline::discover::{discover, write_output};
use crate::pipeline::stage::{Asset, StagePipeline};
use crate::transforms::{BuildContext, Transform, TransformReport};
use crate::types::TaskKind;
use crate::watch::hash::{combine_hashes, compute_bytes_hash, compute_hash_for_paths};
use crate::watch::patterns::GlobMatcher;

/// Decimal places kept in compiled numbers.
pub const NUMBER_PRECISION: usize = 6;

/// Quoted strings and `url(...)` tokens are matched so they can be passed
/// through untouched; only bare numbers are rounded.
static LONG_DECIMAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""(?:[^"\\]|\\.)*"|'(?:[^'\\]|\\.)*'|(?i:url)\([^)]*\)|\d*\.\d{7,}"#)
        .expect("decimal regex")
});

pub struct StylesTransform {
    pipeline: StagePipeline,
    /// Per-entry compiled contribution, keyed by source path.
    cache: IncrementalCache<String>,
    /// Every `.scss` under the styles base, used to fingerprint imports.
    all_scss: GlobMatcher,
}

impl StylesTransform {
    pub fn new(cfg: &BuildConfig) -> Result<Self> {
        let load_path = cfg.styles.base_dir(&cfg.root);
        let pipeline = StagePipeline::new(TaskKind::Styles)
            .stage("compile", move |asset| compile_scss(asset, &load_path))
            .stage("minify", |asset| {
                let css = print_css(asset.text()?, Targets::default())?;
                Ok(asset.with_contents(css))
            })
            .stage("prefix", |asset| {
                let css = print_css(asset.text()?, prefix_targets())?;
                Ok(asset.with_contents(css))
            });

        Ok(Self {
            pipeline,
            cache: IncrementalCache::new(),
            all_scss: import_matcher(cfg.styles.sources.base())?,
        })
    }
}

impl Transform for StylesTransform {
    fn kind(&self) -> TaskKind {
        TaskKind::Styles
    }

    fn run(&mut self, ctx: &BuildContext) -> Result<TransformReport> {
        let cfg = &ctx.config;
        let mut report = TransformReport::default();

        let entries: Vec<_> = discover(&cfg.root, &cfg.styles.sources)?
            .into_iter()
            .filter(|f| !is_partial(&f.path))
            .collect();

        let live: HashSet<PathBuf> = entries.iter().map(|f| f.path.clone()).collect();
        self.cache.retain_paths(&live);

        if entries.is_empty() {
            debug!("no stylesheet entries; nothing to bundle");
            return Ok(report);
        }

        // Anything an entry may import: partials and nested sheets.
        let imports: Vec<PathBuf> = discover(&cfg.root, &self.all_scss)?
            .into_iter()
            .map(|f| f.path)
            .filter(|p| !live.contains(p))
            .collect();
        let imports_hash = compute_hash_for_paths(&imports)?;

        let mut contributions: Vec<String> = Vec::with_capacity(entries.len());
        for file in &entries {
            let asset: Asset = match file.read() {
                Ok(asset) => asset,
                Err(err) => {
                    ctx.notify(self.kind(), "read", &file.rel_root, format!("{err:#}"));
                    self.cache.invalidate(&file.path);
                    report.failed += 1;
                    continue;
                }
            };

            let fingerprint =
                combine_hashes([compute_bytes_hash(&asset.contents).as_str(), imports_hash.as_str()]);
            if let Some(css) = self.cache.get_fresh(&file.path, &fingerprint) {
                contributions.push(css.clone());
                report.skipped += 1;
                continue;
            }

            match self.pipeline.process(asset, ctx.notifier.as_ref()) {
                Some(out) => {
                    let css = String::from_utf8_lossy(&out.contents).into_owned();
                    self.cache.insert(file.path.clone(), fingerprint, css.clone());
                    contributions.push(css);
                    report.processed += 1;
                }
                None => {
                    self.cache.invalidate(&file.path);
                    report.failed += 1;
                }
            }
        }

        if contributions.is_empty() {
            warn!(failed = report.failed, "every stylesheet failed; keeping previous bundle");
            return Ok(report);
        }

        let dest = cfg.styles.dist.join(cfg.styles_bundle());
        write_output(&dest, contributions.join("\n").as_bytes())?;
        report.written.push(dest);
        Ok(report)
    }

    fn clear_cache(&mut self) {
        self.cache.clear();
    }
}

/// Every `.scss` below `base`, whether entry or partial.
fn import_matcher(base: &Path) -> Result<GlobMatcher> {
    let base = base.to_string_lossy().replace('\\', "/");
    let pattern = if base.is_empty() {
        "**/*.scss".to_string()
    } else {
        format!("{base}/**/*.scss")
    };
    Ok(GlobMatcher::new(&[pattern], &[])?)
}

/// `_name.scss` files are only compiled through an import.
fn is_partial(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('_'))
}

fn compile_scss(asset: Asset, load_path: &Path) -> Result<Asset> {
    let source = asset.text()?.to_string();
    let own_dir = asset
        .source
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();

    let options = grass::Options::default()
        .style(grass::OutputStyle::Expanded)
        .load_path(own_dir)
        .load_path(load_path)
        .quiet(true);
    let css = grass::from_string(source, &options).map_err(|err| anyhow!("{err}"))?;

    Ok(asset.with_contents(limit_precision(&indent_with_tabs(&css), NUMBER_PRECISION)))
}

/// Re-indent expanded output (two spaces per level) with tabs.
pub fn indent_with_tabs(css: &str) -> String {
    let mut out = String::with_capacity(css.len());
    for line in css.lines() {
        let trimmed = line.trim_start_matches(' ');
        let spaces = line.len() - trimmed.len();
        out.push_str(&"\t".repeat(spaces / 2));
        out.push_str(&" ".repeat(spaces % 2));
        out.push_str(trimmed);
        out.push('\n');
    }
    out
}

/// Round every number with more than `places` decimals. Strings and urls
/// are left alone.
pub fn limit_precision(css: &str, places: usize) -> String {
    LONG_DECIMAL
        .replace_all(css, |caps: &regex::Captures<'_>| {
            let raw = &caps[0];
            if !raw.starts_with(|c: char| c == '.' || c.is_ascii_digit()) {
                return raw.to_string();
            }
            match raw.parse::<f64>() {
                Ok(value) => {
                    let rounded = format!("{value:.places$}");
                    let rounded = rounded.trim_end_matches('0').trim_end_matches('.');
                    match rounded {
                        "" | "0" => "0".to_string(),
                        r if raw.starts_with('.') => r.trim_start_matches('0').to_string(),
                        r => r.to_string(),
                    }
                }
                Err(_) => raw.to_string(),
            }
        })
        .into_owned()
}

/// Browsers vendor prefixes are generated for.
pub fn prefix_targets() -> Targets {
    let version = |major: u32| Some(major << 16);
    Targets::from(Browsers {
        android: version(4),
        chrome: version(49),
        edge: version(15),
        firefox: version(52),
        ie: version(11),
        ios_saf: version(10),
        opera: version(36),
        safari: version(10),
        samsung: version(5),
    })
}

fn print_css(css: &str, targets: Targets) -> Result<String> {
    let mut sheet =
        StyleSheet::parse(css, ParserOptions::default()).map_err(|err| anyhow!("{err}"))?;
    sheet
        .minify(MinifyOptions {
            targets: targets.clone(),
            ..MinifyOptions::default()
        })
        .map_err(|err| anyhow!("{err}"))?;
    let printed = sheet
        .to_css(PrinterOptions {
            minify: true,
            targets,
            ..PrinterOptions::default()
        })
        .map_err(|err| anyhow!("{err}"))?;
    Ok(printed.code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partials_are_recognised_by_underscore() {
        assert!(is_partial(Path::new("/p/src/scss/_vars.scss")));
        assert!(!is_partial(Path::new("/p/src/scss/main.scss")));
    }

    #[test]
    fn reindents_two_space_levels_as_tabs() {
        let css = ".a {\n  color: red;\n}\n@media print {\n  .b {\n    top: 0;\n  }\n}\n";
        let out = indent_with_tabs(css);
        assert!(out.contains("\n\tcolor: red;\n"));
        assert!(out.contains("\n\t\ttop: 0;\n"));
    }

    #[test]
    fn rounds_long_decimals_only() {
        assert_eq!(limit_precision("width: 33.33333333%;", 6), "width: 33.333333%;");
        assert_eq!(limit_precision("a: .12345678px", 6), "a: .123457px");
        assert_eq!(limit_precision("b: 1.5px", 6), "b: 1.5px");
        assert_eq!(limit_precision("c: 2.0000000001em", 6), "c: 2em");
    }

    #[test]
    fn strings_and_urls_keep_their_digits() {
        let css = "content: \"v1.123456789\"; background: url(img/x.1234567890.png); \
                   font: 'f.12345678'; src: URL(\"a.12345678.woff\"); left: 0.123456789px";
        assert_eq!(
            limit_precision(css, 6),
            "content: \"v1.123456789\"; background: url(img/x.1234567890.png); \
             font: 'f.12345678'; src: URL(\"a.12345678.woff\"); left: 0.123457px"
        );
    }

    #[test]
    fn import_matcher_rejects_unparsable_base() {
        assert!(import_matcher(Path::new("src/scss")).is_ok());
        assert!(import_matcher(Path::new("src/{scss")).is_err());
    }

    #[test]
    fn minifies_and_prefixes() {
        let minified = print_css(".a {\n\twidth: 10px;\n}\n", Targets::default()).unwrap();
        assert_eq!(minified, ".a{width:10px}");

        let prefixed = print_css(".b{user-select:none}", prefix_targets()).unwrap();
        assert!(prefixed.contains("-webkit-user-select:none"), "{prefixed}");
        assert!(prefixed.contains("user-select:none"));
    }

    #[test]
    fn compile_stage_reports_syntax_errors() {
        let asset = Asset {
            source: PathBuf::from("/nowhere/bad.scss"),
            rel_root: "src/scss/bad.scss".into(),
            rel: "bad.scss".into(),
            contents: b".a { width: 10px".to_vec(),
        };
        assert!(compile_scss(asset, Path::new("/nowhere")).is_err());
    }
}
