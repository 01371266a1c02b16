// src/transforms/scripts.rs

//! Scripts transform: lint (report only) → minify → one combined script.

use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;
use std::sync::LazyLock;

use anyhow::{anyhow, Result};
use minify_js::{minify, Session, TopLevelMode};
use regex::Regex;
use tracing::{debug, warn};

use crate::pipeline::cache::IncrementalCache;
use crate::pipeline::discover::{discover, write_output};
use crate::pipeline::stage::{Asset, StagePipeline};
use crate::transforms::{BuildContext, Transform, TransformReport};
use crate::types::TaskKind;
use crate::watch::hash::compute_bytes_hash;

/// Group 2 is non-empty for the strict operators.
static LOOSE_EQUALITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|[^=!<>])([=!]=)(=?)").expect("equality regex"));
static DEBUGGER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bdebugger\b").expect("debugger regex"));
static EVAL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\beval\s*\(").expect("eval regex"));

/// One advisory finding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LintFinding {
    pub file: String,
    pub line: usize,
    pub column: usize,
    pub code: &'static str,
    pub message: String,
}

impl fmt::Display for LintFinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: line {}, col {}, {} ({})",
            self.file, self.line, self.column, self.message, self.code
        )
    }
}

/// Check `source` against the built-in rules. String and comment contents
/// are not excluded.
pub fn lint_source(file: &str, source: &str) -> Vec<LintFinding> {
    let mut findings = Vec::new();
    let mut push = |line: usize, column: usize, code: &'static str, message: String| {
        findings.push(LintFinding {
            file: file.to_string(),
            line,
            column,
            code,
            message,
        });
    };

    for (idx, line) in source.lines().enumerate() {
        let line_no = idx + 1;
        let code_part = match line.find("//") {
            Some(pos) => &line[..pos],
            None => line,
        };

        if let Some(m) = DEBUGGER.find(code_part) {
            push(line_no, m.start() + 1, "W087", "Forgotten 'debugger' statement?".into());
        }
        if let Some(m) = EVAL.find(code_part) {
            push(line_no, m.start() + 1, "W061", "eval can be harmful.".into());
        }
        for caps in LOOSE_EQUALITY.captures_iter(code_part) {
            let strict_op = caps.get(2).is_some_and(|m| !m.is_empty());
            if let (Some(op), false) = (caps.get(1), strict_op) {
                let strict = if op.as_str() == "==" { "===" } else { "!==" };
                push(
                    line_no,
                    op.start() + 1,
                    "W116",
                    format!("Expected '{strict}' and instead saw '{}'.", op.as_str()),
                );
            }
        }
        let trimmed = line.trim_end();
        if trimmed.len() != line.len() {
            push(line_no, trimmed.len() + 1, "W102", "Trailing whitespace.".into());
        }
    }

    findings
}

fn report_findings(findings: &[LintFinding]) {
    if findings.is_empty() {
        return;
    }
    for finding in findings {
        warn!(file = %finding.file, line = finding.line, code = finding.code, "{}", finding.message);
        eprintln!("{finding}");
    }
    let plural = if findings.len() == 1 { "" } else { "s" };
    eprintln!("\n{} warning{plural}", findings.len());
}

pub struct ScriptsTransform {
    pipeline: StagePipeline,
    /// Per-file minified output.
    cache: IncrementalCache<String>,
}

impl ScriptsTransform {
    pub fn new() -> Self {
        let pipeline = StagePipeline::new(TaskKind::Scripts)
            .stage("lint", |asset| {
                report_findings(&lint_source(&asset.rel_root, asset.text()?));
                Ok(asset)
            })
            .stage("minify", |asset| {
                let session = Session::new();
                let mut minified = Vec::new();
                minify(&session, TopLevelMode::Global, asset.text()?.as_bytes(), &mut minified)
                    .map_err(|err| anyhow!("syntax error: {err:?}"))?;
                Ok(asset.with_contents(minified))
            });

        Self {
            pipeline,
            cache: IncrementalCache::new(),
        }
    }
}

impl Default for ScriptsTransform {
    fn default() -> Self {
        Self::new()
    }
}

impl Transform for ScriptsTransform {
    fn kind(&self) -> TaskKind {
        TaskKind::Scripts
    }

    fn run(&mut self, ctx: &BuildContext) -> Result<TransformReport> {
        let cfg = &ctx.config;
        let files = discover(&cfg.root, &cfg.scripts.sources)?;
        let mut report = TransformReport::default();

        let live: HashSet<PathBuf> = files.iter().map(|f| f.path.clone()).collect();
        self.cache.retain_paths(&live);

        if files.is_empty() {
            debug!("no scripts; nothing to bundle");
            return Ok(report);
        }

        let mut parts: Vec<String> = Vec::with_capacity(files.len());
        for file in &files {
            let asset: Asset = match file.read() {
                Ok(asset) => asset,
                Err(err) => {
                    ctx.notify(self.kind(), "read", &file.rel_root, format!("{err:#}"));
                    self.cache.invalidate(&file.path);
                    report.failed += 1;
                    continue;
                }
            };

            let fingerprint = compute_bytes_hash(&asset.contents);
            if let Some(minified) = self.cache.get_fresh(&file.path, &fingerprint) {
                parts.push(minified.clone());
                report.skipped += 1;
                continue;
            }

            match self.pipeline.process(asset, ctx.notifier.as_ref()) {
                Some(out) => {
                    let minified = String::from_utf8_lossy(&out.contents).into_owned();
                    self.cache.insert(file.path.clone(), fingerprint, minified.clone());
                    parts.push(minified);
                    report.processed += 1;
                }
                None => {
                    self.cache.invalidate(&file.path);
                    report.failed += 1;
                }
            }
        }

        if parts.is_empty() {
            warn!(failed = report.failed, "every script failed; keeping previous bundle");
            return Ok(report);
        }

        // Files may rely on automatic semicolon insertion at their end.
        let dest = cfg.scripts.dist.join(cfg.scripts_bundle());
        write_output(&dest, parts.join(";\n").as_bytes())?;
        report.written.push(dest);
        Ok(report)
    }

    fn clear_cache(&mut self) {
        self.cache.clear();
    }
}
