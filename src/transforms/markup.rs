// src/transforms/markup.rs

//! Markup transform: resolves `@@include('path')` directives and writes one
//! page per source.
//!
//! Include paths are relative to the including file. Inclusion is recursive
//! and guarded against cycles with the stack of files being resolved.
//!
//! A directive may carry a JSON object, `@@include('nav.html', {"title": "Home"})`.
//! Inside the included file (and anything it includes) `@@title` is then
//! replaced with `Home`; dotted names reach into nested objects. Variables
//! without a value are left as written.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::Result;
use regex::Regex;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::pipeline::cache::IncrementalCache;
use crate::pipeline::discover::{discover, write_output};
use crate::pipeline::stage::{Asset, StagePipeline};
use crate::transforms::{BuildContext, Transform, TransformReport};
use crate::types::TaskKind;
use crate::watch::hash::compute_bytes_hash;

static INCLUDE_DIRECTIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)@@include\(\s*['"]([^'"]+)['"]\s*(?:,\s*(\{.*?\}))?\s*\)"#)
        .expect("include directive regex")
});
static VARIABLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"@@([A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z0-9_]+)*)").expect("variable regex")
});

type IncludeContext = Map<String, Value>;

#[derive(Debug, Error)]
pub enum IncludeError {
    #[error("include target {target:?} (from {from:?}) does not exist")]
    Missing { target: PathBuf, from: PathBuf },

    #[error("circular inclusion: {}", format_chain(.chain))]
    Circular { chain: Vec<PathBuf> },

    #[error("include parameters for {target:?} are not a JSON object: {message}")]
    Parameters { target: PathBuf, message: String },

    #[error("reading include {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

fn format_chain(chain: &[PathBuf]) -> String {
    chain
        .iter()
        .map(|p| {
            p.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| p.display().to_string())
        })
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Replace every include directive in `text` (the contents of `file`) with
/// the resolved contents of its target.
pub fn resolve_includes(file: &Path, text: &str) -> Result<String, IncludeError> {
    let canonical = file.canonicalize().unwrap_or_else(|_| file.to_path_buf());
    let mut stack = vec![canonical];
    resolve_with_stack(file, text, &IncludeContext::new(), &mut stack)
}

fn resolve_with_stack(
    file: &Path,
    text: &str,
    context: &IncludeContext,
    stack: &mut Vec<PathBuf>,
) -> Result<String, IncludeError> {
    let dir = file.parent().unwrap_or_else(|| Path::new("."));
    let mut out = String::with_capacity(text.len());
    let mut last = 0;

    for caps in INCLUDE_DIRECTIVE.captures_iter(text) {
        let (Some(whole), Some(target_rel)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        out.push_str(&text[last..whole.start()]);

        let target = dir.join(target_rel.as_str());
        let canonical = target.canonicalize().map_err(|_| IncludeError::Missing {
            target: target.clone(),
            from: file.to_path_buf(),
        })?;

        if stack.contains(&canonical) {
            let mut chain = stack.clone();
            chain.push(canonical);
            return Err(IncludeError::Circular { chain });
        }

        let body = fs::read_to_string(&canonical).map_err(|source| IncludeError::Io {
            path: canonical.clone(),
            source,
        })?;

        let mut inner = context.clone();
        if let Some(params) = caps.get(2) {
            let params: IncludeContext =
                serde_json::from_str(params.as_str()).map_err(|err| IncludeError::Parameters {
                    target: target.clone(),
                    message: err.to_string(),
                })?;
            inner.extend(params);
        }
        let body = substitute_variables(&body, &inner);

        debug!(from = ?file, target = ?canonical, "resolving include");
        stack.push(canonical.clone());
        let resolved = resolve_with_stack(&canonical, &body, &inner, stack)?;
        stack.pop();

        out.push_str(&resolved);
        last = whole.end();
    }

    out.push_str(&text[last..]);
    Ok(out)
}

/// Replace `@@name` with its value from `context`. Strings are inserted
/// without quotes, other values as JSON.
fn substitute_variables(text: &str, context: &IncludeContext) -> String {
    if context.is_empty() {
        return text.to_string();
    }
    VARIABLE
        .replace_all(text, |caps: &regex::Captures<'_>| {
            let name = &caps[1];
            if name == "include" {
                return caps[0].to_string();
            }
            match lookup(context, name) {
                Some(Value::String(s)) => s.clone(),
                Some(value) => value.to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

fn lookup<'a>(context: &'a IncludeContext, dotted: &str) -> Option<&'a Value> {
    let mut parts = dotted.split('.');
    let mut value = context.get(parts.next()?)?;
    for part in parts {
        value = value.as_object()?.get(part)?;
    }
    Some(value)
}

pub struct MarkupTransform {
    pipeline: StagePipeline,
    /// Fingerprint = hash of the resolved page.
    cache: IncrementalCache,
}

impl MarkupTransform {
    pub fn new() -> Self {
        let pipeline = StagePipeline::new(TaskKind::Markup).stage("include", |asset| {
            let resolved = resolve_includes(&asset.source, asset.text()?)?;
            Ok(asset.with_contents(resolved))
        });

        Self {
            pipeline,
            cache: IncrementalCache::new(),
        }
    }
}

impl Default for MarkupTransform {
    fn default() -> Self {
        Self::new()
    }
}

impl Transform for MarkupTransform {
    fn kind(&self) -> TaskKind {
        TaskKind::Markup
    }

    fn run(&mut self, ctx: &BuildContext) -> Result<TransformReport> {
        let cfg = &ctx.config;
        let files = discover(&cfg.root, &cfg.markup.sources)?;
        let mut report = TransformReport::default();

        let live: HashSet<PathBuf> = files.iter().map(|f| f.path.clone()).collect();
        self.cache.retain_paths(&live);

        for file in files {
            let asset: Asset = match file.read() {
                Ok(asset) => asset,
                Err(err) => {
                    ctx.notify(self.kind(), "read", &file.rel_root, format!("{err:#}"));
                    self.cache.invalidate(&file.path);
                    report.failed += 1;
                    continue;
                }
            };

            let Some(page) = self.pipeline.process(asset, ctx.notifier.as_ref()) else {
                self.cache.invalidate(&file.path);
                report.failed += 1;
                continue;
            };

            let fingerprint = compute_bytes_hash(&page.contents);
            let dest = cfg.markup.dist.join(&page.rel);
            if self.cache.is_fresh(&file.path, &fingerprint) && dest.is_file() {
                report.skipped += 1;
                continue;
            }

            write_output(&dest, &page.contents)?;
            self.cache.insert(file.path.clone(), fingerprint, ());
            report.processed += 1;
            report.written.push(dest);
        }

        Ok(report)
    }

    fn clear_cache(&mut self) {
        self.cache.clear();
    }
}
