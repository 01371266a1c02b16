// src/transforms/sprite.rs

//! Sprite sheet generation.
//!
//! Every image under the sprite subtree is packed into one PNG sheet with
//! shelf packing: tallest first, placed left to right into horizontal shelves
//! whose width is bounded by a square-ish target. A stylesheet partial
//! describing each sub-image's rectangle is written next to the other
//! partials so stylesheets can `@import` it.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::fs;
use std::io::Cursor;

use anyhow::{Context, Result};
use image::{DynamicImage, ImageOutputFormat, Rgba, RgbaImage};
use tracing::{debug, info};

use crate::pipeline::cache::IncrementalCache;
use crate::pipeline::discover::{discover, write_output};
use crate::transforms::{BuildContext, Transform, TransformReport};
use crate::types::TaskKind;
use crate::watch::hash::{combine_hashes, compute_hash_for_paths};

const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Where one sub-image landed on the sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpriteFrame {
    pub name: String,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Result of packing: sheet size plus one frame per input, in input order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpriteLayout {
    pub width: u32,
    pub height: u32,
    pub frames: Vec<SpriteFrame>,
}

#[derive(Debug)]
struct Shelf {
    y: u32,
    height: u32,
    width_used: u32,
}

/// Pack `(name, width, height)` rectangles with `padding` pixels between
/// neighbours and none at the sheet edges.
pub fn pack_sprites(sizes: &[(String, u32, u32)], padding: u32) -> SpriteLayout {
    if sizes.is_empty() {
        return SpriteLayout::default();
    }

    let widest = sizes.iter().map(|(_, w, _)| *w).max().unwrap_or(0);
    let area: u64 = sizes
        .iter()
        .map(|(_, w, h)| u64::from(w + padding) * u64::from(h + padding))
        .sum();
    let max_width = (widest + padding).max((area as f64).sqrt().ceil() as u32);

    let mut order: Vec<usize> = (0..sizes.len()).collect();
    order.sort_by(|&a, &b| sizes[b].2.cmp(&sizes[a].2).then_with(|| sizes[a].0.cmp(&sizes[b].0)));

    let mut shelves: Vec<Shelf> = Vec::new();
    let mut positions = vec![(0u32, 0u32); sizes.len()];

    for idx in order {
        let (_, w, h) = &sizes[idx];
        let padded_w = w + padding;
        let padded_h = h + padding;

        let slot = shelves.iter_mut().find_map(|shelf| {
            if padded_h <= shelf.height && shelf.width_used + padded_w <= max_width {
                let pos = (shelf.width_used, shelf.y);
                shelf.width_used += padded_w;
                Some(pos)
            } else {
                None
            }
        });

        positions[idx] = match slot {
            Some(pos) => pos,
            None => {
                let y = shelves.last().map(|s| s.y + s.height).unwrap_or(0);
                shelves.push(Shelf {
                    y,
                    height: padded_h,
                    width_used: padded_w,
                });
                (0, y)
            }
        };
    }

    let width = shelves.iter().map(|s| s.width_used).max().unwrap_or(0);
    let height = shelves.last().map(|s| s.y + s.height).unwrap_or(0);

    SpriteLayout {
        width: width.saturating_sub(padding),
        height: height.saturating_sub(padding),
        frames: sizes
            .iter()
            .zip(positions)
            .map(|((name, w, h), (x, y))| SpriteFrame {
                name: name.clone(),
                x,
                y,
                width: *w,
                height: *h,
            })
            .collect(),
    }
}

/// Sprite name derived from the path below the sprite base: extension
/// dropped, lowercased, anything outside `[a-z0-9]` replaced with `-`.
pub fn sprite_name(rel: &str) -> String {
    let stem = match rel.rfind('.') {
        Some(dot) if dot > rel.rfind('/').map_or(0, |s| s + 1) => &rel[..dot],
        _ => rel,
    };
    stem.chars()
        .map(|c| {
            let c = c.to_ascii_lowercase();
            if c.is_ascii_alphanumeric() { c } else { '-' }
        })
        .collect()
}

/// Render the stylesheet partial: one variable per sprite holding
/// `(x, y, offset-x, offset-y, width, height, total-width, total-height,
/// image, name)` plus the sheet-level variables and helper mixins.
pub fn render_partial(layout: &SpriteLayout, image_url: &str) -> String {
    let mut out = String::new();
    let (tw, th) = (layout.width, layout.height);
    let offset = |v: u32| if v == 0 { "0px".to_string() } else { format!("-{v}px") };

    out.push_str("// Generated by assetpipe from the sprite directory. Do not edit.\n\n");
    for frame in &layout.frames {
        let _ = writeln!(
            out,
            "${name}: ({x}px, {y}px, {ox}, {oy}, {w}px, {h}px, {tw}px, {th}px, '{image_url}', '{name}', );",
            name = frame.name,
            x = frame.x,
            y = frame.y,
            ox = offset(frame.x),
            oy = offset(frame.y),
            w = frame.width,
            h = frame.height,
        );
    }

    let names: Vec<String> = layout.frames.iter().map(|f| format!("${}", f.name)).collect();
    let _ = writeln!(out, "$spritesheet-width: {tw}px;");
    let _ = writeln!(out, "$spritesheet-height: {th}px;");
    let _ = writeln!(out, "$spritesheet-image: '{image_url}';");
    let _ = writeln!(out, "$spritesheet-sprites: ({}, );", names.join(", "));
    let _ = writeln!(
        out,
        "$spritesheet: ({tw}px, {th}px, '{image_url}', $spritesheet-sprites, );"
    );

    out.push_str(PARTIAL_MIXINS);
    out
}

const PARTIAL_MIXINS: &str = r#"
@mixin sprite-width($sprite) {
  width: nth($sprite, 5);
}

@mixin sprite-height($sprite) {
  height: nth($sprite, 6);
}

@mixin sprite-position($sprite) {
  $sprite-offset-x: nth($sprite, 3);
  $sprite-offset-y: nth($sprite, 4);
  background-position: $sprite-offset-x $sprite-offset-y;
}

@mixin sprite-image($sprite) {
  $sprite-image: nth($sprite, 9);
  background-image: url(#{$sprite-image});
}

@mixin sprite($sprite) {
  @include sprite-image($sprite);
  @include sprite-position($sprite);
  @include sprite-width($sprite);
  @include sprite-height($sprite);
}

@mixin sprites($sprites) {
  @each $sprite in $sprites {
    $sprite-name: nth($sprite, 10);
    .#{$sprite-name} {
      @include sprite($sprite);
    }
  }
}
"#;

/// Draw every decoded image at its frame position and encode as PNG.
pub fn compose_sheet(layout: &SpriteLayout, images: &[RgbaImage]) -> Result<Vec<u8>> {
    let mut sheet = RgbaImage::from_pixel(layout.width.max(1), layout.height.max(1), TRANSPARENT);
    for (frame, img) in layout.frames.iter().zip(images) {
        image::imageops::replace(&mut sheet, img, i64::from(frame.x), i64::from(frame.y));
    }

    let mut bytes = Vec::new();
    DynamicImage::ImageRgba8(sheet)
        .write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::Png)
        .context("encoding sprite sheet")?;
    Ok(bytes)
}

pub struct SpriteTransform {
    /// Single entry keyed by the sprite base directory.
    cache: IncrementalCache,
}

impl SpriteTransform {
    pub fn new() -> Self {
        Self {
            cache: IncrementalCache::new(),
        }
    }
}

impl Default for SpriteTransform {
    fn default() -> Self {
        Self::new()
    }
}

impl Transform for SpriteTransform {
    fn kind(&self) -> TaskKind {
        TaskKind::Sprite
    }

    fn run(&mut self, ctx: &BuildContext) -> Result<TransformReport> {
        let cfg = &ctx.config;
        let sprite = &cfg.sprite;
        let files = discover(&cfg.root, &sprite.sources)?;
        let mut report = TransformReport::default();
        let key = sprite.base_dir(&cfg.root);

        if files.is_empty() {
            debug!("no sprite sources; nothing to pack");
            self.cache.invalidate(&key);
            return Ok(report);
        }

        let sheet_path = sprite.dist.join(&sprite.image_name);
        let inputs_hash = compute_hash_for_paths(files.iter().map(|f| f.path.as_path()))?;
        let padding = sprite.padding.to_string();
        let fingerprint =
            combine_hashes([inputs_hash.as_str(), padding.as_str(), sprite.image_url.as_str()]);
        if self.cache.is_fresh(&key, &fingerprint) && sheet_path.is_file() && sprite.partial.is_file() {
            report.skipped = files.len();
            return Ok(report);
        }

        let mut sizes = Vec::with_capacity(files.len());
        let mut images = Vec::with_capacity(files.len());
        let mut taken: HashMap<String, usize> = HashMap::new();
        for file in &files {
            let decoded = fs::read(&file.path)
                .with_context(|| format!("reading {:?}", file.path))
                .and_then(|bytes| image::load_from_memory(&bytes).context("decoding image"));
            let img = match decoded {
                Ok(img) => img.to_rgba8(),
                Err(err) => {
                    ctx.notify(self.kind(), "decode", &file.rel_root, format!("{err:#}"));
                    report.failed += 1;
                    continue;
                }
            };

            let mut name = sprite_name(&file.rel);
            let seen = taken.entry(name.clone()).or_insert(0);
            *seen += 1;
            if *seen > 1 {
                name = format!("{name}-{seen}");
            }

            sizes.push((name, img.width(), img.height()));
            images.push(img);
        }

        if images.is_empty() {
            self.cache.invalidate(&key);
            return Ok(report);
        }

        let layout = pack_sprites(&sizes, sprite.padding);
        let png = compose_sheet(&layout, &images)?;
        write_output(&sheet_path, &png)?;
        report.written.push(sheet_path);

        let partial = render_partial(&layout, &sprite.image_url);
        let unchanged = fs::read_to_string(&sprite.partial).is_ok_and(|old| old == partial);
        if !unchanged {
            write_output(&sprite.partial, partial.as_bytes())?;
            report.written.push(sprite.partial.clone());
        }

        report.processed = images.len();
        if report.failed == 0 {
            self.cache.insert(key, fingerprint, ());
        } else {
            self.cache.invalidate(&key);
        }

        info!(
            sprites = layout.frames.len(),
            width = layout.width,
            height = layout.height,
            "sprite sheet packed"
        );
        Ok(report)
    }

    fn clear_cache(&mut self) {
        self.cache.clear();
    }
}
