// src/config/model.rs

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::errors::Result;
use crate::watch::patterns::{normalize_rel, GlobMatcher};

/// Top-level configuration as read from `Assetpipe.toml`.
///
/// ```toml
/// [server]
/// port = 4000
///
/// [paths.styles]
/// src = "src/scss/*.scss"
/// dist = "dist/css"
/// bundle = "style.min.css"
///
/// [sprite]
/// padding = 4
/// ```
///
/// Every section and key is optional; omitted values fall back to the
/// built-in `src/` + `dist/` layout.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub paths: PathsSection,

    #[serde(default)]
    pub sprite: SpriteSection,
}

/// `[server]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_port")]
    pub port: u16,

    /// Render an index page for directories without `index.html`.
    #[serde(default = "default_directory_listing")]
    pub directory_listing: bool,

    /// Directory served over HTTP; the combined output root.
    #[serde(default = "default_server_root")]
    pub root: String,

    /// Path logged as the URL to open once the server is up.
    #[serde(default = "default_open_path")]
    pub open_path: String,
}

fn default_port() -> u16 {
    4000
}

fn default_directory_listing() -> bool {
    true
}

fn default_server_root() -> String {
    "dist".to_string()
}

fn default_open_path() -> String {
    "/".to_string()
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            port: default_port(),
            directory_listing: default_directory_listing(),
            root: default_server_root(),
            open_path: default_open_path(),
        }
    }
}

/// `[paths.<category>]` tables.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct PathsSection {
    #[serde(default)]
    pub markup: CategorySection,
    #[serde(default)]
    pub fonts: CategorySection,
    #[serde(default)]
    pub styles: CategorySection,
    #[serde(default)]
    pub scripts: CategorySection,
    #[serde(default)]
    pub library: CategorySection,
    #[serde(default)]
    pub images: CategorySection,
}

/// One asset category as written in TOML. Missing keys take the category's
/// built-in default (see [`Category::defaults`]).
#[derive(Debug, Clone, Deserialize, Default)]
pub struct CategorySection {
    /// Source glob, relative to the project root.
    pub src: Option<String>,
    /// Output directory, relative to the project root.
    pub dist: Option<String>,
    /// Globs that re-trigger the category's transform. Defaults to `[src]`.
    pub watch: Option<Vec<String>>,
    /// Globs removed from both `src` and `watch`.
    pub exclude: Option<Vec<String>>,
    /// Name of the combined output file (styles and scripts only).
    pub bundle: Option<String>,
}

/// `[sprite]` section.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct SpriteSection {
    pub src: Option<String>,
    pub dist: Option<String>,
    pub watch: Option<Vec<String>>,
    pub exclude: Option<Vec<String>>,
    /// File name of the packed sheet.
    pub image: Option<String>,
    /// Generated stylesheet partial, written back into the style sources.
    pub partial: Option<String>,
    /// URL of the sheet as referenced from the compiled stylesheet.
    pub image_url: Option<String>,
    /// Pixels between neighbouring sub-images.
    pub padding: Option<u32>,
}

/// Logical asset categories of the path table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Markup,
    Fonts,
    Styles,
    Scripts,
    Library,
    Images,
}

/// Built-in defaults of one category: `(src, dist, watch, exclude, bundle)`.
struct CategoryDefaults {
    src: &'static str,
    dist: &'static str,
    watch: &'static [&'static str],
    exclude: &'static [&'static str],
    bundle: Option<&'static str>,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Markup,
        Category::Fonts,
        Category::Styles,
        Category::Scripts,
        Category::Library,
        Category::Images,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Markup => "markup",
            Category::Fonts => "fonts",
            Category::Styles => "styles",
            Category::Scripts => "scripts",
            Category::Library => "library",
            Category::Images => "images",
        }
    }

    fn defaults(self) -> CategoryDefaults {
        match self {
            Category::Markup => CategoryDefaults {
                src: "src/html/*.html",
                dist: "dist/html",
                // Includes usually live in sub-directories; watch them too.
                watch: &["src/html/**/*.html"],
                exclude: &[],
                bundle: None,
            },
            Category::Fonts => CategoryDefaults {
                src: "src/font/**/*",
                dist: "dist/font",
                watch: &[],
                exclude: &[],
                bundle: None,
            },
            Category::Styles => CategoryDefaults {
                src: "src/scss/*.scss",
                dist: "dist/css",
                watch: &["src/scss/**/*.scss"],
                exclude: &[],
                bundle: Some("style.min.css"),
            },
            Category::Scripts => CategoryDefaults {
                src: "src/js/*.js",
                dist: "dist/js",
                watch: &[],
                exclude: &[],
                bundle: Some("ui.js"),
            },
            Category::Library => CategoryDefaults {
                src: "src/lib/**/*",
                dist: "dist/lib",
                watch: &[],
                exclude: &[],
                bundle: None,
            },
            Category::Images => CategoryDefaults {
                src: "src/img/**/*.{png,jpg,jpeg,gif,svg,mp4}",
                dist: "dist/img",
                watch: &[],
                exclude: &["src/img/sprite/**"],
                bundle: None,
            },
        }
    }
}

/// Resolved paths of one category.
#[derive(Debug, Clone)]
pub struct CategoryPaths {
    /// Source glob, normalized (forward slashes, no leading `./`).
    pub src: String,
    /// Absolute output directory.
    pub dist: PathBuf,
    pub watch: Vec<String>,
    pub exclude: Vec<String>,
    pub bundle: Option<String>,
    /// Compiled `src` minus `exclude`.
    pub sources: GlobMatcher,
}

impl CategoryPaths {
    fn resolve(root: &Path, section: &CategorySection, category: Category) -> Result<Self> {
        let defaults = category.defaults();
        let src = normalize_rel(section.src.as_deref().unwrap_or(defaults.src));
        let dist = normalize_rel(section.dist.as_deref().unwrap_or(defaults.dist));
        let exclude = section
            .exclude
            .clone()
            .unwrap_or_else(|| defaults.exclude.iter().map(|s| s.to_string()).collect());
        let exclude: Vec<String> = exclude.iter().map(|p| normalize_rel(p)).collect();

        let watch = match &section.watch {
            Some(list) => list.iter().map(|p| normalize_rel(p)).collect(),
            // A custom `src` without custom `watch` watches what it builds.
            None if section.src.is_some() || defaults.watch.is_empty() => vec![src.clone()],
            None => defaults.watch.iter().map(|s| s.to_string()).collect(),
        };

        let sources = GlobMatcher::new(std::slice::from_ref(&src), &exclude)?;

        Ok(Self {
            src,
            dist: root.join(dist),
            watch,
            exclude,
            bundle: section
                .bundle
                .clone()
                .or_else(|| defaults.bundle.map(str::to_string)),
            sources,
        })
    }

    /// Absolute directory that all `src` matches live under.
    pub fn base_dir(&self, root: &Path) -> PathBuf {
        root.join(self.sources.base())
    }
}

/// Resolved sprite settings.
#[derive(Debug, Clone)]
pub struct SpriteSettings {
    pub src: String,
    pub dist: PathBuf,
    pub watch: Vec<String>,
    pub exclude: Vec<String>,
    pub image_name: String,
    /// Absolute path of the generated stylesheet partial.
    pub partial: PathBuf,
    pub image_url: String,
    pub padding: u32,
    pub sources: GlobMatcher,
}

impl SpriteSettings {
    fn resolve(root: &Path, section: &SpriteSection) -> Result<Self> {
        let src = normalize_rel(
            section
                .src
                .as_deref()
                .unwrap_or("src/img/sprite/**/*.{png,jpg,jpeg,gif}"),
        );
        let exclude: Vec<String> = section
            .exclude
            .clone()
            .unwrap_or_default()
            .iter()
            .map(|p| normalize_rel(p))
            .collect();
        let watch = section
            .watch
            .as_ref()
            .map(|list| list.iter().map(|p| normalize_rel(p)).collect())
            .unwrap_or_else(|| vec![src.clone()]);
        let sources = GlobMatcher::new(std::slice::from_ref(&src), &exclude)?;
        let dist = normalize_rel(section.dist.as_deref().unwrap_or("dist/img/sprite"));
        let partial = normalize_rel(
            section
                .partial
                .as_deref()
                .unwrap_or("src/scss/vendor/_sprite.scss"),
        );

        Ok(Self {
            src,
            dist: root.join(dist),
            watch,
            exclude,
            image_name: section
                .image
                .clone()
                .unwrap_or_else(|| "sprite.png".to_string()),
            partial: root.join(partial),
            image_url: section
                .image_url
                .clone()
                .unwrap_or_else(|| "../img/sprite/sprite.png".to_string()),
            padding: section.padding.unwrap_or(4),
            sources,
        })
    }

    pub fn base_dir(&self, root: &Path) -> PathBuf {
        root.join(self.sources.base())
    }
}

/// Resolved server settings.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub port: u16,
    pub directory_listing: bool,
    /// Absolute directory served over HTTP.
    pub root: PathBuf,
    pub open_path: String,
}

/// The immutable path configuration every component receives (by `Arc`).
///
/// Built once at startup from an optional [`RawConfigFile`] and the project
/// root; never mutated afterwards.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Absolute (best-effort canonical) project root.
    pub root: PathBuf,
    pub markup: CategoryPaths,
    pub fonts: CategoryPaths,
    pub styles: CategoryPaths,
    pub scripts: CategoryPaths,
    pub library: CategoryPaths,
    pub images: CategoryPaths,
    pub sprite: SpriteSettings,
    pub server: ServerSettings,
}

impl BuildConfig {
    /// Resolve a raw config against a project root.
    ///
    /// This compiles globs but does not run semantic validation; use
    /// [`crate::config::validate_config`] (or `load_and_validate`) for that.
    pub fn resolve(raw: &RawConfigFile, root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        let root = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
        let paths = &raw.paths;

        Ok(Self {
            markup: CategoryPaths::resolve(&root, &paths.markup, Category::Markup)?,
            fonts: CategoryPaths::resolve(&root, &paths.fonts, Category::Fonts)?,
            styles: CategoryPaths::resolve(&root, &paths.styles, Category::Styles)?,
            scripts: CategoryPaths::resolve(&root, &paths.scripts, Category::Scripts)?,
            library: CategoryPaths::resolve(&root, &paths.library, Category::Library)?,
            images: CategoryPaths::resolve(&root, &paths.images, Category::Images)?,
            sprite: SpriteSettings::resolve(&root, &raw.sprite)?,
            server: ServerSettings {
                port: raw.server.port,
                directory_listing: raw.server.directory_listing,
                root: root.join(normalize_rel(&raw.server.root)),
                open_path: raw.server.open_path.clone(),
            },
            root,
        })
    }

    /// The built-in layout rooted at `root`.
    pub fn with_defaults(root: impl AsRef<Path>) -> Result<Self> {
        Self::resolve(&RawConfigFile::default(), root)
    }

    pub fn paths(&self, category: Category) -> &CategoryPaths {
        match category {
            Category::Markup => &self.markup,
            Category::Fonts => &self.fonts,
            Category::Styles => &self.styles,
            Category::Scripts => &self.scripts,
            Category::Library => &self.library,
            Category::Images => &self.images,
        }
    }

    /// File name of the combined stylesheet.
    pub fn styles_bundle(&self) -> &str {
        self.styles.bundle.as_deref().unwrap_or("style.min.css")
    }

    /// File name of the combined script.
    pub fn scripts_bundle(&self) -> &str {
        self.scripts.bundle.as_deref().unwrap_or("ui.js")
    }

    /// Output directories emptied by Clean. Library and font outputs are
    /// intentionally not in this list.
    pub fn clean_targets(&self) -> [&Path; 4] {
        [
            self.scripts.dist.as_path(),
            self.styles.dist.as_path(),
            self.markup.dist.as_path(),
            self.images.dist.as_path(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_mirror_the_src_dist_layout() {
        let cfg = BuildConfig::with_defaults("/project").unwrap();

        assert_eq!(cfg.markup.src, "src/html/*.html");
        assert_eq!(cfg.markup.dist, PathBuf::from("/project/dist/html"));
        assert_eq!(cfg.styles.dist, PathBuf::from("/project/dist/css"));
        assert_eq!(cfg.styles_bundle(), "style.min.css");
        assert_eq!(cfg.scripts_bundle(), "ui.js");
        assert_eq!(cfg.sprite.padding, 4);
        assert_eq!(cfg.sprite.image_name, "sprite.png");
        assert_eq!(
            cfg.sprite.partial,
            PathBuf::from("/project/src/scss/vendor/_sprite.scss")
        );
        assert_eq!(cfg.server.port, 4000);
        assert_eq!(cfg.server.root, PathBuf::from("/project/dist"));
    }

    #[test]
    fn images_exclude_the_sprite_subtree() {
        let cfg = BuildConfig::with_defaults("/project").unwrap();
        assert!(cfg.images.sources.matches("src/img/logo.png"));
        assert!(cfg.images.sources.matches("src/img/icons/a.svg"));
        assert!(!cfg.images.sources.matches("src/img/sprite/a.png"));
        assert!(!cfg.images.sources.matches("src/img/readme.txt"));
    }

    #[test]
    fn scripts_glob_is_top_level_only() {
        let cfg = BuildConfig::with_defaults("/project").unwrap();
        assert!(cfg.scripts.sources.matches("src/js/app.js"));
        assert!(!cfg.scripts.sources.matches("src/js/vendor/x.js"));
    }

    #[test]
    fn custom_src_without_watch_watches_src() {
        let raw: RawConfigFile = toml::from_str(
            r#"
[paths.markup]
src = "./pages/*.html"
dist = "./out/pages"
"#,
        )
        .unwrap();
        let cfg = BuildConfig::resolve(&raw, "/p").unwrap();
        assert_eq!(cfg.markup.src, "pages/*.html");
        assert_eq!(cfg.markup.watch, vec!["pages/*.html".to_string()]);
        assert_eq!(cfg.markup.dist, PathBuf::from("/p/out/pages"));
    }
}
