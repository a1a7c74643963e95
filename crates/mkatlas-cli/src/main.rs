use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use clap::{ArgAction, Parser};
use globset::{Glob, GlobSet, GlobSetBuilder};
use image::{DynamicImage, ImageReader};
use mkatlas_core::{
    AtlasConfig, FontSpec, InputFont, InputImage, build_atlas, texture_file_name, to_json_string,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};
use walkdir::WalkDir;

#[derive(Parser, Debug)]
#[command(
    name = "mkatlas",
    about = "Pack images and font glyphs into texture atlases",
    version,
    author
)]
struct Cli {
    #[command(flatten)]
    args: PackArgs,
    /// Show progress bars (disable with --progress false or --quiet)
    #[arg(long, default_value_t = true, action=ArgAction::Set, help_heading = "Logging/UX")]
    progress: bool,
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action=ArgAction::Count, help_heading = "Logging/UX")]
    verbose: u8,
    /// Quiet mode (overrides verbose)
    #[arg(short, long, default_value_t = false, help_heading = "Logging/UX")]
    quiet: bool,
}

#[derive(Parser, Debug, Clone)]
struct PackArgs {
    // Input/Output
    /// Input images: files, directories or glob patterns
    #[arg(help_heading = "Input/Output")]
    inputs: Vec<String>,
    /// Output metadata file
    #[arg(short, long, default_value = "atlas.json", help_heading = "Input/Output")]
    out: PathBuf,
    /// Output folder of textures
    #[arg(long, default_value = ".", help_heading = "Input/Output")]
    folder: PathBuf,
    /// Texture file name prefix (files are <prefix>NN.png)
    #[arg(long, default_value = "texture", help_heading = "Input/Output")]
    texture_prefix: String,
    /// YAML config file (texture settings and fonts); explicit flags win
    #[arg(long, help_heading = "Input/Output")]
    config: Option<PathBuf>,
    /// Exclude patterns (glob). Files matching any pattern will be ignored
    #[arg(long, help_heading = "Input/Output")]
    exclude: Vec<String>,

    // Layout
    /// Width of textures
    #[arg(long, help_heading = "Layout")]
    width: Option<u32>,
    /// Height of textures
    #[arg(long, help_heading = "Layout")]
    height: Option<u32>,
    /// Width and height of textures
    #[arg(short, long, help_heading = "Layout")]
    size: Option<u32>,
    /// Texture limit (0 = unlimited)
    #[arg(long, help_heading = "Layout")]
    max_textures: Option<u32>,

    // Image Processing
    /// Padding between images
    #[arg(short, long, help_heading = "Image Processing")]
    padding: Option<u32>,
    /// Expand borders of images into the padding
    #[arg(short, long, default_value_t = false, help_heading = "Image Processing")]
    expand: bool,
    /// Remove transparent borders of images
    #[arg(short, long, default_value_t = false, help_heading = "Image Processing")]
    trim: bool,
    /// Disable rotation of images
    #[arg(long, default_value_t = false, help_heading = "Image Processing")]
    no_flip: bool,

    // Fonts
    /// Add font: FILE[,size=N][,name=S][,color=RRGGBB][,dfsize=N][,dfspread=N][,range=R]...
    #[arg(short, long = "font", value_name = "SPEC", help_heading = "Fonts")]
    fonts: Vec<FontSpec>,

    // Export
    /// Print the merged configuration (after CLI/YAML) and exit
    #[arg(long, default_value_t = false, help_heading = "Export")]
    print_config: bool,
    /// Output format for --print-config: json|yaml
    #[arg(long, default_value = "yaml", value_parser = ["json", "yaml"], help_heading = "Export")]
    print_config_format: String,
    /// Dry run: pack and report stats but do not write files
    #[arg(long, default_value_t = false, help_heading = "Export")]
    dry_run: bool,
}

/// Settings file; every field is optional and only overrides what it names.
#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct YamlConfig {
    width: Option<u32>,
    height: Option<u32>,
    max_textures: Option<u32>,
    padding: Option<u32>,
    expand: Option<bool>,
    trim: Option<bool>,
    allow_rotation: Option<bool>,
    #[serde(default)]
    fonts: Vec<FontSpec>,
}

impl YamlConfig {
    fn apply(self, cfg: &mut AtlasConfig, fonts: &mut Vec<FontSpec>) {
        if let Some(v) = self.width {
            cfg.width = v;
        }
        if let Some(v) = self.height {
            cfg.height = v;
        }
        if let Some(v) = self.max_textures {
            cfg.max_textures = v;
        }
        if let Some(v) = self.padding {
            cfg.padding = v;
        }
        if let Some(v) = self.expand {
            cfg.expand = v;
        }
        if let Some(v) = self.trim {
            cfg.trim = v;
        }
        if let Some(v) = self.allow_rotation {
            cfg.allow_rotation = v;
        }
        fonts.extend(self.fonts);
    }
}

/// Effective settings, as printed by `--print-config`.
#[derive(Serialize, Debug)]
struct MergedConfig {
    #[serde(flatten)]
    atlas: AtlasConfig,
    fonts: Vec<FontSpec>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing_with_level(cli.quiet, cli.verbose);
    run_pack(&cli.args, cli.progress && !cli.quiet)
}

fn merge_config(args: &PackArgs) -> anyhow::Result<MergedConfig> {
    let mut cfg = AtlasConfig::default();
    let mut fonts = Vec::new();

    if let Some(path) = &args.config {
        let file = fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        let y: YamlConfig = serde_yaml::from_str(&file)
            .with_context(|| format!("parse config {}", path.display()))?;
        y.apply(&mut cfg, &mut fonts);
    }

    if let Some(s) = args.size {
        cfg.width = s;
        cfg.height = s;
    }
    if let Some(w) = args.width {
        cfg.width = w;
    }
    if let Some(h) = args.height {
        cfg.height = h;
    }
    if let Some(v) = args.max_textures {
        cfg.max_textures = v;
    }
    if let Some(v) = args.padding {
        cfg.padding = v;
    }
    cfg.expand |= args.expand;
    cfg.trim |= args.trim;
    if args.no_flip {
        cfg.allow_rotation = false;
    }
    fonts.extend(args.fonts.iter().cloned());

    cfg.validate()?;
    for font in &fonts {
        font.validate()?;
    }
    Ok(MergedConfig { atlas: cfg, fonts })
}

fn run_pack(args: &PackArgs, show_progress: bool) -> anyhow::Result<()> {
    let merged = merge_config(args)?;

    if args.print_config {
        match args.print_config_format.as_str() {
            "json" => println!("{}", serde_json::to_string_pretty(&merged)?),
            _ => print!("{}", serde_yaml::to_string(&merged)?),
        }
        return Ok(());
    }

    let paths = gather_paths(&args.inputs, &args.exclude)?;
    let images = load_images_with_progress(&paths, show_progress)?;
    info!(count = images.len(), "loaded input images");

    let mut fonts = Vec::with_capacity(merged.fonts.len());
    for spec in merged.fonts {
        let file = spec.file.clone();
        let font = InputFont::load(spec)
            .with_context(|| format!("load font {}", file.display()))?;
        info!(font = %file.display(), glyphs = font.glyphs.len(), "rasterized font");
        fonts.push(font);
    }

    let t0 = Instant::now();
    let out = build_atlas(images, fonts, &merged.atlas)?;
    let stats = out.stats();
    info!(elapsed = ?t0.elapsed(), "{}", stats.summary());

    if args.dry_run {
        return Ok(());
    }

    fs::create_dir_all(&args.folder)
        .with_context(|| format!("create folder {}", args.folder.display()))?;
    let mut names = Vec::with_capacity(out.textures.len());
    for (i, texture) in out.textures.iter().enumerate() {
        let name = texture_file_name(&args.texture_prefix, i);
        let png_path = args.folder.join(&name);
        texture
            .save(&png_path)
            .with_context(|| format!("write {}", png_path.display()))?;
        debug!(path = %png_path.display(), "wrote texture");
        names.push(name);
    }

    if let Some(parent) = args.out.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("create folder {}", parent.display()))?;
    }
    let json = to_json_string(&out.atlas, &names)?;
    fs::write(&args.out, json).with_context(|| format!("write {}", args.out.display()))?;
    info!(out = %args.out.display(), textures = names.len(), "wrote atlas");
    Ok(())
}

fn has_glob_meta(s: &str) -> bool {
    s.contains(['*', '?', '[', '{'])
}

fn build_globset(patterns: &[String]) -> anyhow::Result<Option<GlobSet>> {
    if patterns.is_empty() {
        return Ok(None);
    }
    let mut b = GlobSetBuilder::new();
    for pat in patterns {
        b.add(Glob::new(pat).with_context(|| format!("invalid glob {pat}"))?);
    }
    Ok(Some(b.build()?))
}

/// Directory to walk for a glob pattern: the longest leading part without
/// glob characters.
fn glob_root(pattern: &str) -> PathBuf {
    let mut root = PathBuf::new();
    for comp in Path::new(pattern).components() {
        if has_glob_meta(&comp.as_os_str().to_string_lossy()) {
            break;
        }
        root.push(comp);
    }
    if root.as_os_str().is_empty() || root == Path::new(pattern) {
        PathBuf::from(".")
    } else {
        root
    }
}

fn normalized(p: &Path) -> String {
    let s = p.to_string_lossy().replace('\\', "/");
    s.strip_prefix("./").map(str::to_string).unwrap_or(s)
}

/// Expands inputs into image paths, keeping the order of the inputs and a
/// sorted order within each directory or pattern.
fn gather_paths(inputs: &[String], exclude: &[String]) -> anyhow::Result<Vec<PathBuf>> {
    let exc_set = build_globset(exclude)?;
    let skip = |p: &Path| exc_set.as_ref().is_some_and(|ex| ex.is_match(normalized(p)));

    let mut list: Vec<PathBuf> = Vec::new();
    for input in inputs {
        let path = Path::new(input);
        if path.is_file() {
            if !skip(path) {
                list.push(path.to_path_buf());
            }
            continue;
        }
        let (root, matcher) = if path.is_dir() {
            (path.to_path_buf(), None)
        } else if has_glob_meta(input) {
            let pattern = input.strip_prefix("./").unwrap_or(input);
            (glob_root(input), build_globset(&[pattern.to_string()])?)
        } else {
            anyhow::bail!("input not found: {input}");
        };
        let before = list.len();
        for entry in WalkDir::new(&root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let p = entry.path();
            if !p.is_file() || !is_image(p) || skip(p) {
                continue;
            }
            if matcher.as_ref().is_some_and(|m| !m.is_match(normalized(p))) {
                continue;
            }
            list.push(p.to_path_buf());
        }
        if list.len() == before {
            error!(input, "no images matched");
        }
    }
    Ok(list)
}

fn is_image(p: &Path) -> bool {
    matches!(
        p.extension()
            .and_then(|e| e.to_str())
            .map(|s| s.to_ascii_lowercase()),
        Some(ext) if matches!(ext.as_str(), "png" | "jpg" | "jpeg" | "bmp" | "tga" | "gif")
    )
}

fn load_images_with_progress(paths: &[PathBuf], progress: bool) -> anyhow::Result<Vec<InputImage>> {
    use indicatif::{ProgressBar, ProgressStyle};
    let bar = if progress {
        let b = ProgressBar::new(paths.len() as u64);
        b.set_style(ProgressStyle::with_template(
            "{spinner:.green} loading {pos}/{len} [{elapsed_precise}] {wide_msg}",
        )?);
        Some(b)
    } else {
        None
    };
    let mut list = Vec::with_capacity(paths.len());
    for p in paths {
        if let Some(b) = &bar {
            let msg = p.file_name().and_then(|s| s.to_str()).unwrap_or("");
            b.set_message(msg.to_string());
        }
        let img = load_image(p).with_context(|| format!("load image {}", p.display()))?;
        list.push(InputImage {
            key: image_name(p),
            image: img,
        });
        if let Some(b) = &bar {
            b.inc(1);
        }
    }
    if let Some(b) = &bar {
        b.finish_and_clear();
    }
    Ok(list)
}

/// Name written to the metadata: the file name without directory or extension.
fn image_name(p: &Path) -> String {
    p.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| normalized(p))
}

fn load_image(p: &Path) -> anyhow::Result<DynamicImage> {
    let img = ImageReader::open(p)?.with_guessed_format()?.decode()?;
    Ok(img)
}

fn init_tracing_with_level(quiet: bool, verbose: u8) {
    let level = if quiet {
        "error".to_string()
    } else {
        match verbose {
            0 => "info".into(),
            1 => "debug".into(),
            _ => "trace".into(),
        }
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(level)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn args(extra: &[&str]) -> PackArgs {
        let mut argv = vec!["mkatlas"];
        argv.extend_from_slice(extra);
        Cli::parse_from(argv).args
    }

    fn write_png(path: &Path, w: u32, h: u32) {
        RgbaImage::from_pixel(w, h, Rgba([10, 20, 30, 255]))
            .save(path)
            .unwrap();
    }

    #[test]
    fn flags_override_defaults() {
        let a = args(&["-s", "256", "--height", "128", "-p", "2", "-e", "--no-flip"]);
        let merged = merge_config(&a).unwrap();
        assert_eq!((merged.atlas.width, merged.atlas.height), (256, 128));
        assert_eq!(merged.atlas.padding, 2);
        assert!(merged.atlas.expand);
        assert!(!merged.atlas.allow_rotation);
    }

    #[test]
    fn font_flags_parse_specs() {
        let a = args(&["-f", "ui.ttf,size=12,range=32-126", "-f", "mono.ttf"]);
        assert_eq!(a.fonts.len(), 2);
        assert_eq!(a.fonts[0].size, 12);
        assert_eq!(a.fonts[1].display_name(), "mono");
    }

    #[test]
    fn yaml_config_is_merged_under_flags() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("atlas.yaml");
        fs::write(
            &path,
            "width: 512\nheight: 512\npadding: 4\ntrim: true\nfonts:\n  - file: a.ttf\n    size: 20\n    ranges:\n      - {start: 65, end: 90}\n",
        )
        .unwrap();
        let a = args(&["--config", path.to_str().unwrap(), "--width", "300"]);
        let merged = merge_config(&a).unwrap();
        assert_eq!(merged.atlas.width, 300);
        assert_eq!(merged.atlas.height, 512);
        assert_eq!(merged.atlas.padding, 4);
        assert!(merged.atlas.trim);
        assert_eq!(merged.fonts.len(), 1);
        assert_eq!(merged.fonts[0].size, 20);
    }

    #[test]
    fn gather_walks_dirs_and_globs() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("sprites");
        fs::create_dir_all(&sub).unwrap();
        write_png(&sub.join("b.png"), 2, 2);
        write_png(&sub.join("a.png"), 2, 2);
        fs::write(sub.join("notes.txt"), "x").unwrap();
        write_png(&dir.path().join("skip_me.png"), 2, 2);

        let root = dir.path().to_string_lossy().into_owned();
        let found = gather_paths(&[root.clone()], &["**/skip_*".into()]).unwrap();
        let names: Vec<_> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.png", "b.png"]);

        let pattern = format!("{}/sprites/*.png", normalized(dir.path()));
        assert_eq!(gather_paths(&[pattern], &[]).unwrap().len(), 2);
        assert!(gather_paths(&[format!("{root}/missing.png")], &[]).is_err());
    }

    #[test]
    fn glob_root_stops_at_first_pattern() {
        assert_eq!(glob_root("assets/ui/*.png"), PathBuf::from("assets/ui"));
        assert_eq!(glob_root("*.png"), PathBuf::from("."));
    }

    #[test]
    fn writes_textures_and_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in");
        fs::create_dir_all(&input).unwrap();
        write_png(&input.join("one.png"), 8, 8);
        write_png(&input.join("two.png"), 4, 6);
        let out = dir.path().join("out/atlas.json");
        let folder = dir.path().join("tex");

        let a = args(&[
            input.to_str().unwrap(),
            "-s",
            "32",
            "-o",
            out.to_str().unwrap(),
            "--folder",
            folder.to_str().unwrap(),
        ]);
        run_pack(&a, false).unwrap();

        assert!(folder.join("texture00.png").exists());
        let doc: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(doc["textures"][0]["file"], "texture00.png");
        assert_eq!(doc["images"].as_array().unwrap().len(), 2);
        assert_eq!(doc["images"][0]["name"], "one");
        assert_eq!(doc["images"][1]["name"], "two");
    }

    #[test]
    fn image_names_drop_directory_and_extension() {
        assert_eq!(image_name(Path::new("assets/ui/hero.png")), "hero");
        assert_eq!(image_name(Path::new("./icon.v2.png")), "icon.v2");
    }
}
