use annotator_core::{
    parse_boxes, parse_records, records_to_annotations, AnnotationRecord, BoundingBox, Bounds,
    Editor, EditorConfig, Fit, Shape, Size,
};
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Parser)]
#[command(name = "annotator-cli")]
#[command(about = "Image annotation engine CLI")]
pub struct Cli {
    /// JSON editor configuration; defaults plus ANNOTATOR_* variables otherwise.
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print how an image fits into a container.
    Fit {
        #[arg(long, value_name = "WxH", value_parser = parse_size)]
        container: Size,
        #[command(flatten)]
        image: ImageSource,
    },
    /// Print the display geometry of every annotation in a file.
    Project {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[arg(long, value_name = "WxH", value_parser = parse_size)]
        container: Size,
        #[command(flatten)]
        image: ImageSource,
    },
    /// Load and re-export annotations as canonical records.
    Normalize {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[command(flatten)]
        image: ImageSource,
        /// Read FILE as bounding boxes (xmin, ymin, xmax, ymax) and import them as rectangles.
        #[arg(long)]
        boxes: bool,
    },
    /// Print axis-aligned bounding boxes in image pixels.
    Bbox {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Print CLI version.
    Version,
}

/// Natural image size, read from a file or given directly.
#[derive(Debug, Args)]
#[group(required = true, multiple = false)]
struct ImageSource {
    /// Image file whose dimensions are used.
    #[arg(long, value_name = "FILE")]
    image: Option<PathBuf>,
    /// Natural image size.
    #[arg(long, value_name = "WxH", value_parser = parse_size)]
    image_size: Option<Size>,
}

impl ImageSource {
    fn natural_size(&self) -> Result<Size> {
        if let Some(size) = self.image_size {
            return Ok(size);
        }
        let Some(path) = self.image.as_deref() else {
            anyhow::bail!("either --image or --image-size is required");
        };
        ensure_file_exists(path)?;
        let (width, height) = image::image_dimensions(path)
            .with_context(|| format!("failed to decode image {}", path.display()))?;
        tracing::debug!(width, height, path = %path.display(), "image dimensions read");
        Ok(Size::new(f64::from(width), f64::from(height)))
    }
}

#[derive(Debug, Serialize)]
struct ProjectOutput {
    fit: Fit,
    stroke_width: f64,
    annotations: Vec<ProjectedAnnotation>,
}

#[derive(Debug, Serialize)]
struct ProjectedAnnotation {
    id: String,
    kind: &'static str,
    x: f64,
    y: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    width: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    height: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    radius: Option<f64>,
    stroke: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    label: Option<String>,
    bounds: Bounds,
}

pub fn run<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);

    match cli.command {
        Commands::Fit { container, image } => run_fit(container, &image),
        Commands::Project { file, container, image } => {
            let config = load_config(cli.config.as_deref())?;
            run_project(&file, container, &image, config)
        }
        Commands::Normalize { file, image, boxes } => {
            let config = load_config(cli.config.as_deref())?;
            run_normalize(&file, &image, boxes, config)
        }
        Commands::Bbox { file } => run_bbox(&file),
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn run_fit(container: Size, image: &ImageSource) -> Result<()> {
    let natural = image.natural_size()?;
    let fit = Fit::compute(container, natural).with_context(|| {
        format!(
            "cannot fit a {}x{} image into a {}x{} container",
            natural.width, natural.height, container.width, container.height
        )
    })?;
    print_json(&fit)
}

fn run_project(
    file: &Path,
    container: Size,
    image: &ImageSource,
    config: EditorConfig,
) -> Result<()> {
    let records = read_records(file)?;
    let mut editor = open_editor(config, container, image.natural_size()?)?;
    let loaded = editor.import(&records);
    report_skipped(loaded, records.len());
    let fit = *editor.fit().context("no image is displayed")?;

    let annotations = editor
        .store()
        .iter()
        .map(|entity| {
            let (width, height, radius) = match entity.shape() {
                Shape::Rect { width, height } => (Some(width), Some(height), None),
                Shape::Circle { radius } => (None, None, Some(radius)),
            };
            ProjectedAnnotation {
                id: entity.id().to_string(),
                kind: entity.shape().kind().as_str(),
                x: entity.position().x,
                y: entity.position().y,
                width,
                height,
                radius,
                stroke: entity.stroke().to_string(),
                label: entity.label().map(|label| label.text.clone()),
                bounds: entity.display_bounds(),
            }
        })
        .collect();

    print_json(&ProjectOutput {
        fit,
        stroke_width: editor.context().coords.stroke_width(),
        annotations,
    })
}

fn run_normalize(
    file: &Path,
    image: &ImageSource,
    boxes: bool,
    config: EditorConfig,
) -> Result<()> {
    let natural = image.natural_size()?;
    // Displaying the image at its natural size keeps the round trip exact
    let mut editor = open_editor(config, natural, natural)?;
    if boxes {
        let bounding_boxes = read_boxes(file)?;
        let loaded = editor.import_boxes(&bounding_boxes);
        report_skipped(loaded, bounding_boxes.len());
    } else {
        let records = read_records(file)?;
        let loaded = editor.import(&records);
        report_skipped(loaded, records.len());
    }
    let json = editor.to_json()?;
    println!("{json}");
    Ok(())
}

fn run_bbox(file: &Path) -> Result<()> {
    let records = read_records(file)?;
    let boxes: Vec<_> = records_to_annotations(&records)
        .iter()
        .map(|annotation| annotation.bounding_box())
        .collect();
    print_json(&boxes)
}

fn open_editor(config: EditorConfig, container: Size, natural: Size) -> Result<Editor> {
    let mut editor = Editor::new(config, container).context("failed to create editor")?;
    editor.load_image(natural).context("failed to display image")?;
    Ok(editor)
}

fn report_skipped(loaded: usize, total: usize) {
    if loaded < total {
        tracing::warn!(skipped = total - loaded, "some annotations were not loaded");
    }
}

fn load_config(path: Option<&Path>) -> Result<EditorConfig> {
    match path {
        Some(path) => {
            ensure_file_exists(path)?;
            EditorConfig::from_file(path)
                .with_context(|| format!("failed to load config {}", path.display()))
        }
        None => EditorConfig::from_env().context("invalid ANNOTATOR_* environment"),
    }
}

fn read_annotation_file(path: &Path) -> Result<String> {
    ensure_file_exists(path)?;
    fs::read_to_string(path)
        .with_context(|| format!("failed to read annotation file {}", path.display()))
}

fn read_records(path: &Path) -> Result<Vec<AnnotationRecord>> {
    let json = read_annotation_file(path)?;
    parse_records(&json)
        .with_context(|| format!("failed to parse annotations in {}", path.display()))
}

fn read_boxes(path: &Path) -> Result<Vec<BoundingBox>> {
    let json = read_annotation_file(path)?;
    parse_boxes(&json)
        .with_context(|| format!("failed to parse bounding boxes in {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{json}");
    Ok(())
}

fn ensure_file_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        anyhow::bail!("file does not exist: {}", path.display());
    }

    if !path.is_file() {
        anyhow::bail!("path is not a file: {}", path.display());
    }

    Ok(())
}

fn parse_size(value: &str) -> std::result::Result<Size, String> {
    let (width, height) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got `{value}`"))?;
    let parse = |part: &str| {
        part.trim()
            .parse::<f64>()
            .map_err(|_| format!("invalid dimension `{part}` in `{value}`"))
    };
    let size = Size::new(parse(width)?, parse(height)?);
    if !size.is_usable() {
        return Err(format!("dimensions must be positive, got `{value}`"));
    }
    Ok(size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("800x600"), Ok(Size::new(800.0, 600.0)));
        assert_eq!(parse_size("12.5X4"), Ok(Size::new(12.5, 4.0)));
        assert!(parse_size("800").is_err());
        assert!(parse_size("0x10").is_err());
        assert!(parse_size("axb").is_err());
    }
}
