// Command-line surface for the deck binary

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::info;

use deck_ai::ImagePipeline;
use deck_core::DeckConfig;
use deck_docs::{ChartDecision, ChartRequest, PptxSlide, add_chart_to_slide, determine_chart_type};

#[derive(Parser)]
#[command(name = "deck")]
#[command(about = "Chart-selecting slide builder and prompt-to-image generator")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the chart type picked for a data file
    Classify {
        /// Chart request JSON (`series`, optional `categories`, `x_axis`, `y_axis`)
        #[arg(short, long)]
        data: PathBuf,
    },

    /// Build a presentation with one chart slide per data file
    Chart {
        /// Chart request JSON files, one slide each
        #[arg(short, long, num_args = 1.., required = true)]
        data: Vec<PathBuf>,

        /// Output .pptx path
        #[arg(short, long)]
        output: PathBuf,

        /// Slide title (defaults to the data file name)
        #[arg(short, long)]
        title: Option<String>,
    },

    /// Generate an image from a prompt and save it
    Image {
        /// Text prompt sent to the image model
        #[arg(short, long)]
        prompt: String,

        /// Output path; the extension picks the file format
        #[arg(short, long)]
        output: PathBuf,

        /// Run without an async runtime
        #[arg(long)]
        blocking: bool,
    },
}

/// Read and parse a chart request file.
pub fn load_request(path: &Path) -> Result<ChartRequest> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read chart data: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse chart data: {}", path.display()))
}

pub fn run_classify(data: &Path) -> Result<ChartDecision> {
    let request = load_request(data)?;
    let decision = determine_chart_type(&request);
    info!(
        kind = decision.kind.as_str(),
        shape = decision.shape.as_str(),
        "Classified {}",
        data.display()
    );
    Ok(decision)
}

/// One slide per data file, each carrying its classified chart.
pub fn build_slides(data: &[PathBuf], title: Option<&str>) -> Result<Vec<PptxSlide>> {
    if data.is_empty() {
        bail!("No chart data files given");
    }

    let mut slides = Vec::with_capacity(data.len());
    for (idx, path) in data.iter().enumerate() {
        let request = load_request(path)?;
        let decision = determine_chart_type(&request);

        let mut slide = PptxSlide::new(slide_title(title, path, idx, data.len()), "");
        add_chart_to_slide(&mut slide, &decision, &request)
            .with_context(|| format!("Failed to chart {}", path.display()))?;
        slides.push(slide);
    }
    Ok(slides)
}

pub fn run_chart(data: &[PathBuf], output: &Path, title: Option<&str>) -> Result<()> {
    let slides = build_slides(data, title)?;
    deck_docs::write_pptx(output, &slides)?;
    Ok(())
}

pub fn run_image(config: &DeckConfig, prompt: &str, output: &Path, blocking: bool) -> Result<PathBuf> {
    let pipeline = ImagePipeline::from_config(config);
    let saved = if blocking {
        pipeline.generate_and_save_image_blocking(prompt, output)?
    } else {
        let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
        runtime.block_on(pipeline.generate_and_save_image(prompt, output))?
    };
    Ok(saved)
}

fn slide_title(title: Option<&str>, path: &Path, idx: usize, total: usize) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| format!("Chart {}", idx + 1));
    match title {
        Some(t) if total == 1 => t.to_string(),
        Some(t) => format!("{t}: {stem}"),
        None => stem,
    }
}
