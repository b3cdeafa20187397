//! CLI Application logic
//!
//! Argument parsing, logging setup and the stage commands shared by the
//! `md2json`, `json2slide`, `json2pptx` and `mdslides` programs.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser};
use tracing::info;
use tracing_subscriber::EnvFilter;

use mdslides_ast::{MarkdownDocument, SlideDocument};
use mdslides_core::{
    default_output_path, FileSink, FileSource, Pipeline, Sink, Source, Stage,
};
use mdslides_pptx::{PotxTemplate, PptxRenderer, Presentation, SlideContract};

/// Options shared by every stage program
#[derive(Debug, Args)]
pub struct CommonArgs {
    /// Input file
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output file (defaults to a name derived from the input)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Template and contract options of the rendering programs
#[derive(Debug, Args)]
pub struct RenderArgs {
    /// Reference template (.pptx or .potx); the built-in template is used when absent
    #[arg(short = 'r', long = "ref")]
    pub template: Option<PathBuf>,

    /// SlideContract TOML file
    #[arg(short, long)]
    pub contract: Option<PathBuf>,
}

#[derive(Parser)]
#[command(name = "md2json")]
#[command(author, version, about = "Flatten and tokenize a Markdown deck into a Markdown Document", long_about = None)]
struct Md2JsonCli {
    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Parser)]
#[command(name = "json2slide")]
#[command(author, version, about = "Split a Markdown Document into a Slide Document", long_about = None)]
struct Json2SlideCli {
    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Parser)]
#[command(name = "json2pptx")]
#[command(author, version, about = "Render a Slide Document into a PowerPoint presentation", long_about = None)]
struct Json2PptxCli {
    #[command(flatten)]
    common: CommonArgs,

    #[command(flatten)]
    render: RenderArgs,
}

#[derive(Parser)]
#[command(name = "mdslides")]
#[command(author, version, about = "Markdown slide deck to PowerPoint in one step", long_about = None)]
struct MdSlidesCli {
    #[command(flatten)]
    common: CommonArgs,

    #[command(flatten)]
    render: RenderArgs,

    /// Also write the intermediate .json and .slides.json next to the input
    #[arg(long)]
    keep_intermediate: bool,
}

/// Install the stderr log subscriber.
///
/// `RUST_LOG` wins over the verbosity flag. A second call is a no-op.
pub fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Entry point of the `md2json` program
pub fn md2json_cli() -> Result<()> {
    let cli = Md2JsonCli::parse();
    init_logging(cli.common.verbose);
    run_md2json(&cli.common.input, cli.common.output.as_deref())?;
    Ok(())
}

/// Entry point of the `json2slide` program
pub fn json2slide_cli() -> Result<()> {
    let cli = Json2SlideCli::parse();
    init_logging(cli.common.verbose);
    run_json2slide(&cli.common.input, cli.common.output.as_deref())?;
    Ok(())
}

/// Entry point of the `json2pptx` program
pub fn json2pptx_cli() -> Result<()> {
    let cli = Json2PptxCli::parse();
    init_logging(cli.common.verbose);
    run_json2pptx(
        &cli.common.input,
        cli.common.output.as_deref(),
        cli.render.template.as_deref(),
        cli.render.contract.as_deref(),
    )?;
    Ok(())
}

/// Entry point of the `mdslides` program
pub fn mdslides_cli() -> Result<()> {
    let cli = MdSlidesCli::parse();
    init_logging(cli.common.verbose);
    run_mdslides(
        &cli.common.input,
        cli.common.output.as_deref(),
        cli.render.template.as_deref(),
        cli.render.contract.as_deref(),
        cli.keep_intermediate,
    )?;
    Ok(())
}

fn output_path(input: &Path, output: Option<&Path>, stage: Stage) -> PathBuf {
    output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_output_path(input, stage))
}

/// Stage 1: Markdown to Markdown Document. Returns the written path.
pub fn run_md2json(input: &Path, output: Option<&Path>) -> Result<PathBuf> {
    let output = output_path(input, output, Stage::Md2Json);

    let pipeline = Pipeline::new();
    let mut sink = FileSink::new(&output);
    pipeline
        .run_md2json(input, &mut sink)
        .with_context(|| format!("Failed to convert {}", input.display()))?;

    info!(output = %output.display(), "wrote markdown document");
    Ok(output)
}

/// Stage 2: Markdown Document to Slide Document. Returns the written path.
pub fn run_json2slide(input: &Path, output: Option<&Path>) -> Result<PathBuf> {
    let output = output_path(input, output, Stage::Json2Slide);

    let pipeline = Pipeline::new();
    let source = FileSource::new(input);
    let mut sink = FileSink::new(&output);
    pipeline
        .run_json2slide(&source, &mut sink)
        .with_context(|| format!("Failed to build slides from {}", input.display()))?;

    info!(output = %output.display(), "wrote slide document");
    Ok(output)
}

/// Stage 3: Slide Document to presentation. Returns the written path.
pub fn run_json2pptx(
    input: &Path,
    output: Option<&Path>,
    template: Option<&Path>,
    contract: Option<&Path>,
) -> Result<PathBuf> {
    let output = output_path(input, output, Stage::Json2Pptx);
    let renderer = load_renderer(template, contract)?;

    let slides: SlideDocument = FileSource::new(input)
        .read()
        .with_context(|| format!("Failed to read slide document {}", input.display()))?;

    let presentation = render_presentation(&renderer, &slides)?;
    write_presentation(&presentation, &output)?;
    Ok(output)
}

/// All three stages in-process. Intermediates are written next to the
/// input only when `keep_intermediate` is set, and only once rendering
/// has succeeded.
pub fn run_mdslides(
    input: &Path,
    output: Option<&Path>,
    template: Option<&Path>,
    contract: Option<&Path>,
    keep_intermediate: bool,
) -> Result<PathBuf> {
    let output = output_path(input, output, Stage::Json2Pptx);
    // Fail on a bad template or contract before doing any work
    let renderer = load_renderer(template, contract)?;

    let pipeline = Pipeline::new();
    let markdown = pipeline
        .markdown_document(input)
        .with_context(|| format!("Failed to convert {}", input.display()))?;
    let slides = pipeline
        .slide_document(&markdown)
        .with_context(|| format!("Failed to build slides from {}", input.display()))?;

    let presentation = render_presentation(&renderer, &slides)?;

    if keep_intermediate {
        write_intermediates(input, &markdown, &slides)?;
    }

    write_presentation(&presentation, &output)?;
    Ok(output)
}

fn write_intermediates(
    input: &Path,
    markdown: &MarkdownDocument,
    slides: &SlideDocument,
) -> Result<()> {
    let markdown_path = default_output_path(input, Stage::Md2Json);
    FileSink::new(&markdown_path)
        .write(markdown)
        .with_context(|| format!("Failed to write {}", markdown_path.display()))?;

    let slides_path = default_output_path(&markdown_path, Stage::Json2Slide);
    FileSink::new(&slides_path)
        .write(slides)
        .with_context(|| format!("Failed to write {}", slides_path.display()))?;

    info!(
        markdown = %markdown_path.display(),
        slides = %slides_path.display(),
        "kept intermediates"
    );
    Ok(())
}

/// Build a renderer from the optional template and contract files
pub fn load_renderer(template: Option<&Path>, contract: Option<&Path>) -> Result<PptxRenderer> {
    let contract = match contract {
        Some(path) => SlideContract::from_file(path)
            .with_context(|| format!("Failed to load contract: {}", path.display()))?,
        None => SlideContract::default(),
    };

    let template = match template {
        Some(path) => PotxTemplate::from_file(path)
            .with_context(|| format!("Failed to load template: {}", path.display()))?,
        None => PotxTemplate::builtin().context("Failed to build the built-in template")?,
    };

    Ok(PptxRenderer::new(template, contract))
}

fn render_presentation(renderer: &PptxRenderer, slides: &SlideDocument) -> Result<Presentation> {
    renderer
        .render(slides)
        .context("Failed to render presentation")
}

fn write_presentation(presentation: &Presentation, output: &Path) -> Result<()> {
    let mut sink = FileSink::new(output);
    sink.write(presentation)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    info!(
        output = %output.display(),
        slides = presentation.slide_count,
        "wrote presentation"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definitions() {
        Md2JsonCli::command().debug_assert();
        Json2SlideCli::command().debug_assert();
        Json2PptxCli::command().debug_assert();
        MdSlidesCli::command().debug_assert();
    }

    #[test]
    fn test_parse_render_flags() {
        let cli = MdSlidesCli::try_parse_from([
            "mdslides",
            "-i",
            "deck.md",
            "-r",
            "corp.potx",
            "-c",
            "contract.toml",
            "-vv",
            "--keep-intermediate",
        ])
        .unwrap();

        assert_eq!(cli.common.input, PathBuf::from("deck.md"));
        assert!(cli.common.output.is_none());
        assert_eq!(cli.render.template, Some(PathBuf::from("corp.potx")));
        assert_eq!(cli.render.contract, Some(PathBuf::from("contract.toml")));
        assert_eq!(cli.common.verbose, 2);
        assert!(cli.keep_intermediate);
    }

    #[test]
    fn test_input_is_required() {
        assert!(Md2JsonCli::try_parse_from(["md2json", "-o", "out.json"]).is_err());
        // Stage programs without rendering reject --ref
        assert!(Json2SlideCli::try_parse_from(["json2slide", "-i", "a.json", "--ref", "t.pptx"])
            .is_err());
    }

    #[test]
    fn test_output_path() {
        let input = Path::new("/work/deck.md");
        assert_eq!(
            output_path(input, None, Stage::Md2Json),
            PathBuf::from("/work/deck.json")
        );
        assert_eq!(
            output_path(input, Some(Path::new("x.json")), Stage::Md2Json),
            PathBuf::from("x.json")
        );
        assert_eq!(
            output_path(input, None, Stage::Json2Pptx),
            PathBuf::from("/work/deck.pptx")
        );
    }
}
