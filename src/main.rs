use clap::Parser as _;
use std::path::PathBuf;

use lectr::content_format::{GeneratedContent, SectionPlan, VisualManifest};
use lectr::error::ContextError;
use lectr::visual::{DiagramResult, FlowchartResult, VisualOutcome};

/// The command line arguments: the generated content JSON, optionally the
/// section plan and the manifest of pre-rasterized visuals, and the path of
/// the output PDF file.
#[derive(clap::Parser)]
struct CliArguments {
    /// The path of the generated content JSON.
    #[arg(short = 'c', long = "content", value_name = "content_file")]
    content_path: PathBuf,
    /// The path of the optional section plan JSON.
    #[arg(short = 'p', long = "plan", value_name = "plan_file")]
    plan_path: Option<PathBuf>,
    /// The path of the optional visual manifest JSON.
    #[arg(short = 'v', long = "visuals", value_name = "manifest_file")]
    manifest_path: Option<PathBuf>,
    /// The path of the output PDF file.
    #[arg(short = 'o', long = "output", value_name = "output_file")]
    output_pdf_path: PathBuf,
}

fn main() -> Result<(), ContextError> {
    env_logger::init();
    let cli_arguments = CliArguments::parse();

    let content = GeneratedContent::from_path(&cli_arguments.content_path)?;
    let plan = match &cli_arguments.plan_path {
        Some(plan_path) => Some(SectionPlan::from_path(plan_path)?),
        None => None,
    };
    let manifest = match &cli_arguments.manifest_path {
        Some(manifest_path) => VisualManifest::from_path(manifest_path)?,
        None => VisualManifest::default(),
    };

    let (diagrams, flowcharts) = load_visuals(&manifest);
    let composed = lectr::compose::assemble(&content, diagrams, flowcharts, plan.as_ref())?;

    std::fs::write(&cli_arguments.output_pdf_path, &composed.bytes).map_err(|error| {
        ContextError::with_error(
            format!(
                "Unable to write the PDF document {:?}",
                cli_arguments.output_pdf_path
            ),
            &error,
        )
    })?;
    log::info!(
        "Wrote {:?} ({} bytes) to {:?}",
        composed.title,
        composed.bytes.len(),
        cli_arguments.output_pdf_path
    );

    Ok(())
}

/// Turn the manifest entries into visual results: a path becomes a loaded
/// buffer, a missing or unreadable file becomes a failed outcome carrying
/// the reason, exactly as a failed generation call would.
fn load_visuals(manifest: &VisualManifest) -> (Vec<DiagramResult>, Vec<FlowchartResult>) {
    let diagrams = manifest
        .diagrams
        .iter()
        .map(|entry| DiagramResult {
            index: entry.index,
            outcome: load_outcome(entry.path.as_ref(), entry.error.as_deref()),
        })
        .collect();
    let flowcharts = manifest
        .flowcharts
        .iter()
        .map(|entry| FlowchartResult {
            index: entry.index,
            name: entry.name.clone(),
            outcome: load_outcome(entry.path.as_ref(), entry.error.as_deref()),
        })
        .collect();

    (diagrams, flowcharts)
}

fn load_outcome(path: Option<&PathBuf>, error: Option<&str>) -> VisualOutcome {
    if let Some(reason) = error {
        return VisualOutcome::Failed(reason.to_string());
    }
    let Some(path) = path else {
        return VisualOutcome::Failed("no visual was produced".to_string());
    };
    match std::fs::read(path) {
        Ok(buffer) => VisualOutcome::Ready(buffer),
        Err(read_error) => {
            log::warn!("Unable to read the visual {:?}: {}", path, read_error);
            VisualOutcome::Failed(format!("unable to read {:?}", path))
        }
    }
}
