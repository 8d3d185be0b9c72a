use std::sync::mpsc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::ContextError;

/// The outcome of attempting to produce one visual: either the raster
/// buffer is ready, or the attempt failed with a reason. There is no state
/// in between, which spares every consumer from nullable-field checking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VisualOutcome {
    Ready(Vec<u8>),
    Failed(String),
}

impl VisualOutcome {
    /// Whether a raster buffer is available.
    pub fn is_ready(&self) -> bool {
        matches!(self, VisualOutcome::Ready(_))
    }
}

/// The result of one diagram generation attempt, correlated to its concept
/// by `index`, not by completion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagramResult {
    pub index: usize,
    pub outcome: VisualOutcome,
}

/// The result of one flowchart rasterization attempt. The name is carried
/// along because the assembler matches flowcharts to planned sections by it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowchartResult {
    pub index: usize,
    pub name: String,
    pub outcome: VisualOutcome,
}

/// The external image-generation collaborator: a prompt goes in, PNG or
/// JPEG bytes come out. The call may block on the network.
pub trait DiagramRenderer: Send + Sync {
    fn render(&self, prompt: &str) -> Result<Vec<u8>, ContextError>;
}

/// The external rasterizer that turns flowchart graph source into an image.
/// The call may block on a subprocess.
pub trait FlowchartRenderer: Send + Sync {
    fn render(&self, name: &str, graph_source: &str) -> Result<Vec<u8>, ContextError>;
}

/// Render every diagram prompt concurrently and collect index-aligned
/// results. Each prompt gets its own worker thread; a worker that has not
/// answered by the shared deadline is given up on and its slot carries a
/// `Failed` outcome, so one slow item cannot stall the batch and the result
/// vector never has a gap.
pub fn render_diagram_batch(
    renderer: Arc<dyn DiagramRenderer>,
    prompts: Vec<String>,
    timeout: Duration,
) -> Vec<DiagramResult> {
    let deadline = Instant::now() + timeout;

    let receivers: Vec<_> = prompts
        .into_iter()
        .enumerate()
        .map(|(index, prompt)| {
            let (sender, receiver) = mpsc::channel();
            let renderer = Arc::clone(&renderer);
            std::thread::spawn(move || {
                // The receiver may already be gone if the batch timed out.
                let _ = sender.send(renderer.render(&prompt));
            });
            (index, receiver)
        })
        .collect();

    receivers
        .into_iter()
        .map(|(index, receiver)| {
            let outcome = collect_outcome(&receiver, deadline, || format!("diagram {}", index));
            DiagramResult { index, outcome }
        })
        .collect()
}

/// Rasterize every flowchart concurrently; the same batching contract as
/// `render_diagram_batch`. Items are `(name, graph_source)` pairs.
pub fn render_flowchart_batch(
    renderer: Arc<dyn FlowchartRenderer>,
    items: Vec<(String, String)>,
    timeout: Duration,
) -> Vec<FlowchartResult> {
    let deadline = Instant::now() + timeout;

    let receivers: Vec<_> = items
        .into_iter()
        .enumerate()
        .map(|(index, (name, graph_source))| {
            let (sender, receiver) = mpsc::channel();
            let renderer = Arc::clone(&renderer);
            let worker_name = name.clone();
            std::thread::spawn(move || {
                let _ = sender.send(renderer.render(&worker_name, &graph_source));
            });
            (index, name, receiver)
        })
        .collect();

    receivers
        .into_iter()
        .map(|(index, name, receiver)| {
            let outcome = collect_outcome(&receiver, deadline, || format!("flowchart {:?}", name));
            FlowchartResult {
                index,
                name,
                outcome,
            }
        })
        .collect()
}

fn collect_outcome(
    receiver: &mpsc::Receiver<Result<Vec<u8>, ContextError>>,
    deadline: Instant,
    describe: impl Fn() -> String,
) -> VisualOutcome {
    let remaining = deadline.saturating_duration_since(Instant::now());
    match receiver.recv_timeout(remaining) {
        Ok(Ok(buffer)) => VisualOutcome::Ready(buffer),
        Ok(Err(error)) => {
            log::warn!("Generation of {} failed: {}", describe(), error);
            VisualOutcome::Failed(error.to_string())
        }
        Err(_) => {
            log::warn!("Generation of {} timed out", describe());
            VisualOutcome::Failed("generation timed out".to_string())
        }
    }
}
