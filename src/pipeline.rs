//! Driving a stage over a sequence of items.
//!
//! The stage itself handles one item per call. This module is the host side:
//! it feeds items in one at a time and reports what happened as a sequence of
//! [`StageEvent`]s, the way a streaming build tool reports `data` and `error`
//! events.
//!
//! For every item exactly one of `Finished` or `Error` is reported, after
//! the `Data` events of the outputs it produced. A failed item does not stop
//! the run unless [`PipelineOptions::halt_on_error`] is set.

use crate::engine::Generator;
use crate::item::{ItemSink, PipelineItem};
use crate::stage::{StageError, TransformStage};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::warn;

/// What a pipeline run reports, in order.
#[derive(Debug)]
pub enum StageEvent<I> {
    /// An emitted item: a generated file or a passed-through null item.
    Data(I),
    /// The item at `source` failed; nothing more comes from it.
    Error { source: PathBuf, error: StageError },
    /// The item at `source` completed after emitting `emitted` files.
    Finished { source: PathBuf, emitted: usize },
}

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Stop taking items after the first failure.
    pub halt_on_error: bool,
    /// Bound of the event channel used by [`spawn`].
    pub capacity: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            halt_on_error: false,
            capacity: 16,
        }
    }
}

/// Counts over a whole run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineSummary {
    pub completed: usize,
    pub failed: usize,
    pub emitted: usize,
    /// True when the run stopped early because of `halt_on_error`.
    pub halted: bool,
}

/// Receiver of pipeline events.
#[async_trait]
pub trait EventSink<I: Send>: Send {
    async fn send(&mut self, event: StageEvent<I>);
}

#[async_trait]
impl<I: Send> EventSink<I> for Vec<StageEvent<I>> {
    async fn send(&mut self, event: StageEvent<I>) {
        self.push(event);
    }
}

#[async_trait]
impl<I: Send> EventSink<I> for mpsc::Sender<StageEvent<I>> {
    async fn send(&mut self, event: StageEvent<I>) {
        if mpsc::Sender::send(self, event).await.is_err() {
            warn!("event receiver dropped, discarding event");
        }
    }
}

/// Adapts an event sink into the item sink the stage pushes to.
struct DataSink<'a, E>(&'a mut E);

#[async_trait]
impl<I, E> ItemSink<I> for DataSink<'_, E>
where
    I: Send + 'static,
    E: EventSink<I>,
{
    async fn push(&mut self, item: I) {
        self.0.send(StageEvent::Data(item)).await;
    }
}

/// Run one item through `stage`, reporting to `events` and `summary`.
///
/// Returns false when the item failed.
pub async fn process<G, I, E>(
    stage: &TransformStage<G>,
    item: I,
    events: &mut E,
    summary: &mut PipelineSummary,
) -> bool
where
    G: Generator,
    I: PipelineItem + 'static,
    E: EventSink<I>,
{
    let source = item.path().to_path_buf();
    let result = stage.transform(item, &mut DataSink(&mut *events)).await;
    match result {
        Ok(emitted) => {
            summary.completed += 1;
            summary.emitted += emitted;
            events.send(StageEvent::Finished { source, emitted }).await;
            true
        }
        Err(error) => {
            summary.failed += 1;
            events.send(StageEvent::Error { source, error }).await;
            false
        }
    }
}

/// Run all `items` in order and collect the events.
pub async fn run<G, I>(
    stage: &TransformStage<G>,
    items: impl IntoIterator<Item = I>,
    options: &PipelineOptions,
) -> (Vec<StageEvent<I>>, PipelineSummary)
where
    G: Generator,
    I: PipelineItem + 'static,
{
    let mut events = Vec::new();
    let mut summary = PipelineSummary::default();
    for item in items {
        let ok = process(stage, item, &mut events, &mut summary).await;
        if !ok && options.halt_on_error {
            summary.halted = true;
            break;
        }
    }
    (events, summary)
}

/// Run the stage as a task fed by `items`.
///
/// Items are taken one at a time; the next item is not received until the
/// previous one finished or failed. The task ends when `items` closes or,
/// with `halt_on_error`, after the first failure.
pub fn spawn<G, I>(
    stage: Arc<TransformStage<G>>,
    mut items: mpsc::Receiver<I>,
    options: PipelineOptions,
) -> (mpsc::Receiver<StageEvent<I>>, JoinHandle<PipelineSummary>)
where
    G: Generator + 'static,
    I: PipelineItem + 'static,
{
    let (mut tx, rx) = mpsc::channel(options.capacity.max(1));
    let handle = tokio::spawn(async move {
        let mut summary = PipelineSummary::default();
        while let Some(item) = items.recv().await {
            let ok = process(&stage, item, &mut tx, &mut summary).await;
            if !ok && options.halt_on_error {
                summary.halted = true;
                break;
            }
        }
        summary
    });
    (rx, handle)
}
