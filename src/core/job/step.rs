//! Chunk-oriented step: read from a source, process, write in chunks

use super::execution::{JobExecution, StepExecution};
use super::runner::StopSignal;
use crate::core::pagination::PaginatedSource;
use crate::domain::{BatchStatus, FerryError, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// Turns one read item into an output item
#[async_trait]
pub trait ItemProcessor<I, O>: Send + Sync {
    /// `Ok(None)` filters the item out
    ///
    /// # Errors
    ///
    /// [`FerryError::PartialFailure`] and [`FerryError::NotFound`] skip the
    /// item; any other error fails the step.
    async fn process(&self, item: I) -> Result<Option<O>>;
}

/// Receives processed chunks and skipped-item failures
#[async_trait]
pub trait ItemWriter<O>: Send {
    async fn write(&mut self, items: Vec<O>) -> Result<()>;

    /// Record an item that was skipped
    async fn write_skipped(&mut self, _failure: &FerryError) -> Result<()> {
        Ok(())
    }

    /// Flush buffered output, called once after the last chunk
    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Whether an item-level error skips the item instead of failing the step
pub fn is_skippable(error: &FerryError) -> bool {
    matches!(
        error,
        FerryError::PartialFailure { .. } | FerryError::NotFound { .. }
    )
}

/// Reads items one at a time and writes them `chunk_size` at a time
///
/// The stop signal is checked before every pull, so a fetch already in
/// flight completes but no further fetch starts once a stop is requested.
pub struct ChunkStep<I, O> {
    name: String,
    chunk_size: usize,
    source: Box<dyn PaginatedSource<I>>,
    processor: Arc<dyn ItemProcessor<I, O>>,
    writer: Box<dyn ItemWriter<O>>,
}

impl<I: Send + 'static, O: Send + 'static> ChunkStep<I, O> {
    pub fn new(
        name: impl Into<String>,
        chunk_size: usize,
        source: Box<dyn PaginatedSource<I>>,
        processor: Arc<dyn ItemProcessor<I, O>>,
        writer: Box<dyn ItemWriter<O>>,
    ) -> Self {
        Self {
            name: name.into(),
            chunk_size: chunk_size.max(1),
            source,
            processor,
            writer,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run the step to completion, stop, or failure
    ///
    /// The step's counters are appended to `execution` whatever the outcome.
    ///
    /// # Errors
    ///
    /// Returns [`FerryError::Step`] wrapping the read, process or write error
    /// that ended the step.
    pub async fn execute(&mut self, execution: &mut JobExecution, stop: &StopSignal) -> Result<()> {
        let mut step = StepExecution::new(self.name.clone());
        let outcome = self.run_chunks(&mut step, stop).await;

        let outcome = match outcome {
            Ok(stopped) => self.writer.close().await.map(|_| stopped),
            Err(e) => Err(e),
        };

        let result = match outcome {
            Ok(true) => {
                tracing::info!(step = %self.name, read = step.read_count, "Step stopped on request");
                step.finish(BatchStatus::Stopped);
                Ok(())
            }
            Ok(false) => {
                step.finish(BatchStatus::Completed);
                Ok(())
            }
            Err(e) => {
                tracing::error!(step = %self.name, error = %e, "Step failed");
                step.finish(BatchStatus::Failed);
                Err(FerryError::step(self.name.clone(), e))
            }
        };

        tracing::info!(
            step = %self.name,
            status = %step.status,
            read = step.read_count,
            written = step.write_count,
            filtered = step.filter_count,
            skipped = step.skip_count,
            "Step finished"
        );
        execution.step_executions.push(step);
        result
    }

    /// Returns `true` when the loop ended because of a stop request
    async fn run_chunks(&mut self, step: &mut StepExecution, stop: &StopSignal) -> Result<bool> {
        loop {
            let mut chunk = Vec::with_capacity(self.chunk_size);
            let mut exhausted = false;
            let mut stopped = false;

            while chunk.len() < self.chunk_size {
                if stop.is_stop_requested() {
                    stopped = true;
                    break;
                }

                let Some(item) = self.source.next().await? else {
                    exhausted = true;
                    break;
                };
                step.read_count += 1;

                match self.processor.process(item).await {
                    Ok(Some(output)) => chunk.push(output),
                    Ok(None) => step.filter_count += 1,
                    Err(e) if is_skippable(&e) => {
                        tracing::warn!(step = %self.name, error = %e, "Skipping item");
                        step.skip_count += 1;
                        self.writer.write_skipped(&e).await?;
                    }
                    Err(e) => return Err(e),
                }
            }

            if !chunk.is_empty() {
                let written = chunk.len() as u64;
                self.writer.write(chunk).await?;
                step.write_count += written;
            }

            if stopped {
                return Ok(true);
            }
            if exhausted {
                return Ok(false);
            }
        }
    }
}
