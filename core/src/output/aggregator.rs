use std::sync::Arc;

use tokio::sync::mpsc;

use crate::task::TaskResult;

use super::filter::{HiddenCounts, StatusFilter};
use super::renderer::{OutputRenderer, RenderEvent};

/// Longest summary excerpt shown next to a result line.
pub const SUMMARY_EXCERPT_CHARS: usize = 50;

const ELLIPSIS: &str = "...";

/// Which results a filter shows and how many of each status it hides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// Indexes into the classified list, in order.
    pub shown: Vec<usize>,
    pub hidden: HiddenCounts,
}

/// Drains the results stream, rendering each result as it arrives.
pub struct ResultAggregator {
    filter: StatusFilter,
    renderer: Arc<dyn OutputRenderer>,
    output_document: String,
}

impl ResultAggregator {
    pub fn new(filter: StatusFilter, renderer: Arc<dyn OutputRenderer>) -> Self {
        Self {
            filter,
            renderer,
            output_document: super::OUTPUT_DOCUMENT_NAME.to_string(),
        }
    }

    /// Name the closing hint points the user to.
    pub fn with_output_document(mut self, name: impl Into<String>) -> Self {
        self.output_document = name.into();
        self
    }

    /// Consume `results` until the stream closes and return everything
    /// observed, filtered or not, in arrival order.
    pub async fn consume(self, mut results: mpsc::UnboundedReceiver<TaskResult>) -> Vec<TaskResult> {
        let mut observed = Vec::new();
        let mut hidden = HiddenCounts::default();

        while let Some(result) = results.recv().await {
            if observed.is_empty() {
                self.renderer.render(&RenderEvent::Heading {
                    title: "Check Results".to_string(),
                });
            }

            let status = result.outcome.status;
            if self.filter.shows(status) {
                self.renderer.render(&task_line(&result));
            } else {
                hidden.record(status);
            }
            tracing::trace!(
                target: "diagkit.output",
                task = %result.identifier(),
                %status,
                "result observed"
            );
            observed.push(result);
        }

        if hidden.total() > 0 {
            self.renderer.render(&RenderEvent::Hidden {
                count: hidden.total(),
                noun: "results",
                breakdown: hidden.breakdown(),
                hint: None,
            });
        }
        if !observed.is_empty() {
            self.renderer.render(&RenderEvent::Note {
                message: format!("See {} for full results.", self.output_document),
            });
        }

        tracing::debug!(
            target: "diagkit.output",
            observed = observed.len(),
            hidden = hidden.total(),
            "results stream closed"
        );
        observed
    }

    /// Apply the filter to an already collected list. Pure: the same list
    /// and filter always give the same classification.
    pub fn classify(&self, results: &[TaskResult]) -> Classification {
        classify(&self.filter, results)
    }
}

pub(crate) fn classify(filter: &StatusFilter, results: &[TaskResult]) -> Classification {
    let mut shown = Vec::new();
    let mut hidden = HiddenCounts::default();
    for (idx, result) in results.iter().enumerate() {
        if filter.shows(result.outcome.status) {
            shown.push(idx);
        } else {
            hidden.record(result.outcome.status);
        }
    }
    Classification { shown, hidden }
}

fn task_line(result: &TaskResult) -> RenderEvent {
    let summary = &result.outcome.summary;
    RenderEvent::TaskLine {
        task_id: result.identifier().to_string(),
        status: result.outcome.status,
        detail: (!summary.trim().is_empty()).then(|| excerpt(summary)),
        url: result.outcome.url.clone(),
        was_override: result.was_override,
    }
}

/// Collapse newlines to spaces and cut to [`SUMMARY_EXCERPT_CHARS`]
/// characters, appending `...` when something was cut.
pub fn excerpt(summary: &str) -> String {
    let flat: String = summary
        .replace("\r\n", " ")
        .chars()
        .map(|c| if c == '\n' { ' ' } else { c })
        .collect();
    if flat.chars().count() <= SUMMARY_EXCERPT_CHARS {
        return flat;
    }
    let mut cut: String = flat.chars().take(SUMMARY_EXCERPT_CHARS).collect();
    cut.push_str(ELLIPSIS);
    cut
}
