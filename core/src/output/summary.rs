use crate::task::TaskResult;

use super::aggregator::classify;
use super::filter::StatusFilter;
use super::renderer::{OutputRenderer, RenderEvent};

/// Long-form report of every non-successful result, with full summaries
/// and URLs. Does nothing for an empty run.
pub fn write_summary(results: &[TaskResult], filter: &StatusFilter, renderer: &dyn OutputRenderer) {
    if results.is_empty() {
        return;
    }

    let issues: Vec<TaskResult> = results
        .iter()
        .filter(|r| r.outcome.is_failure())
        .cloned()
        .collect();

    let title = if issues.is_empty() {
        "No Issues Found"
    } else {
        "Issues Found"
    };
    renderer.render(&RenderEvent::Heading {
        title: title.to_string(),
    });

    let classification = classify(filter, &issues);
    for idx in &classification.shown {
        let issue = &issues[*idx];
        renderer.render(&RenderEvent::Issue {
            task_id: issue.identifier().to_string(),
            status: issue.outcome.status,
            summary: issue.outcome.summary.clone(),
            url: issue.outcome.url.clone(),
        });
    }

    let hidden = classification.hidden;
    if hidden.total() > 0 {
        renderer.render(&RenderEvent::Hidden {
            count: hidden.total(),
            noun: "issues",
            breakdown: hidden.breakdown(),
            hint: Some("(Use \"--filter all\" to see all issues)".to_string()),
        });
    }
}
