use crate::task::Status;

/// Receives user-facing output (controls the output format).
///
/// Separate from logging: renderers print what the user asked to see,
/// `tracing` records what the program did.
pub trait OutputRenderer: Send + Sync {
    fn name(&self) -> &str;
    fn format(&self) -> &str;
    fn render(&self, event: &RenderEvent);
}

/// Render events (unified event type)
#[derive(Debug, Clone, PartialEq)]
pub enum RenderEvent {
    /// Section heading such as "Check Results" or "Issues Found".
    Heading { title: String },
    /// One completed task, as it arrives on the results stream.
    TaskLine {
        task_id: String,
        status: Status,
        /// Truncated, newline-collapsed summary shown next to the identifier.
        detail: Option<String>,
        url: Option<String>,
        was_override: bool,
    },
    /// A non-successful task in the long-form summary.
    Issue {
        task_id: String,
        status: Status,
        summary: String,
        url: Option<String>,
    },
    /// Results hidden by the active filter.
    Hidden {
        count: usize,
        noun: &'static str,
        breakdown: String,
        hint: Option<String>,
    },
    /// Free-form closing line.
    Note { message: String },
}

/// Renderer that drops everything; used when output is suppressed.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRenderer;

impl OutputRenderer for NullRenderer {
    fn name(&self) -> &str {
        "null-renderer"
    }

    fn format(&self) -> &str {
        "none"
    }

    fn render(&self, _event: &RenderEvent) {}
}
