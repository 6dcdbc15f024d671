use diagkit_core::output::{OutputRenderer, RenderEvent};

const RULE_WIDTH: usize = 49;

pub struct TextRenderer {
    ascii_only: bool,
}

impl TextRenderer {
    pub fn new(ascii_only: bool) -> Self {
        Self { ascii_only }
    }

    fn rule(&self) -> String {
        let ch = if self.ascii_only { "-" } else { "─" };
        ch.repeat(RULE_WIDTH)
    }

    fn format_event(&self, event: &RenderEvent) -> String {
        match event {
            RenderEvent::Heading { title } => format!("\n{}\n{}", title, self.rule()),
            RenderEvent::TaskLine {
                task_id,
                status,
                detail,
                url: _,
                was_override,
            } => {
                let mut line = format!("{:<8} {}", status.as_str(), task_id);
                if *was_override {
                    line.push_str(" (override)");
                }
                if let Some(detail) = detail {
                    line.push_str(&format!(" - {}", detail));
                }
                line
            }
            RenderEvent::Issue {
                task_id,
                status,
                summary,
                url,
            } => {
                let mut out = format!("{}: {}", status.as_str(), task_id);
                for line in summary.lines() {
                    out.push_str(&format!("\n    {}", line));
                }
                if let Some(url) = url {
                    out.push_str(&format!("\n    See {} for more information.", url));
                }
                out.push('\n');
                out
            }
            RenderEvent::Hidden {
                count,
                noun,
                breakdown,
                hint,
            } => {
                let mut out = format!("{} {} not shown: {}", count, noun, breakdown);
                if let Some(hint) = hint {
                    out.push_str(&format!("\n{}", hint));
                }
                out
            }
            RenderEvent::Note { message } => message.clone(),
        }
    }
}

impl OutputRenderer for TextRenderer {
    fn name(&self) -> &str {
        "text-renderer"
    }

    fn format(&self) -> &str {
        "text"
    }

    fn render(&self, event: &RenderEvent) {
        println!("{}", self.format_event(event));
    }
}
