use chrono::Local;
use diagkit_core::output::{OutputRenderer, RenderEvent};
use serde_json::{json, Value};

pub struct JsonlRenderer {
    pretty_print: bool,
}

impl JsonlRenderer {
    pub fn new(pretty_print: bool) -> Self {
        Self { pretty_print }
    }

    fn event_to_json(&self, event: &RenderEvent) -> Value {
        let ts = Local::now().to_rfc3339();
        match event {
            RenderEvent::Heading { title } => json!({
                "v": 1,
                "event_type": "section.start",
                "ts": ts,
                "title": title,
            }),
            RenderEvent::TaskLine {
                task_id,
                status,
                detail,
                url,
                was_override,
            } => json!({
                "v": 1,
                "event_type": "task.result",
                "ts": ts,
                "task_id": task_id,
                "status": status,
                "metadata": {
                    "detail": detail,
                    "url": url,
                    "override": was_override,
                }
            }),
            RenderEvent::Issue {
                task_id,
                status,
                summary,
                url,
            } => json!({
                "v": 1,
                "event_type": "task.issue",
                "ts": ts,
                "task_id": task_id,
                "status": status,
                "metadata": {
                    "summary": summary,
                    "url": url,
                }
            }),
            RenderEvent::Hidden {
                count,
                noun,
                breakdown,
                hint,
            } => json!({
                "v": 1,
                "event_type": "filter.hidden",
                "ts": ts,
                "metadata": {
                    "count": count,
                    "noun": noun,
                    "breakdown": breakdown,
                    "hint": hint,
                }
            }),
            RenderEvent::Note { message } => json!({
                "v": 1,
                "event_type": "note",
                "ts": ts,
                "message": message,
            }),
        }
    }
}

impl OutputRenderer for JsonlRenderer {
    fn name(&self) -> &str {
        "jsonl-renderer"
    }

    fn format(&self) -> &str {
        "jsonl"
    }

    fn render(&self, event: &RenderEvent) {
        let value = self.event_to_json(event);
        if self.pretty_print {
            println!("{}", serde_json::to_string_pretty(&value).unwrap_or_else(|_| "{}".into()));
        } else {
            println!("{}", serde_json::to_string(&value).unwrap_or_else(|_| "{}".into()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use diagkit_core::task::Status;

    #[test]
    fn test_task_line_event() {
        let renderer = JsonlRenderer::new(false);
        let value = renderer.event_to_json(&RenderEvent::TaskLine {
            task_id: "Base/Env/InitSystem".to_string(),
            status: Status::Info,
            detail: None,
            url: None,
            was_override: true,
        });
        assert_eq!(value["event_type"], "task.result");
        assert_eq!(value["status"], "Info");
        assert_eq!(value["metadata"]["override"], true);
    }

    #[test]
    fn test_hidden_event() {
        let renderer = JsonlRenderer::new(false);
        let value = renderer.event_to_json(&RenderEvent::Hidden {
            count: 2,
            noun: "issues",
            breakdown: "2 Warning".to_string(),
            hint: None,
        });
        assert_eq!(value["event_type"], "filter.hidden");
        assert_eq!(value["metadata"]["count"], 2);
    }
}
