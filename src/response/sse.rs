//! Minimal server-sent-event block parser

/// One event block: optional `event:` name plus the joined `data:` lines
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    pub event: Option<String>,
    pub data: String,
}

impl SseEvent {
    /// The `[DONE]` sentinel that terminates the stream
    pub fn is_done(&self) -> bool {
        self.data.trim() == "[DONE]"
    }
}

/// Split a complete event-stream body into blocks. Blocks without data are dropped.
pub fn parse_events(body: &str) -> Vec<SseEvent> {
    let normalized = body.replace("\r\n", "\n");

    normalized
        .split("\n\n")
        .filter_map(parse_block)
        .collect()
}

fn parse_block(block: &str) -> Option<SseEvent> {
    let mut event = None;
    let mut data_lines: Vec<&str> = Vec::new();

    for line in block.lines() {
        // comment line
        if line.starts_with(':') {
            continue;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "event" => event = Some(value.trim().to_string()),
            "data" => data_lines.push(value),
            _ => {}
        }
    }

    if data_lines.is_empty() {
        return None;
    }

    Some(SseEvent {
        event: event.filter(|name| !name.is_empty()),
        data: data_lines.join("\n"),
    })
}
