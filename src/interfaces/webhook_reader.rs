use crate::domain::webhook::WebhookEvent;
use crate::error::Result;
use std::io::BufRead;

/// Reads partner webhook deliveries, one JSON object per line.
///
/// Blank lines are skipped. Each remaining line is validated into a [`WebhookEvent`]; a
/// malformed line yields an `InvalidWebhook` error without stopping the stream.
pub struct WebhookReader<R: BufRead> {
    source: R,
}

impl<R: BufRead> WebhookReader<R> {
    pub fn new(source: R) -> Self {
        Self { source }
    }

    pub fn events(self) -> impl Iterator<Item = Result<WebhookEvent>> {
        self.source
            .lines()
            .filter(|line| !matches!(line, Ok(text) if text.trim().is_empty()))
            .map(|line| WebhookEvent::from_json(&line?))
    }
}
