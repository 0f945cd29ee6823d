use serde::Deserialize;
use serde_json::value::RawValue;

/// Inbound envelope: `{"event": "<name>", "data": <any JSON>}`.
///
/// `data` stays as raw JSON text; the payload is never re-serialized.
#[derive(Debug, Deserialize)]
pub struct RelayEvent {
    pub event: String,
    #[serde(default)]
    pub data: Option<Box<RawValue>>,
}

impl RelayEvent {
    pub fn parse(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    pub fn is(&self, name: &str) -> bool {
        self.event == name
    }

    /// Payload text for logging; `null` when absent.
    pub fn data_text(&self) -> &str {
        self.data.as_deref().map_or("null", RawValue::get)
    }
}
