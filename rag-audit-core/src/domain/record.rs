use std::borrow::Cow;

/// One logged conversation turn exactly as it was stored. May be well-formed
/// JSON or arbitrarily corrupted text; it is never modified after load.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RawRecord {
    bytes: Vec<u8>,
}

impl RawRecord {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Lossy UTF-8 view used by the salvage extractors.
    pub fn as_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl From<&str> for RawRecord {
    fn from(text: &str) -> Self {
        Self::new(text.as_bytes())
    }
}

impl From<String> for RawRecord {
    fn from(text: String) -> Self {
        Self::new(text.into_bytes())
    }
}

impl From<Vec<u8>> for RawRecord {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}
