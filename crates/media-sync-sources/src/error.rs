#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceErrorKind {
    /// Network or I/O hiccup; retrying later may succeed
    Transient,
    /// One malformed or unmatchable item
    Data,
    /// The backing store is unusable
    Corrupt,
}

#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct SourceError {
    kind: SourceErrorKind,
    message: String,
}

impl SourceError {
    pub fn new(kind: SourceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::Transient, message)
    }

    pub fn data(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::Data, message)
    }

    pub fn corrupt(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::Corrupt, message)
    }

    pub fn kind(&self) -> SourceErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<std::io::Error> for SourceError {
    fn from(err: std::io::Error) -> Self {
        Self::transient(err.to_string())
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(err: serde_json::Error) -> Self {
        Self::corrupt(format!("invalid document: {}", err))
    }
}
