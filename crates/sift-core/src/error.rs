use std::fmt;

/// Machine-readable error codes for agent-friendly decision making.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigParseError,
    StorageUnavailable,
    EmbeddingFailed,
    DimensionMismatch,
    CorruptEmbedding,
    IndexOutOfSync,
    EmptyQuery,
    BatchLengthMismatch,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ConfigParseError => "E1001",
            Self::StorageUnavailable => "E2001",
            Self::EmbeddingFailed => "E3001",
            Self::DimensionMismatch => "E3002",
            Self::CorruptEmbedding => "E3003",
            Self::IndexOutOfSync => "E3004",
            Self::EmptyQuery => "E4001",
            Self::BatchLengthMismatch => "E4002",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ConfigParseError => "Config file parse error",
            Self::StorageUnavailable => "Store database unavailable",
            Self::EmbeddingFailed => "Embedding computation failed",
            Self::DimensionMismatch => "Embedding dimension mismatch",
            Self::CorruptEmbedding => "Corrupt stored embedding",
            Self::IndexOutOfSync => "Store and index have drifted",
            Self::EmptyQuery => "Empty query",
            Self::BatchLengthMismatch => "Ingest batch lengths differ",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint that can be surfaced to operators and agents.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::ConfigParseError => Some("Fix syntax in .sift/config.toml and retry."),
            Self::StorageUnavailable => {
                Some("Check the database path and filesystem permissions.")
            }
            Self::EmbeddingFailed => {
                Some("Verify the embedding backend is reachable, then re-ingest the batch.")
            }
            Self::DimensionMismatch => {
                Some("Re-ingest the corpus after changing embedding dimensionality.")
            }
            Self::CorruptEmbedding => Some("Re-ingest the affected documents."),
            Self::IndexOutOfSync => Some("Run `sift clear` and re-ingest, or restore a backup."),
            Self::EmptyQuery => Some("Provide a non-empty query string."),
            Self::BatchLengthMismatch => {
                Some("Pass exactly one source entry (and optional id) per text.")
            }
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
