use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A record could not be parsed back into points and labels.
    #[error("malformed record on line {line}: {reason}")]
    MalformedRecord { line: usize, reason: String },

    /// The caller asked for labels the record does not carry, or the reverse.
    #[error("label mismatch: expected labels = {expected}, record has labels = {found}")]
    LabelMismatch { expected: bool, found: bool },

    /// An operand has shape `rows`×`cols` where another shape was required.
    #[error("dimension mismatch: got {rows}x{cols}")]
    DimensionMismatch { rows: usize, cols: usize },

    #[error("not a permutation of 0..{len}: {perm:?}")]
    NotAPermutation { len: usize, perm: Vec<usize> },

    #[error("batch size mismatch: {left} vs {right}")]
    BatchMismatch { left: usize, right: usize },

    #[error("no record {index} at {}", path.display())]
    NotFound { index: usize, path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn malformed(line: usize, reason: impl Into<String>) -> Self {
        Self::MalformedRecord {
            line,
            reason: reason.into(),
        }
    }
}
