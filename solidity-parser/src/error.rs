#[non_exhaustive]
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Parsing error: {0}")]
    ParseGrammar(#[from] peg::error::ParseError<peg::str::LineCol>),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Zero-based line of the furthest position the grammar reached, when known.
    #[must_use]
    pub fn line(&self) -> Option<usize> {
        match self {
            Self::ParseGrammar(e) => Some(e.location.line.saturating_sub(1)),
            Self::Io(_) => None,
        }
    }

    /// Byte offset of the furthest position the grammar reached, when known.
    #[must_use]
    pub fn offset(&self) -> Option<usize> {
        match self {
            Self::ParseGrammar(e) => Some(e.location.offset),
            Self::Io(_) => None,
        }
    }

    /// What the grammar expected at the failure position.
    #[must_use]
    pub fn expected(&self) -> Vec<String> {
        match self {
            Self::ParseGrammar(e) => {
                let mut expected: Vec<String> =
                    e.expected.tokens().map(ToString::to_string).collect();
                expected.sort_unstable();
                expected
            }
            Self::Io(_) => Vec::new(),
        }
    }
}
