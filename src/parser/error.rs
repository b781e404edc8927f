//! Error types for the tree parser

use thiserror::Error;

/// Errors that can occur while turning raw input into a [`GenericTreeNode`](super::GenericTreeNode)
#[derive(Error, Debug)]
pub enum ParseError {
    /// The underlying reader failed
    #[error("failed to read input: {0}")]
    Io(#[from] std::io::Error),

    /// The XML tokenizer rejected the input
    #[error("malformed document at byte {position}: {source}")]
    Malformed {
        position: u64,
        #[source]
        source: quick_xml::Error,
    },

    /// Tag names and text must be valid UTF-8
    #[error("invalid UTF-8 at byte {position}: {detail}")]
    Encoding { position: u64, detail: String },

    /// The input contained no root element
    #[error("document has no root element")]
    EmptyDocument,

    /// The input ended while elements were still open
    #[error("unexpected end of input: element '{tag}' is not closed")]
    UnclosedElement { tag: String },

    /// A second top-level element followed the root
    #[error("unexpected element '{tag}' after the root element closed")]
    MultipleRoots { tag: String },

    /// Character data appeared outside the root element
    #[error("unexpected text outside the root element at byte {position}")]
    StrayText { position: u64 },
}

impl ParseError {
    pub(crate) fn malformed(position: u64, source: quick_xml::Error) -> Self {
        Self::Malformed { position, source }
    }

    pub(crate) fn encoding(position: u64, detail: impl Into<String>) -> Self {
        Self::Encoding {
            position,
            detail: detail.into(),
        }
    }
}
