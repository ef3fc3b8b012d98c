//! Errors which can happen while turning techniques and tile geometry into scene objects.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// No handler is registered for the technique kind and the legacy path can't build it either.
    #[error("no technique handler or fallback for technique kind '{0}'")]
    UnknownTechniqueKind(String),
    /// A handler was constructed from a technique it doesn't know how to render.
    #[error("a '{expected}' handler received a '{found}' technique")]
    WrongTechniqueKind {
        expected: &'static str,
        found: String,
    },
    #[error("the '{0}' material was not created")]
    MissingMaterial(&'static str),
    #[error("the source geometry has no '{0}' attribute")]
    MissingAttribute(&'static str),
    #[error("group [{start}, {start} + {count}) exceeds the {len} primitives of its geometry")]
    InvalidGroup { start: u32, count: u32, len: usize },
    #[error("failed to parse the theme:\r\n{0}")]
    Theme(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Config(#[from] config::ConfigError),
    #[error(transparent)]
    Watch(#[from] notify::Error),
}

impl Error {
    /// Configuration errors only affect the group that triggered them.
    ///
    /// Everything else is a bug in the pooling or identity bookkeeping and aborts the tile.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::UnknownTechniqueKind(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
