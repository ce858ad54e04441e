use std::error::Error as StdError;
use std::fmt;

/// Failure kind reported by channel operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The handle has no engine behind it (see [Channel::null](crate::Channel::null)).
    Null,
    /// The channel has been closed.
    Closed,
}

impl Error {
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Error::Null)
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        matches!(self, Error::Closed)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Null => write!(f, "Channel is null"),
            Error::Closed => write!(f, "Channel is closed"),
        }
    }
}

impl StdError for Error {}

/// Error of [Channel::try_recv](crate::Channel::try_recv).
///
/// `Empty` means nothing was immediately available; the other variants
/// mirror [Error].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TryRecvError {
    Empty,
    Null,
    Closed,
}

impl TryRecvError {
    /// True when the channel was merely empty, so a later receive may
    /// still succeed.
    #[inline]
    pub fn is_empty(&self) -> bool {
        matches!(self, TryRecvError::Empty)
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        matches!(self, TryRecvError::Closed)
    }
}

impl fmt::Display for TryRecvError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TryRecvError::Empty => write!(f, "Channel is empty"),
            TryRecvError::Null => write!(f, "Channel is null"),
            TryRecvError::Closed => write!(f, "Channel is closed"),
        }
    }
}

impl StdError for TryRecvError {}

impl From<Error> for TryRecvError {
    fn from(err: Error) -> Self {
        match err {
            Error::Null => TryRecvError::Null,
            Error::Closed => TryRecvError::Closed,
        }
    }
}

/// Failure of a tie: which operand failed first, and why.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TieError {
    /// Index of the operand the failure belongs to.
    pub index: usize,
    pub kind: Error,
}

impl fmt::Display for TieError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} (operand {})", self.kind, self.index)
    }
}

impl StdError for TieError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(&self.kind)
    }
}
