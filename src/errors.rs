use std::fmt::{self, Display, Formatter};

/// Closed error taxonomy for the analyzer. The engine itself is total over
/// evaluation (see `clause::analyze_clause`) — this type only surfaces the
/// programmer-error and load-error cases spec.md §7 calls out explicitly.
#[derive(Debug)]
pub struct Error(pub ErrorKind);

impl Error {
    pub fn new(kind: ErrorKind) -> Error {
        Error(kind)
    }
}

#[derive(Debug)]
pub enum ErrorKind {
    JsonError(serde_json::Error),
    IoError(std::io::Error),
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.0 {
            ErrorKind::JsonError(err) => write!(f, "error parsing rule file JSON: {}", err),
            ErrorKind::IoError(err) => write!(f, "I/O error reading rule file: {}", err),
        }
    }
}

impl std::error::Error for Error {}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error(ErrorKind::JsonError(err))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error(ErrorKind::IoError(err))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
