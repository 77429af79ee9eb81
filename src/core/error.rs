use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Io,
    CorruptHeader,
    CorruptIndex,
    IndexTooLarge,
    ShortWrite,
    UnparsableFilename,
    OutOfOrderInsert,
    InvalidArgument,
    UnsupportedQuery,
    Locked,
}

#[derive(Debug)]
pub struct Error {
    pub kind: ErrorKind,
    pub context: String,
}

impl Error {
    pub fn new(kind: ErrorKind, context: String) -> Self {
        Error { kind, context }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.context)
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error {
            kind: ErrorKind::Io,
            context: err.to_string(),
        }
    }
}

impl From<fst::Error> for Error {
    fn from(err: fst::Error) -> Self {
        let kind = match &err {
            fst::Error::Fst(fst::raw::Error::DuplicateKey { .. })
            | fst::Error::Fst(fst::raw::Error::OutOfOrder { .. }) => ErrorKind::OutOfOrderInsert,
            // store errors tunnelled through io::Write keep their kind
            fst::Error::Io(io) => io
                .get_ref()
                .and_then(|inner| inner.downcast_ref::<Error>())
                .map(|inner| inner.kind)
                .unwrap_or(ErrorKind::Io),
            _ => ErrorKind::CorruptIndex,
        };
        Error {
            kind,
            context: format!("FST error: {}", err),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error {
            kind: ErrorKind::InvalidArgument,
            context: format!("config: {}", err),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
