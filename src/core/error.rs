use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Io,
    Parse,
    NotFound,
    AlreadyExists,
    InvalidArgument,
    Corrupted,
    Consistency,  // a reload did not observe what was just written
    Transport,
    Internal,
}

#[derive(Debug)]
pub struct Error {
    pub kind: ErrorKind,
    pub context: String,
    pub shard: Option<usize>,
}

impl Error {
    pub fn new(kind: ErrorKind, context: String) -> Self {
        Error { kind, context, shard: None }
    }

    pub fn not_found(context: String) -> Self {
        Error::new(ErrorKind::NotFound, context)
    }

    /// Tag the error with the shard it came from. An existing tag wins.
    pub fn on_shard(mut self, shard: usize) -> Self {
        if self.shard.is_none() {
            self.shard = Some(shard);
        }
        self
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.shard {
            Some(shard) => write!(f, "{:?} (shard {}): {}", self.kind, shard, self.context),
            None => write!(f, "{:?}: {}", self.kind, self.context),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::new(ErrorKind::Io, err.to_string())
    }
}

impl From<bincode::Error> for Error {
    fn from(err: bincode::Error) -> Self {
        Error::new(ErrorKind::Parse, err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::new(ErrorKind::Parse, format!("JSON error: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
