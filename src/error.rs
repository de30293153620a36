use thiserror::Error;

/// The externally visible failure kinds of the oblivious store and the sort
/// client. The store surfaces the first three as RPC status codes; the client
/// treats any of them as fatal for the in-flight sort.
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("operation out of order: {0}")]
    FailedPrecondition(String),
    #[error("out of range: {0}")]
    OutOfRange(String),
    /// A ciphertext failed authentication. Either the cell was corrupted on
    /// the server, the key does not match, or the response was tampered with.
    #[error("ciphertext failed authentication")]
    Integrity,
    #[error("transport failure")]
    Transport {
        #[source]
        inner: BoxError,
    },
}

impl Error {
    pub fn invalid_argument<M: Into<String>>(msg: M) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn failed_precondition<M: Into<String>>(msg: M) -> Self {
        Self::FailedPrecondition(msg.into())
    }

    pub fn out_of_range<M: Into<String>>(msg: M) -> Self {
        Self::OutOfRange(msg.into())
    }

    pub fn transport<E: Into<BoxError>>(inner: E) -> Self {
        Self::Transport {
            inner: inner.into(),
        }
    }
}

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type Result<T> = std::result::Result<T, Error>;
