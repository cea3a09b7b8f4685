use thiserror::Error;

/// Failure taxonomy for the chain mirror core.
///
/// Watcher tasks never surface these to a caller; synchronous reads
/// propagate the first failure untransformed in kind, wrapped with the
/// name of the sub-call that failed.
#[derive(Debug, Error)]
pub enum ChainError {
    /// The RPC endpoint is unreachable, timed out, or rejected the request.
    #[error("transport: {0}")]
    Transport(String),

    /// Returned bytes did not match the expected ABI layout.
    #[error("decoding {name}: {reason}")]
    Decode { name: String, reason: String },

    /// A call was made against a function or event name absent from the
    /// loaded contract interface.
    #[error("unknown function or event \"{0}\"")]
    UnknownSelector(String),

    /// A multi-call read failed; `field` names the sub-call that broke.
    #[error("reading {field}: {source}")]
    Read {
        field: &'static str,
        #[source]
        source: Box<ChainError>,
    },

    /// Required chain configuration is absent. Surfaced to callers of
    /// chain-backed endpoints only; never fatal to the process.
    #[error("chain not configured: {0}")]
    Configuration(&'static str),
}

impl ChainError {
    pub fn decode(name: impl Into<String>, reason: impl Into<String>) -> ChainError {
        ChainError::Decode {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Wraps a sub-call failure with the field it was fetching.
    pub fn while_reading(field: &'static str) -> impl FnOnce(ChainError) -> ChainError {
        move |source| ChainError::Read {
            field,
            source: Box::new(source),
        }
    }
}
