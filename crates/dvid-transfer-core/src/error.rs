//! Error taxonomy for a transfer.
//!
//! Every failure is fatal to the transfer it occurs in. Components return
//! these values; only the binary decides how to report them and exit.

use std::fmt;

use reqwest::StatusCode;

/// The network step that was being performed when a request failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// `GET <node>/info`
    Metadata,
    /// `GET <node>/raw/...`
    Read,
    /// `POST <node>/raw/...`
    Write,
    /// `GET <node>/roi`
    RoiRead,
    /// `POST <node>/roi`
    RoiWrite,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Metadata => "getting metadata",
            Operation::Read => "receiving data",
            Operation::Write => "sending data",
            Operation::RoiRead => "receiving roi",
            Operation::RoiWrite => "sending roi",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("invalid data URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("{op}: request to {url} failed: {source}")]
    Request {
        op: Operation,
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{op}: bad status {status} from {url}")]
    Status {
        op: Operation,
        url: String,
        status: StatusCode,
    },

    #[error("getting metadata: malformed descriptor from {url}: {reason}")]
    MalformedDescriptor { url: String, reason: String },

    #[error("cannot handle source data type {type_name}")]
    UnsupportedSource { type_name: String },

    #[error("can't transfer {source_type} to {dest_type}, need {required} destination")]
    Incompatible {
        source_type: String,
        dest_type: String,
        required: String,
    },

    #[error("can't handle non-cubic block sizes: {block_size:?}")]
    NonCubicBlocks { block_size: [i64; 3] },

    #[error("invalid volume geometry: {reason}")]
    InvalidGeometry { reason: String },

    #[error("volume byte size overflows for extent {extent:?}")]
    SizeOverflow { extent: [u64; 3] },
}

impl TransferError {
    /// The network operation that failed, if this error came from one.
    pub fn operation(&self) -> Option<Operation> {
        match self {
            TransferError::Request { op, .. } | TransferError::Status { op, .. } => Some(*op),
            TransferError::MalformedDescriptor { .. } => Some(Operation::Metadata),
            _ => None,
        }
    }

    /// True for type-pairing errors, which are raised before any data moves.
    pub fn is_compatibility(&self) -> bool {
        matches!(
            self,
            TransferError::UnsupportedSource { .. } | TransferError::Incompatible { .. }
        )
    }
}

pub type Result<T, E = TransferError> = std::result::Result<T, E>;
