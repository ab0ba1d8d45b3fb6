//! Error types.
//!
//! Three families, kept apart so callers can tell a programming bug from a
//! flaky transport:
//!
//! - [`Error::Creation`]: an entity could not be built. Nothing is returned,
//!   so there is nothing to destroy.
//! - [`Error::Transport`]: a send/receive/notify/listen call failed at
//!   runtime. Never retried here.
//! - [`Error::Protocol`]: the consumer misused the API (unknown or
//!   double-returned loan, wrong handle type).

use std::fmt;

use crate::names::{EntityKind, NameError};
use crate::transport::TransportError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    ResourceCreationFailure,
    TransportFailure,
    ProtocolViolation,
}

/// Construction step that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreationStage {
    /// Deriving or validating the channel name.
    ServiceName,
    /// Opening or creating the named service.
    Service,
    /// Creating the send/receive/notify endpoint on the service.
    Port,
}

impl fmt::Display for CreationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CreationStage::ServiceName => write!(f, "service name"),
            CreationStage::Service => write!(f, "service"),
            CreationStage::Port => write!(f, "port"),
        }
    }
}

/// Underlying cause of a construction failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreationCause {
    Name(NameError),
    Transport(TransportError),
}

impl fmt::Display for CreationCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CreationCause::Name(e) => write!(f, "{}", e),
            CreationCause::Transport(e) => write!(f, "{}", e),
        }
    }
}

/// Runtime operation that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Send,
    Loan,
    Receive,
    Notify,
    Listen,
    Wait,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Send => "send",
            Operation::Loan => "loan",
            Operation::Receive => "receive",
            Operation::Notify => "notify",
            Operation::Listen => "listen",
            Operation::Wait => "wait",
        };
        f.write_str(name)
    }
}

/// Misuse of the API by the consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolViolation {
    /// A loan address that was never handed out, or was already returned.
    InvalidPayload { addr: usize },
    /// Destination buffer cannot hold the received payload.
    BufferTooSmall { needed: usize, available: usize },
    /// Handle data is not the type the operation expects.
    WrongHandle {
        expected: &'static str,
        actual: &'static str,
    },
    /// Handle was created by a different implementation.
    IncorrectImplementation { found: String },
}

impl fmt::Display for ProtocolViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolViolation::InvalidPayload { addr } => {
                write!(f, "no outstanding loan at address {:#x}", addr)
            }
            ProtocolViolation::BufferTooSmall { needed, available } => write!(
                f,
                "payload of {} bytes does not fit into {} bytes",
                needed, available
            ),
            ProtocolViolation::WrongHandle { expected, actual } => {
                write!(f, "expected a {} handle, got a {} handle", expected, actual)
            }
            ProtocolViolation::IncorrectImplementation { found } => {
                write!(f, "handle belongs to implementation '{}'", found)
            }
        }
    }
}

/// Error returned by every fallible core operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    Creation {
        entity: EntityKind,
        stage: CreationStage,
        source: CreationCause,
    },
    Transport {
        op: Operation,
        source: TransportError,
    },
    Protocol(ProtocolViolation),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Creation { .. } => ErrorKind::ResourceCreationFailure,
            Error::Transport { .. } => ErrorKind::TransportFailure,
            Error::Protocol(_) => ErrorKind::ProtocolViolation,
        }
    }

    pub(crate) fn name(entity: EntityKind, e: NameError) -> Self {
        Error::Creation {
            entity,
            stage: CreationStage::ServiceName,
            source: CreationCause::Name(e),
        }
    }

    pub(crate) fn service(entity: EntityKind, e: TransportError) -> Self {
        Error::Creation {
            entity,
            stage: CreationStage::Service,
            source: CreationCause::Transport(e),
        }
    }

    pub(crate) fn port(entity: EntityKind, e: TransportError) -> Self {
        Error::Creation {
            entity,
            stage: CreationStage::Port,
            source: CreationCause::Transport(e),
        }
    }

    pub(crate) fn transport(op: Operation) -> impl FnOnce(TransportError) -> Self {
        move |source| Error::Transport { op, source }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Creation {
                entity,
                stage,
                source,
            } => write!(f, "failed to create {} ({}): {}", entity, stage, source),
            Error::Transport { op, source } => write!(f, "{} failed: {}", op, source),
            Error::Protocol(v) => write!(f, "protocol violation: {}", v),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Creation {
                source: CreationCause::Name(e),
                ..
            } => Some(e),
            Error::Creation {
                source: CreationCause::Transport(e),
                ..
            } => Some(e),
            Error::Transport { source, .. } => Some(source),
            Error::Protocol(_) => None,
        }
    }
}

impl From<ProtocolViolation> for Error {
    fn from(v: ProtocolViolation) -> Self {
        Error::Protocol(v)
    }
}

/// Errors from a [`LoanRegistry`](crate::LoanRegistry).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoanError {
    /// Address is not a live loan of this registry.
    InvalidPayload { addr: usize },
}

impl fmt::Display for LoanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoanError::InvalidPayload { addr } => {
                write!(f, "address {:#x} is not an outstanding loan", addr)
            }
        }
    }
}

impl std::error::Error for LoanError {}

impl From<LoanError> for Error {
    fn from(e: LoanError) -> Self {
        match e {
            LoanError::InvalidPayload { addr } => {
                Error::Protocol(ProtocolViolation::InvalidPayload { addr })
            }
        }
    }
}
