//! Return codes.
//!
//! The external contract only knows a handful of codes, so the typed errors
//! of `tether_core` collapse here. The detail is not lost: it is logged
//! once, at the boundary, before the code is handed out.

use std::fmt;

use tether_core::{Error, ErrorKind, ProtocolViolation};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum RetCode {
    Ok = 0,
    Error = 1,
    Timeout = 2,
    Unsupported = 3,
    InvalidArgument = 11,
    IncorrectImplementation = 12,
}

pub type RetResult<T = ()> = std::result::Result<T, RetCode>;

impl RetCode {
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

impl fmt::Display for RetCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RetCode::Ok => "ok",
            RetCode::Error => "error",
            RetCode::Timeout => "timeout",
            RetCode::Unsupported => "unsupported",
            RetCode::InvalidArgument => "invalid argument",
            RetCode::IncorrectImplementation => "incorrect implementation",
        };
        f.write_str(name)
    }
}

impl std::error::Error for RetCode {}

impl From<&Error> for RetCode {
    fn from(e: &Error) -> Self {
        match e {
            Error::Creation { .. } | Error::Transport { .. } => RetCode::Error,
            Error::Protocol(ProtocolViolation::IncorrectImplementation { .. }) => {
                RetCode::IncorrectImplementation
            }
            Error::Protocol(_) => RetCode::InvalidArgument,
        }
    }
}

impl<T> From<&RetResult<T>> for RetCode {
    fn from(result: &RetResult<T>) -> Self {
        match result {
            Ok(_) => RetCode::Ok,
            Err(code) => *code,
        }
    }
}

/// Collapse an error raised inside entry point `op`, logging its detail.
pub(crate) fn fail(op: &'static str) -> impl FnOnce(Error) -> RetCode {
    move |e| {
        let code = RetCode::from(&e);
        match e.kind() {
            ErrorKind::ProtocolViolation => tracing::warn!(op, %code, error = %e, "rejected call"),
            _ => tracing::error!(op, %code, error = %e, "call failed"),
        }
        code
    }
}

/// Reject a missing argument of entry point `op`.
pub(crate) fn invalid_argument(op: &'static str, argument: &'static str) -> RetCode {
    tracing::warn!(op, argument, "argument is null");
    RetCode::InvalidArgument
}

#[cfg(test)]
mod tests {
    use tether_core::names::{EntityKind, NameError};
    use tether_core::transport::TransportError;
    use tether_core::{CreationCause, CreationStage, Operation};

    use super::*;

    #[test]
    fn errors_collapse_by_family() {
        let creation = Error::Creation {
            entity: EntityKind::Publisher,
            stage: CreationStage::ServiceName,
            source: CreationCause::Name(NameError::InvalidTopicName),
        };
        assert_eq!(RetCode::from(&creation), RetCode::Error);

        let transport = Error::Transport {
            op: Operation::Send,
            source: TransportError::new("send", "queue closed"),
        };
        assert_eq!(RetCode::from(&transport), RetCode::Error);

        let invalid = Error::Protocol(ProtocolViolation::InvalidPayload { addr: 0x10 });
        assert_eq!(RetCode::from(&invalid), RetCode::InvalidArgument);

        let foreign = Error::Protocol(ProtocolViolation::IncorrectImplementation {
            found: "other".into(),
        });
        assert_eq!(RetCode::from(&foreign), RetCode::IncorrectImplementation);
    }

    #[test]
    fn results_map_to_codes() {
        assert_eq!(RetCode::from(&RetResult::Ok(5)), RetCode::Ok);
        assert_eq!(
            RetCode::from(&RetResult::<()>::Err(RetCode::Timeout)),
            RetCode::Timeout
        );
        assert_eq!(RetCode::InvalidArgument.as_i32(), 11);
    }
}
