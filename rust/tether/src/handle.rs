//! Opaque handles.
//!
//! Every entity crosses the boundary as a [`Handle`]: the identifier of the
//! implementation that created it plus type-erased data. Before touching
//! the data an entry point checks both, so a handle from another middleware
//! or of the wrong entity type is reported instead of misread.

use std::any::Any;

use tether_core::{Error, ProtocolViolation, Result};

use crate::IMPLEMENTATION_IDENTIFIER;

/// Data that can live behind a [`Handle`].
pub(crate) trait HandleData: Any + Send + Sync {
    /// Entity name used in diagnostics.
    const KIND: &'static str;
}

pub struct Handle {
    implementation_identifier: &'static str,
    kind: &'static str,
    data: Box<dyn Any + Send + Sync>,
}

impl std::fmt::Debug for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handle")
            .field("implementation_identifier", &self.implementation_identifier)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl Handle {
    pub(crate) fn new<D: HandleData>(data: D) -> Self {
        Self {
            implementation_identifier: IMPLEMENTATION_IDENTIFIER,
            kind: D::KIND,
            data: Box::new(data),
        }
    }

    /// A handle created by another implementation. It carries no data this
    /// crate can use and is rejected by every entry point.
    pub fn foreign(implementation_identifier: &'static str) -> Self {
        Self {
            implementation_identifier,
            kind: "foreign",
            data: Box::new(()),
        }
    }

    pub fn implementation_identifier(&self) -> &'static str {
        self.implementation_identifier
    }

    /// Entity type behind this handle, e.g. `"publisher"`.
    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub(crate) fn get<D: HandleData>(&self) -> Result<&D> {
        self.check_implementation()?;
        self.data.downcast_ref::<D>().ok_or_else(|| {
            Error::Protocol(ProtocolViolation::WrongHandle {
                expected: D::KIND,
                actual: self.kind,
            })
        })
    }

    fn check_implementation(&self) -> Result<()> {
        if self.implementation_identifier != IMPLEMENTATION_IDENTIFIER {
            return Err(Error::Protocol(
                ProtocolViolation::IncorrectImplementation {
                    found: self.implementation_identifier.to_owned(),
                },
            ));
        }
        Ok(())
    }

    /// Take the handle out of `slot` if it holds a `D`. On any error the
    /// slot is left untouched.
    pub(crate) fn take<D: HandleData>(slot: &mut Option<Handle>) -> Result<D> {
        let Some(handle) = slot.take() else {
            return Err(Error::Protocol(ProtocolViolation::WrongHandle {
                expected: D::KIND,
                actual: "null",
            }));
        };
        if let Err(e) = handle.check_implementation() {
            *slot = Some(handle);
            return Err(e);
        }

        let Handle {
            implementation_identifier,
            kind,
            data,
        } = handle;
        match data.downcast::<D>() {
            Ok(data) => Ok(*data),
            Err(data) => {
                *slot = Some(Handle {
                    implementation_identifier,
                    kind,
                    data,
                });
                Err(Error::Protocol(ProtocolViolation::WrongHandle {
                    expected: D::KIND,
                    actual: kind,
                }))
            }
        }
    }
}
