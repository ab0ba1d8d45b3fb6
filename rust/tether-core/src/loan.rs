//! Loan registry.
//!
//! When a payload is handed to a consumer as a bare address, the owning
//! sample has to be parked somewhere until the consumer gives the address
//! back. [`LoanRegistry`] is that place, and the only authority translating
//! an address back into the owned sample.
//!
//! - `store` takes ownership and returns the payload address.
//! - `release` drops the sample for an address (slot goes back to the
//!   transport); `take` hands it back instead.
//! - An address is valid from `store` until the first `release`/`take`.
//!   Anything else is [`LoanError::InvalidPayload`].
//! - Dropping the registry releases every sample still on loan.
//!
//! Methods take `&mut self`; a registry has a single writer, its owner.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::ptr::NonNull;

use crate::error::LoanError;
use crate::transport::{Payload, PayloadMut};

/// Address and length of a payload on loan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Loan {
    ptr: NonNull<u8>,
    len: usize,
}

impl Loan {
    pub fn as_ptr(&self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    pub fn addr(&self) -> usize {
        self.ptr.as_ptr() as usize
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// View the loaned bytes.
    ///
    /// # Safety
    ///
    /// The loan must still be outstanding in the registry that produced it,
    /// and that registry must outlive the returned slice.
    pub unsafe fn as_slice<'a>(&self) -> &'a [u8] {
        // SAFETY: upheld by the caller; the registry keeps the payload alive.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }
}

pub struct LoanRegistry<S: Payload> {
    entries: HashMap<usize, S>,
    /// Samples pushed out by an address collision. They are never handed
    /// back, only released with the rest on drain.
    displaced: Vec<S>,
}

impl<S: Payload> Default for LoanRegistry<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Payload> std::fmt::Debug for LoanRegistry<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoanRegistry")
            .field("outstanding", &self.entries.len())
            .field("displaced", &self.displaced.len())
            .finish()
    }
}

impl<S: Payload> LoanRegistry<S> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            displaced: Vec::new(),
        }
    }

    /// Take ownership of `sample` and return its payload address.
    pub fn store(&mut self, sample: S) -> Loan {
        let stored = self.insert(sample);
        let payload = stored.payload();
        Loan {
            ptr: NonNull::from(payload).cast::<u8>(),
            len: payload.len(),
        }
    }

    /// Drop the sample loaned out at `ptr`.
    pub fn release(&mut self, ptr: *const u8) -> Result<(), LoanError> {
        self.take(ptr).map(drop)
    }

    /// Remove the sample loaned out at `ptr` and hand it back.
    pub fn take(&mut self, ptr: *const u8) -> Result<S, LoanError> {
        let addr = ptr as usize;
        self.entries
            .remove(&addr)
            .ok_or(LoanError::InvalidPayload { addr })
    }

    pub fn contains(&self, ptr: *const u8) -> bool {
        self.entries.contains_key(&(ptr as usize))
    }

    /// Number of outstanding loans.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Release every outstanding sample. Returns how many were released.
    pub fn drain(&mut self) -> usize {
        let count = self.entries.len() + self.displaced.len();
        self.entries.clear();
        self.displaced.clear();
        count
    }

    fn insert(&mut self, sample: S) -> &mut S {
        let addr = sample.payload().as_ptr() as usize;
        match self.entries.entry(addr) {
            Entry::Vacant(v) => v.insert(sample),
            Entry::Occupied(o) => {
                tracing::error!(
                    addr = format_args!("{:#x}", addr),
                    "transport returned an address that is already on loan"
                );
                let stored = o.into_mut();
                let previous = std::mem::replace(stored, sample);
                self.displaced.push(previous);
                stored
            }
        }
    }
}

impl<S: PayloadMut> LoanRegistry<S> {
    /// Like [`store`](Self::store), for writable payloads. The returned
    /// address may be written through while the loan is outstanding.
    pub fn store_mut(&mut self, sample: S) -> Loan {
        let stored = self.insert(sample);
        let payload = stored.payload_mut();
        let len = payload.len();
        Loan {
            ptr: NonNull::from(payload).cast::<u8>(),
            len,
        }
    }
}

impl<S: Payload> Drop for LoanRegistry<S> {
    fn drop(&mut self) {
        let released = self.drain();
        if released > 0 {
            tracing::debug!(released, "released outstanding loans on teardown");
        }
    }
}
