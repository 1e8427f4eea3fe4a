//! Reusable object pool
//!
//! Short-lived protocol objects (reply writers above all) are recycled through
//! an `ObjectPool` instead of being allocated per request. The pool owns its
//! idle instances; a caller owns a `Pooled` loan from `acquire` until it hands
//! it back with `release`. Each loan remembers the pool it came from, and the
//! pool keeps a record of outstanding loans, so releasing into the wrong pool
//! or releasing something that is not on loan is refused.

use crate::protocol::{ByteOrder, PacketWriter};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Pool misuse and construction failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PoolError {
    #[error("pool {pool}: factory produced no instance")]
    Factory { pool: &'static str },

    #[error("pool {pool}: instance belongs to another pool")]
    ForeignInstance { pool: &'static str },

    #[error("pool {pool}: loan {ticket} is not outstanding")]
    NotOnLoan { pool: &'static str, ticket: u64 },
}

/// A type that can live in an `ObjectPool`
///
/// `Request` describes what the caller needs; an idle instance is reused only
/// when `fits` accepts it, otherwise `create` builds a new one.
pub trait Recyclable: Sized + Send {
    type Request;

    fn create(request: &Self::Request) -> Option<Self>;

    fn fits(&self, request: &Self::Request) -> bool;

    /// Prepare an instance for reuse by the next borrower
    fn recycle(&mut self, request: &Self::Request);

    /// Reset state before the instance goes back to the idle set
    fn reset(&mut self) {}
}

struct Slots<T> {
    idle: Vec<(u64, T)>,
    on_loan: HashSet<u64>,
}

struct Shared<T> {
    name: &'static str,
    max_idle: usize,
    slots: Mutex<Slots<T>>,
    next_ticket: AtomicU64,
    created: AtomicU64,
}

/// Snapshot of pool usage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    pub idle: usize,
    pub on_loan: usize,
    pub created: u64,
}

/// Cache of idle `T` instances guarded by one lock
///
/// Cloning the pool clones the handle; clones share the idle set.
pub struct ObjectPool<T: Recyclable> {
    shared: Arc<Shared<T>>,
}

impl<T: Recyclable> Clone for ObjectPool<T> {
    fn clone(&self) -> Self {
        ObjectPool {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Recyclable> ObjectPool<T> {
    pub fn new(name: &'static str, max_idle: usize) -> Self {
        ObjectPool {
            shared: Arc::new(Shared {
                name,
                max_idle,
                slots: Mutex::new(Slots {
                    idle: Vec::new(),
                    on_loan: HashSet::new(),
                }),
                next_ticket: AtomicU64::new(1),
                created: AtomicU64::new(0),
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        self.shared.name
    }

    /// Borrow an instance fitting `request`, creating one if none is idle
    pub fn acquire(&self, request: &T::Request) -> Result<Pooled<T>, PoolError> {
        let reused = {
            let mut slots = self.shared.slots.lock();
            let found = slots
                .idle
                .iter()
                .position(|(_, value)| value.fits(request));
            found.map(|index| {
                let (ticket, value) = slots.idle.swap_remove(index);
                slots.on_loan.insert(ticket);
                (ticket, value)
            })
        };

        let (ticket, value) = match reused {
            Some((ticket, mut value)) => {
                value.recycle(request);
                (ticket, value)
            }
            None => {
                let value = T::create(request).ok_or(PoolError::Factory {
                    pool: self.shared.name,
                })?;
                let ticket = self.shared.next_ticket.fetch_add(1, Ordering::Relaxed);
                self.shared.created.fetch_add(1, Ordering::Relaxed);
                self.shared.slots.lock().on_loan.insert(ticket);
                log::trace!("pool {}: created instance {}", self.shared.name, ticket);
                (ticket, value)
            }
        };

        Ok(Pooled {
            value: Some(value),
            ticket,
            home: Arc::downgrade(&self.shared),
        })
    }

    /// Return a loan to the idle set
    ///
    /// Fails without touching the idle set when the loan came from another
    /// pool or is not outstanding. Instances beyond `max_idle` are dropped.
    pub fn release(&self, mut loan: Pooled<T>) -> Result<(), PoolError> {
        if !Weak::ptr_eq(&loan.home, &Arc::downgrade(&self.shared)) {
            return Err(PoolError::ForeignInstance {
                pool: self.shared.name,
            });
        }
        let ticket = loan.ticket;
        let Some(mut value) = loan.value.take() else {
            return Err(PoolError::NotOnLoan {
                pool: self.shared.name,
                ticket,
            });
        };
        value.reset();

        let mut slots = self.shared.slots.lock();
        if !slots.on_loan.remove(&ticket) {
            return Err(PoolError::NotOnLoan {
                pool: self.shared.name,
                ticket,
            });
        }
        if slots.idle.len() < self.shared.max_idle {
            slots.idle.push((ticket, value));
        }
        Ok(())
    }

    pub fn stats(&self) -> PoolStats {
        let slots = self.shared.slots.lock();
        PoolStats {
            idle: slots.idle.len(),
            on_loan: slots.on_loan.len(),
            created: self.shared.created.load(Ordering::Relaxed),
        }
    }
}

/// An instance on loan from an `ObjectPool`
///
/// Dropping a loan without releasing it discards the instance.
pub struct Pooled<T: Recyclable> {
    value: Option<T>,
    ticket: u64,
    home: Weak<Shared<T>>,
}

impl<T: Recyclable> Pooled<T> {
    /// Identity of this instance within its pool
    pub fn ticket(&self) -> u64 {
        self.ticket
    }
}

impl<T: Recyclable> Deref for Pooled<T> {
    type Target = T;

    fn deref(&self) -> &T {
        // value is only taken inside release/drop, which consume the loan
        match &self.value {
            Some(value) => value,
            None => unreachable!("pooled value taken before release"),
        }
    }
}

impl<T: Recyclable> DerefMut for Pooled<T> {
    fn deref_mut(&mut self) -> &mut T {
        match &mut self.value {
            Some(value) => value,
            None => unreachable!("pooled value taken before release"),
        }
    }
}

impl<T: Recyclable> Drop for Pooled<T> {
    fn drop(&mut self) {
        if self.value.is_none() {
            return;
        }
        if let Some(shared) = self.home.upgrade() {
            shared.slots.lock().on_loan.remove(&self.ticket);
            log::debug!(
                "pool {}: loan {} dropped without release",
                shared.name,
                self.ticket
            );
        }
    }
}

/// What a caller needs from a pooled reply writer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriterRequest {
    pub byte_order: ByteOrder,
    pub capacity: usize,
}

impl Recyclable for PacketWriter {
    type Request = WriterRequest;

    fn create(request: &WriterRequest) -> Option<Self> {
        Some(PacketWriter::with_capacity(
            request.byte_order,
            request.capacity,
        ))
    }

    fn fits(&self, request: &WriterRequest) -> bool {
        self.capacity() >= request.capacity
    }

    fn recycle(&mut self, request: &WriterRequest) {
        self.set_byte_order(request.byte_order);
    }

    fn reset(&mut self) {
        self.clear();
    }
}
