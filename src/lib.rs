//!
//! Pawl is a library of busy-wait mutual exclusion primitives built directly on
//! atomic hardware operations. It consists of various parts:
//! * `atomics`: Portable atomics substrate the lock algorithms are written against
//! * `spin`: Test-and-set and test-and-test-and-set spin locks
//! * `ticket`: FIFO ticket lock
//! * `anderson`: Array-based queue lock with cache-line padded slots
//! * `mcs`, `clh`: List-based queue locks with caller-supplied nodes
//! * `rwlock`: Writer-preferring and phase-fair reader-writer locks
//!
//! Every lock spins with a CPU pause hint and never parks its caller, which is
//! the right trade for short critical sections on dedicated cores and the wrong
//! one everywhere else. Acquisition returns an RAII guard; dropping the guard
//! releases the lock. The queue locks additionally take a per-thread node whose
//! lifetime rules are documented on their modules.

/// Array-based queue lock (Anderson)
pub mod anderson;
/// Portable atomics substrate
pub mod atomics;
/// List-based queue lock spinning on the predecessor's flag (CLH)
pub mod clh;
/// Error types
pub mod errors;
/// Ifaces for the locking primitives
pub mod ifaces;
/// List-based queue lock spinning on the caller's own flag (MCS)
pub mod mcs;
/// Writer-preferring and phase-fair reader-writer locks
pub mod rwlock;
/// Simple single-word spin locks
pub mod spin;
/// FIFO ticket lock
pub mod ticket;

/// Allocation helpers
mod alloc;

///
/// Prelude of pawl
pub mod prelude {
    pub use crate::anderson::*;
    pub use crate::clh::*;
    pub use crate::ifaces::*;
    pub use crate::mcs::*;
    pub use crate::rwlock::*;
    pub use crate::spin::*;
    pub use crate::ticket::*;
}
