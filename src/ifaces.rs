/// Iface implemented by every mutual-exclusion lock in the crate that can be
/// acquired without a caller-supplied queue node.
pub unsafe trait LockIface {
    fn lock(&self);

    fn try_lock(&self) -> bool;

    fn is_locked(&self) -> bool;

    fn unlock(&self);
}

/// Iface implemented by the reader-writer locks.
pub unsafe trait RwLockIface {
    fn lock_read(&self);

    fn try_lock_read(&self) -> bool;

    fn release_read(&self);

    fn lock_write(&self);

    fn try_lock_write(&self) -> bool;

    fn release_write(&self);
}
