use std::result;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LockErrorType {
    #[error("Slot count must lie in 1..={0}")]
    SlotBound(usize),
    #[error("Queue node allocation failed")]
    AllocFailed,
}

pub type LockResult<T> = result::Result<T, LockErrorType>;
