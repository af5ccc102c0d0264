pub mod locking;


pub use locking::{LockError, LockMarker, ReleaseGuard};
