//! Session services (load, edit, save)

pub mod loader;

pub use loader::{LoadOutcome, LoadState, LoadTicket, MatrixSession};
