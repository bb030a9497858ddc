//! Shared helpers for binaries, storage backends and workflows.

pub mod bootstrap;
pub mod compensation;
pub mod retry;
