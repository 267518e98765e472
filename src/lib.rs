//! sigtriage - signature-based bug triage for differential compiler testing
//!
//! Each version of a compiler under test is cataloged with the failure
//! signatures its historical corpus produces. Freshly generated programs are
//! then compiled against every version, and a failure is recorded only when
//! its normalized signature reproduces a cataloged bug of that version and has
//! not been recorded for it before.

pub mod campaign;
pub mod catalog;
pub mod cli;
pub mod compiler;
pub mod config;
pub mod error;
pub mod pattern;
pub mod process;
pub mod signature;
pub mod store;
pub mod summary;
pub mod version;
