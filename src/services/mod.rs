//! Service layer for revtrail
//!
//! The service layer provides the audit operations on top of the storage
//! layer: recording with version assignment, history queries and revision
//! reconstruction.

pub mod audit;
pub mod revision;
pub mod sequencer;

pub use audit::AuditService;
pub use revision::fold;
pub use sequencer::VersionSequencer;
