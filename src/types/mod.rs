//! Core types for the alert registry.

pub mod alert;
pub mod query;

pub use alert::{AlertId, AffectedJourney, AffectsSpec, ServiceAlert};
pub use query::{AlertList, AlertQuery};
