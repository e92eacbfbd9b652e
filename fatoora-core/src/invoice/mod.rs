//! Invoice subsystem: numbering, status rules, the team-scoped service and
//! its HTTP handlers.

pub mod handlers;
pub mod numbering;
pub mod service;
pub mod state_machine;
pub mod types;

pub use service::{InvoiceDocument, InvoiceService};
