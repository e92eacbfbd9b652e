pub mod client;
pub mod invoice;
pub mod team;
pub mod user;

pub use client::Client;
pub use invoice::{Invoice, InvoiceChanges, InvoiceResponse, InvoiceStatus, NewInvoice};
pub use team::{Membership, Team};
pub use user::{NewUser, User};
