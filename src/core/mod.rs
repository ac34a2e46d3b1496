pub mod auth;
pub mod fetch;
pub mod registry;
pub mod retrieval;
pub mod session;

pub use crate::domain::model::{ContactRecord, Credential, IdentityFields, PropertyFields};
pub use crate::domain::ports::{Connector, ContactStore, Portal};
pub use crate::utils::error::Result;
