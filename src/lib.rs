pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod portals;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::TomlConfig;

pub use adapters::{http::ReqwestConnector, store::JsonFileStore};
pub use crate::core::{
    registry::{PortalContext, PortalRegistry},
    retrieval::{with_session, ContactRetriever},
};
pub use domain::model::{ContactRecord, Credential, RetrievalRequest};
pub use domain::ports::{Connector, ContactStore, Portal};
pub use utils::error::{ErrorKind, PortalError, Result};
