// Adapters layer: concrete implementations for external systems (http, storage).

pub mod http;
pub mod store;
