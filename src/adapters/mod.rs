// Adapters: the HTTP surface over the core services.

pub mod http;
pub mod pages;
