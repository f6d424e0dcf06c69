pub mod core;
pub(crate) mod helpers;
pub mod http;
pub mod service;
