pub mod access_control;
pub mod analytics;
pub mod auth;
pub mod banners;
pub mod contents;
pub mod employees;
pub mod errors;
pub mod site;
