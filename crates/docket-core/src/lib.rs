#![allow(clippy::pedantic)]
#![allow(clippy::nursery)]
#![deny(clippy::unwrap_used)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::similar_names)]

pub mod access;
pub mod models;
pub mod sanitize;
pub mod schedule;
pub mod validation;

pub use crate::access::*;
pub use crate::models::*;
pub use crate::schedule::*;
