#[macro_use]
extern crate tracing;

pub mod apply;
pub mod claims;
pub mod config;
pub mod dns;
pub mod error;
pub mod ingress;
pub mod planner;
pub mod records;
pub mod resolver;
pub mod sync;
pub mod zone;
