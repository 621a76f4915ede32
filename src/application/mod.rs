//! Application Layer
//!
//! Contains business logic services orchestrating the flow of data between
//! the presentation and domain layers.

pub mod services;
