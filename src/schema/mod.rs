//! Authored content and the data a playthrough carries.

pub mod condition;
pub mod flags;
pub mod node;
pub mod scenario;
pub mod state;
pub mod variables;
