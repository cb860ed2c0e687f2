pub mod config;
pub mod evaluator;
pub mod gallery;
pub mod persistence;
pub mod playtest;
pub mod session;
pub mod traversal;
pub mod validator;
