//! VN Engine: the narrative core of a branching visual novel.
//!
//! Walks a player through an authored scenario graph of scene, choice,
//! jump, branch and end nodes, tracking affection variables and story
//! flags, and persists progress to save slots plus an autosave. Rendering,
//! audio and widgets belong to the host; the engine only answers "given
//! this state and this input, what happens next".

pub mod core;
pub mod schema;
