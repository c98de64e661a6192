//! The per-event workflow engine and its supporting pieces.

mod engine;
mod instructions;
mod prompt;
mod steps;
mod workspace;

pub use engine::Engine;
pub use instructions::build_repo_instructions;
pub use workspace::Workspace;
