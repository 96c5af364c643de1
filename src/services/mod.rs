//! 服务层模块

pub mod board;
mod idea_schema;
pub mod idea_service;
mod prompt_service;

pub use board::{Admission, BoardView, Completion, IdeaBoard};
pub use idea_service::{GenerationError, IdeaGenerator};
