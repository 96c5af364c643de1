//! 数据模型

mod api;
mod idea;

pub use api::*;
pub use idea::*;
