//! 评分能力层
//!
//! 纯函数：规范化识别结果、解析名单、计算分数。不持有状态，不会失败。

pub mod normalizer;
pub mod roster;
pub mod scorer;

pub use normalizer::{normalize, normalize_key_cell, resize_answer_key, NO_ANSWER};
pub use roster::parse_roster;
pub use scorer::{format_percentage, is_passing, percentage, score};
