//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责终端交互和流程调度，是整个系统的"指挥中心"。
//!
//! ### `app` - 终端阅卷应用
//! - 管理应用生命周期（初始化、运行、统计）
//! - 持有拍摄资源（FrameCapture）和会话控制器（Controller）
//! - 把教师输入分派到会话转换
//! - 导出成绩、输出统计信息
//!
//! ## 层次关系
//!
//! ```text
//! app (终端交互，持有 FrameCapture + Controller)
//!     ↓
//! workflow::ScanFlow / Session (处理单个学生)
//!     ↓
//! services (能力层：ocr / export)
//!     ↓
//! grading (纯函数：normalize / score / roster)
//! ```
//!
//! ## 设计原则
//!
//! 1. **资源隔离**：只有编排层持有 FrameCapture
//! 2. **向下依赖**：编排层 → workflow → services → infrastructure
//! 3. **无业务逻辑**：只做调度和展示，评分和状态转换都在下层

pub mod app;

// 重新导出主要类型
pub use app::{App, Step};
