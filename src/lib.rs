//! # Exam Scan Grader
//!
//! 一个用 AI 视觉识别答题卡并自动评分的阅卷工具
//!
//! ## 架构设计
//!
//! 本系统采用四层架构，外加一组纯函数：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（拍摄目录），只暴露能力
//! - `FrameCapture` - 读取静态画面并编码为 JPEG
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"
//! - `OcrService` - 通过 Vision API 识别作答（实现 `AnswerRecognizer`）
//! - `ResultExporter` - 把成绩写成 Excel
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一位学生"的完整处理流程和会话状态
//! - `SetupForm` - 设置表单与校验
//! - `Session` - 阅卷状态机（Scanning → Review → Scanning | Completed）
//! - `ScanFlow` - 单次扫描（识别 → 规范化 → 评分）
//! - `Controller` - 持有表单或会话，负责完全重置
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/app` - 终端交互循环
//!
//! ### 纯函数（Grading）
//! - `grading/` - 答案规范化、评分、名单解析
//!
//! ## 模块结构

pub mod config;
pub mod error;
pub mod grading;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult};
pub use infrastructure::{CapturedFrame, FrameCapture};
pub use models::{AnswerOptions, ExamConfig, ExamResult, Phase, Recognition, ScanOutcome, Student};
pub use orchestrator::App;
pub use services::{AnswerRecognizer, OcrService, ResultExporter};
pub use workflow::{Controller, ScanFlow, Session, SetupForm};
