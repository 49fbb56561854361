//! 单次扫描流程 - 流程层
//!
//! 流程顺序：begin_scan → OCR 识别（含规范化）→ finish_scan（评分）
//!
//! - 不持有拍摄资源，只接收已编码的画面
//! - 只依赖业务能力（`AnswerRecognizer`）
//! - 失败不重试，由教师决定是否重新拍摄

use std::sync::Arc;
use tracing::info;

use crate::config::Config;
use crate::error::SessionError;
use crate::infrastructure::CapturedFrame;
use crate::models::{AnswerOptions, ScanOutcome};
use crate::services::{AnswerRecognizer, OcrService};
use crate::workflow::Session;

/// 单次扫描流程
pub struct ScanFlow {
    recognizer: Arc<dyn AnswerRecognizer>,
    options: AnswerOptions,
}

impl ScanFlow {
    /// 使用配置中的 OCR 服务创建流程
    pub fn new(config: &Config) -> Self {
        Self::with_recognizer(
            Arc::new(OcrService::new(config)),
            config.answer_options.clone(),
        )
    }

    pub fn with_recognizer(recognizer: Arc<dyn AnswerRecognizer>, options: AnswerOptions) -> Self {
        Self {
            recognizer,
            options,
        }
    }

    pub fn options(&self) -> &AnswerOptions {
        &self.options
    }

    /// 对当前学生执行一次扫描
    ///
    /// 成功时会话进入 Review 并返回待确认结果；失败时会话保持 Scanning
    pub async fn run(
        &self,
        session: &mut Session,
        frame: &CapturedFrame,
    ) -> Result<ScanOutcome, SessionError> {
        let request = session.begin_scan()?;

        info!(
            "🔍 [{}/{}] AI 正在识别答题卡...",
            request.student_index + 1,
            session.config().students().len()
        );

        let reply = self
            .recognizer
            .recognize(frame, request.expected_length, &self.options)
            .await;

        session.finish_scan(reply).cloned()
    }
}
