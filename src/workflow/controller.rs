//! 会话控制器
//!
//! 唯一持有会话状态的对象：要么是可编辑的设置表单，要么是进行中的阅卷会话

use tracing::{info, warn};

use crate::error::{AppError, SessionError};
use crate::models::Phase;
use crate::workflow::{Session, SetupForm};

/// 控制器所处阶段
#[derive(Debug, Clone)]
pub enum Stage {
    Setup(SetupForm),
    Grading(Session),
}

/// 会话控制器
#[derive(Debug, Clone)]
pub struct Controller {
    stage: Stage,
}

impl Default for Controller {
    fn default() -> Self {
        Self::new()
    }
}

impl Controller {
    pub fn new() -> Self {
        Self {
            stage: Stage::Setup(SetupForm::new()),
        }
    }

    pub fn with_form(form: SetupForm) -> Self {
        Self {
            stage: Stage::Setup(form),
        }
    }

    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    pub fn phase(&self) -> Phase {
        match &self.stage {
            Stage::Setup(_) => Phase::Setup,
            Stage::Grading(session) => session.phase(),
        }
    }

    pub fn form_mut(&mut self) -> Option<&mut SetupForm> {
        match &mut self.stage {
            Stage::Setup(form) => Some(form),
            Stage::Grading(_) => None,
        }
    }

    pub fn session(&self) -> Option<&Session> {
        match &self.stage {
            Stage::Setup(_) => None,
            Stage::Grading(session) => Some(session),
        }
    }

    pub fn session_mut(&mut self) -> Option<&mut Session> {
        match &mut self.stage {
            Stage::Setup(_) => None,
            Stage::Grading(session) => Some(session),
        }
    }

    /// 提交设置表单：Setup → Scanning
    ///
    /// 校验失败时保持 Setup，表单内容不变
    pub fn submit_setup(&mut self) -> Result<Phase, AppError> {
        let form = match &self.stage {
            Stage::Setup(form) => form,
            Stage::Grading(session) => {
                return Err(SessionError::InvalidTransition {
                    phase: session.phase(),
                    action: "submit_setup",
                }
                .into());
            }
        };

        let config = form.submit().map_err(|e| {
            warn!("⚠️ 设置校验失败: {}", e);
            AppError::from(e)
        })?;

        self.stage = Stage::Grading(Session::start(config));
        Ok(self.phase())
    }

    /// 完全重置：丢弃会话，回到空白设置表单
    pub fn reset(&mut self) {
        if let Stage::Grading(session) = &self.stage {
            info!(
                "🔄 重置会话，丢弃 {} 条成绩",
                session.results().len()
            );
        }
        self.stage = Stage::Setup(SetupForm::new());
    }
}
