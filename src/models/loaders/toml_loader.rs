use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;

/// 考试设置文件
///
/// 对应设置表单的原始输入，尚未校验：
///
/// ```toml
/// subject = "คณิตศาสตร์ ป.6"
/// total_questions = 3
/// answer_key = ["ก", "ข", "ค"]
/// students = """
/// 1, นายสมชาย
/// 2, นางสาวใจดี
/// """
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExamSetupFile {
    #[serde(default)]
    pub subject: String,
    #[serde(default = "default_total_questions")]
    pub total_questions: i64,
    #[serde(default)]
    pub answer_key: Vec<String>,
    /// 学生名单原文，每行 `เลขที่, ชื่อ`
    #[serde(default)]
    pub students: String,
}

fn default_total_questions() -> i64 {
    10
}

/// 从 TOML 文件加载考试设置
pub async fn load_exam_setup(toml_file_path: &Path) -> Result<ExamSetupFile> {
    let content = fs::read_to_string(toml_file_path)
        .await
        .with_context(|| format!("无法读取TOML文件: {}", toml_file_path.display()))?;

    let setup: ExamSetupFile = toml::from_str(&content)
        .with_context(|| format!("无法解析TOML文件: {}", toml_file_path.display()))?;

    tracing::info!(
        "成功加载考试设置: {} ({} 题)",
        setup.subject,
        setup.total_questions
    );

    Ok(setup)
}
