use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// 学生
///
/// 身份由在名单中的位置决定，`id` 只是自由文本标签（不保证唯一）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub id: String,
    pub name: String,
}

impl Student {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for Student {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "เลขที่ {} - {}", self.id, self.name)
    }
}

/// 考试配置
///
/// 在 Setup → Scanning 时构建一次，整个会话期间不可变。
/// 只能通过 `SetupForm::submit` 构建，保证 `answer_key.len() == total_questions`。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamConfig {
    pub(crate) subject: String,
    pub(crate) total_questions: usize,
    pub(crate) answer_key: Vec<String>,
    pub(crate) students: Vec<Student>,
}

impl ExamConfig {
    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn total_questions(&self) -> usize {
        self.total_questions
    }

    pub fn answer_key(&self) -> &[String] {
        &self.answer_key
    }

    pub fn students(&self) -> &[Student] {
        &self.students
    }
}

/// 单次扫描结果（待确认）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanOutcome {
    pub score: usize,
    pub detected_answers: Vec<String>,
    pub confidence: f64,
}

/// 已确认的考试结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamResult {
    pub student_id: String,
    pub student_name: String,
    pub score: usize,
    pub total: usize,
    pub detected_answers: Vec<String>,
    pub scan_date: DateTime<Local>,
}

/// 会话阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    Setup,
    Scanning,
    Review,
    Completed,
}

impl Phase {
    pub fn name(self) -> &'static str {
        match self {
            Phase::Setup => "Setup",
            Phase::Scanning => "Scanning",
            Phase::Review => "Review",
            Phase::Completed => "Completed",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// 识别结果（已规范化）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recognition {
    pub answers: Vec<String>,
    pub confidence: f64,
}

/// 有效作答选项
///
/// 有序列表：顺序用于构建提示词
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerOptions(Vec<String>);

impl AnswerOptions {
    /// 创建选项列表，去除空白项和重复项
    pub fn new<I, S>(options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut list: Vec<String> = Vec::new();
        for option in options {
            let option = option.into().trim().to_string();
            if !option.is_empty() && !list.contains(&option) {
                list.push(option);
            }
        }
        Self(list)
    }

    /// 解析逗号分隔的选项列表，例如 `"ก,ข,ค,ง"`
    ///
    /// 没有任何有效选项时返回 `None`
    pub fn parse_list(s: &str) -> Option<Self> {
        let options = Self::new(s.split(','));
        if options.0.is_empty() {
            None
        } else {
            Some(options)
        }
    }

    pub fn contains(&self, value: &str) -> bool {
        self.0.iter().any(|o| o == value)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// 以 `", "` 连接，用于提示词
    pub fn joined(&self) -> String {
        self.0.join(", ")
    }
}

impl Default for AnswerOptions {
    fn default() -> Self {
        Self::new(["ก", "ข", "ค", "ง"])
    }
}
