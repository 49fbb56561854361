//! 设置表单
//!
//! Setup 阶段可反复编辑的表单。提交成功后生成不可变的 `ExamConfig`；
//! 校验失败时表单保持原样，可继续修改后重新提交。

use tracing::debug;

use crate::error::ValidationError;
use crate::grading::{normalize_key_cell, parse_roster, resize_answer_key};
use crate::models::{ExamConfig, ExamSetupFile, Student};

const DEFAULT_TOTAL_QUESTIONS: usize = 10;

/// 设置表单
#[derive(Debug, Clone, PartialEq)]
pub struct SetupForm {
    subject: String,
    total_input: String,
    answer_key: Vec<String>,
    roster_text: String,
}

impl Default for SetupForm {
    fn default() -> Self {
        Self {
            subject: String::new(),
            total_input: DEFAULT_TOTAL_QUESTIONS.to_string(),
            answer_key: vec![String::new(); DEFAULT_TOTAL_QUESTIONS],
            roster_text: String::new(),
        }
    }
}

impl SetupForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从设置文件填充表单
    pub fn from_setup_file(file: &ExamSetupFile) -> Self {
        let mut form = Self::new();
        form.set_subject(&file.subject);
        form.set_total_questions(&file.total_questions.to_string());
        for (index, value) in file.answer_key.iter().enumerate() {
            form.set_answer(index, value);
        }
        form.set_roster(&file.students);
        form
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn answer_key(&self) -> &[String] {
        &self.answer_key
    }

    pub fn roster_text(&self) -> &str {
        &self.roster_text
    }

    pub fn set_subject(&mut self, subject: &str) {
        self.subject = subject.to_string();
    }

    pub fn set_roster(&mut self, roster_text: &str) {
        self.roster_text = roster_text.to_string();
    }

    /// 修改题目数量
    ///
    /// 只有解析为正整数时才调整标准答案长度（保留已填写的答案）
    pub fn set_total_questions(&mut self, input: &str) {
        self.total_input = input.to_string();
        if let Some(total) = parse_total(input) {
            self.answer_key = resize_answer_key(&self.answer_key, total);
            debug!("标准答案长度调整为 {}", total);
        }
    }

    /// 填写第 `index` 题的标准答案（去空白，只保留第一个字符）
    ///
    /// 超出范围时忽略并返回 `false`
    pub fn set_answer(&mut self, index: usize, value: &str) -> bool {
        match self.answer_key.get_mut(index) {
            Some(cell) => {
                *cell = normalize_key_cell(value);
                true
            }
            None => false,
        }
    }

    /// 当前名单能解析出的学生
    pub fn preview_students(&self) -> Vec<Student> {
        parse_roster(&self.roster_text)
    }

    /// 校验并生成考试配置
    ///
    /// 校验顺序：名单 → 科目 → 题目数量
    pub fn submit(&self) -> Result<ExamConfig, ValidationError> {
        let students = self.preview_students();
        if students.is_empty() {
            return Err(ValidationError::EmptyRoster);
        }

        let subject = self.subject.trim();
        if subject.is_empty() {
            return Err(ValidationError::EmptySubject);
        }

        let total_questions =
            parse_total(&self.total_input).ok_or_else(|| ValidationError::InvalidQuestionCount {
                value: self.total_input.clone(),
            })?;

        Ok(ExamConfig {
            subject: subject.to_string(),
            total_questions,
            answer_key: resize_answer_key(&self.answer_key, total_questions),
            students,
        })
    }
}

fn parse_total(input: &str) -> Option<usize> {
    input.trim().parse::<usize>().ok().filter(|total| *total > 0)
}
