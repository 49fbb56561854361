//! 作答规范化
//!
//! 把 OCR 返回的原始数组对齐到题目数量，无效项一律替换为空字符串（未作答）

use crate::models::AnswerOptions;

/// 未作答/无法识别的占位值
pub const NO_ANSWER: &str = "";

/// 规范化 OCR 原始作答
///
/// - 不在 `valid_options` 中的值（包括 `None`、空串、词表外的值）替换为 [`NO_ANSWER`]
/// - 比较前先去掉首尾空白
/// - 不足 `expected_length` 时在末尾补 [`NO_ANSWER`]，超出时截断
pub fn normalize(
    raw: &[Option<String>],
    expected_length: usize,
    valid_options: &AnswerOptions,
) -> Vec<String> {
    let mut answers: Vec<String> = raw
        .iter()
        .take(expected_length)
        .map(|answer| match answer.as_deref().map(str::trim) {
            Some(value) if valid_options.contains(value) => value.to_string(),
            _ => NO_ANSWER.to_string(),
        })
        .collect();

    answers.resize(expected_length, NO_ANSWER.to_string());
    answers
}

/// 调整标准答案长度，保留已有的答案
pub fn resize_answer_key(key: &[String], total: usize) -> Vec<String> {
    let mut resized: Vec<String> = key.iter().take(total).cloned().collect();
    resized.resize(total, NO_ANSWER.to_string());
    resized
}

/// 标准答案单元格：去掉空白后只保留第一个字符
pub fn normalize_key_cell(value: &str) -> String {
    value
        .trim()
        .chars()
        .next()
        .map(String::from)
        .unwrap_or_default()
}
