//! 学生名单解析

use crate::models::Student;

/// 解析学生名单
///
/// 每行一个学生，格式 `เลขที่, ชื่อ`，字段去除空白，可以为空；
/// 多余的逗号字段忽略。两个字段都为空的行被丢弃。
pub fn parse_roster(text: &str) -> Vec<Student> {
    text.trim()
        .lines()
        .filter_map(|line| {
            let mut parts = line.split(',').map(str::trim);
            let id = parts.next().unwrap_or_default();
            let name = parts.next().unwrap_or_default();
            if id.is_empty() && name.is_empty() {
                None
            } else {
                Some(Student::new(id, name))
            }
        })
        .collect()
}
