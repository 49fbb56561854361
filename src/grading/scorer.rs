//! 评分与百分比计算

/// 计算得分
///
/// 只有两边都非空、且去掉空白后完全相等（区分大小写）的位置才得分。
/// 长度不一致时多出的位置视为不匹配；未设置的标准答案永远不得分。
pub fn score(detected: &[String], key: &[String]) -> usize {
    detected
        .iter()
        .zip(key.iter())
        .filter(|(answer, expected)| {
            let answer = answer.trim();
            let expected = expected.trim();
            !answer.is_empty() && !expected.is_empty() && answer == expected
        })
        .count()
}

/// 得分百分比，满分为 0 时返回 0
pub fn percentage(score: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        score as f64 / total as f64 * 100.0
    }
}

/// 保留一位小数并加上 `%`，例如 `66.7%`
pub fn format_percentage(score: usize, total: usize) -> String {
    format!("{:.1}%", percentage(score, total))
}

/// 是否及格（≥ 50%）
pub fn is_passing(score: usize, total: usize) -> bool {
    total > 0 && score * 2 >= total
}
