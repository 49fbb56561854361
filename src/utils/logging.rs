use anyhow::Result;
/// 日志工具模块
///
/// 提供日志初始化、日志文件和格式化输出的辅助函数
use std::fs::{self, OpenOptions};
use std::io::Write;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use crate::grading::format_percentage;
use crate::workflow::History;

/// 初始化 tracing 订阅者
///
/// 优先使用 `RUST_LOG`；未设置时详细模式为 `debug`，否则为 `info`
pub fn init(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// 初始化日志文件
///
/// # 参数
/// - `log_file_path`: 日志文件路径
pub fn init_log_file(log_file_path: &str) -> Result<()> {
    let log_header = format!(
        "{}\n阅卷日志 - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(log_file_path, log_header)?;
    Ok(())
}

/// 把本次会话的成绩追加到日志文件
pub fn append_session_summary(log_file_path: &str, history: &History<'_>) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file_path)?;

    writeln!(file, "科目: {}", history.subject)?;
    writeln!(file, "已确认: {}/{}", history.confirmed, history.roster_size)?;
    for result in history.results {
        writeln!(
            file,
            "  {} {} - {}/{} ({})",
            result.student_id,
            result.student_name,
            result.score,
            result.total,
            format_percentage(result.score, result.total)
        )?;
    }
    writeln!(file)?;
    Ok(())
}

/// 记录程序启动信息
pub fn log_startup(model_name: &str, capture_dir: &str) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 答题卡扫描阅卷模式");
    info!("🤖 识别模型: {}", model_name);
    info!("📁 拍摄目录: {}", capture_dir);
    info!("{}", "=".repeat(60));
}

/// 打印会话统计信息
pub fn print_session_stats(history: &History<'_>, log_file_path: &str) {
    let passed = history
        .results
        .iter()
        .filter(|r| crate::grading::is_passing(r.score, r.total))
        .count();

    info!("\n{}", "=".repeat(60));
    info!("📊 阅卷完成统计 - {}", history.subject);
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 已确认: {}/{}", history.confirmed, history.roster_size);
    info!("🎯 及格: {}", passed);
    info!("{}", "=".repeat(60));
    info!("\n日志已保存至: {}", log_file_path);
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
