//! 成绩导出服务 - 业务能力层
//!
//! 只负责"把已确认的成绩写成 Excel"能力

use chrono::{DateTime, Datelike, Local, Timelike};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::ExportError;
use crate::grading::format_percentage;
use crate::models::ExamResult;

/// 工作表名称
pub const SHEET_NAME: &str = "ผลการสอบ";

/// 表头：เลขที่ / ชื่อ-นามสกุล / คะแนนที่ได้ / คะแนนเต็ม / คิดเป็นร้อยละ / วันที่ตรวจ
pub const HEADERS: [&str; 6] = [
    "เลขที่",
    "ชื่อ-นามสกุล",
    "คะแนนที่ได้",
    "คะแนนเต็ม",
    "คิดเป็นร้อยละ",
    "วันที่ตรวจ",
];

/// 导出表格中的一行
#[derive(Debug, Clone, PartialEq)]
pub struct ExportRow {
    pub student_id: String,
    pub student_name: String,
    pub score: usize,
    pub total: usize,
    pub percentage: String,
    pub scan_date: String,
}

impl From<&ExamResult> for ExportRow {
    fn from(result: &ExamResult) -> Self {
        Self {
            student_id: result.student_id.clone(),
            student_name: result.student_name.clone(),
            score: result.score,
            total: result.total,
            percentage: format_percentage(result.score, result.total),
            scan_date: format_thai_datetime(&result.scan_date),
        }
    }
}

/// 成绩导出服务
pub struct ResultExporter {
    export_dir: PathBuf,
}

impl ResultExporter {
    pub fn new(export_dir: impl Into<PathBuf>) -> Self {
        Self {
            export_dir: export_dir.into(),
        }
    }

    pub fn export_dir(&self) -> &Path {
        &self.export_dir
    }

    /// 导出成绩，返回写入的文件路径
    pub async fn export(&self, subject: &str, results: &[ExamResult]) -> Result<PathBuf, ExportError> {
        let bytes = build_workbook(results)?;

        tokio::fs::create_dir_all(&self.export_dir)
            .await
            .map_err(|source| ExportError::WriteFailed {
                path: self.export_dir.display().to_string(),
                source,
            })?;

        let path = self.export_dir.join(export_file_name(subject));
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|source| ExportError::WriteFailed {
                path: path.display().to_string(),
                source,
            })?;

        info!("📊 已导出 {} 条成绩: {}", results.len(), path.display());

        Ok(path)
    }
}

/// 构建表格行
pub fn build_rows(results: &[ExamResult]) -> Vec<ExportRow> {
    results.iter().map(ExportRow::from).collect()
}

/// 生成 XLSX 字节
pub fn build_workbook(results: &[ExamResult]) -> Result<Vec<u8>, ExportError> {
    if results.is_empty() {
        return Err(ExportError::NoResults);
    }

    let mut book = umya_spreadsheet::new_file();
    let sheet = book
        .get_sheet_mut(&0)
        .ok_or_else(|| ExportError::Spreadsheet("默认工作表不存在".to_string()))?;
    sheet.set_name(SHEET_NAME);

    // 表头
    for (col_idx, header) in HEADERS.iter().enumerate() {
        let cell = sheet.get_cell_mut(((col_idx as u32) + 1, 1));
        cell.set_value(*header);
        cell.get_style_mut().get_font_mut().set_bold(true);
    }

    // 数据行
    for (row_idx, row) in build_rows(results).iter().enumerate() {
        let row_num = (row_idx as u32) + 2;
        sheet.get_cell_mut((1, row_num)).set_value(row.student_id.as_str());
        sheet.get_cell_mut((2, row_num)).set_value(row.student_name.as_str());
        sheet.get_cell_mut((3, row_num)).set_value_number(row.score as f64);
        sheet.get_cell_mut((4, row_num)).set_value_number(row.total as f64);
        sheet.get_cell_mut((5, row_num)).set_value(row.percentage.as_str());
        sheet.get_cell_mut((6, row_num)).set_value(row.scan_date.as_str());
    }

    let mut buf = Cursor::new(Vec::new());
    umya_spreadsheet::writer::xlsx::write_writer(&book, &mut buf)
        .map_err(|e| ExportError::Spreadsheet(format!("XLSX 生成失败: {}", e)))?;

    Ok(buf.into_inner())
}

/// 导出文件名：`ผลสอบ_<科目>.xlsx`，路径非法字符替换为 `_`
pub fn export_file_name(subject: &str) -> String {
    let safe: String = subject
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    format!("ผลสอบ_{}.xlsx", safe)
}

/// 泰国本地时间格式：`d/m/yyyy H:MM:SS`，年份为佛历（公历 + 543）
pub fn format_thai_datetime(dt: &DateTime<Local>) -> String {
    format!(
        "{}/{}/{} {}:{:02}:{:02}",
        dt.day(),
        dt.month(),
        dt.year() + 543,
        dt.hour(),
        dt.minute(),
        dt.second()
    )
}
