//! 终端阅卷应用 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，负责终端交互和资源管理。
//!
//! ## 核心功能
//!
//! 1. **应用初始化**：写日志文件头、打开拍摄目录、创建扫描流程
//! 2. **交互循环**：按当前阶段显示提示，读取教师输入并分派
//! 3. **资源管理**：唯一持有 `FrameCapture`，失效后在下一次扫描时重新获取；
//!    直接按 Enter 时拒绝上一位学生已确认过的同一张照片
//! 4. **错误处理**：每一步的错误都转换成泰文提示，不中断循环
//! 5. **导出与统计**：Completed 阶段导出 Excel，并把成绩追加到日志文件
//!
//! ## 输入约定
//!
//! | 阶段 | 输入 |
//! |------|------|
//! | Setup | Enter 重新读取设置文件并开始，`q` 退出 |
//! | Scanning | Enter 使用最新图片，输入路径使用指定图片，`h` 历史，`q` 退出 |
//! | Review | `y` 确认，`r` 重新扫描，`h` 历史，`q` 退出 |
//! | Completed | `e` 导出，`n` 重新开始，`h` 历史，`q` 退出 |

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::ResourceError;
use crate::grading::{format_percentage, is_passing};
use crate::infrastructure::FrameCapture;
use crate::models::{load_exam_setup, Phase, ScanOutcome};
use crate::services::ResultExporter;
use crate::utils::logging::{
    append_session_summary, init_log_file, log_startup, print_session_stats,
};
use crate::workflow::{Controller, History, ScanFlow, SetupForm};

/// 一次输入处理后的去向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Continue,
    Quit,
}

/// 应用主结构
pub struct App {
    config: Config,
    controller: Controller,
    capture: Option<FrameCapture>,
    scan_flow: ScanFlow,
    exporter: ResultExporter,
    last_export: Option<PathBuf>,
    /// 待确认结果所用照片
    pending_frame: Option<FrameStamp>,
    /// 上一次确认所用照片
    committed_frame: Option<FrameStamp>,
}

type FrameStamp = (PathBuf, SystemTime);

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        // 初始化日志文件
        init_log_file(&config.output_log_file)?;

        log_startup(&config.ocr_model_name, &config.capture_dir);

        let scan_flow = ScanFlow::new(&config);
        Ok(Self::new(config, scan_flow))
    }

    /// 使用指定的扫描流程创建应用（不写日志文件头）
    pub fn new(config: Config, scan_flow: ScanFlow) -> Self {
        let capture = match FrameCapture::open(&config.capture_dir, config.jpeg_quality) {
            Ok(capture) => Some(capture),
            Err(e) => {
                warn!("⚠️ 拍摄目录暂不可用，将在扫描时重试: {}", e);
                None
            }
        };

        Self {
            exporter: ResultExporter::new(config.export_dir.clone()),
            controller: Controller::new(),
            capture,
            scan_flow,
            last_export: None,
            pending_frame: None,
            committed_frame: None,
            config,
        }
    }

    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    pub fn last_export(&self) -> Option<&Path> {
        self.last_export.as_deref()
    }

    pub fn has_capture(&self) -> bool {
        self.capture.is_some()
    }

    /// 运行交互循环，直到教师退出或输入结束
    pub async fn run(mut self) -> Result<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            println!("\n{}", self.prompt());

            let Some(line) = lines.next_line().await? else {
                info!("输入结束，程序退出");
                break;
            };

            if self.handle_input(line.trim()).await == Step::Quit {
                break;
            }
        }

        if let Some(session) = self.controller.session() {
            print_session_stats(&session.history(), &self.config.output_log_file);
        }

        Ok(())
    }

    /// 当前阶段的提示文本
    pub fn prompt(&self) -> String {
        match self.controller.phase() {
            Phase::Setup => format!(
                "⚙️ กด Enter เพื่อโหลดไฟล์ตั้งค่า {} และเริ่มตรวจ (q = ออก)",
                self.config.exam_file
            ),
            Phase::Scanning => {
                let (position, student) = self
                    .controller
                    .session()
                    .and_then(|s| {
                        s.current_student().map(|student| {
                            (
                                format!("{}/{}", s.current_index() + 1, s.config().students().len()),
                                student.to_string(),
                            )
                        })
                    })
                    .unwrap_or_default();
                format!(
                    "📷 [{}] {}\nกด Enter เพื่อใช้ภาพล่าสุดใน {} หรือพิมพ์ path ของภาพ (h = ประวัติ, q = ออก)",
                    position, student, self.config.capture_dir
                )
            }
            Phase::Review => "y = ยืนยันคะแนน, r = สแกนใหม่, h = ประวัติ, q = ออก".to_string(),
            Phase::Completed => {
                "🎉 ตรวจครบทุกคนแล้ว! e = ส่งออก Excel, n = เริ่มใหม่, h = ประวัติ, q = ออก".to_string()
            }
        }
    }

    /// 处理一行输入
    pub async fn handle_input(&mut self, input: &str) -> Step {
        if input.eq_ignore_ascii_case("q") {
            return Step::Quit;
        }

        match self.controller.phase() {
            Phase::Setup => self.handle_setup().await,
            Phase::Scanning => match input {
                "h" => self.show_history(),
                _ => self.scan(input).await,
            },
            Phase::Review => match input {
                "y" => self.confirm(),
                "r" => self.retake(),
                "h" => self.show_history(),
                _ => println!("❓ กรุณาพิมพ์ y หรือ r"),
            },
            Phase::Completed => match input {
                "e" => self.export().await,
                "n" => self.reset(),
                "h" => self.show_history(),
                _ => println!("❓ กรุณาพิมพ์ e, n หรือ h"),
            },
        }

        Step::Continue
    }

    /// Setup：重新读取设置文件并提交
    async fn handle_setup(&mut self) {
        let file = match load_exam_setup(Path::new(&self.config.exam_file)).await {
            Ok(file) => file,
            Err(e) => {
                warn!("⚠️ 无法读取设置文件: {:#}", e);
                println!("❗ ไม่สามารถอ่านไฟล์ตั้งค่า {}", self.config.exam_file);
                return;
            }
        };

        if let Some(form) = self.controller.form_mut() {
            *form = SetupForm::from_setup_file(&file);
            println!(
                "📋 วิชา: {} | จำนวนข้อ: {} | นักเรียน: {} คน",
                form.subject(),
                form.answer_key().len(),
                form.preview_students().len()
            );
        }

        match self.controller.submit_setup() {
            Ok(_) => println!("✅ เริ่มการสแกนข้อสอบ"),
            Err(e) => println!("❗ {}", e.user_message()),
        }
    }

    /// 获取拍摄资源；失效时重新打开
    fn ensure_capture(&mut self) -> Result<&FrameCapture, ResourceError> {
        let capture = match self.capture.take() {
            Some(capture) => capture,
            None => FrameCapture::open(&self.config.capture_dir, self.config.jpeg_quality)?,
        };
        let capture: &FrameCapture = self.capture.insert(capture);
        Ok(capture)
    }

    /// Scanning：拍摄并识别当前学生的答题卡
    async fn scan(&mut self, input: &str) {
        let path = (!input.is_empty()).then(|| PathBuf::from(input));

        let capture = match self.ensure_capture() {
            Ok(capture) => capture,
            Err(e) => {
                error!("❌ 拍摄资源不可用: {}", e);
                println!("❗ {}", e.user_message());
                return;
            }
        };

        let frame = match capture.capture(path.as_deref()).await {
            Ok(frame) => frame,
            Err(e) => {
                if !capture.dir().is_dir() {
                    self.capture = None;
                }
                warn!("⚠️ 拍摄失败: {}", e);
                println!("❗ {}", e.user_message());
                return;
            }
        };

        let stamp = frame.stamp();
        if stamp.is_some() && stamp == self.committed_frame {
            if input.is_empty() {
                warn!("⚠️ 最新照片与上一位学生相同，跳过识别");
                println!("❗ ภาพล่าสุดเป็นภาพของนักเรียนคนก่อน กรุณาถ่ายภาพใหม่");
                return;
            }
            warn!("⚠️ 指定的照片与上一位学生相同: {:?}", frame.source);
        }

        let Some(session) = self.controller.session_mut() else {
            return;
        };

        println!("⏳ AI กำลังประมวลผล...");
        match self.scan_flow.run(session, &frame).await {
            Ok(outcome) => {
                self.pending_frame = stamp;
                if let Some(session) = self.controller.session() {
                    print_review(&outcome, session.config().answer_key());
                }
            }
            Err(e) => println!("❗ {}", e.user_message()),
        }
    }

    fn confirm(&mut self) {
        let Some(session) = self.controller.session_mut() else {
            return;
        };

        let result = session.confirm();
        if result.is_ok() {
            self.committed_frame = self.pending_frame.take();
        }

        match result {
            Ok(Phase::Completed) => {
                let history = session.history();
                if let Err(e) = append_session_summary(&self.config.output_log_file, &history) {
                    warn!("⚠️ 写入日志文件失败: {:#}", e);
                }
                print_session_stats(&history, &self.config.output_log_file);
            }
            Ok(_) => println!("✅ บันทึกคะแนนแล้ว"),
            Err(e) => println!("❗ {}", e.user_message()),
        }
    }

    fn retake(&mut self) {
        if let Some(session) = self.controller.session_mut() {
            match session.retake() {
                Ok(_) => self.pending_frame = None,
                Err(e) => println!("❗ {}", e.user_message()),
            }
        }
    }

    /// Completed：导出 Excel
    async fn export(&mut self) {
        let Some(session) = self.controller.session() else {
            return;
        };

        match self
            .exporter
            .export(session.config().subject(), session.results())
            .await
        {
            Ok(path) => {
                println!("📊 ส่งออกไฟล์แล้ว: {}", path.display());
                self.last_export = Some(path);
            }
            Err(e) => {
                error!("❌ 导出失败: {}", e);
                println!("❗ {}", e.user_message());
            }
        }
    }

    fn reset(&mut self) {
        self.controller.reset();
        self.last_export = None;
        self.pending_frame = None;
        self.committed_frame = None;
        println!("🔄 เริ่มการตรวจชุดใหม่");
    }

    fn show_history(&self) {
        if let Some(session) = self.controller.session() {
            print_history(&session.history());
        }
    }
}

// ========== 终端输出辅助函数 ==========

fn print_review(outcome: &ScanOutcome, answer_key: &[String]) {
    println!(
        "📝 คะแนน: {}/{} (ความมั่นใจ {:.0}%)",
        outcome.score,
        answer_key.len(),
        outcome.confidence * 100.0
    );
    for (index, detected) in outcome.detected_answers.iter().enumerate() {
        let expected = answer_key.get(index).map(String::as_str).unwrap_or_default();
        let mark = if !detected.is_empty() && detected == expected {
            "✓"
        } else {
            "✗"
        };
        let shown = if detected.is_empty() { "-" } else { detected };
        println!("  ข้อ {}: {} (เฉลย {}) {}", index + 1, shown, expected, mark);
    }
}

fn print_history(history: &History<'_>) {
    println!(
        "📚 ประวัติการตรวจ: {} ({}/{})",
        history.subject, history.confirmed, history.roster_size
    );
    if history.results.is_empty() {
        println!("  ยังไม่มีข้อมูลการตรวจ");
        return;
    }
    for result in history.results {
        let verdict = if is_passing(result.score, result.total) {
            "ผ่าน"
        } else {
            "ไม่ผ่าน"
        };
        println!(
            "  เลขที่ {} {} - {}/{} ({}) {}",
            result.student_id,
            result.student_name,
            result.score,
            result.total,
            format_percentage(result.score, result.total),
            verdict
        );
    }
}
