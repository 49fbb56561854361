//! 阅卷会话 - 流程层
//!
//! 核心职责：持有考试配置、名单进度、当前阶段、待确认结果和已确认成绩，
//! 并只通过转换方法修改它们。
//!
//! ```text
//! Scanning ──finish_scan(Ok)──▶ Review ──confirm──▶ Scanning（下一位）
//!    ▲   │                        │                └─▶ Completed（名单结束）
//!    │   └─finish_scan(Err)─┐     │
//!    └──────────────────────┴─────┘ retake
//! ```
//!
//! 不允许的操作返回 `SessionError::InvalidTransition`，且不修改任何状态。

use chrono::{DateTime, Local};
use tracing::{info, warn};

use crate::error::{OcrError, SessionError};
use crate::grading::{resize_answer_key, score};
use crate::models::{ExamConfig, ExamResult, Phase, Recognition, ScanOutcome, Student};

/// 一次扫描请求所需的信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRequest {
    pub student_index: usize,
    pub expected_length: usize,
}

/// 成绩历史摘要
#[derive(Debug, Clone, PartialEq)]
pub struct History<'a> {
    pub subject: &'a str,
    pub confirmed: usize,
    pub roster_size: usize,
    pub results: &'a [ExamResult],
}

/// 阅卷会话
#[derive(Debug, Clone)]
pub struct Session {
    config: ExamConfig,
    results: Vec<ExamResult>,
    current_index: usize,
    phase: Phase,
    pending: Option<ScanOutcome>,
    scan_in_flight: bool,
    last_error: Option<OcrError>,
}

impl Session {
    /// 开始会话：从第一位学生的 Scanning 开始
    pub fn start(config: ExamConfig) -> Self {
        info!(
            "📝 开始阅卷: {} ({} 题, {} 名学生)",
            config.subject(),
            config.total_questions(),
            config.students().len()
        );
        Self {
            config,
            results: Vec::new(),
            current_index: 0,
            phase: Phase::Scanning,
            pending: None,
            scan_in_flight: false,
            last_error: None,
        }
    }

    pub fn config(&self) -> &ExamConfig {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn results(&self) -> &[ExamResult] {
        &self.results
    }

    pub fn pending(&self) -> Option<&ScanOutcome> {
        self.pending.as_ref()
    }

    pub fn is_scan_in_flight(&self) -> bool {
        self.scan_in_flight
    }

    /// 最近一次扫描失败（重新扫描或成功后清除）
    pub fn last_error(&self) -> Option<&OcrError> {
        self.last_error.as_ref()
    }

    /// 当前学生；Completed 阶段返回 `None`
    pub fn current_student(&self) -> Option<&Student> {
        match self.phase {
            Phase::Scanning | Phase::Review => self.config.students().get(self.current_index),
            Phase::Setup | Phase::Completed => None,
        }
    }

    pub fn history(&self) -> History<'_> {
        History {
            subject: self.config.subject(),
            confirmed: self.results.len(),
            roster_size: self.config.students().len(),
            results: &self.results,
        }
    }

    /// 开始一次扫描
    ///
    /// 只能在 Scanning 阶段调用，且同一时间只能有一个请求在进行
    pub fn begin_scan(&mut self) -> Result<ScanRequest, SessionError> {
        self.expect_phase(Phase::Scanning, "begin_scan")?;
        if self.scan_in_flight {
            return Err(SessionError::ScanInFlight);
        }

        self.scan_in_flight = true;
        self.last_error = None;

        Ok(ScanRequest {
            student_index: self.current_index,
            expected_length: self.config.total_questions(),
        })
    }

    /// 结束一次扫描
    ///
    /// - 成功：答案对齐到题目数量后计算得分，生成待确认结果，进入 Review
    /// - 失败：保持 Scanning，记录并返回错误
    pub fn finish_scan(
        &mut self,
        reply: Result<Recognition, OcrError>,
    ) -> Result<&ScanOutcome, SessionError> {
        self.expect_phase(Phase::Scanning, "finish_scan")?;
        if !self.scan_in_flight {
            return Err(SessionError::InvalidTransition {
                phase: self.phase,
                action: "finish_scan",
            });
        }
        self.scan_in_flight = false;

        match reply {
            Ok(recognition) => {
                let answers = resize_answer_key(&recognition.answers, self.config.total_questions());
                let score = score(&answers, self.config.answer_key());
                info!(
                    "✓ [{}/{}] 识别完成，得分 {}/{}",
                    self.current_index + 1,
                    self.config.students().len(),
                    score,
                    self.config.total_questions()
                );
                self.phase = Phase::Review;
                let outcome: &ScanOutcome = self.pending.insert(ScanOutcome {
                    score,
                    detected_answers: answers,
                    confidence: recognition.confidence,
                });
                Ok(outcome)
            }
            Err(e) => {
                warn!(
                    "⚠️ [{}/{}] 扫描失败: {}",
                    self.current_index + 1,
                    self.config.students().len(),
                    e
                );
                self.last_error = Some(e.clone());
                Err(SessionError::Ocr(e))
            }
        }
    }

    /// 重新扫描：丢弃待确认结果，回到 Scanning，学生不变
    pub fn retake(&mut self) -> Result<Phase, SessionError> {
        self.expect_phase(Phase::Review, "retake")?;
        self.pending = None;
        self.phase = Phase::Scanning;
        info!("↩️ 重新扫描第 {} 位学生", self.current_index + 1);
        Ok(self.phase)
    }

    /// 确认结果（使用当前时间）
    pub fn confirm(&mut self) -> Result<Phase, SessionError> {
        self.confirm_at(Local::now())
    }

    /// 确认结果：写入成绩，前进到下一位学生或进入 Completed
    pub fn confirm_at(&mut self, scan_date: DateTime<Local>) -> Result<Phase, SessionError> {
        self.expect_phase(Phase::Review, "confirm")?;
        let outcome = self.pending.take().ok_or(SessionError::InvalidTransition {
            phase: self.phase,
            action: "confirm",
        })?;

        let student = &self.config.students()[self.current_index];
        self.results.push(ExamResult {
            student_id: student.id.clone(),
            student_name: student.name.clone(),
            score: outcome.score,
            total: self.config.total_questions(),
            detected_answers: outcome.detected_answers,
            scan_date,
        });
        info!(
            "✅ 已确认 {}: {}/{}",
            student,
            outcome.score,
            self.config.total_questions()
        );

        if self.current_index + 1 < self.config.students().len() {
            self.current_index += 1;
            self.phase = Phase::Scanning;
        } else {
            self.phase = Phase::Completed;
            info!("🎉 全部 {} 名学生阅卷完成", self.results.len());
        }

        Ok(self.phase)
    }

    fn expect_phase(&self, expected: Phase, action: &'static str) -> Result<(), SessionError> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(SessionError::InvalidTransition {
                phase: self.phase,
                action,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OcrErrorKind;
    use crate::workflow::SetupForm;

    fn config(students: &str) -> ExamConfig {
        let mut form = SetupForm::new();
        form.set_subject("วิทยาศาสตร์");
        form.set_total_questions("3");
        form.set_answer(0, "ก");
        form.set_answer(1, "ข");
        form.set_answer(2, "ค");
        form.set_roster(students);
        form.submit().unwrap()
    }

    fn recognition(answers: &[&str]) -> Recognition {
        Recognition {
            answers: answers.iter().map(|s| s.to_string()).collect(),
            confidence: 0.9,
        }
    }

    fn scan(session: &mut Session, answers: &[&str]) -> usize {
        session.begin_scan().unwrap();
        session.finish_scan(Ok(recognition(answers))).unwrap().score
    }

    #[test]
    fn test_start_in_scanning() {
        let session = Session::start(config("1, สมชาย"));
        assert_eq!(session.phase(), Phase::Scanning);
        assert_eq!(session.current_index(), 0);
        assert_eq!(session.current_student(), Some(&Student::new("1", "สมชาย")));
        assert!(session.results().is_empty());
    }

    #[test]
    fn test_successful_scan_enters_review() {
        let mut session = Session::start(config("1, สมชาย"));
        assert_eq!(scan(&mut session, &["ก", "ข", "ง"]), 2);
        assert_eq!(session.phase(), Phase::Review);
        assert!(!session.is_scan_in_flight());
        assert_eq!(session.pending().unwrap().detected_answers, vec!["ก", "ข", "ง"]);
    }

    #[test]
    fn test_failed_scan_stays_scanning() {
        let mut session = Session::start(config("1, สมชาย"));
        session.begin_scan().unwrap();
        let err = session
            .finish_scan(Err(OcrError::new(OcrErrorKind::TransientError, "timeout")))
            .unwrap_err();
        assert!(matches!(err, SessionError::Ocr(_)));
        assert_eq!(session.phase(), Phase::Scanning);
        assert!(session.pending().is_none());
        assert_eq!(session.last_error().unwrap().kind, OcrErrorKind::TransientError);

        // 可以再次扫描
        assert_eq!(scan(&mut session, &["ก", "ข", "ค"]), 3);
        assert!(session.last_error().is_none());
    }

    #[test]
    fn test_recognition_length_aligned_to_question_count() {
        let mut session = Session::start(config("1, สมชาย"));
        assert_eq!(scan(&mut session, &["ก"]), 1);
        assert_eq!(session.pending().unwrap().detected_answers, vec!["ก", "", ""]);
        session.retake().unwrap();

        assert_eq!(scan(&mut session, &["ก", "ข", "ค", "ง", "ก"]), 3);
        session.confirm().unwrap();
        assert_eq!(session.results()[0].detected_answers.len(), 3);
    }

    #[test]
    fn test_single_flight() {
        let mut session = Session::start(config("1, สมชาย"));
        session.begin_scan().unwrap();
        assert_eq!(session.begin_scan(), Err(SessionError::ScanInFlight));
    }

    #[test]
    fn test_finish_without_begin_is_rejected() {
        let mut session = Session::start(config("1, สมชาย"));
        let err = session.finish_scan(Ok(recognition(&["ก"]))).unwrap_err();
        assert!(matches!(err, SessionError::InvalidTransition { .. }));
        assert_eq!(session.phase(), Phase::Scanning);
    }

    #[test]
    fn test_retake_discards_pending() {
        let mut session = Session::start(config("1, สมชาย\n2, สมหญิง"));
        scan(&mut session, &["ก", "ข", "ค"]);

        assert_eq!(session.retake(), Ok(Phase::Scanning));
        assert!(session.pending().is_none());
        assert!(session.results().is_empty());
        assert_eq!(session.current_index(), 0);
    }

    #[test]
    fn test_confirm_advances_then_completes() {
        let mut session = Session::start(config("1, สมชาย\n2, สมหญิง"));

        scan(&mut session, &["ก", "ข", "ค"]);
        assert_eq!(session.confirm(), Ok(Phase::Scanning));
        assert_eq!(session.current_index(), 1);
        assert!(session.pending().is_none());

        scan(&mut session, &["ก", "", ""]);
        assert_eq!(session.confirm(), Ok(Phase::Completed));
        assert_eq!(session.results().len(), 2);
        assert_eq!(session.results()[0].score, 3);
        assert_eq!(session.results()[1].student_name, "สมหญิง");
        assert_eq!(session.results()[1].score, 1);
        assert_eq!(session.results()[1].total, 3);
        assert!(session.current_student().is_none());
    }

    #[test]
    fn test_invalid_transitions_do_not_mutate() {
        let mut session = Session::start(config("1, สมชาย"));
        assert!(matches!(
            session.confirm(),
            Err(SessionError::InvalidTransition { phase: Phase::Scanning, .. })
        ));
        assert!(matches!(
            session.retake(),
            Err(SessionError::InvalidTransition { .. })
        ));

        scan(&mut session, &["ก", "ข", "ค"]);
        assert!(matches!(
            session.begin_scan(),
            Err(SessionError::InvalidTransition { phase: Phase::Review, .. })
        ));
        assert!(session.pending().is_some());

        session.confirm().unwrap();
        assert_eq!(session.phase(), Phase::Completed);
        for result in [session.begin_scan().map(|_| Phase::Scanning), session.retake(), session.confirm()] {
            assert!(matches!(
                result,
                Err(SessionError::InvalidTransition { phase: Phase::Completed, .. })
            ));
        }
        assert_eq!(session.results().len(), 1);
    }

    #[test]
    fn test_history() {
        let mut session = Session::start(config("1, ก\n2, ข\n3, ค"));
        scan(&mut session, &["ก", "ข", "ค"]);
        session.confirm().unwrap();

        let history = session.history();
        assert_eq!(history.subject, "วิทยาศาสตร์");
        assert_eq!(history.confirmed, 1);
        assert_eq!(history.roster_size, 3);
        assert_eq!(history.results.len(), 1);
    }
}
