use async_trait::async_trait;
use exam_scan_grader::error::{OcrError, OcrErrorKind};
use exam_scan_grader::grading::normalize;
use exam_scan_grader::orchestrator::{App, Step};
use exam_scan_grader::{AnswerOptions, AnswerRecognizer, CapturedFrame, Config, Phase, Recognition, ScanFlow};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// 按顺序返回预设答案的识别器
struct ScriptedRecognizer {
    replies: Mutex<Vec<Result<Vec<Option<&'static str>>, OcrError>>>,
    calls: Mutex<usize>,
}

impl ScriptedRecognizer {
    fn new(replies: Vec<Result<Vec<Option<&'static str>>, OcrError>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies),
            calls: Mutex::new(0),
        })
    }

    fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl AnswerRecognizer for ScriptedRecognizer {
    async fn recognize(
        &self,
        frame: &CapturedFrame,
        expected_length: usize,
        options: &AnswerOptions,
    ) -> Result<Recognition, OcrError> {
        assert!(frame.jpeg.starts_with(&[0xFF, 0xD8]), "画面应为 JPEG");
        *self.calls.lock().unwrap() += 1;

        let raw: Vec<Option<String>> = self
            .replies
            .lock()
            .unwrap()
            .remove(0)?
            .into_iter()
            .map(|a| a.map(str::to_string))
            .collect();

        Ok(Recognition {
            answers: normalize(&raw, expected_length, options),
            confidence: 0.9,
        })
    }
}

struct Fixture {
    dir: TempDir,
    config: Config,
}

impl Fixture {
    fn new(exam_toml: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let capture_dir = dir.path().join("captures");
        std::fs::create_dir_all(&capture_dir).unwrap();
        std::fs::write(dir.path().join("exam.toml"), exam_toml).unwrap();

        let path = |name: &str| dir.path().join(name).to_string_lossy().to_string();
        let config = Config {
            exam_file: path("exam.toml"),
            capture_dir: path("captures"),
            export_dir: path("exports"),
            output_log_file: path("output.txt"),
            ..Config::default()
        };

        Self { dir, config }
    }

    fn write_frame(&self, name: &str) -> PathBuf {
        let path = Path::new(&self.config.capture_dir).join(name);
        image::RgbImage::from_pixel(16, 16, image::Rgb([250, 250, 250]))
            .save(&path)
            .unwrap();
        path
    }

    fn app(&self, recognizer: Arc<ScriptedRecognizer>) -> App {
        App::new(
            self.config.clone(),
            ScanFlow::with_recognizer(recognizer, AnswerOptions::default()),
        )
    }
}

const EXAM_TOML: &str = r#"
subject = "วิทยาศาสตร์"
total_questions = 3
answer_key = ["ก", "ข", "ค"]
students = """
1, สมชาย
2, สมหญิง
"""
"#;

fn scores(app: &App) -> Vec<usize> {
    app.controller()
        .session()
        .map(|s| s.results().iter().map(|r| r.score).collect())
        .unwrap_or_default()
}

#[tokio::test]
async fn test_full_grading_session() {
    let _ = tracing_subscriber::fmt::try_init();

    let fixture = Fixture::new(EXAM_TOML);
    let first = fixture.write_frame("sheet_1.png");
    let recognizer = ScriptedRecognizer::new(vec![
        Ok(vec![Some("ก"), Some("ข"), Some("ง")]),
        Ok(vec![Some("ก"), Some("ข"), Some("ค")]),
        Ok(vec![None, Some("ข"), Some("x")]),
    ]);
    let mut app = fixture.app(recognizer.clone());

    // Setup → Scanning
    assert_eq!(app.handle_input("").await, Step::Continue);
    assert_eq!(app.controller().phase(), Phase::Scanning);

    // 第一次扫描后重新扫描
    app.handle_input("").await;
    assert_eq!(app.controller().phase(), Phase::Review);
    app.handle_input("r").await;
    assert_eq!(app.controller().phase(), Phase::Scanning);
    assert!(scores(&app).is_empty());

    // 再次扫描并确认
    app.handle_input("").await;
    app.handle_input("y").await;
    assert_eq!(app.controller().phase(), Phase::Scanning);
    assert_eq!(app.controller().session().unwrap().current_index(), 1);

    // 第二位学生：指定图片路径
    app.handle_input(first.to_str().unwrap()).await;
    assert_eq!(app.controller().phase(), Phase::Review);
    app.handle_input("y").await;
    assert_eq!(app.controller().phase(), Phase::Completed);

    assert_eq!(scores(&app), vec![3, 1]);
    assert_eq!(recognizer.calls(), 3);
    let session = app.controller().session().unwrap();
    assert_eq!(session.results().len(), session.config().students().len());
    assert_eq!(session.results()[1].detected_answers, vec!["", "ข", ""]);

    // 导出
    app.handle_input("e").await;
    let exported = app.last_export().expect("应已导出").to_path_buf();
    assert!(exported.exists());
    assert_eq!(
        exported.file_name().unwrap().to_string_lossy(),
        "ผลสอบ_วิทยาศาสตร์.xlsx"
    );

    let log = std::fs::read_to_string(fixture.dir.path().join("output.txt")).unwrap();
    assert!(log.contains("已确认: 2/2"));

    // 重新开始
    app.handle_input("n").await;
    assert_eq!(app.controller().phase(), Phase::Setup);
    assert!(app.controller().session().is_none());
    assert!(app.last_export().is_none());

    assert_eq!(app.handle_input("q").await, Step::Quit);
}

#[tokio::test]
async fn test_previous_students_photo_is_not_reused() {
    let fixture = Fixture::new(EXAM_TOML);
    let first = fixture.write_frame("sheet_1.png");
    let recognizer = ScriptedRecognizer::new(vec![
        Ok(vec![Some("ก"), Some("ข"), Some("ค")]),
        Ok(vec![Some("ก"), None, None]),
    ]);
    let mut app = fixture.app(recognizer.clone());
    app.handle_input("").await;

    app.handle_input("").await;
    app.handle_input("y").await;
    assert_eq!(app.controller().session().unwrap().current_index(), 1);

    // 没有拍新照片，最新图片仍是上一位学生的
    app.handle_input("").await;
    assert_eq!(app.controller().phase(), Phase::Scanning);
    assert_eq!(recognizer.calls(), 1);

    std::fs::remove_file(&first).unwrap();
    fixture.write_frame("sheet_2.png");
    app.handle_input("").await;
    assert_eq!(app.controller().phase(), Phase::Review);
    assert_eq!(app.controller().session().unwrap().pending().unwrap().score, 1);
    assert_eq!(recognizer.calls(), 2);
}

#[tokio::test]
async fn test_invalid_setup_stays_until_file_fixed() {
    let fixture = Fixture::new(
        r#"
subject = "คณิตศาสตร์"
total_questions = 2
answer_key = ["ก", "ข"]
students = " , "
"#,
    );
    let mut app = fixture.app(ScriptedRecognizer::new(vec![]));

    app.handle_input("").await;
    assert_eq!(app.controller().phase(), Phase::Setup);

    std::fs::write(&fixture.config.exam_file, EXAM_TOML).unwrap();
    app.handle_input("").await;
    assert_eq!(app.controller().phase(), Phase::Scanning);
    assert_eq!(
        app.controller().session().unwrap().config().subject(),
        "วิทยาศาสตร์"
    );
}

#[tokio::test]
async fn test_ocr_failure_keeps_student_and_retry_succeeds() {
    let fixture = Fixture::new(EXAM_TOML);
    fixture.write_frame("sheet.png");
    let recognizer = ScriptedRecognizer::new(vec![
        Err(OcrError::new(OcrErrorKind::TransientError, "503 unavailable")),
        Ok(vec![Some("ก"); 3]),
    ]);
    let mut app = fixture.app(recognizer.clone());
    app.handle_input("").await;

    app.handle_input("").await;
    let session = app.controller().session().unwrap();
    assert_eq!(session.phase(), Phase::Scanning);
    assert_eq!(session.current_index(), 0);
    assert_eq!(
        session.last_error().map(|e| e.kind),
        Some(OcrErrorKind::TransientError)
    );

    app.handle_input("").await;
    assert_eq!(app.controller().phase(), Phase::Review);
    assert_eq!(app.controller().session().unwrap().pending().unwrap().score, 1);
    assert_eq!(recognizer.calls(), 2);
}

#[tokio::test]
async fn test_capture_reacquired_after_directory_appears() {
    let fixture = Fixture::new(EXAM_TOML);
    std::fs::remove_dir_all(&fixture.config.capture_dir).unwrap();
    let recognizer = ScriptedRecognizer::new(vec![Ok(vec![Some("ก"), Some("ข"), Some("ค")])]);
    let mut app = fixture.app(recognizer.clone());
    assert!(!app.has_capture());

    app.handle_input("").await;
    app.handle_input("").await;
    assert_eq!(app.controller().phase(), Phase::Scanning);
    assert_eq!(recognizer.calls(), 0);

    std::fs::create_dir_all(&fixture.config.capture_dir).unwrap();
    fixture.write_frame("sheet.png");
    app.handle_input("").await;
    assert!(app.has_capture());
    assert_eq!(app.controller().phase(), Phase::Review);
    assert_eq!(app.controller().session().unwrap().pending().unwrap().score, 3);
}
