use crate::models::AnswerOptions;

/// 程序配置
#[derive(Clone, Debug)]
pub struct Config {
    /// 考试设置文件（TOML）
    pub exam_file: String,
    /// 拍摄图片存放目录（相当于摄像头）
    pub capture_dir: String,
    /// 导出 Excel 的目录
    pub export_dir: String,
    /// 有效的作答选项
    pub answer_options: AnswerOptions,
    /// JPEG 编码质量 (1-100)
    pub jpeg_quality: u8,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 输出日志文件
    pub output_log_file: String,
    // --- OCR (LLM Vision) 配置 ---
    pub ocr_api_key: String,
    pub ocr_api_base_url: String,
    pub ocr_model_name: String,
    pub ocr_temperature: f32,
    pub ocr_max_tokens: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            exam_file: "exam.toml".to_string(),
            capture_dir: "captures".to_string(),
            export_dir: "exports".to_string(),
            answer_options: AnswerOptions::default(),
            jpeg_quality: 92,
            verbose_logging: false,
            output_log_file: "output.txt".to_string(),
            ocr_api_key: String::new(),
            ocr_api_base_url: "https://generativelanguage.googleapis.com/v1beta/openai".to_string(),
            ocr_model_name: "gemini-3-flash-preview".to_string(),
            ocr_temperature: 0.1,
            ocr_max_tokens: 2048,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            exam_file: std::env::var("EXAM_FILE").unwrap_or(default.exam_file),
            capture_dir: std::env::var("CAPTURE_DIR").unwrap_or(default.capture_dir),
            export_dir: std::env::var("EXPORT_DIR").unwrap_or(default.export_dir),
            answer_options: std::env::var("ANSWER_OPTIONS").ok().and_then(|v| AnswerOptions::parse_list(&v)).unwrap_or(default.answer_options),
            jpeg_quality: std::env::var("JPEG_QUALITY").ok().and_then(|v| v.parse().ok()).map(|q: u8| q.clamp(1, 100)).unwrap_or(default.jpeg_quality),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(default.verbose_logging),
            output_log_file: std::env::var("OUTPUT_LOG_FILE").unwrap_or(default.output_log_file),
            ocr_api_key: std::env::var("OCR_API_KEY").or_else(|_| std::env::var("API_KEY")).unwrap_or(default.ocr_api_key),
            ocr_api_base_url: std::env::var("OCR_API_BASE_URL").unwrap_or(default.ocr_api_base_url),
            ocr_model_name: std::env::var("OCR_MODEL_NAME").unwrap_or(default.ocr_model_name),
            ocr_temperature: std::env::var("OCR_TEMPERATURE").ok().and_then(|v| v.parse().ok()).unwrap_or(default.ocr_temperature),
            ocr_max_tokens: std::env::var("OCR_MAX_TOKENS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.ocr_max_tokens),
        }
    }
}
