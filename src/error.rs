use thiserror::Error;

use crate::models::Phase;

/// 应用程序错误类型
///
/// 所有错误都在发生处被捕获并转换成教师可见的提示，不会导致程序崩溃
#[derive(Debug, Error)]
pub enum AppError {
    /// 设置表单校验错误
    #[error("设置校验错误: {0}")]
    Validation(#[from] ValidationError),
    /// 拍摄资源不可用
    #[error("资源错误: {0}")]
    Resource(#[from] ResourceError),
    /// OCR 服务错误
    #[error("OCR错误: {0}")]
    Ocr(#[from] OcrError),
    /// 会话状态错误
    #[error("会话错误: {0}")]
    Session(#[from] SessionError),
    /// 导出错误
    #[error("导出错误: {0}")]
    Export(#[from] ExportError),
}

impl AppError {
    /// 给教师看的提示信息
    pub fn user_message(&self) -> String {
        match self {
            AppError::Validation(e) => e.user_message().to_string(),
            AppError::Resource(e) => e.user_message().to_string(),
            AppError::Ocr(e) => e.user_message().to_string(),
            AppError::Session(e) => e.user_message(),
            AppError::Export(e) => e.user_message().to_string(),
        }
    }
}

/// 设置表单校验错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// 名单中没有任何学生
    #[error("学生名单为空")]
    EmptyRoster,
    /// 科目名称为空
    #[error("科目名称为空")]
    EmptySubject,
    /// 题目数量不是正整数
    #[error("题目数量无效: {value}")]
    InvalidQuestionCount { value: String },
}

impl ValidationError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ValidationError::EmptyRoster => "กรุณาระบุรายชื่อนักเรียนอย่างน้อย 1 คน",
            ValidationError::EmptySubject => "กรุณาระบุชื่อวิชา",
            ValidationError::InvalidQuestionCount { .. } => "กรุณาระบุจำนวนข้อสอบเป็นตัวเลขที่มากกว่า 0",
        }
    }
}

/// 拍摄资源错误
#[derive(Debug, Error)]
pub enum ResourceError {
    /// 拍摄目录或图片不可用
    #[error("拍摄资源不可用 ({path}): {reason}")]
    Unavailable { path: String, reason: String },
    /// 图片解码/编码失败
    #[error("图片处理失败 ({path}): {source}")]
    ImageFailed {
        path: String,
        #[source]
        source: image::ImageError,
    },
}

impl ResourceError {
    pub fn unavailable(path: impl Into<String>, reason: impl Into<String>) -> Self {
        ResourceError::Unavailable {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            ResourceError::Unavailable { .. } => "กรุณาอนุญาตสิทธิ์การเข้าถึงกล้อง",
            ResourceError::ImageFailed { .. } => "ไม่สามารถอ่านภาพได้ กรุณาถ่ายใหม่",
        }
    }
}

/// OCR 失败类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OcrErrorKind {
    /// 未配置 API Key
    MissingCredential,
    /// 无权限（401/403）
    PermissionDenied,
    /// 返回内容无法解析为预期结构
    MalformedResponse,
    /// 返回内容为空
    EmptyResponse,
    /// 网络、限流、服务端等临时错误
    TransientError,
}

impl OcrErrorKind {
    pub fn name(self) -> &'static str {
        match self {
            OcrErrorKind::MissingCredential => "MissingCredential",
            OcrErrorKind::PermissionDenied => "PermissionDenied",
            OcrErrorKind::MalformedResponse => "MalformedResponse",
            OcrErrorKind::EmptyResponse => "EmptyResponse",
            OcrErrorKind::TransientError => "TransientError",
        }
    }
}

impl std::fmt::Display for OcrErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// OCR 服务错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("[{kind}] {message}")]
pub struct OcrError {
    pub kind: OcrErrorKind,
    pub message: String,
}

impl OcrError {
    pub fn new(kind: OcrErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn missing_credential() -> Self {
        Self::new(OcrErrorKind::MissingCredential, "未配置 OCR API Key")
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(OcrErrorKind::MalformedResponse, message)
    }

    pub fn empty(model: &str) -> Self {
        Self::new(
            OcrErrorKind::EmptyResponse,
            format!("OCR 返回内容为空 (模型: {})", model),
        )
    }

    pub fn user_message(&self) -> &'static str {
        match self.kind {
            OcrErrorKind::MissingCredential => "ยังไม่ได้ตั้งค่า API Key สำหรับระบบ AI",
            OcrErrorKind::PermissionDenied => "ไม่มีสิทธิ์เรียกใช้บริการ AI กรุณาตรวจสอบ API Key",
            OcrErrorKind::MalformedResponse => "ไม่สามารถประมวลผลข้อมูลจากรูปภาพได้",
            OcrErrorKind::EmptyResponse => "AI ไม่ส่งผลลัพธ์กลับมา กรุณาลองใหม่",
            OcrErrorKind::TransientError => "การสแกนล้มเหลว กรุณาลองใหม่",
        }
    }
}

/// 会话状态错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// 当前阶段不允许该操作
    #[error("阶段 {phase} 不允许操作: {action}")]
    InvalidTransition { phase: Phase, action: &'static str },
    /// 已有扫描请求正在进行
    #[error("已有扫描请求正在进行")]
    ScanInFlight,
    /// 扫描失败，会话保持在 Scanning
    #[error("扫描失败: {0}")]
    Ocr(#[from] OcrError),
}

impl SessionError {
    pub fn user_message(&self) -> String {
        match self {
            SessionError::InvalidTransition { .. } => "ไม่สามารถทำรายการนี้ได้ในขั้นตอนปัจจุบัน".to_string(),
            SessionError::ScanInFlight => "AI กำลังประมวลผล...".to_string(),
            SessionError::Ocr(e) => e.user_message().to_string(),
        }
    }
}

/// 导出错误
#[derive(Debug, Error)]
pub enum ExportError {
    /// 没有可导出的结果
    #[error("没有可导出的结果")]
    NoResults,
    /// 生成 XLSX 失败
    #[error("生成 XLSX 失败: {0}")]
    Spreadsheet(String),
    /// 写入文件失败
    #[error("写入文件失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl ExportError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ExportError::NoResults => "ยังไม่มีข้อมูลการตรวจ",
            ExportError::Spreadsheet(_) | ExportError::WriteFailed { .. } => "ส่งออกไฟล์ Excel ไม่สำเร็จ",
        }
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
