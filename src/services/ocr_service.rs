//! OCR 服务 - 业务能力层
//!
//! 只负责"从答题卡照片中识别作答"能力，不关心流程
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 调用 Vision API
//! - 默认使用 Gemini 的 OpenAI 兼容端点，可通过配置替换
//! - 返回内容严格按 `{"detectedAnswers": [...], "confidence": 0.0}` 解码

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestMessageContentPartImage,
        ChatCompletionRequestMessageContentPartText, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, ChatCompletionRequestUserMessageContent,
        ChatCompletionRequestUserMessageContentPart, CreateChatCompletionRequestArgs, ImageDetail,
        ImageUrl,
    },
    Client,
};
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{OcrError, OcrErrorKind};
use crate::grading::normalize;
use crate::infrastructure::CapturedFrame;
use crate::models::{AnswerOptions, Recognition};
use crate::utils::truncate_text;

/// 作答识别能力
///
/// 每次调用都是独立请求：不缓存、不去重、不自动重试
#[async_trait]
pub trait AnswerRecognizer: Send + Sync {
    async fn recognize(
        &self,
        frame: &CapturedFrame,
        expected_length: usize,
        options: &AnswerOptions,
    ) -> Result<Recognition, OcrError>;
}

/// OCR 服务
///
/// 职责：
/// - 构建请求（图片 + 提示词 + 期望的返回结构）
/// - 严格解码返回内容并规范化
/// - 对失败进行分类
pub struct OcrService {
    client: Client<OpenAIConfig>,
    model_name: String,
    has_credential: bool,
    temperature: f32,
    max_tokens: u32,
}

impl OcrService {
    /// 创建新的 OCR 服务
    pub fn new(config: &Config) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.ocr_api_key)
            .with_api_base(&config.ocr_api_base_url);

        Self {
            client: Client::with_config(openai_config),
            model_name: config.ocr_model_name.clone(),
            has_credential: !config.ocr_api_key.trim().is_empty(),
            temperature: config.ocr_temperature,
            max_tokens: config.ocr_max_tokens,
        }
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// 发送一次 Vision 请求，返回原始文本
    async fn send_vision_request(
        &self,
        prompt: &str,
        system_message: &str,
        image_url: String,
    ) -> Result<String, OcrError> {
        debug!("调用 OCR API，模型: {}", self.model_name);
        debug!("提示词长度: {} 字符", prompt.len());

        let system_msg = ChatCompletionRequestSystemMessageArgs::default()
            .content(system_message)
            .build()
            .map_err(request_build_failed)?;

        let content_parts = vec![
            ChatCompletionRequestUserMessageContentPart::Text(
                ChatCompletionRequestMessageContentPartText {
                    text: prompt.to_string(),
                },
            ),
            ChatCompletionRequestUserMessageContentPart::ImageUrl(
                ChatCompletionRequestMessageContentPartImage {
                    image_url: ImageUrl {
                        url: image_url,
                        detail: Some(ImageDetail::High),
                    },
                },
            ),
        ];

        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(ChatCompletionRequestUserMessageContent::Array(content_parts))
            .build()
            .map_err(request_build_failed)?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(vec![
                ChatCompletionRequestMessage::System(system_msg),
                ChatCompletionRequestMessage::User(user_msg),
            ])
            .temperature(self.temperature)
            .max_tokens(self.max_tokens)
            .build()
            .map_err(request_build_failed)?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            let message = e.to_string();
            let kind = classify_failure(&message);
            warn!("OCR API 调用失败 ({}): {}", kind, message);
            OcrError::new(kind, format!("OCR API 调用失败: {}", message))
        })?;

        debug!("OCR API 调用成功");

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| OcrError::empty(&self.model_name))?;

        if content.trim().is_empty() {
            return Err(OcrError::empty(&self.model_name));
        }

        debug!("OCR 原始返回: {}", truncate_text(content.trim(), 200));

        Ok(content.trim().to_string())
    }
}

#[async_trait]
impl AnswerRecognizer for OcrService {
    async fn recognize(
        &self,
        frame: &CapturedFrame,
        expected_length: usize,
        options: &AnswerOptions,
    ) -> Result<Recognition, OcrError> {
        if !self.has_credential {
            return Err(OcrError::missing_credential());
        }

        let prompt = build_prompt(expected_length, options);
        let response = self
            .send_vision_request(&prompt, SYSTEM_MESSAGE, frame.to_data_url())
            .await?;

        let recognition = decode_reply(&response, expected_length, options)?;

        debug!(
            "识别完成: {} 题, 置信度 {:.2}",
            recognition.answers.len(),
            recognition.confidence
        );

        Ok(recognition)
    }
}

const SYSTEM_MESSAGE: &str = "你是一个专业的答题卡识别助手，擅长识别手写或涂写的泰文选项字母。\
                              你只返回 JSON，不返回任何解释。";

/// 构建识别提示词
pub fn build_prompt(expected_length: usize, options: &AnswerOptions) -> String {
    format!(
        r#"Analyze this exam paper image. Extract the student's selected answers for {total} questions.
The student marks the answers using Thai characters: {options}.
If a question is skipped or the mark is unclear, return null for that answer.
Focus on finding question numbers 1 to {total} and their corresponding marks.
Ensure accuracy in OCR for Thai characters like {options}.

Return ONLY a JSON object with exactly this shape:
{{"detectedAnswers": [<{total} items, each one of {options} or null, in question order>], "confidence": <number between 0 and 1>}}"#,
        total = expected_length,
        options = options.joined(),
    )
}

/// 原始返回结构
#[derive(Debug, Deserialize)]
struct RawReply {
    #[serde(rename = "detectedAnswers")]
    detected_answers: Vec<Option<String>>,
    confidence: f64,
}

fn status_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\b(401|403)\b").expect("valid status pattern"))
}

/// 从夹杂说明文字的返回中找出第一个能完整解码的对象
///
/// 依次从每个 `{` 开始流式解码，只取紧接着的一个值，后面的文字不影响结果
fn first_embedded_reply(text: &str) -> Option<RawReply> {
    text.match_indices('{').find_map(|(start, _)| {
        serde_json::Deserializer::from_str(&text[start..])
            .into_iter::<RawReply>()
            .next()?
            .ok()
    })
}

/// 严格解码 OCR 返回内容
///
/// 先按完整 JSON 解析；失败时只尝试一次：提取第一个完整的 `{ ... }` 对象再解析。
/// 成功后经过规范化，长度一定等于 `expected_length`。
pub fn decode_reply(
    text: &str,
    expected_length: usize,
    options: &AnswerOptions,
) -> Result<Recognition, OcrError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(OcrError::new(OcrErrorKind::EmptyResponse, "OCR 返回内容为空"));
    }

    let raw = match serde_json::from_str::<RawReply>(text) {
        Ok(raw) => raw,
        Err(first_error) => {
            if !text.contains('{') {
                return Err(OcrError::malformed(format!("返回内容不是 JSON: {}", first_error)));
            }
            let raw = first_embedded_reply(text).ok_or_else(|| {
                OcrError::malformed(format!("返回结构不符合预期: {}", first_error))
            })?;
            debug!("从返回文本中提取到 JSON 对象");
            raw
        }
    };

    if raw.detected_answers.len() != expected_length {
        warn!(
            "OCR 返回 {} 个答案，期望 {} 个，已对齐",
            raw.detected_answers.len(),
            expected_length
        );
    }

    Ok(Recognition {
        answers: normalize(&raw.detected_answers, expected_length, options),
        confidence: raw.confidence.clamp(0.0, 1.0),
    })
}

/// 根据错误信息对 API 失败分类
pub fn classify_failure(message: &str) -> OcrErrorKind {
    let lower = message.to_lowercase();
    let denied_markers = [
        "unauthorized",
        "forbidden",
        "permission",
        "api key not valid",
        "invalid api key",
        "incorrect api key",
        "api_key_invalid",
    ];

    if status_pattern().is_match(&lower) || denied_markers.iter().any(|marker| lower.contains(marker)) {
        OcrErrorKind::PermissionDenied
    } else {
        OcrErrorKind::TransientError
    }
}

fn request_build_failed(e: impl std::fmt::Display) -> OcrError {
    OcrError::new(OcrErrorKind::TransientError, format!("构建 OCR 请求失败: {}", e))
}
