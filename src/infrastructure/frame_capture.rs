//! 画面采集器 - 基础设施层
//!
//! 持有唯一的"摄像头"资源（拍摄目录），只暴露"拍一张静态画面"的能力

use base64::{engine::general_purpose, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, info};

use crate::error::ResourceError;

const FRAME_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "bmp", "webp"];

/// 画面采集器
///
/// 职责：
/// - 每个会话打开一次，在所有学生之间复用
/// - 读取静态画面并以固定质量编码为 JPEG
/// - 不认识学生 / 答案
pub struct FrameCapture {
    dir: PathBuf,
    jpeg_quality: u8,
}

impl FrameCapture {
    /// 打开拍摄目录
    ///
    /// 目录不存在或不可读时返回 `ResourceError::Unavailable`
    pub fn open(dir: impl AsRef<Path>, jpeg_quality: u8) -> Result<Self, ResourceError> {
        let dir = dir.as_ref();
        let dir_display = dir.display().to_string();

        if !dir.is_dir() {
            return Err(ResourceError::unavailable(dir_display, "目录不存在"));
        }
        std::fs::read_dir(dir).map_err(|e| ResourceError::unavailable(&dir_display, e.to_string()))?;

        info!("📷 拍摄目录已就绪: {}", dir_display);

        Ok(Self {
            dir: dir.to_path_buf(),
            jpeg_quality: jpeg_quality.clamp(1, 100),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn jpeg_quality(&self) -> u8 {
        self.jpeg_quality
    }

    /// 找到目录中最新的一张图片
    ///
    /// 修改时间相同时取文件名最大的一张
    pub fn latest_frame_path(&self) -> Result<PathBuf, ResourceError> {
        let dir_display = self.dir.display().to_string();
        let entries =
            std::fs::read_dir(&self.dir).map_err(|e| ResourceError::unavailable(&dir_display, e.to_string()))?;

        let mut latest: Option<(SystemTime, PathBuf)> = None;
        for entry in entries.flatten() {
            let path = entry.path();
            if !is_frame_file(&path) {
                continue;
            }
            let modified = entry
                .metadata()
                .and_then(|m| m.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            // 修改时间相同时按文件名取较大者
            let newer = match &latest {
                Some((time, latest_path)) => (modified, &path) > (*time, latest_path),
                None => true,
            };
            if newer {
                latest = Some((modified, path));
            }
        }

        latest
            .map(|(_, path)| path)
            .ok_or_else(|| ResourceError::unavailable(dir_display, "目录中没有图片"))
    }

    /// 拍摄一张静态画面
    ///
    /// 未指定路径时使用目录中最新的图片
    pub async fn capture(&self, path: Option<&Path>) -> Result<CapturedFrame, ResourceError> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => self.latest_frame_path()?,
        };
        let path_display = path.display().to_string();

        let modified = tokio::fs::metadata(&path)
            .await
            .and_then(|m| m.modified())
            .ok();

        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| ResourceError::unavailable(&path_display, e.to_string()))?;

        let image = image::load_from_memory(&bytes).map_err(|source| ResourceError::ImageFailed {
            path: path_display.clone(),
            source,
        })?;

        let frame = CapturedFrame::encode(&image, self.jpeg_quality).map_err(|source| {
            ResourceError::ImageFailed {
                path: path_display.clone(),
                source,
            }
        })?;

        debug!(
            "拍摄画面: {} ({}x{}, JPEG {} 字节)",
            path_display,
            frame.width,
            frame.height,
            frame.jpeg.len()
        );

        Ok(frame.with_source(path, modified))
    }
}

/// 已编码的静态画面
#[derive(Debug, Clone)]
pub struct CapturedFrame {
    pub source: Option<PathBuf>,
    pub modified: Option<SystemTime>,
    pub jpeg: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl CapturedFrame {
    /// 以固定质量编码为 JPEG
    pub fn encode(image: &DynamicImage, quality: u8) -> Result<Self, image::ImageError> {
        let rgb_image = image.to_rgb8();
        let (width, height) = rgb_image.dimensions();

        let mut jpeg = Vec::new();
        {
            let mut encoder = JpegEncoder::new_with_quality(&mut jpeg, quality);
            encoder.encode(rgb_image.as_raw(), width, height, image::ColorType::Rgb8)?;
        }

        Ok(Self {
            source: None,
            modified: None,
            jpeg,
            width,
            height,
        })
    }

    fn with_source(mut self, source: PathBuf, modified: Option<SystemTime>) -> Self {
        self.source = Some(source);
        self.modified = modified;
        self
    }

    /// 来源文件及其修改时间，用于判断是否为同一张照片
    pub fn stamp(&self) -> Option<(PathBuf, SystemTime)> {
        Some((self.source.clone()?, self.modified?))
    }

    /// Base64 编码后的 JPEG 数据
    pub fn to_base64(&self) -> String {
        general_purpose::STANDARD.encode(&self.jpeg)
    }

    /// `data:image/jpeg;base64,...` 形式，用于 Vision API
    pub fn to_data_url(&self) -> String {
        format!("data:image/jpeg;base64,{}", self.to_base64())
    }
}

fn is_frame_file(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| FRAME_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
            .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn write_png(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        let image = RgbImage::from_pixel(8, 6, Rgb([200, 10, 10]));
        image.save(&path).unwrap();
        path
    }

    #[test]
    fn test_open_missing_dir() {
        let result = FrameCapture::open("/nonexistent/captures", 92);
        assert!(matches!(result, Err(ResourceError::Unavailable { .. })));
    }

    #[test]
    fn test_latest_frame_requires_an_image() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.txt"), "not an image").unwrap();
        let capture = FrameCapture::open(dir.path(), 92).unwrap();
        assert!(matches!(
            capture.latest_frame_path(),
            Err(ResourceError::Unavailable { .. })
        ));
    }

    #[tokio::test]
    async fn test_capture_encodes_jpeg() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), "sheet.png");
        let capture = FrameCapture::open(dir.path(), 92).unwrap();

        let frame = capture.capture(None).await.unwrap();
        assert_eq!(frame.source.as_deref(), Some(path.as_path()));
        assert_eq!(frame.stamp().map(|(p, _)| p), Some(path.clone()));
        assert_eq!((frame.width, frame.height), (8, 6));
        // JPEG SOI 标记
        assert_eq!(&frame.jpeg[..2], &[0xFF, 0xD8]);
        assert!(frame.to_data_url().starts_with("data:image/jpeg;base64,/9j/"));
    }

    #[tokio::test]
    async fn test_capture_rejects_corrupt_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.jpg");
        std::fs::write(&path, b"definitely not a jpeg").unwrap();
        let capture = FrameCapture::open(dir.path(), 92).unwrap();

        let result = capture.capture(Some(&path)).await;
        assert!(matches!(result, Err(ResourceError::ImageFailed { .. })));
    }

    #[test]
    fn test_quality_is_clamped() {
        let dir = tempfile::tempdir().unwrap();
        let capture = FrameCapture::open(dir.path(), 0).unwrap();
        assert_eq!(capture.jpeg_quality(), 1);
    }
}
