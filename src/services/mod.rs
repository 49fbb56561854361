pub mod export_service;
pub mod ocr_service;

pub use export_service::ResultExporter;
pub use ocr_service::{AnswerRecognizer, OcrService};
