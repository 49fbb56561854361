pub mod frame_capture;

pub use frame_capture::{CapturedFrame, FrameCapture};
