pub mod controller;
pub mod scan_flow;
pub mod session;
pub mod setup_form;

pub use controller::{Controller, Stage};
pub use scan_flow::ScanFlow;
pub use session::{History, ScanRequest, Session};
pub use setup_form::SetupForm;
