pub mod exam;
pub mod loaders;

pub use exam::{
    AnswerOptions, ExamConfig, ExamResult, Phase, Recognition, ScanOutcome, Student,
};
pub use loaders::{load_exam_setup, ExamSetupFile};
