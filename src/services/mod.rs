pub mod extraction_service;
pub mod grading_service;
pub mod speech_service;

pub use extraction_service::ExtractionService;
pub use grading_service::{grade, GradeReport};
pub use speech_service::{CommandSpeech, NoSpeech, SpeechSynthesizer, SPANISH_LOCALE};
