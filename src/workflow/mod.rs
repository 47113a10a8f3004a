pub mod chat_flow;
pub mod evaluator;

pub use chat_flow::{ChatFlow, TurnOutcome, TurnStatus, CONNECTION_ERROR_REPLY, VISION_PROMPT};
pub use evaluator::{EvaluatorSession, IngestReport};
