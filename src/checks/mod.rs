pub mod llm_check;
pub mod message_check;
pub mod payload_check;
pub mod pdf_check;
pub mod report;
