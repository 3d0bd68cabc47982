pub mod binary_payload;
pub mod content_guard;
pub mod content_kind;
pub mod format_signature;
pub mod llm_client;
pub mod markup;
pub mod pdf;
