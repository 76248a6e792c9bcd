//! Message classification
//!
//! Maps raw Codex JSON events onto [`crate::types::Message`] variants.

mod parser;

pub use parser::{
    default_final_event_predicate, extract_session_id, extract_text, parse_message, raw_type,
    ERROR_TYPES, FINAL_STATUSES, FINAL_TYPES, ITEM_MESSAGE_TYPES, ITEM_TOOL_TYPES, LOG_TOKENS,
};
