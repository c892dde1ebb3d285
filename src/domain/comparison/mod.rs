//! Comparison module - agent reply schema and the derived comparison context.

mod context;
mod reply;

pub use context::{
    is_expired, metadata_snapshot, BestChoiceSummary, ComparisonContext, RowSummary,
    COMPARISON_DATA_KEY, EXPIRY_GRACE_HOURS, REPLY_JSON_KEY,
};
pub use reply::{
    headline, parse_amount, parse_day, AgentReply, BestChoice, Evaluation, ReplyParseError,
    ReplyStatus, TableRow, EVALUATION_REPLY_TYPE,
};
