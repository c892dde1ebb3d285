//! User-facing copy in the supported languages.

use serde::{Deserialize, Serialize};

use crate::domain::comparison::Evaluation;
use crate::domain::foundation::ErrorCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Zh,
}

impl Locale {
    /// Transient placeholder while the agent is still working.
    pub fn still_processing(&self) -> &'static str {
        match self {
            Locale::En => "Still comparing prices across platforms. This can take a few minutes, please wait...",
            Locale::Zh => "正在对比各平台价格，可能需要几分钟，请稍候……",
        }
    }

    /// Advisory notice shown on the first retry.
    pub fn retrying(&self) -> &'static str {
        match self {
            Locale::En => "The pricing service is busy. Processing, please wait...",
            Locale::Zh => "服务繁忙，正在处理中，请稍候……",
        }
    }

    pub fn no_rates_found(&self, hotel_name: &str) -> String {
        match self {
            Locale::En if hotel_name.is_empty() => {
                "No rates were found for these dates. Try different dates or check the hotel name.".to_string()
            }
            Locale::En => format!(
                "No rates were found for {hotel_name} on these dates. Try different dates or check the hotel name."
            ),
            Locale::Zh if hotel_name.is_empty() => "未找到这些日期的价格，请尝试其他日期或检查酒店名称。".to_string(),
            Locale::Zh => format!("未找到 {hotel_name} 在这些日期的价格，请尝试其他日期或检查酒店名称。"),
        }
    }

    pub fn deep_analysis_heading(&self) -> &'static str {
        match self {
            Locale::En => "Deep analysis",
            Locale::Zh => "深度分析",
        }
    }

    /// One-line summary announcing a comparison result.
    pub fn comparison_summary(&self, evaluation: &Evaluation) -> String {
        let rows = evaluation.table_rows.len();
        match (self, &evaluation.best_choice) {
            (Locale::En, Some(best)) => format!(
                "Compared {rows} offer(s) for {}. Best choice: {}.",
                evaluation.hotel_name, best.platform
            ),
            (Locale::En, None) => format!("Compared {rows} offer(s) for {}.", evaluation.hotel_name),
            (Locale::Zh, Some(best)) => format!(
                "已对比 {} 的 {rows} 个报价，推荐：{}。",
                evaluation.hotel_name, best.platform
            ),
            (Locale::Zh, None) => format!("已对比 {} 的 {rows} 个报价。", evaluation.hotel_name),
        }
    }

    /// Failure text for an error that ended an agent exchange.
    pub fn failure(&self, code: ErrorCode) -> &'static str {
        match (self, code) {
            (Locale::En, ErrorCode::ValidationFailed) => {
                "Please enter a hotel name and valid stay dates first."
            }
            (Locale::En, ErrorCode::Timeout) => {
                "The price comparison took too long and was stopped. Please try again."
            }
            (Locale::En, ErrorCode::NetworkError | ErrorCode::ServiceBusy) => {
                "Could not reach the pricing service. Please check your connection and try again."
            }
            (Locale::En, ErrorCode::ParseError) => {
                "The pricing service returned a result I could not read. Please try again."
            }
            (Locale::En, ErrorCode::Unauthorized) => "Your session has expired. Please sign in again.",
            (Locale::En, ErrorCode::Forbidden) => "You do not have access to this conversation.",
            (Locale::En, ErrorCode::ThreadNotFound) => "This conversation no longer exists.",
            (Locale::En, ErrorCode::StorageError) => "Something went wrong saving this conversation.",
            (Locale::Zh, ErrorCode::ValidationFailed) => "请先输入酒店名称和有效的入住日期。",
            (Locale::Zh, ErrorCode::Timeout) => "价格对比耗时过长，已停止，请重试。",
            (Locale::Zh, ErrorCode::NetworkError | ErrorCode::ServiceBusy) => {
                "无法连接价格服务，请检查网络后重试。"
            }
            (Locale::Zh, ErrorCode::ParseError) => "价格服务返回的结果无法解析，请重试。",
            (Locale::Zh, ErrorCode::Unauthorized) => "登录已过期，请重新登录。",
            (Locale::Zh, ErrorCode::Forbidden) => "您无权访问此对话。",
            (Locale::Zh, ErrorCode::ThreadNotFound) => "该对话已不存在。",
            (Locale::Zh, ErrorCode::StorageError) => "保存对话时出错。",
        }
    }

    pub fn delete_failed(&self) -> &'static str {
        match self {
            Locale::En => "Could not delete the conversation. It has been restored.",
            Locale::Zh => "删除对话失败，已恢复。",
        }
    }

    pub fn persistence_warning(&self) -> &'static str {
        match self {
            Locale::En => "This message could not be saved and may be missing next time.",
            Locale::Zh => "此消息未能保存，下次可能无法看到。",
        }
    }
}
