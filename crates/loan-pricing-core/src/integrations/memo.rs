//! Loan committee memo drafting interface.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use crate::pricing::{pricing_text, LoanRecord};

pub const MEMO_SYSTEM_PROMPT: &str = "Generate a memo for the executive loan committee.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    fn new(role: Role, content: impl Into<String>) -> Self {
        ChatMessage {
            role,
            content: content.into(),
        }
    }
}

/// Up to three text blocks for the drafter. Pricing is mandatory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marketing_presentation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub term_sheet: Option<String>,
    pub pricing: String,
}

impl MemoRequest {
    pub fn new(pricing: impl Into<String>) -> Self {
        MemoRequest {
            pricing: pricing.into(),
            ..Default::default()
        }
    }

    /// Pricing block for a single loan: its detail rows, one per line.
    pub fn for_loan(record: &LoanRecord) -> Self {
        Self::new(pricing_text(record))
    }

    /// Pricing block for several loans, each headed by its `Loan N` title.
    pub fn for_loans(records: &[LoanRecord]) -> Self {
        let pricing = match records {
            [single] => pricing_text(single),
            many => many
                .iter()
                .enumerate()
                .map(|(i, r)| format!("Loan {}\n{}", i + 1, pricing_text(r)))
                .collect::<Vec<_>>()
                .join("\n\n"),
        };
        Self::new(pricing)
    }

    pub fn with_marketing_presentation(mut self, text: impl Into<String>) -> Self {
        self.marketing_presentation = Some(text.into());
        self
    }

    pub fn with_term_sheet(mut self, text: impl Into<String>) -> Self {
        self.term_sheet = Some(text.into());
        self
    }

    pub fn validate(&self) -> Result<(), MemoDraftError> {
        if self.pricing.trim().is_empty() {
            return Err(MemoDraftError::InvalidRequest(
                "pricing details are required".into(),
            ));
        }
        Ok(())
    }

    /// System instruction followed by one user message per non-empty block.
    pub fn messages(&self) -> Vec<ChatMessage> {
        let blocks = [
            ("Marketing Presentation", self.marketing_presentation.as_deref()),
            ("Term Sheet", self.term_sheet.as_deref()),
            ("Pricing Details", Some(self.pricing.as_str())),
        ];
        std::iter::once(ChatMessage::new(Role::System, MEMO_SYSTEM_PROMPT))
            .chain(blocks.into_iter().filter_map(|(title, text)| {
                let text = text.filter(|t| !t.trim().is_empty())?;
                Some(ChatMessage::new(Role::User, format!("{title}: {text}")))
            }))
            .collect()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MemoDraftError {
    #[error("Invalid memo request: {0}")]
    InvalidRequest(String),

    #[error("Memo service rate limited{}", retry_hint(.retry_after))]
    RateLimited { retry_after: Option<Duration> },

    #[error("Memo service error: {0}")]
    ServiceError(String),

    #[error("Unknown memo drafting error: {0}")]
    Unknown(String),
}

fn retry_hint(retry_after: &Option<Duration>) -> String {
    match retry_after {
        Some(d) => format!(", retry after {}s", d.as_secs()),
        None => String::new(),
    }
}

/// An LLM backend that turns a [`MemoRequest`] into memo text.
pub trait MemoDrafter {
    fn draft(&self, request: &MemoRequest) -> Result<String, MemoDraftError>;
}

/// Validate the request, then hand it to the drafter. Never retries.
pub fn draft_memo<D>(drafter: &D, request: &MemoRequest) -> Result<String, MemoDraftError>
where
    D: MemoDrafter + ?Sized,
{
    request.validate()?;
    match drafter.draft(request) {
        Ok(memo) => {
            info!(chars = memo.len(), "memo drafted");
            Ok(memo)
        }
        Err(e) => {
            warn!(error = %e, "memo drafting failed");
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;
    use std::cell::RefCell;

    struct EchoDrafter {
        seen: RefCell<Vec<ChatMessage>>,
    }

    impl MemoDrafter for EchoDrafter {
        fn draft(&self, request: &MemoRequest) -> Result<String, MemoDraftError> {
            let messages = request.messages();
            let memo = format!("MEMO ({} inputs)", messages.len() - 1);
            *self.seen.borrow_mut() = messages;
            Ok(memo)
        }
    }

    struct BusyDrafter;

    impl MemoDrafter for BusyDrafter {
        fn draft(&self, _: &MemoRequest) -> Result<String, MemoDraftError> {
            Err(MemoDraftError::RateLimited {
                retry_after: Some(Duration::from_secs(20)),
            })
        }
    }

    #[test]
    fn test_messages_all_blocks() {
        let request = MemoRequest::new("SPREAD (%): 1.00")
            .with_marketing_presentation("Dairy cooperative, 40 years")
            .with_term_sheet("Term Loan, 5 years");
        let messages = request.messages();
        assert_eq!(
            messages,
            vec![
                ChatMessage::new(Role::System, MEMO_SYSTEM_PROMPT),
                ChatMessage::new(Role::User, "Marketing Presentation: Dairy cooperative, 40 years"),
                ChatMessage::new(Role::User, "Term Sheet: Term Loan, 5 years"),
                ChatMessage::new(Role::User, "Pricing Details: SPREAD (%): 1.00"),
            ]
        );
    }

    #[test]
    fn test_empty_blocks_omitted() {
        let request = MemoRequest::new("x").with_term_sheet("   ");
        assert_eq!(request.messages().len(), 2);
    }

    #[test]
    fn test_pricing_block_is_detail_view() {
        let loan = LoanRecord {
            spread_pct: dec!(1.5),
            ..LoanRecord::default()
        };
        let request = MemoRequest::for_loan(&loan);
        assert_eq!(request.pricing, pricing_text(&loan));
        assert_eq!(request.pricing.lines().count(), 16);
    }

    #[test]
    fn test_multiple_loans_headed() {
        let request = MemoRequest::for_loans(&[LoanRecord::default(), LoanRecord::default()]);
        assert!(request.pricing.starts_with("Loan 1\nLoan Type: "));
        assert!(request.pricing.contains("\n\nLoan 2\n"));
    }

    #[test]
    fn test_missing_pricing_rejected_before_call() {
        let drafter = EchoDrafter {
            seen: RefCell::new(Vec::new()),
        };
        let err = draft_memo(&drafter, &MemoRequest::new("  ")).unwrap_err();
        assert!(matches!(err, MemoDraftError::InvalidRequest(_)));
        assert!(drafter.seen.borrow().is_empty());
    }

    #[test]
    fn test_draft_passes_through() {
        let drafter = EchoDrafter {
            seen: RefCell::new(Vec::new()),
        };
        let memo = draft_memo(&drafter, &MemoRequest::new("p").with_term_sheet("t")).unwrap();
        assert_eq!(memo, "MEMO (2 inputs)");
        assert_eq!(drafter.seen.borrow()[0].role, Role::System);

        let err = draft_memo(&BusyDrafter, &MemoRequest::new("p")).unwrap_err();
        assert_eq!(err.to_string(), "Memo service rate limited, retry after 20s");
    }
}
