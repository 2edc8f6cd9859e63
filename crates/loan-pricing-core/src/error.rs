use thiserror::Error;

#[derive(Debug, Error)]
pub enum PricingError {
    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Division by zero in {context}")]
    DivisionByZero { context: String },

    #[error("Export failure{}: {reason}", describe_loan(.loan_index))]
    ExportFailure {
        loan_index: Option<usize>,
        reason: String,
    },

    #[error("Invalid state: cannot {operation} while session is {state}")]
    InvalidState { operation: String, state: String },

    #[error("Loan index {index} out of range (session holds {len} loans)")]
    LoanIndexOutOfRange { index: usize, len: usize },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl PricingError {
    pub(crate) fn invalid(field: &str, reason: impl Into<String>) -> Self {
        PricingError::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

fn describe_loan(loan_index: &Option<usize>) -> String {
    match loan_index {
        Some(i) => format!(" on Loan {}", i + 1),
        None => String::new(),
    }
}

impl From<serde_json::Error> for PricingError {
    fn from(e: serde_json::Error) -> Self {
        PricingError::SerializationError(e.to_string())
    }
}
