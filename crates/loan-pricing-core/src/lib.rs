pub mod error;
pub mod types;

#[cfg(feature = "pricing")]
pub mod pricing;

#[cfg(feature = "session")]
pub mod session;

#[cfg(feature = "workbook")]
pub mod workbook;

#[cfg(feature = "integrations")]
pub mod integrations;

pub use error::PricingError;
pub use types::*;

/// Standard result type for all loan-pricing operations
pub type PricingResult<T> = Result<T, PricingError>;
