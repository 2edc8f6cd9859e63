//! Interfaces to the external services around the pricing core: OCR text
//! extraction, LLM memo drafting and export delivery.

pub mod delivery;
pub mod extraction;
pub mod memo;

pub use delivery::{suggested_filename, DeliveryLocation, ExportDelivery, LocalDirectoryDelivery};
pub use extraction::{
    assemble_transcript, collect_pages, extract_transcript, wait_for_completion,
    wait_for_transcript, BlockType, DocumentExtractor, DocumentLocation, ExtractionError,
    ExtractionPage, JobId, JobStatus, PollPolicy, Sleeper, TextBlock, ThreadSleeper,
};
pub use memo::{draft_memo, MemoDraftError, MemoDrafter, MemoRequest};
