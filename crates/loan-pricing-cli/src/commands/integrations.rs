use clap::Args;
use serde::Deserialize;
use serde_json::{json, Value};

use loan_pricing_core::integrations::{assemble_transcript, ExtractionPage, MemoRequest};

use crate::commands::pricing::LoanInputArgs;
use crate::input::file;

/// Arguments for assembling an OCR transcript from saved result pages
#[derive(Args)]
pub struct TranscriptArgs {
    /// JSON or YAML file holding one result page or a list of pages
    #[arg(long)]
    pub input: String,
}

/// Arguments for building the memo drafting request
#[derive(Args)]
pub struct MemoRequestArgs {
    #[command(flatten)]
    pub source: LoanInputArgs,

    /// Text file with the marketing presentation transcript
    #[arg(long)]
    pub marketing: Option<String>,

    /// Text file with the term sheet transcript
    #[arg(long)]
    pub term_sheet: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PageDocument {
    Many(Vec<ExtractionPage>),
    One(ExtractionPage),
}

pub fn run_transcript(args: TranscriptArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let pages = match file::read_structured::<PageDocument>(&args.input)? {
        PageDocument::Many(pages) => pages,
        PageDocument::One(page) => vec![page],
    };
    Ok(Value::String(assemble_transcript(&pages)))
}

pub fn run_memo_request(args: MemoRequestArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let loans = args.source.loans()?;
    let marketing = args.marketing.as_deref().map(file::read_text).transpose()?;
    let term_sheet = args.term_sheet.as_deref().map(file::read_text).transpose()?;
    build_request(&loans, marketing, term_sheet)
}

fn build_request(
    loans: &[loan_pricing_core::pricing::LoanRecord],
    marketing: Option<String>,
    term_sheet: Option<String>,
) -> Result<Value, Box<dyn std::error::Error>> {
    let mut request = MemoRequest::for_loans(loans);
    if let Some(text) = marketing {
        request = request.with_marketing_presentation(text);
    }
    if let Some(text) = term_sheet {
        request = request.with_term_sheet(text);
    }
    request.validate()?;
    Ok(json!({
        "result": {
            "loans": loans.len(),
            "messages": request.messages(),
        }
    }))
}
