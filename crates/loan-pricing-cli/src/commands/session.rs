use clap::{Args, Subcommand};
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use loan_pricing_core::pricing::{self, LoanEdit, LoanField};
use loan_pricing_core::session::PricingSession;

/// Arguments for the editing session
#[derive(Args)]
pub struct SessionArgs {
    /// Session file, created on `init`
    #[arg(long, default_value = "lpc-session.json")]
    pub file: PathBuf,

    #[command(subcommand)]
    pub action: SessionAction,
}

#[derive(Subcommand)]
pub enum SessionAction {
    /// Start a session with one default loan
    Init,
    /// Add a default loan (up to 4)
    Add,
    /// Discard all edits and return to one default loan
    Reset,
    /// Set one field on one loan
    Set {
        /// Loan number, starting at 1
        #[arg(long, default_value_t = 1)]
        loan: usize,
        /// Field label or key, e.g. "SPREAD (%)" or spread_pct
        #[arg(long)]
        field: String,
        /// New value
        #[arg(long, allow_hyphen_values = true)]
        value: String,
    },
    /// Show every loan with its pricing
    Show,
}

pub fn run_session(args: SessionArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut session = load(&args.file)?;

    let note = match args.action {
        SessionAction::Init => {
            session.initialize()?;
            save(&args.file, &session)?;
            "initialized".to_string()
        }
        SessionAction::Add => {
            let added = session.add_loan()?;
            save(&args.file, &session)?;
            if added {
                format!("added Loan {}", session.loans().len())
            } else {
                "session already holds the maximum number of loans".to_string()
            }
        }
        SessionAction::Reset => {
            session.reset()?;
            save(&args.file, &session)?;
            "reset".to_string()
        }
        SessionAction::Set { loan, field, value } => {
            let index = loan.checked_sub(1).ok_or("--loan starts at 1")?;
            let field = LoanField::parse(&field)
                .ok_or_else(|| format!("unknown field '{field}'"))?;
            session.edit(index, LoanEdit::parse(field, &value)?)?;
            save(&args.file, &session)?;
            format!("Loan {} {} updated", loan, field.label())
        }
        SessionAction::Show => "ok".to_string(),
    };

    Ok(describe(&session, &note))
}

fn load(path: &Path) -> Result<PricingSession, Box<dyn std::error::Error>> {
    if !path.exists() {
        return Ok(PricingSession::new());
    }
    let contents = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read '{}': {}", path.display(), e))?;
    let session = PricingSession::from_json(&contents)
        .map_err(|e| format!("Failed to load session '{}': {}", path.display(), e))?;
    Ok(session)
}

fn save(path: &Path, session: &PricingSession) -> Result<(), Box<dyn std::error::Error>> {
    fs::write(path, session.to_json()?)
        .map_err(|e| format!("Failed to write '{}': {}", path.display(), e))?;
    debug!(path = %path.display(), state = %session.state(), "session saved");
    Ok(())
}

fn describe(session: &PricingSession, note: &str) -> Value {
    let loans: Vec<Value> = session
        .loans()
        .iter()
        .enumerate()
        .map(|(i, loan)| {
            let pricing = match pricing::compute(loan) {
                Ok(c) => json!({
                    "summary": pricing::build_summary_view(loan, &c),
                }),
                Err(e) => json!({ "error": e.to_string() }),
            };
            json!({
                "loan": i + 1,
                "company_name": loan.company_name,
                "detail": pricing::build_detail_view(loan),
                "pricing": pricing,
            })
        })
        .collect();
    json!({
        "result": {
            "status": note,
            "state": session.state().to_string(),
            "loans": loans,
        }
    })
}
