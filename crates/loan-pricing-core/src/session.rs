//! Editing session for a small book of loans.
//!
//! The session is an explicit value owned by the host: every operation takes
//! it by `&mut`, and persisting it between interactions is the host's job
//! (it round-trips through serde). Transitions:
//!
//! ```text
//! Empty ──initialize──▶ Editing(1) ──add_loan──▶ Editing(n+1)   (n < 4)
//!                         ▲    │
//!                         │    └──reset──▶ Resetting ──▶ Editing(1)
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

use crate::error::PricingError;
use crate::pricing::{compute, LoanComputation, LoanEdit, LoanRecord};
use crate::PricingResult;

/// Maximum number of loans a session can hold.
pub const MAX_LOANS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "loans", rename_all = "snake_case")]
pub enum SessionState {
    Empty,
    Editing(usize),
    Resetting,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Empty => f.write_str("empty"),
            SessionState::Editing(n) => write!(f, "editing {n} loan(s)"),
            SessionState::Resetting => f.write_str("resetting"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SessionSnapshot")]
pub struct PricingSession {
    state: SessionState,
    loans: Vec<LoanRecord>,
}

/// Serialised form, validated on the way back in.
#[derive(Deserialize)]
struct SessionSnapshot {
    state: SessionState,
    #[serde(default)]
    loans: Vec<LoanRecord>,
}

impl TryFrom<SessionSnapshot> for PricingSession {
    type Error = PricingError;

    fn try_from(snapshot: SessionSnapshot) -> Result<Self, Self::Error> {
        let consistent = match snapshot.state {
            SessionState::Empty => snapshot.loans.is_empty(),
            SessionState::Editing(n) => {
                (1..=MAX_LOANS).contains(&n) && snapshot.loans.len() == n
            }
            // A reset never outlives the call that started it.
            SessionState::Resetting => false,
        };
        if !consistent {
            return Err(PricingError::InvalidState {
                operation: "restore session".into(),
                state: format!("{} with {} stored loans", snapshot.state, snapshot.loans.len()),
            });
        }
        Ok(PricingSession {
            state: snapshot.state,
            loans: snapshot.loans,
        })
    }
}

impl Default for PricingSession {
    fn default() -> Self {
        Self::new()
    }
}

impl PricingSession {
    pub fn new() -> Self {
        PricingSession {
            state: SessionState::Empty,
            loans: Vec::new(),
        }
    }

    /// A session already holding one default loan.
    pub fn initialized() -> Self {
        PricingSession {
            state: SessionState::Editing(1),
            loans: vec![LoanRecord::default()],
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn loans(&self) -> &[LoanRecord] {
        &self.loans
    }

    pub fn is_full(&self) -> bool {
        self.loans.len() >= MAX_LOANS
    }

    /// `Empty -> Editing(1)` with a single default loan.
    pub fn initialize(&mut self) -> PricingResult<SessionState> {
        if self.state != SessionState::Empty {
            return Err(self.wrong_state("initialize"));
        }
        self.loans.push(LoanRecord::default());
        self.transition(SessionState::Editing(1));
        Ok(self.state)
    }

    /// Append a default loan. Returns `false`, changing nothing, once the
    /// session already holds [`MAX_LOANS`].
    pub fn add_loan(&mut self) -> PricingResult<bool> {
        let n = self.editing_count("add a loan")?;
        if n >= MAX_LOANS {
            debug!(loans = n, "add_loan ignored, session full");
            return Ok(false);
        }
        self.loans.push(LoanRecord::default());
        self.transition(SessionState::Editing(n + 1));
        Ok(true)
    }

    /// Discard every edit and go back to a single default loan.
    pub fn reset(&mut self) -> PricingResult<()> {
        self.editing_count("reset")?;
        self.transition(SessionState::Resetting);
        self.loans.clear();
        self.loans.push(LoanRecord::default());
        self.transition(SessionState::Editing(1));
        Ok(())
    }

    pub fn loan(&self, index: usize) -> PricingResult<&LoanRecord> {
        self.editing_count("read a loan")?;
        self.loans.get(index).ok_or(PricingError::LoanIndexOutOfRange {
            index,
            len: self.loans.len(),
        })
    }

    /// Apply one field edit to the loan at `index` (0-based).
    pub fn edit(&mut self, index: usize, edit: LoanEdit) -> PricingResult<()> {
        self.editing_count("edit a loan")?;
        let len = self.loans.len();
        let loan = self
            .loans
            .get_mut(index)
            .ok_or(PricingError::LoanIndexOutOfRange { index, len })?;
        let field = edit.field();
        loan.apply(edit).inspect_err(|e| {
            warn!(loan = index + 1, %field, error = %e, "edit rejected");
        })
    }

    /// Snapshot for the host to persist between interactions.
    pub fn to_json(&self) -> PricingResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Restore a snapshot written by [`PricingSession::to_json`]. Snapshots
    /// whose state and loans disagree are rejected.
    pub fn from_json(json: &str) -> PricingResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Compute every loan in session order.
    pub fn compute_all(&self) -> PricingResult<Vec<LoanComputation>> {
        self.editing_count("compute")?;
        self.loans.iter().map(compute).collect()
    }

    fn editing_count(&self, operation: &str) -> PricingResult<usize> {
        match self.state {
            SessionState::Editing(n) => Ok(n),
            _ => Err(self.wrong_state(operation)),
        }
    }

    fn transition(&mut self, next: SessionState) {
        debug!(from = %self.state, to = %next, "session transition");
        self.state = next;
    }

    fn wrong_state(&self, operation: &str) -> PricingError {
        PricingError::InvalidState {
            operation: operation.into(),
            state: self.state.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
