//! Candidate parsing and validation.
//!
//! A candidate's combined text is split on `|`; every non-empty token is
//! either the primary code (exactly [`PRIMARY_CODE_LEN`] ASCII digits) or an
//! auxiliary code. A valid candidate has exactly one distinct primary code
//! and at least the expected number of distinct auxiliary codes.

use crate::acceptance_log::{AcceptanceLog, AcceptedRecord};
use crate::error::ValidationError;
use crate::reconciler::CandidateRecord;
use dualscan_config_and_utils::DEFAULT_EXPECTED_AUX_COUNT;

/// Length of a primary code.
pub const PRIMARY_CODE_LEN: usize = 20;

/// Token shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeClass {
    Primary,
    Aux,
}

/// Outcome of a candidate that passed shape checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// New item; the caller appends it to the log.
    Accepted(AcceptedRecord),
    /// Primary code already in the log; dropped without error.
    Duplicate { primary_code: String },
}

/// True when `token` is exactly [`PRIMARY_CODE_LEN`] ASCII digits.
///
/// Twenty digits do not fit a 64-bit integer, so the check is on the
/// characters rather than a numeric parse.
pub fn is_primary_code(token: &str) -> bool {
    token.len() == PRIMARY_CODE_LEN && token.bytes().all(|b| b.is_ascii_digit())
}

pub fn classify_token(token: &str) -> CodeClass {
    if is_primary_code(token) {
        CodeClass::Primary
    } else {
        CodeClass::Aux
    }
}

/// Resolve the configured aux count. Unset or non-positive values use
/// `default`, and a zero `default` uses [`DEFAULT_EXPECTED_AUX_COUNT`].
pub fn resolve_expected_aux_count(configured: Option<i64>, default: usize) -> usize {
    let default = if default == 0 {
        DEFAULT_EXPECTED_AUX_COUNT
    } else {
        default
    };
    match configured {
        Some(n) if n > 0 => usize::try_from(n).unwrap_or(default),
        _ => default,
    }
}

/// Validate a candidate against the shape contract and the current log.
///
/// The log is only read; appending an accepted record is left to the caller.
pub fn validate(
    candidate: &CandidateRecord,
    expected_aux_count: usize,
    log: &AcceptanceLog,
) -> Result<Verdict, ValidationError> {
    let mut primaries: Vec<&str> = Vec::new();
    let mut aux: Vec<&str> = Vec::new();

    for token in candidate.combined_text.split('|').filter(|t| !t.is_empty()) {
        let bucket = match classify_token(token) {
            CodeClass::Primary => &mut primaries,
            CodeClass::Aux => &mut aux,
        };
        if !bucket.contains(&token) {
            bucket.push(token);
        }
    }

    let primary_code = match primaries.as_slice() {
        [] => return Err(ValidationError::NoPrimaryCode),
        [single] => *single,
        many => {
            return Err(ValidationError::AmbiguousPrimaryCode {
                codes: many.iter().map(|s| s.to_string()).collect(),
            })
        }
    };

    if log.contains(primary_code) {
        return Ok(Verdict::Duplicate {
            primary_code: primary_code.to_string(),
        });
    }

    if aux.len() < expected_aux_count {
        return Err(ValidationError::InsufficientAuxCodes {
            found: aux.len(),
            expected: expected_aux_count,
        });
    }

    Ok(Verdict::Accepted(AcceptedRecord {
        primary_code: primary_code.to_string(),
        aux_codes: aux.into_iter().map(str::to_string).collect(),
    }))
}
