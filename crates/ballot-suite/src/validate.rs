//! Result-word validation, mirroring the shared checker convention: an
//! invocation reports `0xf` when all of its checks passed and `0x2` when any
//! failed; only `0xf` counts as a pass.

use crate::error::{CaseError, CaseResult};

/// Result word an invocation stores when every check passed.
pub const RESULT_PASS: u32 = 0xf;
/// Result word an invocation stores when any check failed.
pub const RESULT_FAIL: u32 = 0x2;

/// Checks every per-invocation result word. The first non-passing word fails
/// the case, with the invocation index and observed value in the diagnostic.
pub fn check_invocation_results(results: &[u32]) -> CaseResult<()> {
    if results.is_empty() {
        return Err(CaseError::Internal(
            "executor returned no invocation results".to_string(),
        ));
    }
    for (invocation, &word) in results.iter().enumerate() {
        if word != RESULT_PASS {
            return Err(CaseError::Fail(format!(
                "invocation {invocation} reported {word:#x}, expected {RESULT_PASS:#x}"
            )));
        }
    }
    Ok(())
}
