//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract: batch scripts rely on them.
//!
//! | Code | Domain    | Description                                        |
//! |------|-----------|----------------------------------------------------|
//! | 0    | Universal | Success (every document agrees with ground truth)  |
//! | 1    | Universal | General error (unspecified)                        |
//! | 2    | Universal | CLI usage error (bad args, missing answer file)    |
//! | 3    | recon     | Config invalid (parse or validation failure)       |
//! | 4    | recon     | Runtime error (unreadable table, bad reference)    |
//! | 5    | recon     | Discrepancies found against ground truth           |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing input file.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Recon (3-5)
// =============================================================================

/// Config could not be parsed or failed validation.
pub const EXIT_RECON_INVALID_CONFIG: u8 = 3;

/// Reference data or answers could not be read or are inconsistent.
pub const EXIT_RECON_RUNTIME: u8 = 4;

/// At least one document disagrees with ground truth.
pub const EXIT_RECON_MISMATCH: u8 = 5;

// =============================================================================
// Engine Error Mapping
// =============================================================================

use inactives_recon::ReconError;

/// Map an engine error to its exit code.
pub fn recon_exit_code(err: &ReconError) -> u8 {
    match err {
        ReconError::ConfigParse(_) | ReconError::ConfigValidation(_) => EXIT_RECON_INVALID_CONFIG,
        ReconError::MissingColumn { .. }
        | ReconError::FieldParse { .. }
        | ReconError::UnknownIngredientId(_)
        | ReconError::AnswerParse(_)
        | ReconError::Io(_) => EXIT_RECON_RUNTIME,
    }
}
