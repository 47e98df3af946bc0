//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Scripts driving `prlink` rely on them.
//!
//! | Code | Meaning                                                    |
//! |------|------------------------------------------------------------|
//! | 0    | Success                                                    |
//! | 1    | General error (unspecified, or `resolve` found no column)  |
//! | 2    | CLI usage error (bad args, unreadable config file)         |
//! | 3    | Invalid config (TOML parse or validation failure)          |
//! | 4    | Primary input unusable (unreadable, or no ID column)       |
//! | 5    | Output could not be written                                |
//!
//! Missing or unreadable secondary inputs are not errors: the run continues
//! with the affected joins skipped and a warning logged.

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing config file.
pub const EXIT_USAGE: u8 = 2;

/// Config file parsed but is malformed or fails validation.
pub const EXIT_INVALID_CONFIG: u8 = 3;

/// Pull-request table cannot be read, or has no resolvable ID column.
pub const EXIT_PRIMARY_INPUT: u8 = 4;

/// Final (or merged) CSV could not be written.
pub const EXIT_OUTPUT_WRITE: u8 = 5;

/// Map an engine error to its exit code.
pub fn link_exit_code(err: &prlink_recon::LinkError) -> u8 {
    use prlink_recon::LinkError;
    match err {
        LinkError::ConfigParse(_) | LinkError::ConfigValidation(_) => EXIT_INVALID_CONFIG,
        LinkError::MissingKeyColumn { .. } | LinkError::Csv { .. } => EXIT_PRIMARY_INPUT,
        LinkError::Io(_) => EXIT_ERROR,
    }
}
