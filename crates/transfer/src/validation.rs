use crate::TransferError;

/// Validates the name a file is stored under in the vault.
///
/// Rejects:
/// - Empty or whitespace-only names
/// - Path separators (`/`, `\`) and the special names `.` / `..`
/// - Control characters
pub fn validate_file_name(name: &str) -> Result<(), TransferError> {
    if name.trim().is_empty() {
        return Err(TransferError::InvalidFileName("empty name".into()));
    }

    if name == "." || name == ".." {
        return Err(TransferError::InvalidFileName(format!(
            "reserved name not allowed: {name}"
        )));
    }

    if name.contains(['/', '\\']) {
        return Err(TransferError::InvalidFileName(format!(
            "path separators not allowed: {name}"
        )));
    }

    if name.chars().any(char::is_control) {
        return Err(TransferError::InvalidFileName(format!(
            "control characters not allowed: {name:?}"
        )));
    }

    Ok(())
}
