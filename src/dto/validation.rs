//! Validation helpers for DTOs.

use validator::ValidationError;

/// Lobby codes are exactly this many decimal digits.
pub const GAME_CODE_LENGTH: usize = 6;

/// Longest accepted nickname after trimming.
const MAX_NICK_LENGTH: usize = 24;

/// Validates that a game code is exactly 6 decimal digits.
///
/// # Examples
///
/// ```ignore
/// validate_game_code("042137") // Ok
/// validate_game_code("42137")  // Err - too short
/// validate_game_code("4213a7") // Err - non-digit
/// ```
pub fn validate_game_code(code: &str) -> Result<(), ValidationError> {
    if code.len() != GAME_CODE_LENGTH {
        let mut err = ValidationError::new("game_code_length");
        err.message = Some(
            format!(
                "Game code must be exactly {GAME_CODE_LENGTH} digits (got {})",
                code.len()
            )
            .into(),
        );
        return Err(err);
    }

    if !code.chars().all(|c| c.is_ascii_digit()) {
        let mut err = ValidationError::new("game_code_format");
        err.message = Some("Game code must contain only decimal digits".into());
        return Err(err);
    }

    Ok(())
}

/// Validates that a nickname is non-blank and within length bounds once
/// trimmed.
pub fn validate_nick(nick: &str) -> Result<(), ValidationError> {
    let trimmed = nick.trim();
    if trimmed.is_empty() {
        let mut err = ValidationError::new("nick_blank");
        err.message = Some("Nickname must not be blank".into());
        return Err(err);
    }

    if trimmed.chars().count() > MAX_NICK_LENGTH {
        let mut err = ValidationError::new("nick_length");
        err.message =
            Some(format!("Nickname must be at most {MAX_NICK_LENGTH} characters").into());
        return Err(err);
    }

    Ok(())
}
