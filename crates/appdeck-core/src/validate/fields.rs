//! Field validators shared by the create and edit flows.

use thiserror::Error;

/// Maximum length of an application identifier.
pub const MAX_IDENTIFIER_LEN: usize = 20;
/// Minimum length of an application title.
pub const MIN_TITLE_LEN: usize = 10;
/// Maximum length of an application title.
pub const MAX_TITLE_LEN: usize = 1000;
/// Maximum length of an application description.
pub const MAX_DESCRIPTION_LEN: usize = 15_000;

/// A single field violation, with its user-facing message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("the identifier must not be empty")]
    IdentifierEmpty,
    #[error("the identifier contains invalid characters; only alphanumeric characters, dots, dashes and underscores are allowed")]
    IdentifierCharset,
    #[error("the identifier must not be longer than 20 characters")]
    IdentifierTooLong,
    #[error("the title must not be empty or shorter than 10 characters")]
    TitleTooShort,
    #[error("the title must not be longer than 1000 characters")]
    TitleTooLong,
    #[error("the description must not be longer than 15000 characters")]
    DescriptionTooLong,
}

fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, 'ñ' | 'Ñ' | '.' | '_' | '-')
}

/// Validate an application identifier: required, charset, max length —
/// checked in that order.
pub fn validate_identifier(id: &str) -> Result<(), FieldError> {
    if id.is_empty() {
        return Err(FieldError::IdentifierEmpty);
    }
    if !id.chars().all(is_identifier_char) {
        return Err(FieldError::IdentifierCharset);
    }
    if id.chars().count() > MAX_IDENTIFIER_LEN {
        return Err(FieldError::IdentifierTooLong);
    }
    Ok(())
}

/// Validate an application title: required/min length, then max length.
pub fn validate_title(title: &str) -> Result<(), FieldError> {
    let len = title.chars().count();
    if len < MIN_TITLE_LEN {
        return Err(FieldError::TitleTooShort);
    }
    if len > MAX_TITLE_LEN {
        return Err(FieldError::TitleTooLong);
    }
    Ok(())
}

/// Validate an application description. Empty is fine.
pub fn validate_description(description: &str) -> Result<(), FieldError> {
    if description.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(FieldError::DescriptionTooLong);
    }
    Ok(())
}
