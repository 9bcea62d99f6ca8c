//! In-memory edit session for an existing application configuration.
//!
//! Each mutator validates its input first: on success the configuration is
//! updated, on failure it is left untouched and the field error (whose
//! `Display` is the user-facing message) is returned.

use crate::config::{Align, AppConfig, Category};
use crate::validate::{
    validate_description, validate_identifier, validate_title, FieldError,
};

/// A loaded configuration being edited.
///
/// Identifier changes are staged in `new_id` rather than applied to the
/// configuration, mirroring how a rename is a separate operation from a
/// field edit.
#[derive(Debug, Clone)]
pub struct EditSession {
    config: AppConfig,
    new_id: String,
}

impl EditSession {
    pub fn new(config: AppConfig) -> Self {
        let new_id = config.id.clone();
        Self { config, new_id }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// The staged identifier (equal to the loaded one until changed).
    pub fn new_id(&self) -> &str {
        &self.new_id
    }

    pub fn set_identifier(&mut self, id: &str) -> Result<(), FieldError> {
        validate_identifier(id)?;
        self.new_id = id.to_string();
        Ok(())
    }

    pub fn set_title(&mut self, title: &str) -> Result<(), FieldError> {
        validate_title(title)?;
        self.config.title = title.to_string();
        Ok(())
    }

    pub fn set_description(&mut self, description: &str) -> Result<(), FieldError> {
        validate_description(description)?;
        self.config.description = description.to_string();
        Ok(())
    }

    pub fn add_category(&mut self, name: &str) {
        self.config.categories.push(Category::new(name));
    }

    /// Remove the first category with the given name. Returns whether one
    /// was removed.
    pub fn remove_category(&mut self, name: &str) -> bool {
        if let Some(index) = self.config.categories.iter().position(|c| c.name == name) {
            self.config.categories.remove(index);
            true
        } else {
            false
        }
    }

    pub fn set_align(&mut self, align: Align) {
        self.config.style.align = align;
    }

    /// Consume the session, producing the edited configuration with the
    /// staged identifier applied.
    pub fn into_config(mut self) -> AppConfig {
        self.config.id = self.new_id;
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> EditSession {
        let mut config = AppConfig::draft();
        config.id = "demo-app".into();
        config.title = "A perfectly fine title".into();
        EditSession::new(config)
    }

    #[test]
    fn test_set_title_applies() {
        let mut s = session();
        s.set_title("A brand new title").unwrap();
        assert_eq!(s.config().title, "A brand new title");
    }

    #[test]
    fn test_set_title_rejected_leaves_config() {
        let mut s = session();
        let before = s.config().title.clone();
        assert_eq!(s.set_title("short"), Err(FieldError::TitleTooShort));
        assert_eq!(s.config().title, before);
    }

    #[test]
    fn test_set_description_rejected() {
        let mut s = session();
        let long = "d".repeat(15_001);
        assert_eq!(
            s.set_description(&long),
            Err(FieldError::DescriptionTooLong)
        );
        assert!(s.config().description.is_empty());
    }

    #[test]
    fn test_set_identifier_staged() {
        let mut s = session();
        s.set_identifier("renamed").unwrap();
        assert_eq!(s.new_id(), "renamed");
        // The loaded config keeps its id until the session is finalized
        assert_eq!(s.config().id, "demo-app");
        assert_eq!(s.into_config().id, "renamed");
    }

    #[test]
    fn test_set_identifier_rejected() {
        let mut s = session();
        assert_eq!(
            s.set_identifier("bad id!"),
            Err(FieldError::IdentifierCharset)
        );
        assert_eq!(s.new_id(), "demo-app");
    }

    #[test]
    fn test_categories() {
        let mut s = session();
        s.add_category("Dog");
        s.add_category("Cat");
        assert_eq!(s.config().categories.len(), 2);

        assert!(s.remove_category("Dog"));
        assert_eq!(s.config().categories.len(), 1);
        assert!(!s.remove_category("Dog"));
    }

    #[test]
    fn test_set_align() {
        let mut s = session();
        s.set_align(Align::Right);
        assert_eq!(s.config().style.align, Align::Right);
    }
}
