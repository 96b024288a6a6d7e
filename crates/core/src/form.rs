use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// A tracked form: its name doubles as the destination table name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormTarget {
    pub name: String,
    /// External form identifier understood by the upstream API.
    pub uuid: String,
}

impl FormTarget {
    #[must_use]
    pub fn new(name: impl Into<String>, uuid: impl Into<String>) -> Self {
        Self { name: name.into(), uuid: uuid.into() }
    }
}

/// Ordered list of tracked forms. Order is the processing order of a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FormRegistry {
    forms: Vec<FormTarget>,
}

impl FormRegistry {
    /// Build a registry, rejecting blank fields and duplicate names.
    ///
    /// # Errors
    /// Returns [`CoreError::InvalidForms`] when a name or uuid is blank or a
    /// name appears twice (two forms would share one table).
    pub fn new(forms: Vec<FormTarget>) -> Result<Self> {
        let mut seen = HashSet::new();
        for form in &forms {
            if form.name.trim().is_empty() {
                return Err(CoreError::InvalidForms(format!(
                    "form with uuid {:?} has an empty name",
                    form.uuid
                )));
            }
            if form.uuid.trim().is_empty() {
                let reason = format!("form {} has an empty uuid", form.name);
                return Err(CoreError::InvalidForms(reason));
            }
            if !seen.insert(form.name.as_str()) {
                return Err(CoreError::InvalidForms(format!("duplicate form name {}", form.name)));
            }
        }
        Ok(Self { forms })
    }

    /// Parse a registry from a JSON array of `{"name", "uuid"}` objects.
    ///
    /// # Errors
    /// Returns an error if the JSON is malformed or fails validation.
    pub fn from_json(json: &str) -> Result<Self> {
        let forms: Vec<FormTarget> = serde_json::from_str(json)?;
        Self::new(forms)
    }

    /// Read and parse a registry file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or is not a valid registry.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Keep only the named forms, preserving registry order.
    ///
    /// # Errors
    /// Returns [`CoreError::InvalidForms`] if a requested name is not registered.
    pub fn select(&self, names: &[String]) -> Result<Self> {
        if names.is_empty() {
            return Ok(self.clone());
        }
        if let Some(unknown) = names.iter().find(|n| !self.forms.iter().any(|f| &f.name == *n)) {
            return Err(CoreError::InvalidForms(format!("unknown form {unknown}")));
        }
        let forms = self.forms.iter().filter(|f| names.contains(&f.name)).cloned().collect();
        Ok(Self { forms })
    }

    #[must_use]
    pub fn forms(&self) -> &[FormTarget] {
        &self.forms
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.forms.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.forms.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[expect(clippy::unwrap_used, reason = "test code")]
    fn parses_registry_in_order() {
        let registry = FormRegistry::from_json(
            r#"[{"name": "DeAgostini_ES", "uuid": "94aa"}, {"name": "CDL", "uuid": "3cbb"}]"#,
        )
        .unwrap();
        let names: Vec<&str> = registry.forms().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["DeAgostini_ES", "CDL"]);
    }

    #[test]
    fn rejects_duplicate_names() {
        let result = FormRegistry::new(vec![FormTarget::new("A", "1"), FormTarget::new("A", "2")]);
        assert!(matches!(result, Err(CoreError::InvalidForms(_))));
    }

    #[test]
    fn rejects_blank_uuid() {
        let result = FormRegistry::new(vec![FormTarget::new("A", "  ")]);
        assert!(result.is_err());
    }

    #[test]
    #[expect(clippy::unwrap_used, reason = "test code")]
    fn select_keeps_registry_order() {
        let registry = FormRegistry::new(vec![
            FormTarget::new("A", "1"),
            FormTarget::new("B", "2"),
            FormTarget::new("C", "3"),
        ])
        .unwrap();
        let picked = registry.select(&["C".to_owned(), "A".to_owned()]).unwrap();
        let names: Vec<&str> = picked.forms().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["A", "C"]);
        assert!(registry.select(&["Z".to_owned()]).is_err());
        assert_eq!(registry.select(&[]).unwrap().len(), 3);
    }
}
