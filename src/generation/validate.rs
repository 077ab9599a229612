//! Contracts for model replies. A reply either satisfies its contract or yields every complaint
//! found, each prefixed with the field path it concerns.

use serde::de::DeserializeOwned;

use crate::formats::{BlogContent, BlogContentSection, Outline, OutlineSection, TopicIdea};

#[derive(Debug, Clone, PartialEq)]
pub enum Validated<T> {
    Valid(T),
    Invalid(Vec<String>),
}

impl<T> Validated<T> {
    pub fn into_result(self) -> Result<T, Vec<String>> {
        match self {
            Self::Valid(value) => Ok(value),
            Self::Invalid(errors) => Err(errors),
        }
    }
}

pub trait Validate {
    fn check(&self, path: &str, errors: &mut Vec<String>);
}

pub fn validate<T: Validate>(value: T) -> Validated<T> {
    let mut errors = Vec::new();
    value.check("", &mut errors);
    if errors.is_empty() {
        Validated::Valid(value)
    } else {
        Validated::Invalid(errors)
    }
}

/// Deserializes then validates. Shape errors and contract errors are reported the same way.
pub fn parse_and_validate<T: DeserializeOwned + Validate>(
    value: serde_json::Value,
    path: &str,
) -> Validated<T> {
    match serde_json::from_value::<T>(value) {
        Ok(parsed) => {
            let mut errors = Vec::new();
            parsed.check(path, &mut errors);
            if errors.is_empty() {
                Validated::Valid(parsed)
            } else {
                Validated::Invalid(errors)
            }
        }
        Err(err) => Validated::Invalid(vec![format!("{}: {err}", display_path(path))]),
    }
}

fn join(path: &str, field: &str) -> String {
    if path.is_empty() {
        field.to_owned()
    } else {
        format!("{path}.{field}")
    }
}

fn display_path(path: &str) -> &str {
    if path.is_empty() { "<root>" } else { path }
}

fn require_text(path: &str, field: &str, value: &str, errors: &mut Vec<String>) {
    if value.trim().is_empty() {
        errors.push(format!("{}: must not be empty", join(path, field)));
    }
}

impl Validate for TopicIdea {
    fn check(&self, path: &str, errors: &mut Vec<String>) {
        require_text(path, "title", &self.title, errors);
        require_text(path, "description", &self.description, errors);
        if self.target_keywords.iter().all(|k| k.trim().is_empty()) {
            errors.push(format!(
                "{}: must contain at least one keyword",
                join(path, "targetKeywords")
            ));
        }
    }
}

impl Validate for OutlineSection {
    fn check(&self, path: &str, errors: &mut Vec<String>) {
        require_text(path, "id", &self.id, errors);
        require_text(path, "title", &self.title, errors);
        require_text(path, "content", &self.content, errors);
        for (idx, child) in self.children().iter().enumerate() {
            child.check(&join(path, &format!("children[{idx}]")), errors);
        }
    }
}

impl Validate for Outline {
    fn check(&self, path: &str, errors: &mut Vec<String>) {
        if self.sections.is_empty() {
            errors.push(format!("{}: must not be empty", join(path, "sections")));
        }
        for (idx, section) in self.sections.iter().enumerate() {
            section.check(&join(path, &format!("sections[{idx}]")), errors);
        }
    }
}

impl Validate for BlogContentSection {
    fn check(&self, path: &str, errors: &mut Vec<String>) {
        require_text(path, "id", &self.id, errors);
        require_text(path, "content", &self.content, errors);
    }
}

impl Validate for BlogContent {
    fn check(&self, path: &str, errors: &mut Vec<String>) {
        if self.sections.is_empty() {
            errors.push(format!("{}: must not be empty", join(path, "sections")));
        }
        for (idx, section) in self.sections.iter().enumerate() {
            section.check(&join(path, &format!("sections[{idx}]")), errors);
        }
    }
}
