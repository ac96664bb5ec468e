#[cfg(test)]
#[path = "field_errors_test.rs"]
mod tests;

use std::collections::BTreeMap;

use crate::domain::models::ValidationErrors;

/// Validation messages routed to the field they belong to, with a general
/// bucket for anything that matched no known field.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FieldErrors {
    pub fields: BTreeMap<String, Vec<String>>,
    pub general: Vec<String>,
}

impl FieldErrors {
    pub fn is_empty(&self) -> bool {
        return self.fields.is_empty() && self.general.is_empty();
    }
}

/// Buckets flat server messages by field. A message belongs to a field when
/// it starts with the field's name ("Name can't be blank", "Name has already
/// been taken"), comparing case-insensitively and treating underscores as
/// spaces, and only at a word boundary so "name" never claims "names".
pub fn classify(messages: &[String], known_fields: &[&str]) -> FieldErrors {
    let mut res = FieldErrors::default();

    for message in messages {
        let normalized = message.trim().to_lowercase().replace('_', " ");

        let matched = known_fields.iter().find(|field| {
            let label = field.to_lowercase().replace('_', " ");
            if !normalized.starts_with(&label) {
                return false;
            }
            return normalized[label.len()..]
                .chars()
                .next()
                .map_or(true, |next| return !next.is_alphanumeric());
        });

        match matched {
            Some(field) => res
                .fields
                .entry(field.to_string())
                .or_default()
                .push(message.clone()),
            None => res.general.push(message.clone()),
        }
    }

    return res;
}

/// Normalizes whichever shape the server chose. Field-keyed maps pass
/// through untouched; flat lists go through [`classify`].
pub fn from_server(errors: &ValidationErrors, known_fields: &[&str]) -> FieldErrors {
    match errors {
        ValidationErrors::Messages(messages) => return classify(messages, known_fields),
        ValidationErrors::Fields(fields) => {
            return FieldErrors {
                fields: fields.clone(),
                general: vec![],
            }
        }
    }
}
