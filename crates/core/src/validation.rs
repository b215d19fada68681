//! Input validation for version and revision drafts.

use serde_json::Value;

use crate::entity::{Actor, ChangeSource};
use crate::error::CoreError;

/// Maximum number of tags on one version.
pub const MAX_TAGS: usize = 20;

/// Maximum length of a single tag.
pub const MAX_TAG_LENGTH: usize = 50;

/// Maximum length of a version description or revision note.
pub const MAX_DESCRIPTION_LENGTH: usize = 1000;

/// Maximum length of a section id.
pub const MAX_SECTION_ID_LENGTH: usize = 200;

/// Snapshots must be JSON objects so they can be diffed field by field.
pub fn validate_snapshot(snapshot: &Value) -> Result<(), CoreError> {
    if snapshot.is_object() {
        Ok(())
    } else {
        Err(CoreError::InvalidSnapshot(
            "content snapshot must be a JSON object".into(),
        ))
    }
}

/// Version metadata must be a JSON object (possibly empty).
pub fn validate_metadata(metadata: &Value) -> Result<(), CoreError> {
    if metadata.is_object() {
        Ok(())
    } else {
        Err(CoreError::Validation(
            "metadata must be a JSON object".into(),
        ))
    }
}

/// Validate version tags (each non-empty, <= 50 chars, max 20 tags).
pub fn validate_tags(tags: &[String]) -> Result<(), CoreError> {
    if tags.len() > MAX_TAGS {
        return Err(CoreError::Validation(format!(
            "A maximum of {MAX_TAGS} tags is allowed"
        )));
    }
    for tag in tags {
        if tag.trim().is_empty() {
            return Err(CoreError::Validation("Tags must not be empty".into()));
        }
        if tag.chars().count() > MAX_TAG_LENGTH {
            return Err(CoreError::Validation(format!(
                "Each tag must be at most {MAX_TAG_LENGTH} characters"
            )));
        }
    }
    Ok(())
}

/// Validate an optional free-text description or note.
pub fn validate_description(field: &str, text: Option<&str>) -> Result<(), CoreError> {
    match text {
        Some(t) if t.chars().count() > MAX_DESCRIPTION_LENGTH => Err(CoreError::Validation(
            format!("{field} must be at most {MAX_DESCRIPTION_LENGTH} characters"),
        )),
        _ => Ok(()),
    }
}

/// Every change is attributed to a named user (the system account included).
pub fn validate_actor(actor: &Actor) -> Result<(), CoreError> {
    if actor.user_id < 0 {
        return Err(CoreError::Validation(format!(
            "Invalid acting user id {}",
            actor.user_id
        )));
    }
    if actor.display_name.trim().is_empty() {
        return Err(CoreError::Validation(
            "Acting user display name must not be empty".into(),
        ));
    }
    Ok(())
}

/// Validate a revision's sub-region address.
pub fn validate_section(
    section_id: Option<&str>,
    paragraph_index: Option<i32>,
) -> Result<(), CoreError> {
    if let Some(id) = section_id {
        if id.trim().is_empty() {
            return Err(CoreError::Validation("section_id must not be empty".into()));
        }
        if id.chars().count() > MAX_SECTION_ID_LENGTH {
            return Err(CoreError::Validation(format!(
                "section_id must be at most {MAX_SECTION_ID_LENGTH} characters"
            )));
        }
    }
    if matches!(paragraph_index, Some(i) if i < 0) {
        return Err(CoreError::Validation(
            "paragraph_index must not be negative".into(),
        ));
    }
    Ok(())
}

/// AI provenance is only recorded on AI-sourced changes.
pub fn validate_ai_provenance(
    source: ChangeSource,
    has_ai_metadata: bool,
) -> Result<(), CoreError> {
    if has_ai_metadata && !source.is_ai() {
        return Err(CoreError::Validation(format!(
            "AI prompt/model may only be recorded for ai_generated changes, got {source}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn snapshot_must_be_object() {
        assert!(validate_snapshot(&json!({"title": "A"})).is_ok());
        assert!(matches!(
            validate_snapshot(&json!(["A"])),
            Err(CoreError::InvalidSnapshot(_))
        ));
        assert!(validate_snapshot(&json!(null)).is_err());
    }

    #[test]
    fn tags_limits() {
        assert!(validate_tags(&["draft".to_string()]).is_ok());
        assert!(validate_tags(&["".to_string()]).is_err());
        assert!(validate_tags(&["x".repeat(51)]).is_err());
        let many: Vec<String> = (0..21).map(|i| format!("tag-{i}")).collect();
        assert!(validate_tags(&many).is_err());
    }

    #[test]
    fn description_length() {
        assert!(validate_description("description", None).is_ok());
        assert!(validate_description("description", Some("short")).is_ok());
        let err = validate_description("change_notes", Some(&"n".repeat(1001))).unwrap_err();
        assert!(err.to_string().contains("change_notes"));
    }

    #[test]
    fn actor_rules() {
        assert!(validate_actor(&Actor::system()).is_ok());
        assert!(validate_actor(&Actor::new(-1, "x")).is_err());
        assert!(validate_actor(&Actor::new(3, "  ")).is_err());
    }

    #[test]
    fn section_rules() {
        assert!(validate_section(Some("intro"), Some(0)).is_ok());
        assert!(validate_section(None, None).is_ok());
        assert!(validate_section(Some(""), None).is_err());
        assert!(validate_section(None, Some(-1)).is_err());
    }

    #[test]
    fn ai_metadata_requires_ai_source() {
        assert!(validate_ai_provenance(ChangeSource::AiGenerated, true).is_ok());
        assert!(validate_ai_provenance(ChangeSource::HumanEdit, false).is_ok());
        assert!(validate_ai_provenance(ChangeSource::HumanEdit, true).is_err());
    }
}
