use serde::{Deserialize, Deserializer, Serialize};

/// A classroom as served by `/api/dashboard/subjects`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classroom {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub grade: String,
    pub section: String,
    pub subject: String,
    #[serde(default)]
    pub completed_chapters: Vec<u32>,
}

impl Classroom {
    /// Optimistic record for a creation that has not reached the server.
    pub fn pending(temp_id: impl Into<String>, data: CreateClassroom) -> Self {
        Classroom {
            id: temp_id.into(),
            grade: data.grade,
            section: data.section,
            subject: data.subject,
            completed_chapters: Vec::new(),
        }
    }

    pub fn is_pending(&self) -> bool {
        crate::features::sync::is_temp_id(&self.id)
    }
}

/// Payload for creating a classroom.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateClassroom {
    pub grade: String,
    pub section: String,
    pub subject: String,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(i64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Number(n) => n.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_classroom() {
        let json = r#"{"id":"cls-1","grade":"5","section":"A","subject":"Maths","completed_chapters":[0,2]}"#;
        let c: Classroom = serde_json::from_str(json).unwrap();
        assert_eq!(c.id, "cls-1");
        assert_eq!(c.completed_chapters, vec![0, 2]);
        assert!(!c.is_pending());
    }

    #[test]
    fn test_numeric_id_and_missing_chapters() {
        let json = r#"{"id":12,"grade":"7","section":"B","subject":"Science"}"#;
        let c: Classroom = serde_json::from_str(json).unwrap();
        assert_eq!(c.id, "12");
        assert!(c.completed_chapters.is_empty());
    }

    #[test]
    fn test_pending_classroom() {
        let data = CreateClassroom {
            grade: "5".to_string(),
            section: "A".to_string(),
            subject: "Maths".to_string(),
        };
        let c = Classroom::pending("temp-1-abc", data);
        assert!(c.is_pending());
        assert_eq!(c.subject, "Maths");
        assert!(c.completed_chapters.is_empty());
    }
}
