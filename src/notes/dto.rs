use serde::{Deserialize, Serialize};

use crate::notes::repo::Note;

#[derive(Debug, Deserialize)]
pub struct CreateNoteRequest {
    pub category: String,
    pub title: String,
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateNoteRequest {
    pub category: String,
    pub title: String,
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct NotesData {
    pub notes: Vec<Note>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;
    use uuid::Uuid;

    #[test]
    fn note_serializes_camel_case() {
        let note = Note {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            category: "Personal".into(),
            title: "Meeting Notes".into(),
            text: "Discussed milestones".into(),
            created_at: OffsetDateTime::now_utc(),
            updated_at: OffsetDateTime::now_utc(),
        };
        let json = serde_json::to_string(&note).unwrap();
        assert!(json.contains("\"userId\""));
        assert!(json.contains("\"createdAt\""));
        assert!(json.contains("Meeting Notes"));
    }
}
