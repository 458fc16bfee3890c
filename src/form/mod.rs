//! Meeting form values and per-field validation.

use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Kind of document the workflow should produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentType {
    CompteRendu,
    ProcesVerbal,
    NoteDeReunion,
}

impl DocumentType {
    pub const ALL: [DocumentType; 3] = [
        DocumentType::CompteRendu,
        DocumentType::ProcesVerbal,
        DocumentType::NoteDeReunion,
    ];

    /// Value sent to the workflow.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CompteRendu => "Compte rendu",
            Self::ProcesVerbal => "Procès verbal",
            Self::NoteDeReunion => "Note de réunion",
        }
    }

    fn slug(&self) -> &'static str {
        match self {
            Self::CompteRendu => "compte-rendu",
            Self::ProcesVerbal => "proces-verbal",
            Self::NoteDeReunion => "note-de-reunion",
        }
    }

    /// Accepts the wire value (any case) or its slug.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(value) || t.slug() == value)
    }
}

/// Languages offered by the workflow, as (code, name).
pub const LANGUAGES: [(&str, &str); 4] = [
    ("fr", "French"),
    ("en", "English"),
    ("es", "Spanish"),
    ("de", "German"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FormField {
    DocumentType,
    MeetingTitle,
    MeetingDate,
    MainObjective,
    Participants,
    AudioFile,
    Language,
    Agenda,
}

impl FormField {
    /// Multipart field name.
    pub fn wire_name(&self) -> &'static str {
        match self {
            Self::DocumentType => "documentType",
            Self::MeetingTitle => "meetingTitle",
            Self::MeetingDate => "meetingDate",
            Self::MainObjective => "mainObjective",
            Self::Participants => "participants",
            Self::AudioFile => "audioFile",
            Self::Language => "language",
            Self::Agenda => "ordreJour",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::DocumentType => "Document type",
            Self::MeetingTitle => "Meeting title",
            Self::MeetingDate => "Meeting date",
            Self::MainObjective => "Main objective",
            Self::Participants => "Participants",
            Self::AudioFile => "Audio file",
            Self::Language => "Language",
            Self::Agenda => "Agenda",
        }
    }
}

/// Raw values as entered by the user.
#[derive(Debug, Clone, Default)]
pub struct MeetingForm {
    pub document_type: String,
    pub meeting_title: String,
    pub meeting_date: String,
    pub main_objective: String,
    pub participants: String,
    pub audio_file: Option<PathBuf>,
    pub language: String,
    pub agenda: String,
}

/// Per-field validation messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Error)]
#[error("{} form field(s) need attention", .0.len())]
pub struct FormErrors(BTreeMap<FormField, String>);

impl FormErrors {
    pub fn get(&self, field: FormField) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    pub fn contains(&self, field: FormField) -> bool {
        self.0.contains_key(&field)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn fields(&self) -> impl Iterator<Item = FormField> + '_ {
        self.0.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FormField, &str)> + '_ {
        self.0.iter().map(|(field, msg)| (*field, msg.as_str()))
    }

    fn insert(&mut self, field: FormField, message: impl Into<String>) {
        self.0.insert(field, message.into());
    }

    fn remove(&mut self, field: FormField) {
        self.0.remove(&field);
    }
}

/// A form that passed validation, ready to be sent.
#[derive(Debug, Clone)]
pub struct ValidatedForm {
    pub document_type: DocumentType,
    pub meeting_title: String,
    pub meeting_date: NaiveDate,
    pub main_objective: String,
    pub participants: String,
    pub audio_file: PathBuf,
    pub language: String,
    pub agenda: String,
}

/// Holds the form values and the errors from the last validation.
#[derive(Debug, Clone, Default)]
pub struct FormState {
    form: MeetingForm,
    errors: FormErrors,
}

impl FormState {
    pub fn new(form: MeetingForm) -> Self {
        Self {
            form,
            errors: FormErrors::default(),
        }
    }

    pub fn form(&self) -> &MeetingForm {
        &self.form
    }

    pub fn errors(&self) -> &FormErrors {
        &self.errors
    }

    /// Update a text field and clear its error. `AudioFile` takes the value as a path.
    pub fn set_field(&mut self, field: FormField, value: impl Into<String>) {
        let value = value.into();
        match field {
            FormField::DocumentType => self.form.document_type = value,
            FormField::MeetingTitle => self.form.meeting_title = value,
            FormField::MeetingDate => self.form.meeting_date = value,
            FormField::MainObjective => self.form.main_objective = value,
            FormField::Participants => self.form.participants = value,
            FormField::Language => self.form.language = value,
            FormField::Agenda => self.form.agenda = value,
            FormField::AudioFile => {
                let path = (!value.trim().is_empty()).then(|| PathBuf::from(value));
                return self.set_audio_file(path);
            }
        }
        self.errors.remove(field);
    }

    /// Select (or clear) the audio file. The error is cleared only when a file is chosen.
    pub fn set_audio_file(&mut self, path: Option<PathBuf>) {
        if path.is_some() {
            self.errors.remove(FormField::AudioFile);
        }
        self.form.audio_file = path;
    }

    /// Check every required field, remembering the errors for display.
    pub fn validate(&mut self) -> Result<ValidatedForm, FormErrors> {
        let form = &self.form;
        let mut errors = FormErrors::default();

        let document_type = if form.document_type.trim().is_empty() {
            errors.insert(FormField::DocumentType, "Please select a document type");
            None
        } else {
            let parsed = DocumentType::parse(&form.document_type);
            if parsed.is_none() {
                errors.insert(
                    FormField::DocumentType,
                    format!("Unknown document type '{}'", form.document_type.trim()),
                );
            }
            parsed
        };

        if form.meeting_title.trim().is_empty() {
            errors.insert(FormField::MeetingTitle, "The meeting title is required");
        }

        let meeting_date = if form.meeting_date.trim().is_empty() {
            errors.insert(FormField::MeetingDate, "The meeting date is required");
            None
        } else {
            let parsed = NaiveDate::parse_from_str(form.meeting_date.trim(), "%Y-%m-%d").ok();
            if parsed.is_none() {
                errors.insert(
                    FormField::MeetingDate,
                    "The meeting date must use the YYYY-MM-DD format",
                );
            }
            parsed
        };

        if form.main_objective.trim().is_empty() {
            errors.insert(FormField::MainObjective, "The main objective is required");
        }

        match &form.audio_file {
            None => errors.insert(FormField::AudioFile, "The audio file is required"),
            Some(path) if !path.is_file() => errors.insert(
                FormField::AudioFile,
                format!("Audio file not found: {}", path.display()),
            ),
            Some(_) => {}
        }

        if form.language.trim().is_empty() {
            errors.insert(FormField::Language, "The language is required");
        }

        if form.agenda.trim().is_empty() {
            errors.insert(FormField::Agenda, "The agenda is required");
        }

        self.errors = errors.clone();

        match (document_type, meeting_date, &form.audio_file) {
            (Some(document_type), Some(meeting_date), Some(audio_file)) if errors.is_empty() => {
                Ok(ValidatedForm {
                    document_type,
                    meeting_title: form.meeting_title.trim().to_string(),
                    meeting_date,
                    main_objective: form.main_objective.trim().to_string(),
                    participants: form.participants.trim().to_string(),
                    audio_file: audio_file.clone(),
                    language: form.language.trim().to_string(),
                    agenda: form.agenda.trim().to_string(),
                })
            }
            _ => Err(errors),
        }
    }
}

impl fmt::Display for FormField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_form(audio: PathBuf) -> MeetingForm {
        MeetingForm {
            document_type: "Compte rendu".to_string(),
            meeting_title: "Weekly sync".to_string(),
            meeting_date: "2024-05-02".to_string(),
            main_objective: "Plan the release".to_string(),
            participants: String::new(),
            audio_file: Some(audio),
            language: "fr".to_string(),
            agenda: "1. Status\n2. Risks".to_string(),
        }
    }

    #[test]
    fn test_empty_form_has_seven_errors() {
        let mut state = FormState::default();
        let errors = state.validate().unwrap_err();

        assert_eq!(errors.len(), 7);
        let fields: Vec<FormField> = errors.fields().collect();
        assert_eq!(
            fields,
            vec![
                FormField::DocumentType,
                FormField::MeetingTitle,
                FormField::MeetingDate,
                FormField::MainObjective,
                FormField::AudioFile,
                FormField::Language,
                FormField::Agenda,
            ]
        );
        assert!(!errors.contains(FormField::Participants));
        assert_eq!(state.errors(), &errors);
    }

    #[test]
    fn test_complete_form_validates() {
        let audio = tempfile::Builder::new().suffix(".mp3").tempfile().unwrap();
        let mut state = FormState::new(complete_form(audio.path().to_path_buf()));

        let validated = state.validate().unwrap();
        assert_eq!(validated.document_type, DocumentType::CompteRendu);
        assert_eq!(
            validated.meeting_date,
            NaiveDate::from_ymd_opt(2024, 5, 2).unwrap()
        );
        assert_eq!(validated.participants, "");
        assert!(state.errors().is_empty());
    }

    #[test]
    fn test_whitespace_only_fields_are_empty() {
        let audio = tempfile::Builder::new().suffix(".wav").tempfile().unwrap();
        let mut form = complete_form(audio.path().to_path_buf());
        form.meeting_title = "   ".to_string();
        form.main_objective = "\t".to_string();

        let errors = FormState::new(form).validate().unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors.contains(FormField::MeetingTitle));
        assert!(errors.contains(FormField::MainObjective));
    }

    #[test]
    fn test_invalid_date_and_document_type() {
        let audio = tempfile::Builder::new().suffix(".wav").tempfile().unwrap();
        let mut form = complete_form(audio.path().to_path_buf());
        form.meeting_date = "02/05/2024".to_string();
        form.document_type = "Minutes".to_string();

        let errors = FormState::new(form).validate().unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors
            .get(FormField::MeetingDate)
            .unwrap()
            .contains("YYYY-MM-DD"));
        assert!(errors.get(FormField::DocumentType).unwrap().contains("Minutes"));
    }

    #[test]
    fn test_missing_audio_file_on_disk() {
        let mut form = complete_form(PathBuf::from("/tmp/meetdoc_missing_audio.mp3"));
        form.participants = "Alice, Bob".to_string();

        let errors = FormState::new(form).validate().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors.get(FormField::AudioFile).unwrap().contains("not found"));
    }

    #[test]
    fn test_editing_a_field_clears_its_error() {
        let mut state = FormState::default();
        let _ = state.validate();
        assert!(state.errors().contains(FormField::MeetingTitle));

        state.set_field(FormField::MeetingTitle, "Board meeting");
        assert!(!state.errors().contains(FormField::MeetingTitle));
        assert_eq!(state.errors().len(), 6);

        state.set_audio_file(None);
        assert!(state.errors().contains(FormField::AudioFile));
        state.set_field(FormField::AudioFile, "/tmp/meeting.wav");
        assert!(!state.errors().contains(FormField::AudioFile));
        assert_eq!(
            state.form().audio_file,
            Some(PathBuf::from("/tmp/meeting.wav"))
        );
    }

    #[test]
    fn test_document_type_parse() {
        assert_eq!(
            DocumentType::parse("procès verbal"),
            Some(DocumentType::ProcesVerbal)
        );
        assert_eq!(
            DocumentType::parse("note-de-reunion"),
            Some(DocumentType::NoteDeReunion)
        );
        assert_eq!(DocumentType::parse("report"), None);
    }

    #[test]
    fn test_wire_names() {
        assert_eq!(FormField::Agenda.wire_name(), "ordreJour");
        assert_eq!(FormField::AudioFile.wire_name(), "audioFile");
        assert_eq!(FormField::DocumentType.wire_name(), "documentType");
    }
}
