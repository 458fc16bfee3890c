//! Interactive completion of the meeting form.
//!
//! Only fields that are still empty are asked for; values given on the
//! command line are kept as they are.

use anyhow::Result;
use chrono::{Local, NaiveDate};
use dialoguer::{theme::ColorfulTheme, Input, Select};
use std::path::PathBuf;

use crate::form::{DocumentType, FormField, FormState, LANGUAGES};

pub fn fill_missing(state: &mut FormState) -> Result<()> {
    let theme = ColorfulTheme::default();

    if state.form().document_type.trim().is_empty() {
        let items: Vec<&str> = DocumentType::ALL.iter().map(|t| t.as_str()).collect();
        let selection = Select::with_theme(&theme)
            .with_prompt(FormField::DocumentType.label())
            .items(&items)
            .default(0)
            .interact()?;
        state.set_field(FormField::DocumentType, items[selection]);
    }

    prompt_required(&theme, state, FormField::MeetingTitle)?;

    if state.form().meeting_date.trim().is_empty() {
        let date: String = Input::with_theme(&theme)
            .with_prompt(format!("{} (YYYY-MM-DD)", FormField::MeetingDate.label()))
            .default(Local::now().format("%Y-%m-%d").to_string())
            .validate_with(|input: &String| -> Result<(), &'static str> {
                NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d")
                    .map(|_| ())
                    .map_err(|_| "Use the YYYY-MM-DD format")
            })
            .interact_text()?;
        state.set_field(FormField::MeetingDate, date);
    }

    prompt_required(&theme, state, FormField::MainObjective)?;

    if state.form().participants.trim().is_empty() {
        let participants: String = Input::with_theme(&theme)
            .with_prompt(format!("{} (optional)", FormField::Participants.label()))
            .allow_empty(true)
            .interact_text()?;
        state.set_field(FormField::Participants, participants);
    }

    if state.form().audio_file.is_none() {
        let path: String = Input::with_theme(&theme)
            .with_prompt(FormField::AudioFile.label())
            .validate_with(|input: &String| -> Result<(), &'static str> {
                if PathBuf::from(input.trim()).is_file() {
                    Ok(())
                } else {
                    Err("File not found")
                }
            })
            .interact_text()?;
        state.set_audio_file(Some(PathBuf::from(path.trim())));
    }

    if state.form().language.trim().is_empty() {
        let items: Vec<String> = LANGUAGES
            .iter()
            .map(|(code, name)| format!("{} ({})", name, code))
            .collect();
        let selection = Select::with_theme(&theme)
            .with_prompt(FormField::Language.label())
            .items(&items)
            .default(0)
            .interact()?;
        state.set_field(FormField::Language, LANGUAGES[selection].0);
    }

    prompt_required(&theme, state, FormField::Agenda)?;

    Ok(())
}

fn prompt_required(theme: &ColorfulTheme, state: &mut FormState, field: FormField) -> Result<()> {
    let current = match field {
        FormField::MeetingTitle => &state.form().meeting_title,
        FormField::MainObjective => &state.form().main_objective,
        FormField::Agenda => &state.form().agenda,
        _ => return Ok(()),
    };
    if !current.trim().is_empty() {
        return Ok(());
    }

    let value: String = Input::with_theme(theme)
        .with_prompt(field.label())
        .validate_with(|input: &String| -> Result<(), &'static str> {
            if input.trim().is_empty() {
                Err("This field is required")
            } else {
                Ok(())
            }
        })
        .interact_text()?;
    state.set_field(field, value);
    Ok(())
}
