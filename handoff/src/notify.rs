//! User-visible notifications and their localized texts.
//!
//! Exchange failures are never surfaced in detail. The user sees one generic
//! message in the configured language; the cause only goes to the log.

use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    De,
    Fr,
    It,
    En,
}

impl Language {
    /// Parse a language code such as `fr` or `fr-CH`. Unknown codes map to
    /// the default language.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let code = raw.trim().split(['-', '_']).next().unwrap_or_default();
        match code.to_ascii_lowercase().as_str() {
            "fr" => Self::Fr,
            "it" => Self::It,
            "en" => Self::En,
            _ => Self::De,
        }
    }

    /// Text shown when a portal login could not be completed.
    #[must_use]
    pub fn exchange_failure_message(self) -> &'static str {
        match self {
            Self::De => "Die Anmeldung über das Portal ist fehlgeschlagen. Bitte starten Sie die Anmeldung erneut im Portal.",
            Self::Fr => "La connexion via le portail a échoué. Veuillez recommencer la connexion depuis le portail.",
            Self::It => "L'accesso tramite il portale non è riuscito. Si prega di ripetere l'accesso dal portale.",
            Self::En => "Signing in through the portal failed. Please start the login again from the portal.",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Info,
    Danger,
}

/// One message queued for display on the next page the user sees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

impl Notification {
    #[must_use]
    pub fn danger(message: impl Into<String>) -> Self {
        Self { level: NotificationLevel::Danger, message: message.into() }
    }

    #[must_use]
    pub fn exchange_failed(language: Language) -> Self {
        Self::danger(language.exchange_failure_message())
    }
}

#[cfg(test)]
#[path = "notify_test.rs"]
mod tests;
