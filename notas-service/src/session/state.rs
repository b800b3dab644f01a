use notas_types::{Payload, SessionView, Stage, UserMessage};

use crate::models::Person;

/// Position in the login flow. The person travels with the stage so an
/// authenticated session always knows who it belongs to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionStage {
    #[default]
    Anonymous,
    PasswordPending(Person),
    Authenticated(Person),
}

/// Everything one client's session remembers between interactions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub stage: SessionStage,
    /// Registration form should be offered
    pub show_registration: bool,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user(&self) -> Option<&Person> {
        match &self.stage {
            SessionStage::Anonymous => None,
            SessionStage::PasswordPending(person) | SessionStage::Authenticated(person) => {
                Some(person)
            }
        }
    }

    /// The logged-in person, if any
    pub fn authenticated_user(&self) -> Option<&Person> {
        match &self.stage {
            SessionStage::Authenticated(person) => Some(person),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated_user().is_some()
    }

    pub fn stage_kind(&self) -> Stage {
        match self.stage {
            SessionStage::Anonymous => Stage::Anonymous,
            SessionStage::PasswordPending(_) => Stage::PasswordPending,
            SessionStage::Authenticated(_) => Stage::Authenticated,
        }
    }

    /// Back to the initial state
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn to_view(&self, messages: Vec<UserMessage>, payload: Option<Payload>) -> SessionView {
        SessionView {
            stage: self.stage_kind(),
            user: self.user().map(Person::to_view),
            show_registration: self.show_registration,
            messages,
            payload,
        }
    }
}
