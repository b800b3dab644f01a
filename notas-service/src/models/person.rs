use notas_types::PersonView;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::NotasError;

/// Authorization level of a person
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Agent,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Agent => "agent",
            Role::Admin => "admin",
        }
    }
}

impl FromStr for Role {
    type Err = NotasError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "agent" => Ok(Role::Agent),
            "admin" => Ok(Role::Admin),
            other => Err(NotasError::InvalidInput(format!("unknown role {:?}", other))),
        }
    }
}

/// A registered agent. `password_hash` holds the encoded salted digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Person {
    pub ra: String,
    pub nome: String,
    pub password_hash: String,
    pub role: Role,
}

impl Person {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn to_view(&self) -> PersonView {
        PersonView {
            ra: self.ra.clone(),
            nome: self.nome.clone(),
            role: self.role.as_str().to_string(),
        }
    }
}
