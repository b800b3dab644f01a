use chrono::Local;
use notas_types::{MessageLevel, Payload, UserMessage};

use super::state::{SessionStage, SessionState};
use crate::auth;
use crate::db::Database;
use crate::error::NotasError;
use crate::models::{Person, Score};
use crate::reporting;

/// Everything a client can do
#[derive(Debug, Clone)]
pub enum Interaction {
    SubmitIdentifier(String),
    SubmitPassword(String),
    Register {
        ra: String,
        nome: String,
        password: String,
    },
    SubmitTicket {
        ticket: String,
        score: i64,
    },
    ShowDashboard,
    RunQuery(String),
    Logout,
}

/// Messages and optional payload produced by one interaction
#[derive(Debug, Clone, Default)]
pub struct Outcome {
    pub messages: Vec<UserMessage>,
    pub payload: Option<Payload>,
}

impl Outcome {
    fn message(level: MessageLevel, text: impl Into<String>) -> Self {
        Self {
            messages: vec![UserMessage::new(level, text)],
            payload: None,
        }
    }

    fn success(text: impl Into<String>) -> Self {
        Self::message(MessageLevel::Success, text)
    }

    fn info(text: impl Into<String>) -> Self {
        Self::message(MessageLevel::Info, text)
    }

    fn warning(text: impl Into<String>) -> Self {
        Self::message(MessageLevel::Warning, text)
    }

    fn error(text: impl Into<String>) -> Self {
        Self::message(MessageLevel::Error, text)
    }

    fn with_payload(payload: Payload) -> Self {
        Self {
            messages: Vec::new(),
            payload: Some(payload),
        }
    }

    #[cfg(test)]
    pub fn has_level(&self, level: MessageLevel) -> bool {
        self.messages.iter().any(|m| m.level == level)
    }
}

/// Applies interactions to a caller-owned `SessionState`.
pub struct InteractionHandler<'a> {
    db: &'a Database,
    query_row_limit: usize,
}

impl<'a> InteractionHandler<'a> {
    pub fn new(db: &'a Database, query_row_limit: usize) -> Self {
        Self { db, query_row_limit }
    }

    pub fn handle(&self, state: &mut SessionState, interaction: Interaction) -> Outcome {
        match interaction {
            Interaction::SubmitIdentifier(identifier) => self.submit_identifier(state, &identifier),
            Interaction::SubmitPassword(password) => self.submit_password(state, &password),
            Interaction::Register { ra, nome, password } => {
                self.register(state, &ra, &nome, &password)
            }
            Interaction::SubmitTicket { ticket, score } => self.submit_ticket(state, &ticket, score),
            Interaction::ShowDashboard => self.show_dashboard(state),
            Interaction::RunQuery(sql) => self.run_query(state, &sql),
            Interaction::Logout => {
                if let Some(person) = state.user() {
                    log::info!("[SESSION] {} logged out", person.ra);
                }
                state.reset();
                Outcome::info("Logged out")
            }
        }
    }

    fn submit_identifier(&self, state: &mut SessionState, identifier: &str) -> Outcome {
        if state.is_authenticated() {
            return Outcome::error("Already logged in");
        }
        if identifier.trim().is_empty() {
            return Outcome::warning("Please enter your RA");
        }

        match self.db.find_person(identifier) {
            Ok(Some(person)) => {
                log::debug!("[SESSION] Identified {}", person.ra);
                state.stage = SessionStage::PasswordPending(person);
                Outcome::info("Enter your password")
            }
            Ok(None) => {
                state.stage = SessionStage::Anonymous;
                state.show_registration = true;
                Outcome::warning("User not found. Please register.")
            }
            Err(e) => {
                log::error!("[SESSION] Lookup failed: {}", e);
                Outcome::error(format!("Database error: {}", e))
            }
        }
    }

    fn submit_password(&self, state: &mut SessionState, password: &str) -> Outcome {
        let SessionStage::PasswordPending(person) = &state.stage else {
            return Outcome::error("Enter your RA first");
        };

        if auth::verify_password(password, &person.password_hash) {
            // Reload so a role granted since identification takes effect.
            let person = match self.db.get_person(&person.ra) {
                Ok(Some(fresh)) => fresh,
                Ok(None) => person.clone(),
                Err(e) => {
                    log::error!("[SESSION] Reload failed for {}: {}", person.ra, e);
                    return Outcome::error(format!("Database error: {}", e));
                }
            };
            log::info!("[SESSION] {} logged in", person.ra);
            state.stage = SessionStage::Authenticated(person);
            Outcome::success("Login successful!")
        } else {
            log::warn!("[SESSION] Wrong password for {}", person.ra);
            state.stage = SessionStage::Anonymous;
            Outcome::warning("Incorrect password!")
        }
    }

    fn register(&self, state: &mut SessionState, ra: &str, nome: &str, password: &str) -> Outcome {
        match self.db.create_person(ra, nome, password) {
            Ok(_) => {
                state.show_registration = false;
                Outcome::success("Registration successful!")
            }
            Err(NotasError::DuplicatePerson(ra)) => {
                Outcome::error(format!("RA {} is already registered", ra))
            }
            Err(NotasError::InvalidInput(msg)) => Outcome::warning(msg),
            Err(e) => {
                log::error!("[SESSION] Registration failed: {}", e);
                Outcome::error(format!("Database error: {}", e))
            }
        }
    }

    fn submit_ticket(&self, state: &SessionState, ticket: &str, score: i64) -> Outcome {
        let Some(person) = state.authenticated_user() else {
            return Outcome::error("Log in to submit tickets");
        };
        let score = match Score::new(score) {
            Ok(score) => score,
            Err(e) => return Outcome::error(e.to_string()),
        };

        match self
            .db
            .create_nota(ticket, &person.ra, Local::now().naive_local(), score)
        {
            Ok(_) => Outcome::success("Ticket and score submitted!"),
            Err(NotasError::DuplicateTicket(_)) => Outcome::error("Ticket already submitted"),
            Err(NotasError::InvalidInput(msg)) => Outcome::warning(msg),
            Err(e) => {
                log::error!("[SESSION] Ticket submission failed: {}", e);
                Outcome::error(format!("Database error: {}", e))
            }
        }
    }

    fn show_dashboard(&self, state: &SessionState) -> Outcome {
        let Some(person) = state.authenticated_user() else {
            return Outcome::error("Log in to see your notes");
        };

        match reporting::agent_report(self.db, person) {
            Ok(report) => {
                let empty = report.table.rows.is_empty();
                let mut outcome = Outcome::with_payload(Payload::Report(report));
                if empty {
                    outcome
                        .messages
                        .push(UserMessage::new(MessageLevel::Info, "No notes registered."));
                }
                outcome
            }
            Err(e) => {
                log::error!("[SESSION] Report failed for {}: {}", person.ra, e);
                Outcome::error(format!("Database error: {}", e))
            }
        }
    }

    fn run_query(&self, state: &SessionState, sql: &str) -> Outcome {
        let Some(person) = state.authenticated_user() else {
            return Outcome::error("Log in to run queries");
        };
        if !person.is_admin() {
            return Outcome::error("Ad-hoc queries require the admin role");
        }
        if sql.trim().is_empty() {
            return Outcome::warning("Please enter an SQL query.");
        }

        self.query_as(person, sql)
    }

    fn query_as(&self, person: &Person, sql: &str) -> Outcome {
        match self.db.run_adhoc_query(person, sql, self.query_row_limit) {
            Ok(table) => Outcome::with_payload(Payload::Query(table)),
            Err(e) => Outcome::error(format!("Error running query: {}", e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use notas_types::Stage;

    fn handler(db: &Database) -> InteractionHandler<'_> {
        InteractionHandler::new(db, 100)
    }

    fn login(h: &InteractionHandler<'_>, state: &mut SessionState, id: &str, pw: &str) -> Outcome {
        h.handle(state, Interaction::SubmitIdentifier(id.to_string()));
        h.handle(state, Interaction::SubmitPassword(pw.to_string()))
    }

    #[test]
    fn test_unknown_id_surfaces_registration() {
        let db = Database::open_in_memory().unwrap();
        let h = handler(&db);
        let mut state = SessionState::new();

        let outcome = h.handle(&mut state, Interaction::SubmitIdentifier("A1".to_string()));
        assert!(outcome.has_level(MessageLevel::Warning));
        assert!(state.show_registration);
        assert_eq!(state.stage_kind(), Stage::Anonymous);
    }

    #[test]
    fn test_correct_password_authenticates() {
        let db = Database::open_in_memory().unwrap();
        db.create_person("A1", "Alice", "pw").unwrap();
        let h = handler(&db);
        let mut state = SessionState::new();

        let outcome = h.handle(&mut state, Interaction::SubmitIdentifier("Alice".to_string()));
        assert_eq!(state.stage_kind(), Stage::PasswordPending);
        assert!(!outcome.has_level(MessageLevel::Error));

        let outcome = h.handle(&mut state, Interaction::SubmitPassword("pw".to_string()));
        assert!(outcome.has_level(MessageLevel::Success));
        assert_eq!(state.authenticated_user().map(|p| p.ra.as_str()), Some("A1"));
    }

    #[test]
    fn test_wrong_password_returns_to_anonymous() {
        let db = Database::open_in_memory().unwrap();
        db.create_person("A1", "Alice", "pw").unwrap();
        let h = handler(&db);
        let mut state = SessionState::new();

        let outcome = login(&h, &mut state, "A1", "nope");
        assert!(outcome.has_level(MessageLevel::Warning));
        assert_eq!(state.stage, SessionStage::Anonymous);

        // retry works
        login(&h, &mut state, "A1", "pw");
        assert!(state.is_authenticated());
    }

    #[test]
    fn test_password_without_identifier_is_refused() {
        let db = Database::open_in_memory().unwrap();
        let h = handler(&db);
        let mut state = SessionState::new();

        let outcome = h.handle(&mut state, Interaction::SubmitPassword("pw".to_string()));
        assert!(outcome.has_level(MessageLevel::Error));
        assert_eq!(state, SessionState::default());
    }

    #[test]
    fn test_register_hides_form_and_duplicate_keeps_it() {
        let db = Database::open_in_memory().unwrap();
        let h = handler(&db);
        let mut state = SessionState::new();
        h.handle(&mut state, Interaction::SubmitIdentifier("A1".to_string()));
        assert!(state.show_registration);

        let register = Interaction::Register {
            ra: "A1".to_string(),
            nome: "Alice".to_string(),
            password: "pw".to_string(),
        };
        let outcome = h.handle(&mut state, register.clone());
        assert!(outcome.has_level(MessageLevel::Success));
        assert!(!state.show_registration);

        state.show_registration = true;
        let outcome = h.handle(&mut state, register);
        assert!(outcome.has_level(MessageLevel::Error));
        assert!(state.show_registration);
    }

    #[test]
    fn test_ticket_requires_login_and_valid_score() {
        let db = Database::open_in_memory().unwrap();
        db.create_person("A1", "Alice", "pw").unwrap();
        let h = handler(&db);
        let mut state = SessionState::new();

        let submit = |score| Interaction::SubmitTicket {
            ticket: "T1".to_string(),
            score,
        };

        assert!(h.handle(&mut state, submit(5)).has_level(MessageLevel::Error));

        login(&h, &mut state, "A1", "pw");
        assert!(h.handle(&mut state, submit(11)).has_level(MessageLevel::Error));
        assert!(h.handle(&mut state, submit(-1)).has_level(MessageLevel::Error));
        assert!(db.list_notas("A1").unwrap().is_empty());

        assert!(h.handle(&mut state, submit(5)).has_level(MessageLevel::Success));
        let duplicate = h.handle(&mut state, submit(6));
        assert_eq!(duplicate.messages[0].text, "Ticket already submitted");
        assert!(state.is_authenticated());
    }

    #[test]
    fn test_query_requires_admin_role() {
        let db = Database::open_in_memory().unwrap();
        db.create_person("A1", "Alice", "pw").unwrap();
        db.create_person("ADM", "TESTE", "pw").unwrap();
        db.set_role("ADM", Role::Admin).unwrap();
        let h = handler(&db);

        let mut agent = SessionState::new();
        login(&h, &mut agent, "A1", "pw");
        let outcome = h.handle(&mut agent, Interaction::RunQuery("SELECT 1".to_string()));
        assert!(outcome.has_level(MessageLevel::Error));
        assert!(outcome.payload.is_none());

        let mut admin = SessionState::new();
        login(&h, &mut admin, "ADM", "pw");
        let empty = h.handle(&mut admin, Interaction::RunQuery("  ".to_string()));
        assert!(empty.has_level(MessageLevel::Warning));

        let outcome = h.handle(&mut admin, Interaction::RunQuery("SELECT 1 AS one".to_string()));
        match outcome.payload {
            Some(Payload::Query(table)) => {
                assert_eq!(table.columns, vec!["one"]);
                assert_eq!(table.rows, vec![vec![serde_json::Value::from(1)]]);
            }
            other => panic!("expected query payload, got {:?}", other),
        }

        let failed = h.handle(&mut admin, Interaction::RunQuery("DROP TABLE notas".to_string()));
        assert!(failed.has_level(MessageLevel::Error));
    }

    #[test]
    fn test_query_gate_refuses_transactions_pragmas_and_batches() {
        let db = Database::open_in_memory().unwrap();
        db.create_person("A1", "Alice", "pw").unwrap();
        db.create_person("ADM", "Root", "pw").unwrap();
        db.set_role("ADM", Role::Admin).unwrap();
        let h = handler(&db);
        let mut admin = SessionState::new();
        login(&h, &mut admin, "ADM", "pw");

        for sql in ["BEGIN", "PRAGMA foreign_keys = OFF", "SELECT 1; DROP TABLE notas"] {
            let outcome = h.handle(&mut admin, Interaction::RunQuery(sql.to_string()));
            assert!(outcome.has_level(MessageLevel::Error), "{} was accepted", sql);
            assert!(outcome.payload.is_none());
        }
        assert!(admin.is_authenticated());

        // tables, foreign keys and autocommit all survive
        let mut agent = SessionState::new();
        login(&h, &mut agent, "A1", "pw");
        let submit = Interaction::SubmitTicket {
            ticket: "T1".to_string(),
            score: 7,
        };
        assert!(h.handle(&mut agent, submit).has_level(MessageLevel::Success));
        assert_eq!(db.list_notas("A1").unwrap().len(), 1);
        assert!(matches!(
            db.create_nota("T2", "ghost", Local::now().naive_local(), Score::new(5).unwrap()),
            Err(NotasError::UnknownAgent(_))
        ));
    }

    #[test]
    fn test_second_identifier_switches_pending_person() {
        let db = Database::open_in_memory().unwrap();
        db.create_person("A1", "Alice", "pw-a").unwrap();
        db.create_person("B1", "Bob", "pw-b").unwrap();
        let h = handler(&db);
        let mut state = SessionState::new();

        h.handle(&mut state, Interaction::SubmitIdentifier("A1".to_string()));
        let outcome = h.handle(&mut state, Interaction::SubmitIdentifier("B1".to_string()));
        assert!(!outcome.has_level(MessageLevel::Error));
        assert_eq!(state.user().map(|p| p.ra.as_str()), Some("B1"));

        let outcome = h.handle(&mut state, Interaction::SubmitPassword("pw-b".to_string()));
        assert!(outcome.has_level(MessageLevel::Success));
        assert_eq!(state.authenticated_user().map(|p| p.ra.as_str()), Some("B1"));
    }

    #[test]
    fn test_role_granted_after_identify_applies_at_login() {
        let db = Database::open_in_memory().unwrap();
        db.create_person("ADM", "Root", "pw").unwrap();
        let h = handler(&db);
        let mut state = SessionState::new();

        h.handle(&mut state, Interaction::SubmitIdentifier("ADM".to_string()));
        db.set_role("ADM", Role::Admin).unwrap();
        h.handle(&mut state, Interaction::SubmitPassword("pw".to_string()));

        assert!(state.authenticated_user().unwrap().is_admin());
    }

    #[test]
    fn test_logout_resets_everything() {
        let db = Database::open_in_memory().unwrap();
        db.create_person("A1", "Alice", "pw").unwrap();
        let h = handler(&db);
        let mut state = SessionState::new();
        login(&h, &mut state, "A1", "pw");
        state.show_registration = true;

        h.handle(&mut state, Interaction::Logout);
        assert_eq!(state, SessionState::default());
    }

    #[test]
    fn test_end_to_end_register_login_rate() {
        let db = Database::open_in_memory().unwrap();
        let h = handler(&db);
        let mut state = SessionState::new();

        h.handle(
            &mut state,
            Interaction::Register {
                ra: "A1".to_string(),
                nome: "Alice".to_string(),
                password: "pw".to_string(),
            },
        );
        login(&h, &mut state, "A1", "pw");
        assert!(state.is_authenticated());

        let outcome = h.handle(
            &mut state,
            Interaction::SubmitTicket {
                ticket: "T1".to_string(),
                score: 8,
            },
        );
        assert!(outcome.has_level(MessageLevel::Success));

        let today = Local::now().date_naive();
        let notas = db.list_notas("A1").unwrap();
        assert_eq!(notas.len(), 1);
        assert_eq!(notas[0].ticket, "T1");
        assert_eq!(notas[0].data.date(), today);
        assert_eq!(notas[0].score.value(), 8);
        assert_eq!(db.daily_average("A1", today).unwrap(), 8.0);

        let outcome = h.handle(&mut state, Interaction::ShowDashboard);
        let Some(Payload::Report(report)) = outcome.payload else {
            panic!("expected report payload");
        };
        assert_eq!(report.daily_average_text, "8.00");
        assert_eq!(report.table.rows.len(), 1);
        let chart = report.chart.expect("chart expected");
        assert_eq!(chart.averages, vec![8.0]);
    }
}
