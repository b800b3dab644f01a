//! Ticket rating (nota) database operations and per-agent aggregates

use chrono::{Datelike, Local, NaiveDate, NaiveDateTime, Timelike};
use rusqlite::types::Type;
use rusqlite::{params, Row};

use super::super::Database;
use crate::error::{
    is_check_violation, is_foreign_key_violation, is_unique_violation, NotasError, NotasResult,
};
use crate::models::{DailyAverage, Nota, Score, DATE_FORMAT, TIMESTAMP_FORMAT};

impl Database {
    /// Record a rating for a ticket. Each ticket can be rated once.
    pub fn create_nota(
        &self,
        ticket: &str,
        agente: &str,
        at: NaiveDateTime,
        score: Score,
    ) -> NotasResult<Nota> {
        let ticket = ticket.trim();
        if ticket.is_empty() {
            return Err(NotasError::InvalidInput("ticket must not be empty".to_string()));
        }
        // stored with second precision
        let at = at.with_nanosecond(0).unwrap_or(at);

        let conn = self.conn();
        conn.execute(
            "INSERT INTO notas (ticket, agente, data, nota) VALUES (?1, ?2, ?3, ?4)",
            params![
                ticket,
                agente,
                at.format(TIMESTAMP_FORMAT).to_string(),
                score.value()
            ],
        )
        .map_err(|e| {
            if is_unique_violation(&e) {
                NotasError::DuplicateTicket(ticket.to_string())
            } else if is_foreign_key_violation(&e) {
                NotasError::UnknownAgent(agente.to_string())
            } else if is_check_violation(&e) {
                NotasError::InvalidScore(score.value() as i64)
            } else {
                NotasError::Database(e)
            }
        })?;

        log::info!("[DB] Ticket {} rated {} for {}", ticket, score.value(), agente);

        Ok(Nota {
            ticket: ticket.to_string(),
            agente: agente.to_string(),
            data: at,
            score,
        })
    }

    /// Average score of an agent on one calendar day; 0.0 when there are no notes.
    pub fn daily_average(&self, agente: &str, day: NaiveDate) -> NotasResult<f64> {
        let conn = self.conn();
        let avg: Option<f64> = conn.query_row(
            "SELECT AVG(nota) FROM notas WHERE date(data) = ?1 AND agente = ?2",
            params![day.format(DATE_FORMAT).to_string(), agente],
            |row| row.get(0),
        )?;
        Ok(avg.unwrap_or(0.0))
    }

    /// Average score of an agent over one calendar month; 0.0 when there are no notes.
    pub fn monthly_average(&self, agente: &str, year: i32, month: u32) -> NotasResult<f64> {
        let conn = self.conn();
        let avg: Option<f64> = conn.query_row(
            "SELECT AVG(nota) FROM notas WHERE strftime('%Y-%m', data) = ?1 AND agente = ?2",
            params![format!("{:04}-{:02}", year, month), agente],
            |row| row.get(0),
        )?;
        Ok(avg.unwrap_or(0.0))
    }

    pub fn average_today(&self, agente: &str) -> NotasResult<f64> {
        self.daily_average(agente, Local::now().date_naive())
    }

    pub fn average_this_month(&self, agente: &str) -> NotasResult<f64> {
        let today = Local::now().date_naive();
        self.monthly_average(agente, today.year(), today.month())
    }

    /// All notes of an agent, in storage order
    pub fn list_notas(&self, agente: &str) -> NotasResult<Vec<Nota>> {
        let conn = self.conn();
        let mut stmt =
            conn.prepare("SELECT ticket, agente, data, nota FROM notas WHERE agente = ?1")?;
        let notas = stmt
            .query_map([agente], Self::row_to_nota)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(notas)
    }

    /// Per-day average score of an agent, oldest day first
    pub fn daily_averages(&self, agente: &str) -> NotasResult<Vec<DailyAverage>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT date(data) AS dia, AVG(nota) AS media
             FROM notas
             WHERE agente = ?1
             GROUP BY date(data)
             ORDER BY dia",
        )?;
        let averages = stmt
            .query_map([agente], |row| {
                let day: String = row.get(0)?;
                Ok(DailyAverage {
                    day: NaiveDate::parse_from_str(&day, DATE_FORMAT)
                        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e)))?,
                    average: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(averages)
    }

    fn row_to_nota(row: &Row) -> rusqlite::Result<Nota> {
        let data: String = row.get(2)?;
        let score: i64 = row.get(3)?;
        Ok(Nota {
            ticket: row.get(0)?,
            agente: row.get(1)?,
            data: NaiveDateTime::parse_from_str(&data, TIMESTAMP_FORMAT)
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e)))?,
            score: Score::new(score).map_err(|_| rusqlite::Error::IntegralValueOutOfRange(3, score))?,
        })
    }
}
