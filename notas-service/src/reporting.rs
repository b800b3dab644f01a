//! Turns query results into table and chart structures for display.

use notas_types::{AgentReport, DailyAverageChart, NotesTable, NotesTableRow};

use crate::db::Database;
use crate::error::NotasResult;
use crate::models::{DailyAverage, Nota, Person, DATE_FORMAT, TIMESTAMP_FORMAT};

pub const NOTES_COLUMNS: [&str; 3] = ["Ticket", "Date", "Score"];
pub const CHART_TITLE: &str = "Average score per day";

pub fn notes_table(notas: &[Nota]) -> NotesTable {
    NotesTable {
        columns: NOTES_COLUMNS.iter().map(|c| c.to_string()).collect(),
        rows: notas
            .iter()
            .map(|n| NotesTableRow {
                ticket: n.ticket.clone(),
                date: n.data.format(TIMESTAMP_FORMAT).to_string(),
                score: n.score.value(),
            })
            .collect(),
    }
}

/// Bar chart of per-day averages; `None` when there is nothing to plot
pub fn daily_average_chart(averages: &[DailyAverage]) -> Option<DailyAverageChart> {
    if averages.is_empty() {
        return None;
    }
    Some(DailyAverageChart {
        title: CHART_TITLE.to_string(),
        x_label: "Day".to_string(),
        y_label: "Average".to_string(),
        days: averages.iter().map(|a| a.day.format(DATE_FORMAT).to_string()).collect(),
        averages: averages.iter().map(|a| a.average).collect(),
    })
}

pub fn format_average(value: f64) -> String {
    format!("{:.2}", value)
}

/// Dashboard for one agent: today's and this month's averages, the notes
/// table and, when there are notes, the per-day chart.
pub fn agent_report(db: &Database, person: &Person) -> NotasResult<AgentReport> {
    let notas = db.list_notas(&person.ra)?;
    let daily_average = db.average_today(&person.ra)?;
    let monthly_average = db.average_this_month(&person.ra)?;

    let chart = if notas.is_empty() {
        None
    } else {
        daily_average_chart(&db.daily_averages(&person.ra)?)
    };

    Ok(AgentReport {
        greeting: format!("Welcome, {}!", person.nome),
        daily_average,
        monthly_average,
        daily_average_text: format_average(daily_average),
        monthly_average_text: format_average(monthly_average),
        table: notes_table(&notas),
        chart,
    })
}
