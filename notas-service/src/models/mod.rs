mod nota;
mod person;

pub use nota::{DailyAverage, Nota, Score, DATE_FORMAT, TIMESTAMP_FORMAT};
pub use person::{Person, Role};
