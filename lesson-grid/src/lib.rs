//! Places a semester's recurring lessons onto a printable month grid.
//!
//! A [`Schedule`] anchors lessons to a semester start date. For a target
//! month, [`CalendarBuilder`] lays out one row per date and one column per
//! lesson slot, [`CalendarBuilder::overlay`] writes every lesson occurrence
//! of that month into its row, and [`CalendarBuilder::finish`] hands back the
//! [`CalendarGrid`] together with the [`StyleDirective`]s a renderer needs.

mod error;
mod grid;
mod month;
mod overlay;
mod parser;
mod structs;

#[cfg(feature = "ics")]
mod ics;

pub use error::{Error, RangeError, Result};
pub use grid::{
    week_of_semester, weekday_name, Align, CalendarBuilder, CalendarGrid, Cell, Color, Effect,
    StyleDirective, VAlign, LEADING_COLUMNS, TWO_LINE_LEADING, WEEKDAY_NAMES,
};
pub use month::MonthView;
pub use overlay::{lesson_dates, Occurrence};
pub use parser::{iso_weekday, parse_ranges, MAX_RANGE_VALUE};
pub use structs::{Lesson, LessonSlot, OccurrencePattern, Schedule, DEFAULT_LESSON_TIMES};
