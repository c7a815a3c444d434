use std::fs;
use std::path::Path;

use chrono::{NaiveDate, NaiveTime};
use once_cell::sync::Lazy;
use serde::{Deserialize, Deserializer};

use crate::{Error, Result};

/// The nine-period day used when a schedule does not list its own lesson times.
pub static DEFAULT_LESSON_TIMES: Lazy<Vec<LessonSlot>> = Lazy::new(|| {
    [
        ((8, 0), (8, 45)),
        ((8, 50), (9, 35)),
        ((9, 55), (10, 40)),
        ((10, 45), (11, 30)),
        ((11, 35), (12, 20)),
        ((13, 30), (14, 15)),
        ((14, 20), (15, 5)),
        ((15, 15), (16, 0)),
        ((16, 5), (16, 50)),
    ]
    .into_iter()
    .filter_map(|((start_hour, start_minute), (end_hour, end_minute))| {
        Some(LessonSlot {
            start: NaiveTime::from_hms_opt(start_hour, start_minute, 0)?,
            end: NaiveTime::from_hms_opt(end_hour, end_minute, 0)?,
        })
    })
    .collect()
});

fn deserialize_clock_time<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
    let raw = String::deserialize(deserializer)?;
    NaiveTime::parse_from_str(raw.trim(), "%H:%M").map_err(serde::de::Error::custom)
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Schedule {
    pub semester_start_day: NaiveDate,
    #[serde(default)]
    pub lesson_times: Option<Vec<LessonSlot>>,
    pub lessons: Vec<Lesson>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Lesson {
    pub name: String,
    pub student: String,
    pub week_day: Vec<OccurrencePattern>,
}

/// One recurrence of a lesson. `week` and `lesson` hold range expressions
/// such as `"1-3,5"`, `day` a weekday code.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OccurrencePattern {
    pub room: String,
    pub day: String,
    pub week: String,
    pub lesson: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct LessonSlot {
    #[serde(deserialize_with = "deserialize_clock_time")]
    pub start: NaiveTime,
    #[serde(deserialize_with = "deserialize_clock_time")]
    pub end: NaiveTime,
}

impl LessonSlot {
    /// Header label for the slot numbered `number`, e.g. `"1\n8:00-8:45"`.
    #[must_use]
    pub fn label(&self, number: usize) -> String {
        format!(
            "{number}\n{}-{}",
            self.start.format("%-H:%M"),
            self.end.format("%-H:%M")
        )
    }
}

impl Schedule {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let mut deserializer = serde_json::Deserializer::from_str(json);
        let schedule =
            serde_path_to_error::deserialize(&mut deserializer).map_err(|err| Error::Schedule {
                path: err.path().to_string(),
                source: err.into_inner(),
            })?;

        deserializer.end().map_err(|source| Error::Schedule {
            path: ".".to_string(),
            source,
        })?;

        Ok(schedule)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_json_str(&json)
    }

    #[must_use]
    pub fn lesson_times(&self) -> &[LessonSlot] {
        self.lesson_times
            .as_deref()
            .unwrap_or(DEFAULT_LESSON_TIMES.as_slice())
    }
}
