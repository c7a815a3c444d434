use std::io;
use std::path::PathBuf;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid schedule definition at `{path}`")]
    Schedule {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid range expression {expression:?}")]
    Range {
        expression: String,
        #[source]
        source: RangeError,
    },

    #[error("unrecognized weekday code {0:?}")]
    WeekdayCode(String),

    #[error("lesson slot {slot} is outside the configured slots 1..={count}")]
    SlotOutOfRange { slot: u32, count: usize },

    #[error("no lesson slots configured")]
    NoSlots,

    #[error("{year}-{month:02} is not a calendar month")]
    InvalidMonth { year: i32, month: u32 },

    #[error("lesson {lesson:?} has an invalid `{field}` value")]
    Lesson {
        lesson: String,
        field: &'static str,
        #[source]
        source: Box<Error>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RangeError {
    #[error("empty token")]
    EmptyToken,

    #[error("{0:?} is not a non-negative integer")]
    NotANumber(String),

    #[error("range {start}-{end} has reversed bounds")]
    Reversed { start: u32, end: u32 },

    #[error("{value} is above the largest allowed value {max}")]
    TooLarge { value: u32, max: u32 },
}
