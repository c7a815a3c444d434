use chrono::{Datelike, NaiveDate, TimeDelta, Weekday};
use log::debug;

use crate::{iso_weekday, parse_ranges, CalendarBuilder, Error, Lesson, OccurrencePattern, Result};

/// A lesson placed on a concrete date, spanning `first_slot..=last_slot`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occurrence {
    pub date: NaiveDate,
    pub first_slot: u32,
    pub last_slot: u32,
    pub name: String,
    pub student: String,
    pub room: String,
}

impl Occurrence {
    #[must_use]
    pub fn label(&self) -> String {
        format!("{}\n{} {}", self.name, self.student, self.room)
    }
}

/// Dates falling on `weekday` in each of the given semester weeks. Weeks
/// whose date is not representable are skipped.
pub fn lesson_dates(
    semester_start: NaiveDate,
    weeks: &[u32],
    weekday: Weekday,
) -> impl Iterator<Item = NaiveDate> + '_ {
    weeks.iter().filter_map(move |&week| {
        let offset = (i64::from(week) - 1) * 7 + i64::from(weekday.num_days_from_monday());
        semester_start.checked_add_signed(TimeDelta::try_days(offset)?)
    })
}

struct ResolvedPattern {
    weeks: Vec<u32>,
    weekday: Weekday,
    first_slot: u32,
    last_slot: u32,
}

impl OccurrencePattern {
    fn resolve(&self, lesson: &Lesson, slot_count: usize) -> Result<ResolvedPattern> {
        let context = |field, source| Error::Lesson {
            lesson: lesson.name.clone(),
            field,
            source: Box::new(source),
        };

        let weeks = parse_ranges(&self.week).map_err(|err| context("week", err))?;
        let weekday = iso_weekday(&self.day).map_err(|err| context("day", err))?;
        let slots = parse_ranges(&self.lesson).map_err(|err| context("lesson", err))?;

        // Only the outer slots matter: the cell is merged across everything between.
        let (Some(&first_slot), Some(&last_slot)) = (slots.first(), slots.last()) else {
            return Err(context("lesson", Error::NoSlots));
        };

        for slot in [first_slot, last_slot] {
            if slot == 0 || slot as usize > slot_count {
                return Err(context(
                    "lesson",
                    Error::SlotOutOfRange {
                        slot,
                        count: slot_count,
                    },
                ));
            }
        }

        Ok(ResolvedPattern {
            weeks,
            weekday,
            first_slot,
            last_slot,
        })
    }
}

impl CalendarBuilder {
    /// Places every occurrence of `lessons` that falls within the month.
    /// Occurrences in other months are dropped.
    pub fn overlay(mut self, lessons: &[Lesson]) -> Result<Self> {
        for lesson in lessons {
            for pattern in &lesson.week_day {
                let resolved = pattern.resolve(lesson, self.slots.len())?;

                for date in lesson_dates(self.semester_start, &resolved.weeks, resolved.weekday) {
                    if date.month() != self.month {
                        debug!(
                            "Skipping {} on {date}: outside {}-{:02}",
                            lesson.name, self.year, self.month
                        );
                        continue;
                    }

                    let occurrence = Occurrence {
                        date,
                        first_slot: resolved.first_slot,
                        last_slot: resolved.last_slot,
                        name: lesson.name.clone(),
                        student: lesson.student.clone(),
                        room: pattern.room.clone(),
                    };

                    if !self.place(occurrence) {
                        debug!("Skipping {} on {date}: no calendar row", lesson.name);
                    }
                }
            }
        }

        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Effect, DEFAULT_LESSON_TIMES};

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn lesson(name: &str, week: &str, day: &str, slots: &str) -> Lesson {
        Lesson {
            name: name.to_string(),
            student: "CS-1".to_string(),
            week_day: vec![OccurrencePattern {
                room: "A101".to_string(),
                day: day.to_string(),
                week: week.to_string(),
                lesson: slots.to_string(),
            }],
        }
    }

    fn builder(month: u32) -> CalendarBuilder {
        CalendarBuilder::new(2024, month, date(2024, 9, 2), &DEFAULT_LESSON_TIMES).unwrap()
    }

    #[test]
    fn computes_dates_from_week_and_weekday() {
        let dates = lesson_dates(date(2024, 9, 2), &[1, 2, 6], Weekday::Wed).collect::<Vec<_>>();

        assert_eq!(
            dates,
            vec![date(2024, 9, 4), date(2024, 9, 11), date(2024, 10, 9)]
        );
    }

    #[test]
    fn week_zero_lands_before_the_start() {
        let dates = lesson_dates(date(2024, 9, 2), &[0], Weekday::Mon).collect::<Vec<_>>();

        assert_eq!(dates, vec![date(2024, 8, 26)]);
    }

    #[test]
    fn merges_non_contiguous_slots_into_one_cell() {
        let grid = builder(9)
            .overlay(&[lesson("Physics", "1", "T", "3,5")])
            .unwrap()
            .finish();

        let row = grid.row_for(date(2024, 9, 3)).unwrap();
        assert_eq!(grid.rows()[row][4], "Physics\nCS-1 A101");
        assert!(grid.rows()[row][5..].iter().all(String::is_empty));

        let span = grid
            .styles()
            .iter()
            .rev()
            .find(|style| style.effect == Effect::Span)
            .unwrap();
        assert_eq!((span.from.col, span.to.col), (4, 6));
        assert_eq!(grid.occurrences()[0].first_slot, 3);
        assert_eq!(grid.occurrences()[0].last_slot, 5);
    }

    #[test]
    fn later_lessons_overwrite_earlier_ones() {
        let grid = builder(9)
            .overlay(&[
                lesson("Physics", "1", "M", "1-2"),
                lesson("Chemistry", "1", "M", "1-2"),
            ])
            .unwrap()
            .finish();

        let row = grid.row_for(date(2024, 9, 2)).unwrap();
        assert_eq!(grid.rows()[row][2], "Chemistry\nCS-1 A101");
        assert_eq!(grid.occurrences().len(), 2);
    }

    #[test]
    fn drops_dates_in_other_months() {
        let grid = builder(10)
            .overlay(&[lesson("Physics", "1-6", "M", "1")])
            .unwrap()
            .finish();

        let dates = grid
            .occurrences()
            .iter()
            .map(|occurrence| occurrence.date)
            .collect::<Vec<_>>();

        assert_eq!(dates, vec![date(2024, 10, 7)]);
    }

    #[test]
    fn same_month_of_another_year_is_not_placed() {
        let grid = builder(9)
            .overlay(&[lesson("Physics", "53", "M", "1")])
            .unwrap()
            .finish();

        assert!(grid.occurrences().is_empty());
    }

    #[test]
    fn errors_name_lesson_and_field() {
        let cases = [
            (lesson("Physics", "1-x", "M", "1"), "week"),
            (lesson("Physics", "1", "X", "1"), "day"),
            (lesson("Physics", "1", "M", "0-2"), "lesson"),
            (lesson("Physics", "1", "M", "9-10"), "lesson"),
        ];

        for (lesson, expected_field) in cases {
            match builder(9).overlay(&[lesson]) {
                Err(Error::Lesson { lesson, field, .. }) => {
                    assert_eq!(lesson, "Physics");
                    assert_eq!(field, expected_field);
                }
                other => panic!("expected lesson error, got {other:?}"),
            }
        }
    }

    #[test]
    fn slot_beyond_table_reports_the_slot() {
        let err = builder(9)
            .overlay(&[lesson("Physics", "1", "M", "8-10")])
            .unwrap_err();

        match err {
            Error::Lesson { source, .. } => {
                assert!(matches!(*source, Error::SlotOutOfRange { slot: 10, count: 9 }))
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
