use std::collections::HashSet;

use ics::{
    escape_text,
    properties::{Description, DtEnd, DtStart, Location, Summary},
};
use log::debug;

use crate::{CalendarGrid, LessonSlot, Occurrence};

impl CalendarGrid {
    /// The month's placed lessons as floating-time events.
    #[must_use]
    pub fn to_ics(&self) -> ics::ICalendar<'_> {
        let mut icalendar = ics::ICalendar::new(
            "2.0",
            format!(
                "-//lesson-calendar//{}-{:02}//EN",
                self.year(),
                self.month()
            ),
        );

        let mut uids = HashSet::new();

        for occurrence in self.occurrences() {
            if !uids.insert(occurrence.uid()) {
                debug!(
                    "Skipping duplicate event {} on {}",
                    occurrence.name, occurrence.date
                );
                continue;
            }

            if let Some(event) = occurrence.to_ics(self.slots()) {
                icalendar.add_event(event);
            }
        }

        icalendar
    }
}

impl Occurrence {
    /// Identifies the occurrence by date, slot range, name and room.
    #[must_use]
    pub fn uid(&self) -> String {
        format!(
            "{}_{}-{}_{}_{}",
            self.date.format("%Y%m%d"),
            self.first_slot,
            self.last_slot,
            self.name,
            self.room
        )
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
    }

    /// `None` if the occurrence refers to slots missing from `slots`.
    #[must_use]
    pub fn to_ics(&self, slots: &[LessonSlot]) -> Option<ics::Event<'_>> {
        let first = slots.get(self.first_slot.checked_sub(1)? as usize)?;
        let last = slots.get(self.last_slot.checked_sub(1)? as usize)?;

        let start = format!(
            "{}T{}00",
            self.date.format("%Y%m%d"),
            first.start.format("%H%M")
        );

        let end = format!(
            "{}T{}00",
            self.date.format("%Y%m%d"),
            last.end.format("%H%M")
        );

        let mut ics_event = ics::Event::new(self.uid(), start.clone());

        ics_event.push(DtStart::new(start));
        ics_event.push(DtEnd::new(end));
        ics_event.push(Summary::new(escape_text(self.name.as_str())));
        ics_event.push(Location::new(escape_text(self.room.as_str())));
        ics_event.push(Description::new(escape_text(self.student.as_str())));

        Some(ics_event)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use crate::{CalendarBuilder, Lesson, OccurrencePattern, DEFAULT_LESSON_TIMES};

    #[test]
    fn exports_one_event_per_occurrence() {
        let lessons = [Lesson {
            name: "Data Structures".to_string(),
            student: "CS-2".to_string(),
            week_day: vec![OccurrencePattern {
                room: "Lab 3".to_string(),
                day: "M".to_string(),
                week: "1-2".to_string(),
                lesson: "1-2".to_string(),
            }],
        }];

        let start = NaiveDate::from_ymd_opt(2024, 9, 2).unwrap();
        let grid = CalendarBuilder::new(2024, 9, start, &DEFAULT_LESSON_TIMES)
            .unwrap()
            .overlay(&lessons)
            .unwrap()
            .finish();

        let ics = grid.to_ics().to_string();

        assert_eq!(ics.matches("BEGIN:VEVENT").count(), 2);
        assert!(ics.contains("DTSTART:20240902T080000"));
        assert!(ics.contains("DTEND:20240902T093500"));
        assert!(ics.contains("DTSTART:20240909T080000"));
        assert!(ics.contains("UID:20240902_1-2_Data-Structures_Lab-3"));
        assert!(ics.contains("SUMMARY:Data Structures"));
        assert!(ics.contains("LOCATION:Lab 3"));
        assert!(ics.contains("DESCRIPTION:CS-2"));
    }

    #[test]
    fn overlapping_lessons_get_distinct_uids() {
        let lessons = [
            ("Physics", "1-3", "A101"),
            ("Chemistry", "1-2", "A101"),
            ("Physics", "1-3", "B202"),
        ]
        .map(|(name, slots, room)| Lesson {
            name: name.to_string(),
            student: "CS-1".to_string(),
            week_day: vec![OccurrencePattern {
                room: room.to_string(),
                day: "M".to_string(),
                week: "1".to_string(),
                lesson: slots.to_string(),
            }],
        });

        let start = NaiveDate::from_ymd_opt(2024, 9, 2).unwrap();
        let grid = CalendarBuilder::new(2024, 9, start, &DEFAULT_LESSON_TIMES)
            .unwrap()
            .overlay(&lessons)
            .unwrap()
            .finish();

        let ics = grid.to_ics().to_string();
        let uids = ics
            .lines()
            .filter(|line| line.starts_with("UID:"))
            .collect::<Vec<_>>();

        assert_eq!(
            uids,
            vec![
                "UID:20240902_1-3_Physics_A101",
                "UID:20240902_1-2_Chemistry_A101",
                "UID:20240902_1-3_Physics_B202",
            ]
        );
    }

    #[test]
    fn identical_occurrences_are_exported_once() {
        let lesson = Lesson {
            name: "Physics".to_string(),
            student: "CS-1".to_string(),
            week_day: vec![OccurrencePattern {
                room: "A101".to_string(),
                day: "M".to_string(),
                week: "1".to_string(),
                lesson: "1-2".to_string(),
            }],
        };

        let start = NaiveDate::from_ymd_opt(2024, 9, 2).unwrap();
        let grid = CalendarBuilder::new(2024, 9, start, &DEFAULT_LESSON_TIMES)
            .unwrap()
            .overlay(&[lesson.clone(), lesson])
            .unwrap()
            .finish();

        assert_eq!(grid.occurrences().len(), 2);
        assert_eq!(grid.to_ics().to_string().matches("BEGIN:VEVENT").count(), 1);
    }
}
