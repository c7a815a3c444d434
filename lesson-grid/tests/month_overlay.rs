use std::error::Error as _;

use chrono::{Datelike, Months, NaiveDate, Weekday};
use lesson_grid::{
    week_of_semester, CalendarBuilder, CalendarGrid, Cell, Color, Effect, Schedule,
};

const SCHEDULE: &str = r#"{
    "semester_start_day": "2024-09-02",
    "lessons": [
        {
            "name": "Calculus",
            "student": "CS-1",
            "week_day": [
                { "room": "A101", "day": "M", "week": "1-2", "lesson": "1-2" }
            ]
        },
        {
            "name": "Operating Systems",
            "student": "CS-1",
            "week_day": [
                { "room": "B204", "day": "1", "week": "6", "lesson": "6-8" }
            ]
        }
    ]
}"#;

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

fn build(schedule: &Schedule, year: i32, month: u32) -> CalendarGrid {
    CalendarBuilder::for_schedule(year, month, schedule)
        .unwrap()
        .overlay(&schedule.lessons)
        .unwrap()
        .finish()
}

fn styles_at(grid: &CalendarGrid, cell: Cell) -> Vec<Effect> {
    grid.styles()
        .iter()
        .filter(|style| style.contains(cell))
        .map(|style| style.effect)
        .collect()
}

#[test]
fn monday_lesson_lands_on_first_two_weeks() {
    let schedule = Schedule::from_json_str(SCHEDULE).unwrap();
    let grid = build(&schedule, 2024, 9);

    let lesson_rows = [date(2024, 9, 2), date(2024, 9, 9)]
        .map(|day| grid.row_for(day).unwrap());

    for (idx, row) in grid.rows().iter().enumerate() {
        let has_lesson = row[2..].iter().any(|cell| !cell.is_empty());

        if idx == 0 || idx == grid.rows().len() - 1 {
            continue;
        }

        assert_eq!(has_lesson, lesson_rows.contains(&idx), "row {idx}");
    }

    for row in lesson_rows {
        assert_eq!(grid.rows()[row][2], "Calculus\nCS-1 A101");

        let spans = grid
            .styles()
            .iter()
            .filter(|style| {
                style.effect == Effect::Span && style.from.row == row && style.from.col > 0
            })
            .map(|style| (style.from, style.to))
            .collect::<Vec<_>>();
        assert_eq!(spans, vec![(Cell::new(2, row), Cell::new(3, row))]);

        let effects = styles_at(&grid, Cell::new(3, row));
        assert!(effects.contains(&Effect::Background(Color::PaleGreen)));
        assert!(effects.contains(&Effect::Leading(10.0)));
    }
}

#[test]
fn lesson_in_october_is_not_drawn_in_september() {
    let schedule = Schedule::from_json_str(SCHEDULE).unwrap();

    let september = build(&schedule, 2024, 9);
    assert!(september
        .occurrences()
        .iter()
        .all(|occurrence| occurrence.name != "Operating Systems"));

    let october = build(&schedule, 2024, 10);
    let row = october.row_for(date(2024, 10, 7)).unwrap();
    assert_eq!(october.rows()[row][7], "Operating Systems\nCS-1 B204");
    assert_eq!(october.occurrences().len(), 1);
}

#[test]
fn interior_rows_are_exactly_the_month() {
    let schedule = Schedule::from_json_str(SCHEDULE).unwrap();

    for (year, month) in [(2023, 2), (2024, 2), (2024, 4), (2024, 12), (2025, 1)] {
        let grid = build(&schedule, year, month);

        let first = date(year, month, 1);
        let next = first.checked_add_months(Months::new(1)).unwrap();
        let expected = first
            .iter_days()
            .take_while(|day| *day < next)
            .collect::<Vec<_>>();

        assert_eq!(grid.dates(), expected.as_slice(), "{year}-{month}");
        assert_eq!(grid.rows().len(), expected.len() + 2);
    }
}

#[test]
fn week_numbers_advance_every_seven_days() {
    let schedule = Schedule::from_json_str(SCHEDULE).unwrap();
    let grid = build(&schedule, 2024, 11);

    let weeks = grid.rows()[1..grid.rows().len() - 1]
        .iter()
        .map(|row| row[0].parse::<i64>().unwrap())
        .collect::<Vec<_>>();

    assert!(weeks.windows(2).all(|pair| pair[0] <= pair[1]));

    for (idx, day) in grid.dates().iter().enumerate() {
        assert_eq!(weeks[idx], week_of_semester(schedule.semester_start_day, *day));

        if let Some(later) = grid.dates().get(idx + 7) {
            assert_eq!(weeks[idx + 7], weeks[idx] + 1, "{day} -> {later}");
        }
    }
}

#[test]
fn only_weekend_rows_are_grey() {
    let schedule = Schedule::from_json_str(SCHEDULE).unwrap();
    let grid = build(&schedule, 2025, 3);

    for (idx, day) in grid.dates().iter().enumerate() {
        let row = idx + 1;
        let grey = styles_at(&grid, Cell::new(1, row))
            .contains(&Effect::Background(Color::LightGrey));
        let weekend = matches!(day.weekday(), Weekday::Sat | Weekday::Sun);

        assert_eq!(grey, weekend, "{day}");
    }
}

#[test]
fn building_twice_gives_the_same_grid() {
    let schedule = Schedule::from_json_str(SCHEDULE).unwrap();

    assert_eq!(build(&schedule, 2024, 9), build(&schedule, 2024, 9));
}

#[test]
fn lesson_errors_carry_the_failing_value() {
    let schedule = Schedule::from_json_str(
        r#"{
            "semester_start_day": "2024-09-02",
            "lessons": [
                { "name": "Calculus", "student": "CS-1",
                  "week_day": [{ "room": "A101", "day": "M", "week": "3-1", "lesson": "1" }] }
            ]
        }"#,
    )
    .unwrap();

    let err = CalendarBuilder::for_schedule(2024, 9, &schedule)
        .unwrap()
        .overlay(&schedule.lessons)
        .unwrap_err();

    let mut messages = vec![err.to_string()];
    let mut source = err.source();
    while let Some(cause) = source {
        messages.push(cause.to_string());
        source = cause.source();
    }

    assert_eq!(
        messages,
        vec![
            "lesson \"Calculus\" has an invalid `week` value".to_string(),
            "invalid range expression \"3-1\"".to_string(),
            "range 3-1 has reversed bounds".to_string(),
        ]
    );
}
