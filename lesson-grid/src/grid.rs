use chrono::{Datelike, NaiveDate, Weekday};

use crate::month::MonthView;
use crate::overlay::Occurrence;
use crate::{Error, LessonSlot, Result, Schedule};

pub const WEEKDAY_NAMES: [&str; 7] = ["MON", "TUE", "WED", "THU", "FRI", "SAT", "SUN"];

/// Leading used for header, footer and lesson cells, which hold two lines.
pub const TWO_LINE_LEADING: f32 = 10.0;

const BODY_FONT_SIZE: f32 = 8.0;
const SLOT_LABEL_FONT_SIZE: f32 = 7.0;
const INNER_GRID_WIDTH: f32 = 0.25;
const BOX_WIDTH: f32 = 1.5;

/// Number of columns before the first lesson slot (week and date).
pub const LEADING_COLUMNS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Color {
    Black,
    LightGrey,
    PaleGreen,
}

impl Color {
    /// RGB components in `0.0..=1.0`.
    #[must_use]
    pub fn rgb(self) -> (f32, f32, f32) {
        match self {
            Color::Black => (0.0, 0.0, 0.0),
            Color::LightGrey => (0.827, 0.827, 0.827),
            Color::PaleGreen => (0.596, 0.984, 0.596),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Cell {
    pub col: usize,
    pub row: usize,
}

impl Cell {
    #[must_use]
    pub const fn new(col: usize, row: usize) -> Self {
        Self { col, row }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VAlign {
    Top,
    Middle,
    Bottom,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Effect {
    Span,
    Background(Color),
    Leading(f32),
    FontSize(f32),
    Align(Align),
    VAlign(VAlign),
    InnerGrid { width: f32, color: Color },
    Box { width: f32, color: Color },
}

/// An effect applied to the inclusive cell rectangle `from..=to`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StyleDirective {
    pub from: Cell,
    pub to: Cell,
    pub effect: Effect,
}

impl StyleDirective {
    #[must_use]
    pub const fn new(from: Cell, to: Cell, effect: Effect) -> Self {
        Self { from, to, effect }
    }

    #[must_use]
    pub fn contains(&self, cell: Cell) -> bool {
        (self.from.col..=self.to.col).contains(&cell.col)
            && (self.from.row..=self.to.row).contains(&cell.row)
    }
}

/// A rendered month: header row, one row per date, footer row, and the
/// directives describing how to draw them.
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarGrid {
    year: i32,
    month: u32,
    rows: Vec<Vec<String>>,
    dates: Vec<NaiveDate>,
    styles: Vec<StyleDirective>,
    occurrences: Vec<Occurrence>,
    slots: Vec<LessonSlot>,
}

impl CalendarGrid {
    #[must_use]
    pub fn year(&self) -> i32 {
        self.year
    }

    #[must_use]
    pub fn month(&self) -> u32 {
        self.month
    }

    #[must_use]
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Dates of the interior rows; `dates()[i]` belongs to row `i + 1`.
    #[must_use]
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    #[must_use]
    pub fn styles(&self) -> &[StyleDirective] {
        &self.styles
    }

    #[must_use]
    pub fn occurrences(&self) -> &[Occurrence] {
        &self.occurrences
    }

    #[must_use]
    pub fn slots(&self) -> &[LessonSlot] {
        &self.slots
    }

    #[must_use]
    pub fn column_count(&self) -> usize {
        LEADING_COLUMNS + self.slots.len()
    }

    #[must_use]
    pub fn row_for(&self, date: NaiveDate) -> Option<usize> {
        row_for(&self.dates, date)
    }

    #[must_use]
    pub fn title(&self) -> String {
        format!("{} {:02} Calendar", self.year, self.month)
    }

    /// Output file name without extension, e.g. `calendar_2024_09`.
    #[must_use]
    pub fn file_stem(&self) -> String {
        format!("calendar_{}_{:02}", self.year, self.month)
    }
}

fn row_for(dates: &[NaiveDate], date: NaiveDate) -> Option<usize> {
    dates.binary_search(&date).ok().map(|idx| idx + 1)
}

/// Week of the semester containing `date`; dates before the start give
/// week zero or below.
#[must_use]
pub fn week_of_semester(semester_start: NaiveDate, date: NaiveDate) -> i64 {
    date.signed_duration_since(semester_start)
        .num_days()
        .div_euclid(7)
        + 1
}

#[must_use]
pub fn weekday_name(weekday: Weekday) -> &'static str {
    WEEKDAY_NAMES[weekday.num_days_from_monday() as usize]
}

/// Owns a month grid while lessons are placed on it.
///
/// ```
/// use chrono::NaiveDate;
/// use lesson_grid::{CalendarBuilder, DEFAULT_LESSON_TIMES};
///
/// let start = NaiveDate::from_ymd_opt(2024, 9, 2).unwrap();
/// let grid = CalendarBuilder::new(2024, 9, start, &DEFAULT_LESSON_TIMES)
///     .unwrap()
///     .overlay(&[])
///     .unwrap()
///     .finish();
///
/// assert_eq!(grid.rows().len(), 30 + 2);
/// ```
#[derive(Debug, Clone)]
pub struct CalendarBuilder {
    pub(crate) year: i32,
    pub(crate) month: u32,
    pub(crate) semester_start: NaiveDate,
    rows: Vec<Vec<String>>,
    dates: Vec<NaiveDate>,
    styles: Vec<StyleDirective>,
    occurrences: Vec<Occurrence>,
    pub(crate) slots: Vec<LessonSlot>,
}

impl CalendarBuilder {
    pub fn new(
        year: i32,
        month: u32,
        semester_start: NaiveDate,
        slots: &[LessonSlot],
    ) -> Result<Self> {
        if slots.is_empty() {
            return Err(Error::NoSlots);
        }

        let view = MonthView::new(year, month).ok_or(Error::InvalidMonth { year, month })?;

        let header = ["Week".to_string(), format!("{year}-{month:02}")]
            .into_iter()
            .chain(
                slots
                    .iter()
                    .enumerate()
                    .map(|(idx, slot)| slot.label(idx + 1)),
            )
            .collect::<Vec<_>>();

        let mut rows = vec![header.clone()];
        let mut dates = Vec::new();
        let mut weeks = Vec::new();

        for date in view.filter(|date| date.month() == month) {
            let week = week_of_semester(semester_start, date);

            let mut row = Vec::with_capacity(header.len());
            row.push(week.to_string());
            row.push(format!("{:02} {}", date.day(), weekday_name(date.weekday())));
            row.resize(header.len(), String::new());

            rows.push(row);
            dates.push(date);
            weeks.push(week);
        }

        rows.push(header);

        let mut builder = Self {
            year,
            month,
            semester_start,
            rows,
            dates,
            styles: Vec::new(),
            occurrences: Vec::new(),
            slots: slots.to_vec(),
        };

        builder.push_table_styles();
        builder.push_week_spans(&weeks);
        builder.push_weekend_highlights();

        Ok(builder)
    }

    pub fn for_schedule(year: i32, month: u32, schedule: &Schedule) -> Result<Self> {
        Self::new(
            year,
            month,
            schedule.semester_start_day,
            schedule.lesson_times(),
        )
    }

    #[must_use]
    pub fn finish(self) -> CalendarGrid {
        CalendarGrid {
            year: self.year,
            month: self.month,
            rows: self.rows,
            dates: self.dates,
            styles: self.styles,
            occurrences: self.occurrences,
            slots: self.slots,
        }
    }

    /// Writes `occurrence` into its row, merged across its slots. Returns
    /// `false` when no row carries the occurrence's date. A later placement
    /// on the same cells overwrites an earlier one.
    pub(crate) fn place(&mut self, occurrence: Occurrence) -> bool {
        let Some(row) = row_for(&self.dates, occurrence.date) else {
            return false;
        };

        let from = Cell::new(occurrence.first_slot as usize + LEADING_COLUMNS - 1, row);
        let to = Cell::new(occurrence.last_slot as usize + LEADING_COLUMNS - 1, row);

        self.rows[row][from.col] = occurrence.label();
        self.styles.extend([
            StyleDirective::new(from, to, Effect::Span),
            StyleDirective::new(from, to, Effect::Background(Color::PaleGreen)),
            StyleDirective::new(from, to, Effect::Leading(TWO_LINE_LEADING)),
        ]);
        self.occurrences.push(occurrence);

        true
    }

    fn last_col(&self) -> usize {
        LEADING_COLUMNS + self.slots.len() - 1
    }

    fn push(&mut self, from: Cell, to: Cell, effect: Effect) {
        self.styles.push(StyleDirective::new(from, to, effect));
    }

    fn push_table_styles(&mut self) {
        let last_col = self.last_col();
        let last_row = self.rows.len() - 1;
        let top_left = Cell::new(0, 0);
        let bottom_right = Cell::new(last_col, last_row);

        self.push(top_left, bottom_right, Effect::FontSize(BODY_FONT_SIZE));
        self.push(
            Cell::new(LEADING_COLUMNS, 0),
            Cell::new(last_col, 0),
            Effect::FontSize(SLOT_LABEL_FONT_SIZE),
        );
        self.push(
            Cell::new(LEADING_COLUMNS, last_row),
            bottom_right,
            Effect::FontSize(SLOT_LABEL_FONT_SIZE),
        );

        self.push(top_left, bottom_right, Effect::Align(Align::Center));
        self.push(
            Cell::new(1, 1),
            Cell::new(1, last_row - 1),
            Effect::Align(Align::Left),
        );
        self.push(top_left, bottom_right, Effect::VAlign(VAlign::Middle));

        self.push(
            top_left,
            bottom_right,
            Effect::InnerGrid {
                width: INNER_GRID_WIDTH,
                color: Color::Black,
            },
        );
        self.push(
            top_left,
            bottom_right,
            Effect::Box {
                width: BOX_WIDTH,
                color: Color::Black,
            },
        );

        self.push(top_left, Cell::new(last_col, 0), Effect::Leading(TWO_LINE_LEADING));
        self.push(
            Cell::new(0, last_row),
            bottom_right,
            Effect::Leading(TWO_LINE_LEADING),
        );
    }

    /// Merges the week column over each contiguous run of equal weeks.
    fn push_week_spans(&mut self, weeks: &[i64]) {
        let mut run_start = 0;

        for idx in 1..=weeks.len() {
            if idx == weeks.len() || weeks[idx] != weeks[run_start] {
                self.push(
                    Cell::new(0, run_start + 1),
                    Cell::new(0, idx),
                    Effect::Span,
                );
                run_start = idx;
            }
        }
    }

    fn push_weekend_highlights(&mut self) {
        let last_col = self.last_col();

        let weekend_rows = self
            .dates
            .iter()
            .enumerate()
            .filter(|(_, date)| matches!(date.weekday(), Weekday::Sat | Weekday::Sun))
            .map(|(idx, _)| idx + 1)
            .collect::<Vec<_>>();

        for row in weekend_rows {
            self.push(
                Cell::new(1, row),
                Cell::new(last_col, row),
                Effect::Background(Color::LightGrey),
            );
        }
    }
}
