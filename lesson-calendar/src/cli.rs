use std::env;
use std::path::PathBuf;
use std::process;

use chrono::{Datelike, Local, NaiveDate};
use getopts::Options;

const SCHEDULE_ENV: &str = "LESSON_CALENDAR_SCHEDULE";
const DEFAULT_SCHEDULE: &str = "class-of-semester-2024-2025-2.json";
const DEFAULT_FONT: &str = "C:/Windows/Fonts/arial.ttf";
const DEFAULT_FALLBACK_FONT: &str = "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf";

pub struct Args {
    pub year: i32,
    pub month: u32,
    pub schedule: PathBuf,
    pub output_dir: PathBuf,
    /// Font files in the order they are tried.
    pub fonts: Vec<PathBuf>,
    pub ics: bool,
}

fn opts() -> Options {
    let mut opts = Options::new();
    opts.optflag(
        "h",
        "help",
        concat!("Print the help output of ", env!("CARGO_PKG_NAME")),
    );
    opts.optopt(
        "s",
        "schedule",
        concat!(
            "Schedule definition to read [Default: $LESSON_CALENDAR_SCHEDULE or ",
            "class-of-semester-2024-2025-2.json]"
        ),
        "FILE",
    );
    opts.optopt(
        "o",
        "output-dir",
        "Directory the calendar is written to [Default: .]",
        "DIR",
    );
    opts.optopt(
        "f",
        "font",
        "TrueType font for the table [Default: C:/Windows/Fonts/arial.ttf]",
        "FILE",
    );
    opts.optopt(
        "",
        "fallback-font",
        "Font tried when --font cannot be loaded [Default: DejaVuSans.ttf]",
        "FILE",
    );
    #[cfg(feature = "ics")]
    opts.optflag(
        "i",
        "ics",
        "Also write the month's lessons as an iCalendar file",
    );
    opts
}

fn usage(opts: &Options) -> String {
    let brief = format!("Usage: {} [options] [MONTH [YEAR]]", env!("CARGO_PKG_NAME"));
    opts.usage(&brief)
}

pub fn parse(args: Vec<String>) -> Args {
    let opts = opts();

    let matches = match opts.parse(args) {
        Ok(matches) => matches,
        Err(fail) => {
            eprintln!("{fail}");
            process::exit(1);
        }
    };

    if matches.opt_present("help") {
        println!("{}", usage(&opts));
        process::exit(0);
    }

    let (year, month) = match resolve_period(&matches.free, Local::now().date_naive()) {
        Ok(period) => period,
        Err(err) => {
            eprintln!("{err}");
            process::exit(1);
        }
    };

    let schedule = matches
        .opt_str("schedule")
        .or_else(|| env::var(SCHEDULE_ENV).ok())
        .unwrap_or_else(|| DEFAULT_SCHEDULE.to_string())
        .into();

    let output_dir = matches
        .opt_str("output-dir")
        .map_or_else(|| PathBuf::from("."), PathBuf::from);

    let fonts = vec![
        matches
            .opt_str("font")
            .map_or_else(|| PathBuf::from(DEFAULT_FONT), PathBuf::from),
        matches
            .opt_str("fallback-font")
            .map_or_else(|| PathBuf::from(DEFAULT_FALLBACK_FONT), PathBuf::from),
    ];

    let ics = cfg!(feature = "ics") && matches.opt_present("ics");

    Args {
        year,
        month,
        schedule,
        output_dir,
        fonts,
        ics,
    }
}

/// Resolves the positional `[MONTH [YEAR]]` arguments, taking whatever is
/// missing from `today`.
pub fn resolve_period(free: &[String], today: NaiveDate) -> Result<(i32, u32), String> {
    if let Some(extra) = free.get(2) {
        return Err(format!("Unexpected argument '{extra}'"));
    }

    let month = match free.first() {
        Some(raw) => raw
            .parse::<u32>()
            .map_err(|err| format!("Provided value for MONTH is invalid: {err}"))?,
        None => today.month(),
    };

    if !(1..=12).contains(&month) {
        return Err(format!(
            "Provided value for MONTH is invalid: {month} is not between 1 and 12"
        ));
    }

    let year = match free.get(1) {
        Some(raw) => raw
            .parse::<i32>()
            .map_err(|err| format!("Provided value for YEAR is invalid: {err}"))?,
        None => today.year(),
    };

    if NaiveDate::from_ymd_opt(year, month, 1).is_none() {
        return Err(format!("Provided value for YEAR is invalid: {year} is out of range"));
    }

    Ok((year, month))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 14).unwrap()
    }

    fn free(args: &[&str]) -> Vec<String> {
        args.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn defaults_to_current_month_and_year() {
        assert_eq!(resolve_period(&[], today()), Ok((2025, 3)));
    }

    #[test]
    fn month_alone_keeps_current_year() {
        assert_eq!(resolve_period(&free(&["4"]), today()), Ok((2025, 4)));
    }

    #[test]
    fn month_and_year() {
        assert_eq!(resolve_period(&free(&["4", "2026"]), today()), Ok((2026, 4)));
    }

    #[test]
    fn rejects_bad_positionals() {
        for args in [
            vec!["13"],
            vec!["0"],
            vec!["march"],
            vec!["4", "next"],
            vec!["4", "2026", "x"],
        ] {
            assert!(
                resolve_period(&free(&args), today()).is_err(),
                "{args:?} should be rejected"
            );
        }
    }

    #[test]
    fn options_and_positionals_mix() {
        let matches = opts()
            .parse(["-s", "plan.json", "9", "--output-dir", "out", "2024"])
            .unwrap();

        assert_eq!(matches.opt_str("schedule").as_deref(), Some("plan.json"));
        assert_eq!(matches.opt_str("output-dir").as_deref(), Some("out"));
        assert_eq!(matches.free, free(&["9", "2024"]));
    }
}
