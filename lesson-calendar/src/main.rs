use std::{env, fs};

use anyhow::{Context, Result};
use log::info;

use lesson_grid::{CalendarBuilder, Schedule};

mod cli;
mod font;
mod render;

fn setup_logging() {
    if env::var("LOG").is_err() {
        env::set_var("LOG", "lesson_calendar=info,lesson_grid=info");
    }

    pretty_env_logger::init_custom_env("LOG");
}

fn main() -> Result<()> {
    let args = cli::parse(env::args().skip(1).collect());

    setup_logging();

    let schedule = Schedule::from_path(&args.schedule)
        .with_context(|| format!("Failed to load schedule {}", args.schedule.display()))?;

    info!(
        "Loaded {} lessons, semester starts {}",
        schedule.lessons.len(),
        schedule.semester_start_day
    );

    let grid = CalendarBuilder::for_schedule(args.year, args.month, &schedule)?
        .overlay(&schedule.lessons)?
        .finish();

    info!(
        "Placed {} lesson occurrences in {}",
        grid.occurrences().len(),
        grid.title()
    );

    let font = font::BodyFont::load(&args.fonts);

    fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("Failed to create {}", args.output_dir.display()))?;

    let pdf_path = args.output_dir.join(format!("{}.pdf", grid.file_stem()));
    render::write_pdf(&grid, &font, &pdf_path)?;
    println!("Generated {}", pdf_path.display());

    #[cfg(feature = "ics")]
    if args.ics {
        let ics_path = args.output_dir.join(format!("{}.ics", grid.file_stem()));
        fs::write(&ics_path, grid.to_ics().to_string())
            .with_context(|| format!("Failed to write {}", ics_path.display()))?;
        println!("Generated {}", ics_path.display());
    }

    Ok(())
}
