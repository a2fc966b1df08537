use focusroom_core::{Config, SessionType};
use serde::Serialize;

#[derive(Serialize)]
struct TechniqueRow {
    technique: String,
    work: u32,
    short_break: u32,
    long_break: u32,
    skips_breaks: bool,
}

pub fn run(json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let catalog = config.catalog()?;

    let rows: Vec<TechniqueRow> = catalog
        .iter()
        .map(|(technique, durations)| TechniqueRow {
            technique: technique.to_string(),
            work: durations.minutes(SessionType::Work),
            short_break: durations.minutes(SessionType::ShortBreak),
            long_break: durations.minutes(SessionType::LongBreak),
            skips_breaks: technique.offers_break_skip(),
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    println!("{:<10} {:>6} {:>6} {:>6}", "TECHNIQUE", "WORK", "SHORT", "LONG");
    for row in &rows {
        let marker = if row.skips_breaks { "  (can skip breaks)" } else { "" };
        println!(
            "{:<10} {:>6} {:>6} {:>6}{}",
            row.technique, row.work, row.short_break, row.long_break, marker
        );
    }
    Ok(())
}
