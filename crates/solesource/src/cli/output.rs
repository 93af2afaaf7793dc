//! Terminal output helpers: tables, determination summary, colors.

use comfy_table::{presets::UTF8_FULL_CONDENSED, Cell, Color, ContentArrangement, Table};
use solesource_core::{Determination, DeterminationCode};

/// Print a table with headers and rows
pub fn print_table(headers: &[&str], rows: Vec<Vec<String>>) {
    println!("{}", build_table(headers, rows));
}

/// Table with the shared preset and a cyan header row
fn build_table(headers: &[&str], rows: Vec<Vec<String>>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic);

    let header_cells: Vec<Cell> = headers
        .iter()
        .map(|h| Cell::new(h).fg(Color::Cyan))
        .collect();
    table.set_header(header_cells);

    for row in rows {
        table.add_row(row);
    }
    table
}

/// Title color for each determination tier
pub fn color_for_code(code: DeterminationCode) -> Color {
    match code {
        DeterminationCode::DelegatedAuthority => Color::Blue,
        DeterminationCode::LikelySoleSource => Color::Green,
        DeterminationCode::NeedsFurtherReview => Color::Yellow,
        DeterminationCode::Inconclusive => Color::Grey,
        DeterminationCode::NotLikelySoleSource => Color::Red,
    }
}

/// Print the title, message, and score breakdown of a determination.
pub fn print_determination(result: &Determination) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![Cell::new("Determination").fg(Color::Cyan)]);
    table.add_row(vec![Cell::new(&result.title).fg(color_for_code(result.code))]);
    table.add_row(vec![Cell::new(&result.message)]);
    println!("{}", table);

    if let Some(score) = result.score {
        let mut rows: Vec<Vec<String>> = result
            .breakdown
            .iter()
            .map(|c| vec![c.rule.description().to_string(), format_points(c.points)])
            .collect();
        rows.push(vec!["Total".to_string(), score.to_string()]);
        print_table(&["Rule", "Points"], rows);
    }
}

/// Signed points, e.g. `+3` or `-2`
pub fn format_points(points: i32) -> String {
    format!("{:+}", points)
}

/// Text progress bar, e.g. `[####------] 2/5`.
pub fn progress_bar(number: u8, total: u8) -> String {
    const WIDTH: usize = 20;
    let filled = if total == 0 {
        0
    } else {
        (WIDTH * usize::from(number) / usize::from(total)).min(WIDTH)
    };
    format!(
        "[{}{}] {}/{}",
        "#".repeat(filled),
        "-".repeat(WIDTH - filled),
        number,
        total
    )
}
