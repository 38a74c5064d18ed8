//! Terminal output for the admin CLI.
//!
//! Status lines share one shape (a colored marker, then the message);
//! `print_faces_table` renders the enrolled faces for `list`.

use comfy_table::{Cell, Color, ContentArrangement, Table};
use console::{style, StyledObject};

use crate::vault::RecordMetadata;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

fn status_line(marker: StyledObject<&str>, msg: &str, to_stderr: bool) {
    if to_stderr {
        eprintln!("{marker} {msg}");
    } else {
        println!("{marker} {msg}");
    }
}

pub fn success(msg: &str) {
    status_line(style("\u{2713}").green().bold(), msg, false);
}

/// Errors and warnings go to stderr so stdout stays parseable.
pub fn error(msg: &str) {
    status_line(style("\u{2717}").red().bold(), msg, true);
}

pub fn warning(msg: &str) {
    status_line(style("!").yellow().bold(), msg, true);
}

pub fn info(msg: &str) {
    status_line(style("\u{2022}").cyan(), msg, false);
}

pub fn tip(msg: &str) {
    println!("  {}", style(msg).dim());
}

/// What `list` could make of one stored record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FaceStatus {
    /// A face entry with this many features.
    Face(usize),
    /// Decrypts fine but is not a face entry.
    Opaque,
    /// Fails its tag or signature check.
    Damaged,
}

#[derive(Debug, Clone)]
pub struct FaceRow {
    pub meta: RecordMetadata,
    pub status: FaceStatus,
}

/// Print enrolled faces (Name, Features, Enrolled, Updated) followed by
/// the fingerprint of the vault's public key.
pub fn print_faces_table(rows: &[FaceRow], fingerprint: &str) {
    if rows.is_empty() {
        info("Nobody is enrolled yet.");
        tip("facevault enroll <NAME> <VECTOR.json>");
    } else {
        let mut table = Table::new();
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec!["Name", "Features", "Enrolled", "Updated"]);

        for row in rows {
            let features = match row.status {
                FaceStatus::Face(n) => Cell::new(n),
                FaceStatus::Opaque => Cell::new(format!("raw, {} B", row.meta.size)),
                FaceStatus::Damaged => Cell::new("DAMAGED").fg(Color::Red),
            };
            table.add_row(vec![
                Cell::new(&row.meta.id),
                features,
                Cell::new(row.meta.created_at.format(TIME_FORMAT)),
                Cell::new(row.meta.updated_at.format(TIME_FORMAT)),
            ]);
        }
        println!("{table}");
    }

    println!("Fingerprint: {}", style(fingerprint).bold());
}

