//! Print the rows parsed from a spreadsheet as JSON.
//! Usage: dump_excel <path.xlsx>

use document_classifier_lib::{commands, excel};
use std::path::Path;

fn main() {
    document_classifier_lib::init_tracing();
    let Some(path) = std::env::args().nth(1) else {
        eprintln!("Usage: dump_excel <path.xlsx>");
        std::process::exit(2);
    };
    let rows = match excel::parse_workbook(Path::new(&path)) {
        Ok(rows) => rows,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    match commands::rows_json(&rows) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
