//! FILENAME: app/backend/src/main.rs
// PURPOSE: Console entry point.
// FORMAT: seq|level|category|message

fn main() {
    if let Err(e) = app_lib::run(std::env::args().collect()) {
        eprintln!("record-viewer: {}", e);
        std::process::exit(1);
    }
}
