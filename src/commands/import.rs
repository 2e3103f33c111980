use crate::import::{self, ImportOptions};

use std::path::PathBuf;

pub fn handle_import(source: String, target: Option<String>) {
    let opts = ImportOptions {
        source: PathBuf::from(source),
        target: target.map(PathBuf::from),
    };

    match import::run(opts) {
        Ok(outcome) => {
            println!(
                "imported {} commit{} into {}",
                outcome.commits_imported,
                if outcome.commits_imported == 1 { "" } else { "s" },
                outcome.destination.display()
            );
            if !outcome.content_matches {
                eprintln!(
                    "warning: content mismatch: {} differs from the source file after replay",
                    outcome.destination.display()
                );
            }
        }
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    }
}
