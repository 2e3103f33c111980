use clap::Parser;

use git_import_file::commands;

#[derive(Parser)]
#[command(name = "git-import-file")]
#[command(about = "import a single file's commit history into another git repository", long_about = None)]
#[command(version)]
struct Cli {
    /// File whose commit history should be imported
    source: String,

    /// Destination path for the file in the target repository; defaults to
    /// the source file's name in the current directory
    target: Option<String>,
}

fn main() {
    let cli = Cli::parse();
    commands::import::handle_import(cli.source, cli.target);
}
