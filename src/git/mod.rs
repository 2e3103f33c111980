pub mod repository;
pub mod status;

pub use repository::{Repository, exec_git, exec_git_stdin, find_repository_for_file};
