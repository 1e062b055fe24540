pub mod dedup;
pub mod lookup;
pub mod organize;

use shelver_storage::Disposal;
use std::process::ExitCode;

fn describe(disposal: &Disposal) -> String {
    match disposal {
        Disposal::Trashed(path) => format!("trashed to {}", path.display()),
        Disposal::Purged(path) => format!("purged (via {})", path.display()),
    }
}

/// Non-zero exit if anything in a batch failed or was left unstarted.
fn exit_code(failed: usize, not_started: usize) -> ExitCode {
    if failed == 0 && not_started == 0 { ExitCode::SUCCESS } else { ExitCode::FAILURE }
}
