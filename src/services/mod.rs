//! Audit orchestration.
//!
//! One module per audit subcommand. Each walks its descriptor sequentially,
//! server by server; a transport failure aborts the current server only and
//! the run continues with the next one.

pub mod backup_check;
pub mod compose_check;
pub mod process_check;
pub mod structure_check;
