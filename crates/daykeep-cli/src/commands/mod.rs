pub mod auth_cmd;
pub mod backup_cmd;
pub mod common;
pub mod sync_cmd;
pub mod tasks;
pub mod watch;
