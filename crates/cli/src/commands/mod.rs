pub mod config_cmd;
pub mod diff;
pub mod locate;
