// Console layer - a line-oriented stand-in for a chat platform.
// Messages and admin commands arrive as JSON lines; directives are logged.

pub mod events;
pub mod log_adapter;
