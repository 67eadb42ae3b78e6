//! Terminal dashboard
//!
//! `layout` draws the kill log, the summary tables, the ship card grid and the
//! status bar from a read-locked [`Tracker`](crate::tracker::Tracker).
//! `terminal` owns the crossterm event loop and turns key presses into
//! tracker commands.

pub mod layout;
pub mod renderer;
pub mod terminal;

pub use terminal::run_ui;
