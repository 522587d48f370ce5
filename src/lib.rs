pub mod capture;
pub mod config;
pub mod emotion;
pub mod knowledge;
pub mod observer;
pub mod prefs;
pub mod selector;
pub mod youtube;

/// Application name for XDG paths
pub const APP_NAME: &str = "moodtune";
