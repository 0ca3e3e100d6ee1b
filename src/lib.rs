// Library root
// -----------
// The binary (`main.rs`) parses arguments and prints; everything it calls
// lives here.
//
// Module responsibilities:
// - `config`: environment settings, read once at startup.
// - `api`: blocking AnkiConnect client and its response contract.
// - `cache`: on-disk tag cache with expiry and atomic replacement.
// - `strip`: HTML to single-line text for launcher rows.
// - `alfred`: script filter items and builders.
// - `commands`: one entry point per subcommand plus error classification.
pub mod alfred;
pub mod api;
pub mod cache;
pub mod commands;
pub mod config;
pub mod strip;

#[cfg(test)]
mod test_support;
