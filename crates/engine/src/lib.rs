//! vttdice engine library.
//!
//! Caller side of the dice resolution domain: drives roll shapes through the
//! ruleset registry, settles spendable resources, persists history and
//! broadcasts results to a table session.
//!
//! ## Structure
//!
//! - `use_cases/` - Roll and escalation orchestration, animation playback
//! - `infrastructure/` - External dependency implementations (ports + adapters)
//! - `stores/` - In-memory runtime state
//! - `config` - Environment configuration
//! - `app` - Application composition

pub mod app;
pub mod config;
pub mod infrastructure;
pub mod stores;
pub mod use_cases;

pub use app::App;
pub use config::EngineConfig;
