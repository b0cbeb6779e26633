//! The orchestrating state machine for the zarb core (§4.3): block
//! validation and application, certificate acceptance, genesis bootstrap,
//! and last-info persistence/restore across restarts.

pub mod checker;
pub mod config;
pub mod error;
pub mod genesis;
pub mod machine;
pub mod restore;

pub use checker::StateChecker;
pub use error::StateError;
pub use genesis::bootstrap;
pub use machine::StateMachine;
pub use restore::restore;
