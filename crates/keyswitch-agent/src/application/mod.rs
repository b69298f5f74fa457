//! Application layer use cases for the agent.
//!
//! # What is the "application" layer? (for beginners)
//!
//! In Clean Architecture the *application* layer sits between the domain
//! (pure vocabulary, in `keyswitch-core`) and the infrastructure (Win32 calls,
//! files, the console).
//!
//! Use cases in this layer:
//!
//! - **Orchestrate** domain objects to fulfil a user goal ("when I type on the
//!   German keyboard, switch to German").
//! - **Depend on abstractions** (traits) rather than concrete implementations,
//!   so the Win32 adapters can be replaced by mocks in tests.
//! - **Contain no OS calls and no file system access**.
//!
//! # Sub-modules
//!
//! - **`platform`** – The traits the use cases need from the OS (device list,
//!   language switching) and the error they report.
//!
//! - **`device_registry`** – Enumerates the attached keyboards once at
//!   startup and produces their durable names.
//!
//! - **`mapping_store`** – The device → layout tables: handle-keyed for the
//!   per-keystroke lookup, name-keyed for persistence.
//!
//! - **`switch_engine`** – The state machine that runs on every raw input
//!   event: detect a device change, resolve its layout (asking the user if it
//!   is unknown) and switch the system input language.
//!
//! - **`session`** – Start-up and shutdown: builds the engine from the
//!   collaborators, loads the saved mapping, saves it again on exit, and turns
//!   steady-state failures into user notifications.

pub mod device_registry;
pub mod mapping_store;
pub mod platform;
pub mod session;
pub mod switch_engine;
