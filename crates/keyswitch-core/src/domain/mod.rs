//! Domain entities for KeySwitch.
//!
//! This module contains pure business logic with no infrastructure dependencies.
//!
//! # What is "domain" in Clean Architecture? (for beginners)
//!
//! Clean Architecture organises code into concentric layers.  The innermost
//! layer is called the **domain**.  Domain code holds the core vocabulary of
//! the application and never imports OS APIs, file systems, or UI toolkits.
//!
//! For KeySwitch the vocabulary is small: a keyboard *layout* identified by a
//! 16-bit language code, a *device* identified by a session handle and a
//! durable name, and the *catalog* of layouts the user can pick from.

pub mod catalog;
pub mod device;
pub mod layout;
pub mod power;
pub mod selection;
