//! Locator strategies for inspected elements
//!
//! This module provides:
//! - Typed locator candidates with explicit reliability
//! - Policy-driven ranking per element kind
//! - Child-text fallback for containers without text of their own

pub mod candidate;
pub mod resolver;

pub use candidate::{LocatorCandidate, LocatorKind, Reliability, Selector};
pub use resolver::{child_text, resolve_locators, LocatorResolver};
