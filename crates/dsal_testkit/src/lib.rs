//! # DSAL Testkit
//!
//! Test utilities for DSAL.
//!
//! This crate provides:
//! - Test fixtures for stores and objects on every bundled backend
//! - Property-based test generators using proptest
//! - Data patterns, range checks and a reference model of object contents
//! - A fault-injecting backend wrapper
//!
//! ## Usage
//!
//! ```rust
//! use dsal_testkit::prelude::*;
//!
//! with_temp_object(|obj| {
//!     obj.write(3000, &filled(b'A', 100)).unwrap();
//!     let mut buf = vec![0u8; 4096];
//!     obj.read(0, &mut buf).unwrap();
//!     verify_block(&buf, 0..3000, 0);
//!     verify_block(&buf, 3000..3100, b'A');
//!     verify_block(&buf, 3100..4096, 0);
//! });
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod faulty;
pub mod fixtures;
pub mod generators;
pub mod verify;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::faulty::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::verify::*;
}

pub use faulty::*;
pub use fixtures::*;
pub use generators::*;
pub use verify::*;
