// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 The a68g-rs Authors

//! The runtime engine proper: C1 through C10.
//!
//! Given a [`a68_modes::decorate::DecoratedTree`], [`engine::Engine`] drives it to
//! completion over three regions — an arena [`frame::FrameStack`], a mark-sweep
//! [`heap::Heap`], and the implicit Rust call stack standing in for the reference
//! runtime's separate expression stack (see `DESIGN.md`). [`exec`] holds the
//! tree-walking executor itself; every other module is a region or a service the
//! executor calls into.

pub mod engine;
pub mod error;
pub mod exec;
pub mod format;
pub mod frame;
pub mod heap;
pub mod propagator;
pub mod stowed;
pub mod value;

pub use engine::{Engine, Signal};
pub use error::RuntimeError;
pub use value::Value;
