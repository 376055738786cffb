//! Utilities for memory-efficient data structures.
//!
//! This module provides low-level utilities used internally by the runtime.
//! In particular, it exposes a generational [`Slab`] used as the task arena:
//! tasks are addressed by small integer keys instead of pointers, and keys
//! of finished tasks can never resume a newer task stored in the same slot.

mod slab;

pub(crate) use slab::{Key, Slab};
