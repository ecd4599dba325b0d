// SPDX-FileCopyrightText: 2026 Waitline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Waitline service library: HTTP surface, production wiring, and the
//! background sweep runner. The binary in `main.rs` is a thin shell over
//! this so the end-to-end tests can drive the same router.

pub mod serve;
pub mod sweeper;
