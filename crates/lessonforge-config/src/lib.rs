// Copyright (c) 2026 Lessonforge Contributors
//
// SPDX-License-Identifier: MIT
mod loader;
mod schema;

pub use loader::{from_yaml_str, load};
pub use schema::*;
