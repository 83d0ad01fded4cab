// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
pub mod descriptor;

pub use descriptor::{Header, RequestDescriptor, ResponseDescriptor};
