// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
pub mod config;
pub mod errors;
pub mod api;
pub mod store;
pub mod events;
pub mod snapshot;
pub mod recovery;
pub mod processor;
pub mod worker;
pub mod server;
pub mod programs;
pub mod telemetry;
