// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-thermostat project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! # Daemon Module
//!
//! Process-level wiring of the thermostat: the [`Supervisor`] builds every
//! collaborator once, starts the control loop on its own task, binds the
//! buttons and performs the orderly shutdown.
//!
//! ## Usage
//!
//! ```no_run
//! use rust_thermostat::{config::Config, daemon::{wait_for_shutdown_signal, Supervisor}};
//!
//! async fn run() -> anyhow::Result<()> {
//!     let config = Config::from_file("thermostat.yaml")?;
//!
//!     let mut supervisor = Supervisor::new();
//!     supervisor.launch(&config).await?;
//!
//!     wait_for_shutdown_signal().await?;
//!
//!     supervisor.shutdown().await;
//!     supervisor.join().await?;
//!     Ok(())
//! }
//! ```

pub mod signals;
pub mod supervisor;

pub use signals::wait_for_shutdown_signal;
pub use supervisor::Supervisor;
