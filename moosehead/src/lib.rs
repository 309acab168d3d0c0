//! # Moosehead
//!
//! Event-sourced reservations for capacity-limited workshops.
//!
//! Built on [`moosehead_core`]: every change is a [`WorkshopEvent`] appended
//! to the log, and all state is folded from it.
//!
//! ## Components
//!
//! - [`aggregate::WorkshopAggregate`]: validates commands into events
//! - [`projection::WorkshopListProjection`]: workshops, participants, status
//! - [`saga::EmailSaga`]: seat placement, waiting list, notifications
//! - [`system::WorkshopSystem`]: composition root and writer lock
//! - [`service::WorkshopService`]: participant/admin facade
//!
//! ## Example
//!
//! ```rust,ignore
//! let system = Arc::new(WorkshopSystem::new(log, settings, email, clock));
//! system.bootstrap().await?;
//!
//! let service = WorkshopService::new(system);
//! service.create_workshop(WorkshopData::new("rust-101", "Rust", "Intro", 20)).await?;
//! service.reservation("rust-101", "ada@example.com", "Ada", AuthorKind::User).await?;
//! ```

pub mod aggregate;
pub mod commands;
pub mod config;
pub mod email;
pub mod error;
pub mod events;
pub mod mocks;
pub mod projection;
pub mod saga;
pub mod service;
pub mod system;
pub mod types;

pub use aggregate::WorkshopAggregate;
pub use commands::WorkshopCommand;
pub use config::{Config, SettingsHandle, WorkshopSettings};
pub use email::{ConsoleEmailSender, EmailSender};
pub use error::{CommandError, WorkshopError};
pub use events::WorkshopEvent;
pub use projection::{Participant, Workshop, WorkshopListProjection};
pub use saga::EmailSaga;
pub use service::{ActionResult, ParticipantReservation, WorkshopInfo, WorkshopService};
pub use system::WorkshopSystem;
pub use types::{
    AuthorKind, Email, ReservationStatus, ReservationToken, WorkshopData, WorkshopId, WorkshopStatus,
};
