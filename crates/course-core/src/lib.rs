//! # course-core
//!
//! Client-side domain logic for course playback: the free-preview gate,
//! per-course entitlement state and the read-only viewer context.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        Course view                           │
//! │  ┌──────────────┐   ┌──────────────────┐   ┌──────────────┐  │
//! │  │ PlaybackGate │◀──│ EntitlementStore │◀──│  Enrollment  │  │
//! │  │ (per video)  │   │  (watch channel) │   │    Oracle    │  │
//! │  └──────────────┘   └──────────────────┘   └──────────────┘  │
//! │                              ▲                               │
//! │                              │ grant()                       │
//! │                     payment reconciliation                   │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing in this crate touches the DOM or the network. Collaborators are
//! traits, state changes are explicit transitions, and every piece can be
//! exercised from a plain unit test.

pub mod config;
pub mod context;
pub mod course;
pub mod entitlement;
pub mod error;
pub mod oracle;
pub mod playback;
pub mod view;

pub use config::PlayerConfig;
pub use context::{Role, ViewerContext};
pub use course::CourseId;
pub use entitlement::{EntitlementStatus, EntitlementStore};
pub use error::{CoreError, Result};
pub use oracle::{EnrollmentCheck, EnrollmentOracle, resolve_entitlement};
pub use playback::{GateEvent, PlaybackSession, SeekDecision};
pub use view::{ViewGuard, ViewScope};
