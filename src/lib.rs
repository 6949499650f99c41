//! Project state and cost accounting for AI-assisted video pre-production.
//!
//! # Overview
//!
//! - **project**: the persisted document (scenes, characters, usage totals)
//! - **history**: linear undo/redo over document snapshots, plus the
//!   transient per-scene activity board
//! - **ledger**: append-only image version history per scene
//! - **gate**: estimate, confirm, execute and reconcile billable generation
//! - **migrate** / **persist**: loading older files, saving and bulk export
//! - **studio**: the application object wiring it all together
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use scenecraft::{Credential, Studio, StudioConfig};
//!
//! let studio = Studio::new(StudioConfig::load(None)?, Arc::new(my_capability))
//!     .with_credential(Credential::from_env());
//!
//! studio.edit(|content| content.update_script("1", "Dawn over the harbor"))?;
//! let estimate = studio.request_speech("1")?;
//! let receipt = studio.confirm().await?;
//! ```

pub mod budget;
pub mod capability;
pub mod config;
pub mod error;
pub mod gate;
pub mod history;
pub mod ledger;
pub mod migrate;
pub mod persist;
pub mod project;
pub mod studio;

pub use budget::{format_currency, PricingModel, TokenCount, TokenEstimator, UsageStats};
pub use capability::{Credential, GenerationCapability};
pub use config::StudioConfig;
pub use error::{StudioError, StudioResult};
pub use gate::{ActionKind, CostEstimate, CostReceipt};
pub use history::ProjectStore;
pub use migrate::load_project;
pub use persist::ArtifactKind;
pub use project::ProjectDocument;
pub use studio::Studio;
