//! RetroHost web frontend
//!
//! Browser-resident (wasm32) client for a self-hosted ROM library: browse
//! the systems and ROMs served by the RetroHost backend, play them through
//! EmulatorJS, and persist save states against the backend's save store.
//!
//! Core modules:
//! - `catalog`: Catalog data model and the tag-grouping aggregator
//! - `session`: Save-state session controller and its trait seams
//! - `api`: Fetch-based backend client (wasm only)
//! - `emulator`: EmulatorJS capability handle (wasm only)
//! - `library` / `player`: Page wiring (wasm only)
//!
//! `catalog` and `session` carry all of the actual logic and compile on
//! native targets so `cargo test` needs no browser.

pub mod catalog;
pub mod error;
pub mod session;

#[cfg(target_arch = "wasm32")]
pub mod api;
#[cfg(target_arch = "wasm32")]
pub mod emulator;
#[cfg(target_arch = "wasm32")]
pub mod library;
#[cfg(target_arch = "wasm32")]
pub mod player;

pub use catalog::{CatalogView, RomRecord, SystemInfo, TagGroup, aggregate};
pub use error::{ConfigError, EmulatorError, StoreError};
pub use session::{
    Capture, EmulatorCapability, EntryOutcome, Feedback, SaveBlob, SaveKey, SaveStore,
    SessionController, SessionState,
};

/// Frontend configuration constants
pub mod consts {
    /// Deadline for save-store and catalog requests (ms); a hung backend
    /// must not leave the UI loading forever
    pub const STORE_TIMEOUT_MS: i32 = 5_000;
    /// How long transient button status labels stay up (ms)
    pub const STATUS_RESET_MS: i32 = 2_000;

    /// Backend API paths
    pub const SYSTEMS_API: &str = "/api/systems";
    pub const ROMS_API: &str = "/api/roms";
    pub const SAVES_API: &str = "/api/saves";

    /// ROM content is served under this prefix
    pub const ROMS_PATH: &str = "/roms";

    /// EmulatorJS asset locations
    pub const EMULATOR_DATA_PATH: &str = "/emulatorjs/";
    pub const EMULATOR_LOADER: &str = "/emulatorjs/loader.js";
}
