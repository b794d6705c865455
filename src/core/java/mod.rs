// ─── Java Edition ───
// Mojang manifest, client JSON, client jar and asset index handling.

pub mod asset_index;
pub mod client;
pub mod jar;
pub mod manifest;
pub mod updater;

pub use asset_index::AssetIndex;
pub use client::{AssetIndexInfo, ClientJson};
pub use manifest::{VersionEntry, VersionManifest};
pub use updater::{JavaOutcome, JavaSource, JavaUpdater, MojangSource};
