// ─── mc-lang-sync Core ───
// Mirrors Minecraft language files into a git-tracked tree.
//
// Architecture:
//   core/
//     credentials/ CIK_DATA decoding + CikExtractor driver
//     downloader/  Streamed downloads with SHA-1 validation
//     bedrock/     Catalog, package fetch, extraction, organise, merge
//     java/        Mojang manifest, client jar, asset index
//     lang/        .lang parsing, JSON siblings, locale filter
//     sync/        CI driver, git commits, Actions output
//     state/       Resolved settings

pub mod bedrock;
pub mod credentials;
pub mod downloader;
pub mod error;
pub mod http;
pub mod java;
pub mod lang;
pub mod ledger;
pub mod staging;
pub mod state;
pub mod sync;
pub mod version;
