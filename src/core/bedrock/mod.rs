// ─── Bedrock Edition ───
// Catalog lookup, package download, extraction and the per-version
// extracted/merged trees.

pub mod catalog;
pub mod extractor;
pub mod fe3;
pub mod fetcher;
pub mod merge;
pub mod organizer;
pub mod pipeline;

pub use catalog::{BedrockCatalog, BedrockRelease, BuildType};
pub use extractor::{AppxExtractor, BuildTypeExtractor, PackageExtractor, XvdToolExtractor};
pub use fetcher::{FetchedPackage, McappxSource, PackageFetcher, PackageSource};
pub use merge::Merger;
pub use pipeline::{BedrockOutcome, BedrockPipeline};
