use tracing::info;

use crate::cli::EditionArg;
use crate::core::bedrock::merge::MergeReport;
use crate::core::bedrock::{
    BedrockOutcome, BedrockPipeline, BuildTypeExtractor, McappxSource, Merger, PackageExtractor,
    PackageSource,
};
use crate::core::credentials::{CikExtractor, ContentKeys, CIK_ENV};
use crate::core::error::{SyncError, SyncResult};
use crate::core::http::build_http_client;
use crate::core::java::{JavaOutcome, JavaSource, JavaUpdater, MojangSource};
use crate::core::state::Settings;
use crate::core::sync::output::report_version;
use crate::core::sync::{
    BedrockEdition, Driver, Edition, EditionPipeline, GitCommitter, JavaEdition, SyncOptions,
    SyncSummary,
};
use crate::core::version::Target;

fn http_client() -> SyncResult<reqwest::Client> {
    Ok(build_http_client()?)
}

// ── extract-cik ─────────────────────────────────────────

/// Dump the content keys on this machine and return the `CIK_DATA` value.
pub fn extract_cik(settings: &Settings) -> SyncResult<String> {
    let keys = CikExtractor::new(settings.cik_extractor_path(), settings.cik_dir()).run()?;
    info!("Store the printed value as the {} secret", CIK_ENV);
    Ok(keys.encode())
}

// ── bedrock ─────────────────────────────────────────────

pub async fn bedrock(settings: &Settings, target: &Target) -> SyncResult<BedrockOutcome> {
    let cik = std::env::var(CIK_ENV).ok();
    let source = McappxSource::new(http_client()?, settings.retry);
    let extractor = BuildTypeExtractor::new(settings.xvdtool_path());
    let outcome = run_bedrock(settings, &source, &extractor, cik, target).await?;

    let changed = matches!(outcome, BedrockOutcome::Updated { .. });
    report_version(Edition::Bedrock, changed.then_some(outcome.version()))?;
    Ok(outcome)
}

/// Credentials are decoded before the source is touched.
pub async fn run_bedrock(
    settings: &Settings,
    source: &dyn PackageSource,
    extractor: &dyn PackageExtractor,
    cik: Option<String>,
    target: &Target,
) -> SyncResult<BedrockOutcome> {
    let keys = ContentKeys::from_value(cik)?;
    BedrockPipeline::new(settings, source, extractor, &keys)
        .run(target)
        .await
}

// ── merge ───────────────────────────────────────────────

pub fn merge(settings: &Settings, version: &str) -> SyncResult<MergeReport> {
    Merger::new(settings.extracted_dir(), settings.merged_dir()).merge(version)
}

// ── java ────────────────────────────────────────────────

pub async fn java(settings: &Settings, target: &Target) -> SyncResult<JavaOutcome> {
    let source = MojangSource::new(http_client()?, settings.retry);
    let outcome = JavaUpdater::new(settings, &source).run(target).await?;

    let changed = matches!(outcome, JavaOutcome::Updated { .. });
    report_version(Edition::Java, changed.then_some(outcome.version()))?;
    Ok(outcome)
}

// ── sync ────────────────────────────────────────────────

pub async fn sync(
    settings: &Settings,
    edition: EditionArg,
    options: SyncOptions,
) -> SyncResult<SyncSummary> {
    let cik = std::env::var(CIK_ENV).ok();
    let client = http_client()?;
    let bedrock_source = McappxSource::new(client.clone(), settings.retry);
    let extractor = BuildTypeExtractor::new(settings.xvdtool_path());
    let java_source = MojangSource::new(client, settings.retry);
    let committer = GitCommitter::new(settings.base_dir.clone());

    run_sync(
        settings,
        SyncSources {
            bedrock: &bedrock_source,
            extractor: &extractor,
            java: &java_source,
        },
        &Driver::new(&committer, options),
        edition,
        cik,
    )
    .await?
    .into_result()
}

/// Collaborators the sync command wires together.
pub struct SyncSources<'a> {
    pub bedrock: &'a dyn PackageSource,
    pub extractor: &'a dyn PackageExtractor,
    pub java: &'a dyn JavaSource,
}

pub async fn run_sync(
    settings: &Settings,
    sources: SyncSources<'_>,
    driver: &Driver<'_>,
    edition: EditionArg,
    cik: Option<String>,
) -> SyncResult<SyncSummary> {
    // Missing credentials stop the whole run before anything is fetched.
    let keys = if edition.includes_bedrock() {
        Some(ContentKeys::from_value(cik)?)
    } else {
        None
    };

    let bedrock = keys.as_ref().map(|keys| {
        BedrockEdition::new(BedrockPipeline::new(
            settings,
            sources.bedrock,
            sources.extractor,
            keys,
        ))
    });
    let java = edition
        .includes_java()
        .then(|| JavaEdition::new(JavaUpdater::new(settings, sources.java)));

    let mut pipelines: Vec<&dyn EditionPipeline> = Vec::new();
    if let Some(bedrock) = &bedrock {
        pipelines.push(bedrock);
    }
    if let Some(java) = &java {
        pipelines.push(java);
    }
    if pipelines.is_empty() {
        return Err(SyncError::Configuration("no edition selected".into()));
    }

    driver.run(&pipelines).await
}
