//! Dump orchestration.
//!
//! A dump runs `probe -> listing | blind -> sanitize -> checkout`. Every
//! failure is folded into a [`DumpOutcome`] by [`Dumper::run`].

mod checkout;
mod discover;
mod lock;
mod probe;

use std::path::Path;
use std::sync::Arc;

use dotgit_core::{DumpJob, DumpOutcome};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::{DumpError, Result};
use crate::fetch::{DirectoryFetcher, FetchContext, FileFetcher, ObjectFetcher, RefFinder};
use crate::frontier;
use crate::sanitize::ConfigSanitizer;
use crate::transport::{HttpTransport, Transport};

pub use checkout::{CheckoutMode, checkout};
pub use discover::{
    COMMON_FILES, ObjectSeeds, discover_objects, hex_tokens, pack_tasks, ref_candidates,
};
pub use lock::{DestinationLock, LOCK_FILE};
pub use probe::{Strategy, is_head_content, probe_head, select_strategy};

/// Seed of the listing pass.
const LISTING_SEED: [&str; 2] = [".git/", ".gitignore"];

/// Counters logged after a blind dump.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlindSummary {
    pub files: usize,
    pub refs: usize,
    pub packs: usize,
    pub ids_discovered: usize,
    pub packed: usize,
    pub objects: usize,
    pub checkout: Option<i32>,
}

/// Reconstructs one repository.
///
/// # Example
///
/// ```ignore
/// use dotgit_core::DumpJob;
/// use dotgit_dump::Dumper;
///
/// let job = DumpJob::builder()
///     .url("https://target.example/.git/")
///     .destination("/tmp/dumps/target.example")
///     .build()?;
///
/// let outcome = Dumper::new(job)?.run().await;
/// println!("{}", outcome);
/// ```
pub struct Dumper {
    job: DumpJob,
    transport: Arc<dyn Transport>,
    cancel: CancellationToken,
}

impl Dumper {
    /// Creates a dumper that talks HTTP as configured by `job`.
    pub fn new(job: DumpJob) -> Result<Self> {
        let transport = HttpTransport::from_job(&job)?;
        Ok(Self::with_transport(job, Arc::new(transport)))
    }

    /// Creates a dumper over an existing transport.
    pub fn with_transport(job: DumpJob, transport: Arc<dyn Transport>) -> Self {
        Self {
            job,
            transport,
            cancel: CancellationToken::new(),
        }
    }

    /// Replaces the cancellation token.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Returns the job.
    pub fn job(&self) -> &DumpJob {
        &self.job
    }

    /// Returns a token that cancels this dump between two fetches.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Runs the dump. Never fails: errors become [`DumpOutcome::Error`].
    pub async fn run(&self) -> DumpOutcome {
        match self.try_run().await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Dump of {} failed: {}", self.job.url(), e);
                DumpOutcome::error(e.to_string())
            },
        }
    }

    /// Runs the dump and reports the first fatal error.
    pub async fn try_run(&self) -> Result<DumpOutcome> {
        if self.cancel.is_cancelled() {
            return Err(DumpError::Cancelled);
        }

        let transport = self.transport.as_ref();
        probe_head(transport).await?;
        let strategy = select_strategy(transport).await;
        info!("Dumping {} ({} strategy)", transport.base_url(), strategy.as_str());

        let dest = self.job.destination();
        prepare_destination(dest).await?;
        let _lock = DestinationLock::acquire(dest)?;
        let ctx = FetchContext::new(Arc::clone(&self.transport), dest);

        match strategy {
            Strategy::Listing => {
                let handled = frontier::process(
                    LISTING_SEED.map(String::from),
                    &DirectoryFetcher::new(ctx),
                    &self.cancel,
                )
                .await?;
                info!("Listing pass handled {} paths", handled);

                self.sanitize(dest).await?;
                checkout(&self.job, dest, CheckoutMode::Strict).await?;
            },
            Strategy::Blind => {
                let mut summary = self.blind_dump(ctx).await?;

                self.sanitize(dest).await?;
                summary.checkout = checkout(&self.job, dest, CheckoutMode::BestEffort).await?;
                info!(
                    "Blind dump of {}: {} files, {} refs, {} packs, {} ids discovered, \
                     {} packed, {} objects processed, checkout exit {:?}",
                    transport.base_url(),
                    summary.files,
                    summary.refs,
                    summary.packs,
                    summary.ids_discovered,
                    summary.packed,
                    summary.objects,
                    summary.checkout
                );
            },
        }

        Ok(DumpOutcome::success(
            dest.display().to_string(),
            transport.base_url(),
        ))
    }

    async fn blind_dump(&self, ctx: FetchContext) -> Result<BlindSummary> {
        let mut summary = BlindSummary::default();
        let dest = ctx.destination().to_path_buf();

        info!("Fetching common files");
        let files = COMMON_FILES.iter().map(|p| p.to_string());
        summary.files =
            frontier::process(files, &FileFetcher::new(ctx.clone()), &self.cancel).await?;

        info!("Finding refs");
        summary.refs =
            frontier::process(ref_candidates(), &RefFinder::new(ctx.clone()), &self.cancel)
                .await?;

        let info_packs = dest.join(".git/objects/info/packs");
        if let Ok(text) = tokio::fs::read_to_string(&info_packs).await {
            let tasks = pack_tasks(&text);
            if !tasks.is_empty() {
                info!("Fetching {} pack files", tasks.len());
                frontier::process(tasks, &FileFetcher::new(ctx.clone()), &self.cancel).await?;
            }
        }

        info!("Finding objects");
        let seeds = discover_objects(&dest).await?;
        summary.packs = seeds.packs;
        summary.ids_discovered = seeds.ids.len();
        summary.packed = seeds.packed.len();

        let fetcher = ObjectFetcher::new(ctx, Arc::new(seeds.packed));
        summary.objects = frontier::process(seeds.ids, &fetcher, &self.cancel).await?;

        Ok(summary)
    }

    async fn sanitize(&self, dest: &Path) -> Result<()> {
        let config = dest.join(".git/config");
        if tokio::fs::metadata(&config).await.is_ok_and(|m| m.is_file()) {
            ConfigSanitizer::sanitize_file(&config).await?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for Dumper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dumper")
            .field("job", &self.job)
            .field("base_url", &self.transport.base_url())
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

/// Builds `job` and runs it; construction errors become an error outcome.
pub async fn dump(job: DumpJob, cancel: CancellationToken) -> DumpOutcome {
    match Dumper::new(job) {
        Ok(dumper) => dumper.with_cancellation(cancel).run().await,
        Err(e) => DumpOutcome::error(e.to_string()),
    }
}

async fn prepare_destination(dest: &Path) -> Result<()> {
    if let Ok(mut entries) = tokio::fs::read_dir(dest).await
        && entries.next_entry().await?.is_some()
    {
        warn!("Destination {} is not empty", dest.display());
    }
    tokio::fs::create_dir_all(dest).await?;
    Ok(())
}
