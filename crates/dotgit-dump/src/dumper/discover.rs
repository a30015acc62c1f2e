//! Well-known paths and object seeding for the blind strategy.

use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::Result;
use crate::object::{ObjectId, read_index};
use crate::pack::read_pack;

/// Plain files fetched first: metadata, hook samples and the index.
pub const COMMON_FILES: &[&str] = &[
    ".gitignore",
    ".git/COMMIT_EDITMSG",
    ".git/description",
    ".git/hooks/applypatch-msg.sample",
    ".git/hooks/commit-msg.sample",
    ".git/hooks/post-commit.sample",
    ".git/hooks/post-receive.sample",
    ".git/hooks/post-update.sample",
    ".git/hooks/pre-applypatch.sample",
    ".git/hooks/pre-commit.sample",
    ".git/hooks/pre-push.sample",
    ".git/hooks/pre-rebase.sample",
    ".git/hooks/pre-receive.sample",
    ".git/hooks/prepare-commit-msg.sample",
    ".git/hooks/update.sample",
    ".git/index",
    ".git/info/exclude",
    ".git/objects/info/packs",
];

const FIXED_REF_FILES: &[&str] = &[
    ".git/FETCH_HEAD",
    ".git/HEAD",
    ".git/ORIG_HEAD",
    ".git/config",
    ".git/info/refs",
    ".git/logs/HEAD",
    ".git/logs/refs/stash",
    ".git/packed-refs",
    ".git/refs/stash",
    ".git/logs/refs/remotes/origin/HEAD",
    ".git/refs/remotes/origin/HEAD",
];

const COMMON_BRANCHES: &[&str] = &["main", "master", "staging", "production", "development"];

/// Files that name object ids directly, besides the `refs/` and `logs/`
/// trees.
const ID_SOURCES: &[&str] = &[
    ".git/packed-refs",
    ".git/info/refs",
    ".git/FETCH_HEAD",
    ".git/ORIG_HEAD",
    ".git/HEAD",
];

static PACK_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"pack-([a-f0-9]{40})\.pack").expect("pack regex is valid"));

/// Likely locations of refs and reflogs.
pub fn ref_candidates() -> Vec<String> {
    let mut candidates: Vec<String> = FIXED_REF_FILES.iter().map(|p| p.to_string()).collect();
    for branch in COMMON_BRANCHES {
        candidates.extend([
            format!(".git/logs/refs/heads/{branch}"),
            format!(".git/logs/refs/remotes/origin/{branch}"),
            format!(".git/refs/heads/{branch}"),
            format!(".git/refs/remotes/origin/{branch}"),
            format!(".git/refs/wip/wtree/refs/heads/{branch}"),
            format!(".git/refs/wip/index/refs/heads/{branch}"),
        ]);
    }
    candidates
}

/// Turns the content of `objects/info/packs` into index and data file
/// tasks.
pub fn pack_tasks(info_packs: &str) -> Vec<String> {
    let mut tasks = Vec::new();
    for cap in PACK_NAME.captures_iter(info_packs) {
        let sha = &cap[1];
        for ext in ["idx", "pack"] {
            let task = format!(".git/objects/pack/pack-{sha}.{ext}");
            if !tasks.contains(&task) {
                tasks.push(task);
            }
        }
    }
    tasks
}

/// Returns every 40-hex token of `text`.
pub fn hex_tokens(text: &str) -> impl Iterator<Item = ObjectId> + '_ {
    text.split_whitespace()
        .filter(|token| ObjectId::is_hex_token(token))
        .filter_map(ObjectId::from_hex)
}

/// The starting point of the object pass.
#[derive(Debug, Clone, Default)]
pub struct ObjectSeeds {
    /// Ids to fetch as loose objects.
    pub ids: BTreeSet<ObjectId>,
    /// Ids already present in a local pack.
    pub packed: HashSet<ObjectId>,
    /// Packs that were read successfully.
    pub packs: usize,
}

/// Collects object ids from everything downloaded so far under `dest`:
/// ref and log files, the index and local packs. Packed ids are moved to
/// [`ObjectSeeds::packed`].
pub async fn discover_objects(dest: &Path) -> Result<ObjectSeeds> {
    let root = dest.to_path_buf();
    let (mut ids, pack_pairs) = tokio::task::spawn_blocking(move || {
        let mut ids = scan_ref_files(&root);
        ids.extend(scan_index(&root));
        (ids, local_packs(&root))
    })
    .await?;

    let mut seeds = ObjectSeeds::default();
    for (index_path, pack_path) in pack_pairs {
        match read_pack(index_path, pack_path.clone()).await {
            Ok(contents) => {
                info!(
                    "Read {}: {} objects, {} references",
                    pack_path.display(),
                    contents.packed.len(),
                    contents.references.len()
                );
                seeds.packs += 1;
                ids.extend(contents.references);
                seeds.packed.extend(contents.packed);
            },
            Err(e) => warn!("Could not read {}: {}", pack_path.display(), e),
        }
    }

    ids.retain(|id| !seeds.packed.contains(id));
    seeds.ids = ids;
    Ok(seeds)
}

fn scan_ref_files(root: &Path) -> BTreeSet<ObjectId> {
    let mut files: Vec<PathBuf> = ID_SOURCES.iter().map(|p| root.join(p)).collect();
    for tree in [".git/refs", ".git/logs"] {
        files.extend(
            WalkDir::new(root.join(tree))
                .into_iter()
                .filter_map(|entry| entry.ok())
                .filter(|entry| entry.file_type().is_file())
                .map(|entry| entry.into_path()),
        );
    }

    let mut ids = BTreeSet::new();
    for file in files {
        if let Ok(bytes) = std::fs::read(&file) {
            ids.extend(hex_tokens(&String::from_utf8_lossy(&bytes)));
        }
    }
    ids
}

fn scan_index(root: &Path) -> Vec<ObjectId> {
    let Ok(bytes) = std::fs::read(root.join(".git/index")) else {
        return Vec::new();
    };
    match read_index(&bytes) {
        Ok(entries) => {
            debug!("Index lists {} entries", entries.len());
            entries.into_iter().map(|entry| entry.id).collect()
        },
        Err(e) => {
            warn!("Could not read .git/index: {}", e);
            Vec::new()
        },
    }
}

fn local_packs(root: &Path) -> Vec<(PathBuf, PathBuf)> {
    let Ok(dir) = std::fs::read_dir(root.join(".git/objects/pack")) else {
        return Vec::new();
    };

    let mut pairs: Vec<(PathBuf, PathBuf)> = dir
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.extension().is_some_and(|ext| ext == "pack")
                && path
                    .file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| name.starts_with("pack-"))
        })
        .filter_map(|pack| {
            let index = pack.with_extension("idx");
            index.is_file().then_some((index, pack))
        })
        .collect();
    pairs.sort();
    pairs
}
