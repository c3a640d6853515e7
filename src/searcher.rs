use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::fs::DirEntry;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::error::{ProbeError, SearchError};

/// A single "which files mention this keyword" question.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub directory_path: PathBuf,
    pub keyword: String,
}

impl SearchRequest {
    pub fn new(directory_path: impl Into<PathBuf>, keyword: impl Into<String>) -> SearchRequest {
        SearchRequest {
            directory_path: directory_path.into(),
            keyword: keyword.into(),
        }
    }
}

/// Outcome of probing one file. Produced by exactly one probe task.
#[derive(Debug)]
pub struct FileProbeResult {
    pub file_name: String,
    pub matched: bool,
    pub read_error: Option<ProbeError>,
}

/// Base names of the matching files, sorted lexicographically.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchResult {
    pub file_names: Vec<String>,
}

/// Scans the immediate files of a directory for a case-insensitive keyword.
///
/// Every file is probed on its own tokio task and the searcher waits for all
/// of them before answering. A file that cannot be read or is not UTF-8 text
/// counts as not matching; it never fails the search.
#[derive(Debug, Clone, Default)]
pub struct DirectoryKeywordSearcher {
    max_concurrent_probes: Option<usize>,
}

impl DirectoryKeywordSearcher {
    pub fn new() -> DirectoryKeywordSearcher {
        DirectoryKeywordSearcher::default()
    }

    /// Caps the number of probes reading at the same time. `None` means one
    /// task per file with no limit.
    pub fn with_max_concurrent_probes(mut self, limit: Option<usize>) -> DirectoryKeywordSearcher {
        self.max_concurrent_probes = limit.map(|n| n.max(1));
        self
    }

    pub fn max_concurrent_probes(&self) -> Option<usize> {
        self.max_concurrent_probes
    }

    pub async fn search(
        &self,
        request: &SearchRequest,
        cancel: &CancellationToken,
    ) -> Result<SearchResult, SearchError> {
        if request.keyword.trim().is_empty() {
            return Err(SearchError::InvalidKeyword);
        }
        if cancel.is_cancelled() {
            return Err(SearchError::Cancelled);
        }

        let files = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(SearchError::Cancelled),
            files = list_files(&request.directory_path) => files?,
        };

        tracing::debug!(
            directory = %request.directory_path.display(),
            files = files.len(),
            "probing files"
        );

        let matcher = Arc::new(KeywordMatcher::new(&request.keyword));
        // fresh per search, so nothing is shared between requests
        let permits = self
            .max_concurrent_probes
            .map(|limit| Arc::new(Semaphore::new(limit)));

        let mut probes = JoinSet::new();
        for path in files {
            let matcher = matcher.clone();
            let permits = permits.clone();
            probes.spawn(async move {
                let _permit = match permits {
                    Some(permits) => permits.acquire_owned().await.ok(),
                    None => None,
                };
                probe_file(path, &matcher).await
            });
        }

        let mut file_names = collect_matches(&mut probes, cancel).await.inspect_err(|_| {
            tracing::warn!(
                directory = %request.directory_path.display(),
                "search cancelled with probes in flight"
            );
        })?;
        file_names.sort();
        Ok(SearchResult { file_names })
    }
}

/// Waits for every probe and keeps the names of the ones that matched. If the
/// token fires first, the remaining probes are aborted and nothing is returned.
async fn collect_matches(
    probes: &mut JoinSet<FileProbeResult>,
    cancel: &CancellationToken,
) -> Result<Vec<String>, SearchError> {
    let mut file_names = Vec::new();
    loop {
        let joined = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            joined = probes.join_next() => Some(joined),
        };
        let Some(joined) = joined else {
            probes.abort_all();
            return Err(SearchError::Cancelled);
        };

        match joined {
            None => return Ok(file_names),
            Some(Ok(probe)) => {
                if let Some(err) = &probe.read_error {
                    tracing::debug!(path = %err.path().display(), "skipping file: {:#}", err);
                }
                if probe.matched {
                    file_names.push(probe.file_name);
                }
            }
            Some(Err(e)) => {
                tracing::warn!("probe task failed, file treated as not matching: {}", e);
            }
        }
    }
}

/// Case-insensitive substring matcher. Each char is folded to lowercase on its
/// own (no context rules such as Greek final sigma) and compared ordinally,
/// streaming over the content without building a folded copy.
#[derive(Debug, Clone)]
pub struct KeywordMatcher {
    needle: Vec<char>,
    // KMP failure table: longest proper prefix of needle[..=i] that is also a suffix
    fallback: Vec<usize>,
}

impl KeywordMatcher {
    pub fn new(keyword: &str) -> KeywordMatcher {
        let needle: Vec<char> = fold(keyword).collect();
        let mut fallback = vec![0; needle.len()];
        let mut k = 0;
        for i in 1..needle.len() {
            while k > 0 && needle[i] != needle[k] {
                k = fallback[k - 1];
            }
            if needle[i] == needle[k] {
                k += 1;
            }
            fallback[i] = k;
        }
        KeywordMatcher { needle, fallback }
    }

    pub fn is_match(&self, content: &str) -> bool {
        if self.needle.is_empty() {
            return true;
        }
        let mut matched = 0;
        for c in fold(content) {
            while matched > 0 && self.needle[matched] != c {
                matched = self.fallback[matched - 1];
            }
            if self.needle[matched] == c {
                matched += 1;
                if matched == self.needle.len() {
                    return true;
                }
            }
        }
        false
    }
}

fn fold(text: &str) -> impl Iterator<Item = char> + '_ {
    text.chars().flat_map(char::to_lowercase)
}

/// Case-insensitive substring test, see [`KeywordMatcher`].
pub fn contains_keyword(content: &str, keyword: &str) -> bool {
    KeywordMatcher::new(keyword).is_match(content)
}

async fn list_files(directory: &Path) -> Result<Vec<PathBuf>, SearchError> {
    let not_found = |source: Option<std::io::Error>| SearchError::DirectoryNotFound {
        path: directory.to_path_buf(),
        source,
    };

    let metadata = tokio::fs::metadata(directory)
        .await
        .map_err(|e| not_found(Some(e)))?;
    if !metadata.is_dir() {
        return Err(not_found(None));
    }

    let mut entries = tokio::fs::read_dir(directory)
        .await
        .map_err(|e| not_found(Some(e)))?;

    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(|e| not_found(Some(e)))? {
        if is_probe_candidate(&entry).await {
            files.push(entry.path());
        }
    }
    Ok(files)
}

/// Regular files and links that do not lead to a directory. Dangling links
/// are kept so they fail like any other unreadable file.
async fn is_probe_candidate(entry: &DirEntry) -> bool {
    match entry.file_type().await {
        Ok(file_type) if file_type.is_file() => true,
        Ok(file_type) if file_type.is_symlink() => match tokio::fs::metadata(entry.path()).await {
            Ok(target) => target.is_file(),
            Err(_) => true,
        },
        Ok(_) => false,
        Err(_) => true,
    }
}

async fn probe_file(path: PathBuf, matcher: &KeywordMatcher) -> FileProbeResult {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    match read_text(&path).await {
        Ok(content) => FileProbeResult {
            matched: matcher.is_match(&content),
            file_name,
            read_error: None,
        },
        Err(e) => FileProbeResult {
            file_name,
            matched: false,
            read_error: Some(e),
        },
    }
}

async fn read_text(path: &Path) -> Result<String, ProbeError> {
    let bytes = tokio::fs::read(path).await.map_err(|source| ProbeError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    String::from_utf8(bytes).map_err(|source| ProbeError::Decode {
        path: path.to_path_buf(),
        source,
    })
}
