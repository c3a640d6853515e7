use serde::{Deserialize, Serialize};

use crate::searcher::SearchResult;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub keyword: Option<String>,
}

/// Wire shape is `{"fileNames":[{"fileName":"a.txt"}]}`; clients depend on the wrapper objects.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub file_names: Vec<FileNameEntry>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileNameEntry {
    pub file_name: String,
}

impl From<SearchResult> for SearchResponse {
    fn from(result: SearchResult) -> Self {
        SearchResponse {
            file_names: result
                .file_names
                .into_iter()
                .map(|file_name| FileNameEntry { file_name })
                .collect(),
        }
    }
}
