use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;

use crate::model::{Citation, SourceMap};
use crate::parser::fields::{self, QUOTED};
use crate::parser::scan;

/// `/** label */ key: 'url'`
static ENTRY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?s)/\*\*\s*(.*?)\s*\*/\s*(\w+)\s*:\s*{QUOTED}")).unwrap()
});

/// Parse the citation map in `region` (the text starting at its marker).
/// Only the first `{ … }` object after the marker is read.
pub fn extract(region: &str) -> SourceMap {
    let Some(open) = region.find('{') else {
        return SourceMap::new();
    };
    let body = match scan::block_end(region, open) {
        Some(end) => &region[open..end],
        None => &region[open..],
    };

    let mut map = SourceMap::new();
    for caps in ENTRY_RE.captures_iter(body) {
        let (Some(label), Some(key), Some(url)) = (caps.get(1), caps.get(2), caps.get(3)) else {
            continue;
        };
        let citation = Citation {
            label: label.as_str().to_string(),
            url: fields::unescape(url.as_str()),
        };
        if map.insert(key.as_str().to_string(), citation).is_some() {
            warn!(key = key.as_str(), "duplicate source key, keeping the later entry");
        }
    }
    map
}
