mod decompress;
mod fetch;
mod import;

pub use decompress::decompress_gzip;
pub use fetch::{FetchError, HttpFetcher, IndexFetcher, OfflineFetcher};
pub use import::{
    discover_local_sources, remote_sources, sync_index_text, sync_sources, ImportReport,
    IndexLocation, IndexSource, IndexSyncReport, RemotePlan,
};

#[cfg(test)]
mod tests;
