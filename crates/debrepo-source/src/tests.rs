use super::*;
use debrepo_core::{IndexFamily, StripConvention, StripConventions};
use debrepo_tree::IssueKind;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

const BINARY_INDEX: &str = concat!(
    "Package: foo\n",
    "Version: 1.0\n",
    "Architecture: amd64\n",
    "Filename: pool/main/f/foo/foo_1.0_amd64.deb\n",
    "Description: foo tool\n",
    " Longer text: mentions a colon.\n",
    "\n",
    "Package: libbar1\n",
    "Version: 2.3-1\n",
    "Filename: pool/main/libb/libbar/libbar1_2.3-1_amd64.deb\n",
    "\n",
);

const SOURCE_INDEX: &str = concat!(
    "Package: libbar\n",
    "Version: 2.3-1\n",
    "Directory: pool/main/libb/libbar\n",
    "Files:\n",
    " 0123456789abcdef 1200 libbar_2.3-1.dsc\n",
    "\n",
    "Package: broken\n",
    "Version: 0.1\n",
);

#[derive(Default)]
struct MemoryFetcher {
    files: HashMap<String, Vec<u8>>,
}

impl MemoryFetcher {
    fn with(mut self, url: &str, bytes: Vec<u8>) -> Self {
        self.files.insert(url.to_string(), bytes);
        self
    }
}

impl IndexFetcher for MemoryFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.files
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::NotFound {
                url: url.to_string(),
            })
    }
}

#[test]
fn remote_sources_cover_every_dist_component_and_arch() {
    let output_root = PathBuf::from("/srv/mirror");
    let plan = RemotePlan {
        base_url: "https://deb.example.test/debian/".to_string(),
        distributions: vec!["stable".to_string()],
        components: vec!["main".to_string(), "contrib".to_string()],
        architectures: vec!["binary-amd64".to_string(), "source".to_string()],
        output_root: output_root.clone(),
    };

    let sources = remote_sources(&plan);
    let labels: Vec<String> = sources.iter().map(IndexSource::label).collect();
    assert_eq!(
        labels,
        vec![
            "https://deb.example.test/debian/dists/stable/main/binary-amd64/Packages.gz",
            "https://deb.example.test/debian/dists/stable/main/source/Sources.gz",
            "https://deb.example.test/debian/dists/stable/contrib/binary-amd64/Packages.gz",
            "https://deb.example.test/debian/dists/stable/contrib/source/Sources.gz",
        ]
    );
    assert_eq!(sources[1].family, IndexFamily::Source);
    assert_eq!(
        sources[2].output_root,
        output_root.join("stable").join("contrib").join("binary-amd64")
    );
}

#[test]
fn sync_sources_mirrors_indices_and_skips_failed_fetches() {
    let output_root = test_root();
    let plan = RemotePlan {
        base_url: "https://deb.example.test/debian".to_string(),
        distributions: vec!["stable".to_string()],
        components: vec!["main".to_string(), "contrib".to_string()],
        architectures: vec!["binary-amd64".to_string(), "source".to_string()],
        output_root: output_root.clone(),
    };
    let fetcher = MemoryFetcher::default()
        .with(
            "https://deb.example.test/debian/dists/stable/main/binary-amd64/Packages.gz",
            gzip(BINARY_INDEX),
        )
        .with(
            "https://deb.example.test/debian/dists/stable/main/source/Sources.gz",
            gzip(SOURCE_INDEX),
        );

    let mut seen = Vec::new();
    let report = sync_sources(
        &fetcher,
        &remote_sources(&plan),
        &StripConventions::default(),
        &mut |source| seen.push(source.source.clone()),
    );

    assert_eq!(seen.len(), 4);
    let binary_root = output_root.join("stable/main/binary-amd64");
    assert_eq!(
        fs::read_to_string(binary_root.join("f/foo/foo_1.0_amd64.deb")).expect("must read foo"),
        concat!(
            "Package: foo\n",
            "Version: 1.0\n",
            "Architecture: amd64\n",
            "Filename: pool/main/f/foo/foo_1.0_amd64.deb\n",
            "Description: foo tool\n",
            " Longer text: mentions a colon.\n",
            "\n",
        )
    );
    assert!(binary_root
        .join("libb/libbar/libbar1_2.3-1_amd64.deb")
        .is_file());
    assert!(output_root
        .join("stable/main/source/libb/libbar/libbar_2.3-1.dsc")
        .is_file());

    let fetch_failures: Vec<&str> = report
        .sources
        .iter()
        .flat_map(|source| source.issues.iter())
        .filter(|issue| issue.kind == IssueKind::Fetch)
        .map(|issue| issue.subject.as_str())
        .collect();
    assert_eq!(
        fetch_failures,
        vec![
            "https://deb.example.test/debian/dists/stable/contrib/binary-amd64/Packages.gz",
            "https://deb.example.test/debian/dists/stable/contrib/source/Sources.gz",
        ]
    );

    let summary = report.summary();
    assert_eq!(summary.succeeded, 3);
    assert_eq!(summary.failed, 2);
    assert_eq!(summary.skipped, 1, "source record without Directory is skipped");

    let _ = fs::remove_dir_all(&output_root);
}

#[test]
fn resync_removes_records_dropped_from_the_index() {
    let output_root = test_root();
    let conventions = StripConventions::default();
    sync_index_text(BINARY_INDEX, IndexFamily::Binary, &output_root, &conventions);

    let reduced = "Package: foo\nVersion: 1.1\nFilename: pool/main/f/foo/foo_1.1_amd64.deb\n";
    let report = sync_index_text(reduced, IndexFamily::Binary, &output_root, &conventions);
    assert_eq!(
        report.reconcile.removed_files,
        vec![
            "f/foo/foo_1.0_amd64.deb".to_string(),
            "libb/libbar/libbar1_2.3-1_amd64.deb".to_string()
        ]
    );
    assert_eq!(report.reconcile.removed_dirs, vec!["libb/libbar", "libb"]);
    assert_eq!(report.projection.written, 1);
    assert!(output_root.join("f/foo/foo_1.1_amd64.deb").is_file());

    let again = sync_index_text(reduced, IndexFamily::Binary, &output_root, &conventions);
    assert_eq!(again.reconcile.mutation_count(), 0);
    assert_eq!(again.projection.written, 0);
    assert_eq!(again.projection.unchanged, 1);

    let _ = fs::remove_dir_all(&output_root);
}

#[test]
fn sync_replaces_stale_file_standing_where_a_directory_is_needed() {
    let output_root = test_root();
    fs::create_dir_all(&output_root).expect("must create output root");
    fs::write(output_root.join("f"), "stale").expect("must write stale file");

    let index = "Package: foo\nVersion: 1.0\nFilename: pool/main/f/foo/foo_1.0_amd64.deb\n";
    let report = sync_index_text(
        index,
        IndexFamily::Binary,
        &output_root,
        &StripConventions::default(),
    );
    assert_eq!(report.reconcile.removed_files, vec!["f".to_string()]);
    assert_eq!(report.projection.written, 1);
    assert!(report.projection.issues.is_empty());
    assert!(!report.summary().has_failures());
    assert!(output_root.join("f/foo/foo_1.0_amd64.deb").is_file());

    let _ = fs::remove_dir_all(&output_root);
}

#[test]
fn sync_index_text_uses_the_family_convention() {
    let output_root = test_root();
    let conventions = StripConventions {
        binary: StripConvention::PoolComponent,
        source: StripConvention::PoolComponentPrefix,
    };

    let report = sync_index_text(SOURCE_INDEX, IndexFamily::Source, &output_root, &conventions);
    assert_eq!(report.records, 2);
    assert_eq!(report.projection.written, 1);
    assert_eq!(report.issues.len(), 1);
    assert_eq!(report.issues[0].kind, IssueKind::MissingIdentity);
    assert!(output_root.join("libbar/libbar_2.3-1.dsc").is_file());

    let _ = fs::remove_dir_all(&output_root);
}

#[test]
fn undecodable_index_is_reported_and_leaves_tree_alone() {
    let output_root = test_root();
    let target = output_root.join("stable/main/binary-amd64");
    fs::create_dir_all(target.join("f/foo")).expect("must create tree");
    fs::write(target.join("f/foo/foo_1.0_amd64.deb"), "Package: foo\n\n")
        .expect("must seed tree");

    let url = "https://deb.example.test/debian/dists/stable/main/binary-amd64/Packages.gz";
    let fetcher = MemoryFetcher::default().with(url, b"not gzip at all".to_vec());
    let sources = vec![IndexSource {
        location: IndexLocation::Remote(url.to_string()),
        family: IndexFamily::Binary,
        output_root: target.clone(),
    }];

    let report = sync_sources(
        &fetcher,
        &sources,
        &StripConventions::default(),
        &mut |_| {},
    );
    assert_eq!(report.sources[0].issues[0].kind, IssueKind::Decompress);
    assert_eq!(report.summary().failed, 1);
    assert!(target.join("f/foo/foo_1.0_amd64.deb").is_file());

    let _ = fs::remove_dir_all(&output_root);
}

#[test]
fn discover_local_sources_mirrors_relative_directories() {
    let local_root = test_root();
    let output_root = test_root();
    write_gzip(
        &local_root.join("stable/main/binary-amd64/Packages.gz"),
        BINARY_INDEX,
    );
    write_gzip(&local_root.join("stable/main/source/Sources.gz"), SOURCE_INDEX);
    fs::write(local_root.join("stable/Release"), "Suite: stable\n").expect("must write release");

    let (sources, issues) =
        discover_local_sources(&local_root, &output_root).expect("must discover sources");
    assert!(issues.is_empty());
    assert_eq!(sources.len(), 2);
    assert_eq!(sources[0].family, IndexFamily::Binary);
    assert_eq!(
        sources[0].output_root,
        output_root.join("stable/main/binary-amd64")
    );
    assert_eq!(sources[1].family, IndexFamily::Source);

    let report = sync_sources(
        &MemoryFetcher::default(),
        &sources,
        &StripConventions::default(),
        &mut |_| {},
    );
    assert_eq!(report.summary().failed, 0);
    assert!(output_root
        .join("stable/main/binary-amd64/f/foo/foo_1.0_amd64.deb")
        .is_file());
    assert!(output_root
        .join("stable/main/source/libb/libbar/libbar_2.3-1.dsc")
        .is_file());

    let _ = fs::remove_dir_all(&local_root);
    let _ = fs::remove_dir_all(&output_root);
}

#[test]
fn discover_local_sources_skips_indices_sharing_an_output_root() {
    let local_root = test_root();
    write_gzip(&local_root.join("flat/Packages.gz"), BINARY_INDEX);
    write_gzip(&local_root.join("flat/Sources.gz"), SOURCE_INDEX);

    let (sources, issues) =
        discover_local_sources(&local_root, Path::new("/srv/out")).expect("must discover");
    assert_eq!(sources.len(), 1);
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].kind, IssueKind::PathConvention);
    assert!(issues[0].subject.ends_with("Sources.gz"));

    let _ = fs::remove_dir_all(&local_root);
}

#[test]
fn discover_local_sources_rejects_missing_directory() {
    let err = discover_local_sources(&test_root(), Path::new("/srv/out"))
        .expect_err("must reject missing directory");
    assert!(err.to_string().contains("local index directory not found"));
}

#[test]
fn decompress_gzip_inflates_text_and_rejects_garbage() {
    assert_eq!(
        decompress_gzip(&gzip(BINARY_INDEX)).expect("must inflate"),
        BINARY_INDEX
    );
    let err = decompress_gzip(b"plain").expect_err("must reject non-gzip input");
    assert!(err.to_string().contains("gzip"));
}

fn gzip(text: &str) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(text.as_bytes())
        .expect("must compress index");
    encoder.finish().expect("must finish gzip stream")
}

fn write_gzip(path: &Path, text: &str) {
    fs::create_dir_all(path.parent().expect("index has a parent")).expect("must create dir");
    fs::write(path, gzip(text)).expect("must write index");
}

fn test_root() -> PathBuf {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let mut path = std::env::temp_dir();
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time")
        .as_nanos();
    path.push(format!(
        "debrepo-source-tests-{}-{}-{}",
        std::process::id(),
        nanos,
        COUNTER.fetch_add(1, Ordering::Relaxed)
    ));
    path
}
