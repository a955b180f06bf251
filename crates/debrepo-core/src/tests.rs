use super::*;

const FOO_STANZA: &str =
    "Package: foo\nVersion: 1.0\nFilename: pool/main/f/foo/foo_1.0_amd64.deb\n\n";

fn foo_record() -> Record {
    Record::from_fields([
        ("Package", "foo"),
        ("Version", "1.0"),
        ("Filename", "pool/main/f/foo/foo_1.0_amd64.deb"),
    ])
}

#[test]
fn parse_single_binary_stanza() {
    let records = parse_str(FOO_STANZA);
    assert_eq!(records, vec![foo_record()]);
    let keys: Vec<&str> = records[0].fields().map(|(key, _)| key).collect();
    assert_eq!(keys, vec!["Package", "Version", "Filename"]);
}

#[test]
fn parse_flushes_trailing_stanza_without_blank_line() {
    let records = parse_str("Package: a\nVersion: 1\n\nPackage: b\nVersion: 2");
    assert_eq!(records.len(), 2);
    assert_eq!(records[1].package(), Some("b"));
    assert_eq!(records[1].version(), Some("2"));
}

#[test]
fn parse_preserves_stanza_order() {
    let records = parse_str("Package: z\n\nPackage: a\n\nPackage: m\n\n");
    let names: Vec<&str> = records.iter().filter_map(Record::package).collect();
    assert_eq!(names, vec!["z", "a", "m"]);
}

#[test]
fn parse_trims_key_and_value() {
    let records = parse_str("  Package :   foo  \n");
    assert_eq!(records[0].get("Package"), Some("foo"));
}

#[test]
fn parse_splits_on_first_delimiter_only() {
    let records = parse_str("Homepage: https://example.test/foo\n");
    assert_eq!(records[0].get("Homepage"), Some("https://example.test/foo"));
}

#[test]
fn parse_joins_continuation_lines_with_line_breaks() {
    let text = "Package: foo\nDescription: short summary\n long line one\n .\n long: with colon\nVersion: 1.0\n\n";
    let records = parse_str(text);
    assert_eq!(records.len(), 1);
    assert_eq!(
        records[0].get("Description"),
        Some("short summary\n long line one\n .\n long: with colon")
    );
    assert_eq!(records[0].get("Version"), Some("1.0"));
}

#[test]
fn parse_appends_unindented_continuation_to_last_field() {
    let records = parse_str("Package: foo\nVersion: 1.0\nextra text\n\n");
    assert_eq!(records[0].get("Version"), Some("1.0\nextra text"));
    assert_eq!(records[0].get("Package"), Some("foo"));
}

#[test]
fn continuation_targets_last_inserted_field_even_after_repeat() {
    let records = parse_str("Package: foo\nVersion: 1.0\nPackage: bar\n more\n\n");
    assert_eq!(records[0].get("Package"), Some("bar\n more"));
    assert_eq!(records[0].get("Version"), Some("1.0"));
    let keys: Vec<&str> = records[0].fields().map(|(key, _)| key).collect();
    assert_eq!(keys, vec!["Package", "Version"]);
}

#[test]
fn parse_drops_lines_outside_any_stanza() {
    let records = parse_str("orphan text\n\n   \nPackage: foo\n\n");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].package(), Some("foo"));
}

#[test]
fn parse_drops_field_lines_with_empty_name() {
    let records = parse_str("Package: foo\n: nothing\nVersion: 1\n\n");
    assert_eq!(records[0].len(), 2);
    assert_eq!(records[0].get("Version"), Some("1"));
}

#[test]
fn parse_handles_crlf_and_whitespace_only_separators() {
    let records = parse_str("Package: a\r\nVersion: 1\r\n \r\nPackage: b\r\n");
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].version(), Some("1"));
}

#[test]
fn parse_empty_input_yields_no_records() {
    assert!(parse_str("").is_empty());
    assert!(parse_str("\n\n\n").is_empty());
}

#[test]
fn serialize_record_reproduces_fields_in_order() {
    assert_eq!(serialize_record(&foo_record()), FOO_STANZA);
}

#[test]
fn multiline_value_round_trips_to_original_text() {
    let text = "Package: foo\nDescription: summary\n first detail\n .\n second: detail\nextra\n\n";
    let records = parse_str(text);
    assert_eq!(serialize_records(&records), text);
    assert_eq!(parse_str(&serialize_records(&records)), records);
}

#[test]
fn source_stanza_with_empty_leading_value_round_trips() {
    let text = concat!(
        "Package: bar\n",
        "Version: 2.0-1\n",
        "Directory: pool/main/b/bar\n",
        "Files:\n",
        " d41d8cd98f00b204e9800998ecf8427e 100 bar_2.0-1.dsc\n",
        " 0cc175b9c0f1b6a831c399e269772661 2000 bar_2.0.orig.tar.gz\n",
        "\n",
    );
    let records = parse_str(text);
    assert_eq!(
        records[0].get("Files"),
        Some("\n d41d8cd98f00b204e9800998ecf8427e 100 bar_2.0-1.dsc\n 0cc175b9c0f1b6a831c399e269772661 2000 bar_2.0.orig.tar.gz")
    );
    assert_eq!(serialize_records(&records), text);
    assert_eq!(parse_str(&serialize_records(&records)), records);
}

#[test]
fn empty_value_serializes_without_trailing_space() {
    let record = Record::from_fields([("Package", "bar"), ("Uploaders", "")]);
    assert_eq!(serialize_record(&record), "Package: bar\nUploaders:\n\n");
}

#[test]
fn resolve_binary_record_with_pool_component_convention() {
    let resolver = PathResolver::new(StripConvention::PoolComponent);
    assert_eq!(
        resolver.resolve(&foo_record()).expect("must resolve"),
        "f/foo/foo_1.0_amd64.deb"
    );
}

#[test]
fn resolve_binary_record_with_prefix_convention() {
    let resolver = PathResolver::new(StripConvention::PoolComponentPrefix);
    assert_eq!(
        resolver.resolve(&foo_record()).expect("must resolve"),
        "foo/foo_1.0_amd64.deb"
    );

    let lib = Record::from_fields([
        ("Package", "libfoo1"),
        ("Version", "1.0"),
        ("Filename", "pool/main/libf/libfoo/libfoo1_1.0_amd64.deb"),
    ]);
    assert_eq!(
        resolver.resolve(&lib).expect("must resolve lib prefix"),
        "libfoo/libfoo1_1.0_amd64.deb"
    );
}

#[test]
fn prefix_convention_rejects_mismatched_hash_prefix() {
    let resolver = PathResolver::new(StripConvention::PoolComponentPrefix);
    let record = Record::from_fields([("Filename", "pool/main/x/foo/foo_1.0_amd64.deb")]);
    let err = resolver
        .resolve(&record)
        .expect_err("must reject mismatched prefix");
    assert!(matches!(err, ResolveError::PathConvention { .. }));
    assert!(err.to_string().contains("hash prefix"));
}

#[test]
fn pool_conventions_reject_paths_outside_pool() {
    let resolver = PathResolver::new(StripConvention::PoolComponent);
    let record = Record::from_fields([("Filename", "dists/main/foo_1.0_amd64.deb")]);
    let err = resolver
        .resolve(&record)
        .expect_err("must reject non-pool path");
    assert!(err.to_string().contains("pool/"));
}

#[test]
fn explicit_component_count_skips_structure_checks() {
    let resolver = PathResolver::new(StripConvention::Components(1));
    let record = Record::from_fields([("Filename", "mirror/f/foo/foo.deb")]);
    assert_eq!(
        resolver.resolve(&record).expect("must resolve"),
        "f/foo/foo.deb"
    );
}

#[test]
fn resolve_rejects_paths_that_strip_to_nothing() {
    let resolver = PathResolver::new(StripConvention::PoolComponent);
    let record = Record::from_fields([("Filename", "pool/main")]);
    let err = resolver.resolve(&record).expect_err("must reject");
    assert!(matches!(err, ResolveError::PathConvention { .. }));
}

#[test]
fn resolve_synthesizes_dsc_path_for_source_records() {
    let record = Record::from_fields([
        ("Package", "bar"),
        ("Version", "2.0-1"),
        ("Directory", "pool/main/b/bar"),
    ]);
    assert_eq!(
        raw_archive_path(&record).expect("must synthesize"),
        "pool/main/b/bar/bar_2.0-1.dsc"
    );
    let resolver = PathResolver::new(StripConvention::PoolComponent);
    assert_eq!(
        resolver.resolve(&record).expect("must resolve"),
        "b/bar/bar_2.0-1.dsc"
    );
}

#[test]
fn filename_takes_precedence_over_directory() {
    let mut record = foo_record();
    record.insert("Directory", "pool/main/z/zzz");
    assert_eq!(
        raw_archive_path(&record).expect("must resolve"),
        "pool/main/f/foo/foo_1.0_amd64.deb"
    );
}

#[test]
fn resolve_reports_missing_identity() {
    let resolver = PathResolver::default();
    let record = Record::from_fields([("Package", "foo"), ("Version", "1.0")]);
    let err = resolver.resolve(&record).expect_err("must be skipped");
    assert_eq!(
        err,
        ResolveError::MissingIdentity {
            label: "foo=1.0".to_string()
        }
    );

    let no_version = Record::from_fields([("Package", "foo"), ("Directory", "pool/main/f/foo")]);
    assert!(matches!(
        resolver.resolve(&no_version),
        Err(ResolveError::MissingIdentity { .. })
    ));
}

#[test]
fn resolve_rejects_parent_traversal() {
    let resolver = PathResolver::default();
    for raw in [
        "pool/main/../../etc/passwd",
        "pool/main/f/../../../x.deb",
        "pool/main/./f/x.deb",
    ] {
        let record = Record::from_fields([("Filename", raw)]);
        let err = resolver.resolve(&record).expect_err("must reject traversal");
        assert!(matches!(err, ResolveError::UnsafePath { .. }), "{raw}");
    }
}

#[test]
fn strip_convention_parses_names_and_counts() {
    assert_eq!(
        StripConvention::parse("pool-component").expect("must parse"),
        StripConvention::PoolComponent
    );
    assert_eq!(
        StripConvention::parse("pool-component-prefix").expect("must parse"),
        StripConvention::PoolComponentPrefix
    );
    assert_eq!(
        StripConvention::parse("components:3").expect("must parse"),
        StripConvention::Components(3)
    );
    assert_eq!(
        StripConvention::parse("2").expect("must parse"),
        StripConvention::Components(2)
    );
    let err = StripConvention::parse("two").expect_err("must reject");
    assert!(err.to_string().contains("invalid strip convention"));
}

#[test]
fn strip_convention_display_parses_back() {
    for convention in [
        StripConvention::PoolComponent,
        StripConvention::PoolComponentPrefix,
        StripConvention::Components(4),
    ] {
        assert_eq!(
            StripConvention::parse(&convention.to_string()).expect("must parse"),
            convention
        );
    }
}

#[test]
fn strip_conventions_select_by_family() {
    let conventions = StripConventions {
        binary: StripConvention::PoolComponent,
        source: StripConvention::PoolComponentPrefix,
    };
    assert_eq!(
        conventions.for_family(IndexFamily::Source),
        StripConvention::PoolComponentPrefix
    );
    assert_eq!(
        conventions.for_family(IndexFamily::Binary),
        StripConvention::PoolComponent
    );
}

#[test]
fn index_family_maps_arch_and_file_names() {
    assert_eq!(IndexFamily::from_arch("source"), IndexFamily::Source);
    assert_eq!(IndexFamily::from_arch("binary-amd64"), IndexFamily::Binary);
    assert_eq!(
        IndexFamily::from_index_file_name("Sources.gz"),
        Some(IndexFamily::Source)
    );
    assert_eq!(IndexFamily::from_index_file_name("Release"), None);
    assert_eq!(IndexFamily::Binary.index_file_name(), "Packages.gz");
}

#[test]
fn archive_prefix_handles_lib_names() {
    assert_eq!(archive_prefix("foo"), "f");
    assert_eq!(archive_prefix("libfoo"), "libf");
    assert_eq!(archive_prefix("lib"), "l");
}

#[test]
fn identifier_list_skips_comments_and_reports_malformed_lines() {
    let list = parse_identifier_list("# header\n\nfoo=1.0\n bar = 2.0-1 \nnoversion\n=1\nbaz=\n");
    assert_eq!(
        list.ids,
        vec![PackageId::new("foo", "1.0"), PackageId::new("bar", "2.0-1")]
    );
    assert_eq!(
        list.malformed,
        vec![
            (5, "noversion".to_string()),
            (6, "=1".to_string()),
            (7, "baz=".to_string())
        ]
    );
}

#[test]
fn identifier_splits_on_first_equals() {
    assert_eq!(
        parse_identifier("foo=1:2.0=rc"),
        Some(PackageId::new("foo", "1:2.0=rc"))
    );
}

#[test]
fn record_identity_requires_package_and_version() {
    assert_eq!(foo_record().identity(), Some(PackageId::new("foo", "1.0")));
    let record = Record::from_fields([("Package", "foo")]);
    assert_eq!(record.identity(), None);
    assert_eq!(record.label(), "foo");
    assert_eq!(PackageId::new("foo", "1.0").to_string(), "foo=1.0");
}
