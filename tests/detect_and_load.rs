use std::path::Path;

use elech_tools::data::samples::{write_sample, SampleShape};
use elech_tools::data::vendors::{Biologic, Hz7000, Sd8};
use elech_tools::{
    detect_and_load, load_file, write_parquet, Analyser, Dispatcher, LoaderConfig, Mode,
    StepKey, Vendor, VendorParser,
};

fn direct(vendor: Vendor, path: &Path) -> elech_tools::CyclingTable {
    let config = LoaderConfig::default();
    match vendor {
        Vendor::Sd8 => Sd8.load(path, &config),
        Vendor::Biologic => Biologic.load(path, &config),
        Vendor::Hz7000 => Hz7000.load(path, &config),
    }
    .unwrap()
}

#[test]
fn dispatcher_matches_direct_parser_output() {
    let dir = tempfile::tempdir().unwrap();
    let shape = SampleShape::default();

    for vendor in [Vendor::Sd8, Vendor::Biologic, Vendor::Hz7000] {
        let path = write_sample(vendor, dir.path(), &shape).unwrap();

        let (detected, table) = Dispatcher::default().detect(&path).unwrap();
        assert_eq!(detected, vendor);
        assert_eq!(table, direct(vendor, &path));
        assert_eq!(detect_and_load(&path).unwrap(), table);
    }
}

#[test]
fn only_the_matching_parser_accepts_each_sample() {
    let dir = tempfile::tempdir().unwrap();
    let shape = SampleShape::default();
    let config = LoaderConfig::default();
    let parsers: [&dyn VendorParser; 3] = [&Sd8, &Biologic, &Hz7000];

    for vendor in [Vendor::Sd8, Vendor::Biologic, Vendor::Hz7000] {
        let path = write_sample(vendor, dir.path(), &shape).unwrap();
        for parser in parsers {
            let result = parser.load(&path, &config);
            if parser.vendor() == vendor {
                assert!(result.is_ok(), "{vendor}: {:?}", result.err());
            } else {
                let err = result.unwrap_err();
                assert!(err.is_format_mismatch(), "{} on {vendor}: {err}", parser.vendor());
            }
        }
    }
}

#[test]
fn unrecognised_file_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.txt");
    std::fs::write(&path, "just some notes\nnothing tabular here\n").unwrap();

    let err = detect_and_load(&path).unwrap_err();
    assert!(err.is_format_mismatch());
    assert!(err.to_string().contains("None of the parsers"), "{err}");
}

#[test]
fn parquet_copy_loads_identically() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_sample(Vendor::Sd8, dir.path(), &SampleShape::default()).unwrap();
    let table = load_file(&path).unwrap();

    let parquet_path = dir.path().join("sd8.parquet");
    write_parquet(&table, &parquet_path).unwrap();
    let restored = load_file(&parquet_path).unwrap();
    assert_eq!(
        restored.records().collect::<Vec<_>>(),
        table.records().collect::<Vec<_>>()
    );
}

#[test]
fn loaded_sample_supports_step_queries() {
    let dir = tempfile::tempdir().unwrap();
    let shape = SampleShape::default();
    let path = write_sample(Vendor::Biologic, dir.path(), &shape).unwrap();
    let analyser = Analyser::new(detect_and_load(&path).unwrap());

    assert_eq!(analyser.lookup(2, Mode::Charge).unwrap(), StepKey::new(2, 1));
    assert_eq!(analyser.lookup(3, Mode::Discharge).unwrap(), StepKey::new(3, 3));
    let rows = analyser.rows_for(3, Mode::Discharge).unwrap();
    assert_eq!(rows.len(), shape.points_per_step);

    // Nearest row to 95 s: samples are 10 s apart, ties go to the later row.
    let search = analyser.table().time_search();
    assert_eq!(search.nearest_index(95.0).unwrap(), 10);
}
