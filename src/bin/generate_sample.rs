use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use elech_tools::data::samples::{write_sample, SampleShape};
use elech_tools::{write_parquet, Analyser, Dispatcher, LoaderConfig, Mode, TimeUnit, Vendor};

/// Usage: `generate_sample [OUT_DIR] [CONFIG_JSON]`
fn main() -> Result<()> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let out_dir = PathBuf::from(args.next().unwrap_or_else(|| "sample_data".to_string()));
    let config = match args.next() {
        Some(path) => LoaderConfig::from_json_file(Path::new(&path))?,
        None => LoaderConfig::default(),
    };

    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;

    let dispatcher = Dispatcher::new(config);
    let shape = SampleShape::default();

    for vendor in [Vendor::Sd8, Vendor::Biologic, Vendor::Hz7000] {
        let path = write_sample(vendor, &out_dir, &shape)?;
        let (detected, table) = dispatcher
            .detect(&path)
            .with_context(|| format!("Failed to load {}", path.display()))?;

        let head = table.select_rows(&(0..table.len().min(8)).collect::<Vec<_>>())?;
        println!("{} → detected as {detected}, {} rows", path.display(), table.len());
        println!("{head}");

        let analyser = Analyser::new(table);
        if let Ok(curve) = analyser.charge_discharge_curve(1, Mode::Discharge) {
            println!("  {}: {} points", curve.name, curve.len());
        }
        let trace = analyser.potential_by_time(None, None, TimeUnit::Minutes);
        if let Some([t, v]) = trace.points.last() {
            println!("  last sample at {t:.1} min, {v:.3} V");
        }

        let parquet_path = path.with_extension("parquet");
        write_parquet(analyser.table(), &parquet_path)?;
        println!("  wrote {}", parquet_path.display());
    }

    Ok(())
}
