//! paclean CLI - clean protected-area datasets for area statistics

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use paclean_algorithms::dissolve::{dissolve, dissolve_by, DissolveOutput};
use paclean_algorithms::normalize::fields;
use paclean_algorithms::overlap::Precedence;
use paclean_algorithms::pipeline::{prepare, CleanParams};
use paclean_core::io::{read_features, write_audit, write_geometry, write_records};
use paclean_core::{AuditLog, FeatureCollection, CRS};
use paclean_parallel::{clean_parallel, set_num_threads, PartitionScheme, ProcessingMode};

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "paclean")]
#[command(author, version, about = "Clean protected-area datasets for area statistics", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show record counts of a GeoJSON file
    Info {
        /// Input GeoJSON file
        input: PathBuf,
    },
    /// Run the full cleaning pipeline
    Clean {
        /// Input GeoJSON file
        input: PathBuf,
        /// Output GeoJSON file
        output: PathBuf,
        /// Emit overlapping records as-is instead of erasing overlaps
        #[arg(long)]
        keep_overlaps: bool,
        /// Overlap precedence: input-order, id, established-year, management-category
        #[arg(long)]
        precedence: Option<Precedence>,
        /// Partitioning of overlap resolution: overlap-groups, realm, realm-and-region
        #[arg(long, default_value = "overlap-groups")]
        partition: PartitionScheme,
        #[command(flatten)]
        pipeline: PipelineArgs,
    },
    /// Normalize, expand and repair, then dissolve into one footprint
    Dissolve {
        /// Input GeoJSON file
        input: PathBuf,
        /// Output GeoJSON file
        output: PathBuf,
        /// One output file per realm, named `<output>_<realm>.geojson`
        #[arg(long)]
        by_realm: bool,
        #[command(flatten)]
        pipeline: PipelineArgs,
    },
}

/// Options shared by every processing subcommand
#[derive(Args)]
struct PipelineArgs {
    /// EPSG code of the input CRS (default: 4326)
    #[arg(long, conflicts_with = "proj")]
    epsg: Option<u32>,
    /// PROJ string of the input CRS
    #[arg(long)]
    proj: Option<String>,
    /// Precision grid cells per working unit
    #[arg(short, long)]
    precision: Option<f64>,
    /// Segments per expanded point circle
    #[arg(long)]
    segments: Option<usize>,
    /// Worker threads (default: all cores)
    #[arg(short = 'j', long)]
    threads: Option<usize>,
    /// Write the audit log as JSON
    #[arg(long)]
    audit: Option<PathBuf>,
    /// JSON parameter file; flags override its values
    #[arg(long)]
    config: Option<PathBuf>,
}

impl PipelineArgs {
    fn params(&self) -> Result<CleanParams> {
        let mut params = match &self.config {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config {}", path.display()))?;
                serde_json::from_str(&text).with_context(|| format!("Invalid config {}", path.display()))?
            }
            None => CleanParams::default(),
        };

        if let Some(code) = self.epsg {
            params.crs = CRS::from_epsg(code);
        }
        if let Some(proj) = &self.proj {
            params.crs = CRS::from_proj(proj.clone());
        }
        if let Some(precision) = self.precision {
            params.geometry_precision = Some(precision);
        }
        if let Some(segments) = self.segments {
            params.segments = segments;
        }
        params.validate().context("Invalid parameters")?;
        Ok(params)
    }

    /// Size the global thread pool from `--threads`
    fn configure_threads(&self) {
        if let Some(threads) = self.threads.filter(|&n| n > 0) {
            set_num_threads(threads);
        }
    }

    fn mode(&self) -> ProcessingMode {
        self.configure_threads();
        ProcessingMode::from_threads(self.threads)
    }
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("setting default subscriber failed")
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn read_input(path: &Path) -> Result<FeatureCollection> {
    let pb = spinner("Reading features...");
    let features = read_features(path).with_context(|| format!("Failed to read {}", path.display()))?;
    pb.finish_and_clear();
    info!("{} features read from {}", features.len(), path.display());
    Ok(features)
}

fn report_audit(audit: &AuditLog, path: Option<&PathBuf>) -> Result<()> {
    print!("{}", audit.summary());
    if let Some(path) = path {
        write_audit(audit, path).with_context(|| format!("Failed to write audit log {}", path.display()))?;
        println!("Audit log saved to: {}", path.display());
    }
    Ok(())
}

fn done(name: &str, path: &Path, elapsed: std::time::Duration) {
    println!("{} saved to: {}", name, path.display());
    println!("  Processing time: {:.2?}", elapsed);
}

fn realm_path(output: &Path, realm: &str) -> PathBuf {
    let stem = output.file_stem().and_then(|s| s.to_str()).unwrap_or("dissolved");
    output.with_file_name(format!("{stem}_{}.geojson", realm.to_ascii_lowercase()))
}

fn geometry_kind(geometry: Option<&geo_types::Geometry<f64>>) -> &'static str {
    use geo_types::Geometry;
    match geometry {
        None => "None",
        Some(Geometry::Point(_)) => "Point",
        Some(Geometry::MultiPoint(_)) => "MultiPoint",
        Some(Geometry::Polygon(_)) => "Polygon",
        Some(Geometry::MultiPolygon(_)) => "MultiPolygon",
        Some(Geometry::LineString(_)) | Some(Geometry::Line(_)) => "LineString",
        Some(Geometry::MultiLineString(_)) => "MultiLineString",
        Some(Geometry::GeometryCollection(_)) => "GeometryCollection",
        Some(Geometry::Rect(_)) | Some(Geometry::Triangle(_)) => "Polygon",
    }
}

fn print_counts(title: &str, counts: &BTreeMap<String, usize>) {
    println!("\n{title}:");
    for (key, n) in counts {
        println!("  {:<28} {}", key, n);
    }
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        Commands::Info { input } => {
            let features = read_input(&input)?;

            let mut status = BTreeMap::new();
            let mut realm = BTreeMap::new();
            let mut kinds = BTreeMap::new();
            for feature in features.iter() {
                let text = |key: &str| {
                    feature
                        .get_property(key)
                        .and_then(|v| v.as_text())
                        .unwrap_or_else(|| "(missing)".to_string())
                };
                *status.entry(text(fields::STATUS)).or_insert(0) += 1;
                *realm.entry(text(fields::REALM)).or_insert(0) += 1;
                *kinds
                    .entry(geometry_kind(feature.geometry.as_ref()).to_string())
                    .or_insert(0) += 1;
            }

            println!("File: {}", input.display());
            println!("Features: {}", features.len());
            print_counts("Status", &status);
            print_counts("Realm", &realm);
            print_counts("Geometry", &kinds);
        }

        Commands::Clean {
            input,
            output,
            keep_overlaps,
            precedence,
            partition,
            pipeline,
        } => {
            let mut params = pipeline.params()?;
            if keep_overlaps {
                params.erase_overlaps = false;
            }
            if let Some(precedence) = precedence {
                params.precedence = precedence;
            }
            let mode = pipeline.mode();
            let features = read_input(&input)?;

            let start = Instant::now();
            let pb = spinner("Cleaning records...");
            let out = clean_parallel(features, &params, partition, mode).context("Failed to clean records")?;
            pb.finish_and_clear();
            let elapsed = start.elapsed();

            let total: f64 = out.records.iter().filter_map(|r| r.computed_area_km2).sum();
            let pb = spinner("Writing output...");
            write_records(&out.records, &output).context("Failed to write output")?;
            pb.finish_and_clear();

            println!("{} records, {:.3} km² total", out.records.len(), total);
            report_audit(&out.audit, pipeline.audit.as_ref())?;
            done("Cleaned records", &output, elapsed);
        }

        Commands::Dissolve {
            input,
            output,
            by_realm,
            pipeline,
        } => {
            let params = pipeline.params()?;
            pipeline.configure_threads();
            let features = read_input(&input)?;

            let start = Instant::now();
            let pb = spinner("Dissolving records...");
            let mut staged = prepare(features, &params).context("Failed to prepare records")?;
            let layers: Vec<(Option<String>, DissolveOutput)> = if by_realm {
                dissolve_by(&staged.records, |r| r.realm(), &params.dissolve_params())
                    .into_iter()
                    .map(|(realm, layer)| (Some(realm.as_str().to_string()), layer))
                    .collect()
            } else {
                vec![(None, dissolve(&staged.records, &params.dissolve_params()))]
            };
            pb.finish_and_clear();
            let elapsed = start.elapsed();

            if layers.is_empty() {
                bail!("No records left to dissolve");
            }
            for (realm, layer) in layers {
                let path = match &realm {
                    Some(realm) => realm_path(&output, realm),
                    None => output.clone(),
                };
                write_geometry(&layer.geometry, layer.area_km2, &path)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                println!(
                    "{}: {:.3} km² in {} polygons -> {}",
                    realm.as_deref().unwrap_or("all realms"),
                    layer.area_km2,
                    layer.geometry.0.len(),
                    path.display()
                );
                staged.audit.merge(layer.audit);
            }
            report_audit(&staged.audit, pipeline.audit.as_ref())?;
            done("Dissolved footprint", &output, elapsed);
        }
    }

    Ok(())
}
