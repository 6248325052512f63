use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context};
use clap::{Args as ClapArgs, Parser, Subcommand};
use reqwest::blocking::Client;
use tracing::{info, warn};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use pangkalan_core::{
    default_runner, generate_sample, load_document, nearest, rank_by_distance, sanitize,
    set_feature_count_warning_threshold, set_region_bounds, unique_categories, validate_text,
    LocationFilter, NoticeSeverity,
};
use pangkalan_model::{Category, LatLng, LocationDocument, TimeOfDay};
use pangkalan_report::{
    write_html_report, HtmlReportContext, ReportSummary, ReportSummaryContext, ValidationReport,
};

#[derive(Debug, Parser)]
#[command(name = "pangkalan")]
#[command(about = "Validator and toolbox for pangkalan ojek GeoJSON files")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Validate a file and write report.json (and optionally report.html)
    Validate(ValidateArgs),
    /// Validate, then write the sanitized document
    Sanitize(SanitizeArgs),
    /// Write the sample document
    Sample(SampleArgs),
    /// Filter locations by text, category, density or busy time
    Search(SearchArgs),
    /// Rank locations by distance from a point
    Nearest(NearestArgs),
    /// List allowed categories, or those present in a file
    Categories(CategoriesArgs),
}

#[derive(Debug, ClapArgs)]
struct InputArgs {
    #[arg(short = 'i', long = "input")]
    input: Option<PathBuf>,

    #[arg(short = 'u', long = "url")]
    url: Option<String>,

    /// Accept coordinates outside Indonesia
    #[arg(long = "no-region-check", alias = "no_region_check")]
    no_region_check: bool,

    /// Warn when a file has more locations than this
    #[arg(long = "max-features", alias = "max_features")]
    max_features: Option<usize>,
}

#[derive(Debug, ClapArgs)]
struct ValidateArgs {
    #[command(flatten)]
    input: InputArgs,

    #[arg(short = 'o', long = "output_base", alias = "output", default_value = ".")]
    output: PathBuf,

    #[arg(short = 'p', long = "pretty")]
    pretty: bool,

    /// Also write report.html
    #[arg(long = "html")]
    html: bool,
}

#[derive(Debug, ClapArgs)]
struct SanitizeArgs {
    #[command(flatten)]
    input: InputArgs,

    #[arg(short = 'o', long = "output")]
    output: PathBuf,
}

#[derive(Debug, ClapArgs)]
struct SampleArgs {
    /// Defaults to stdout
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,
}

#[derive(Debug, ClapArgs)]
struct SearchArgs {
    #[command(flatten)]
    input: InputArgs,

    #[arg(short = 'q', long = "query")]
    query: Option<String>,

    #[arg(short = 'c', long = "category", value_parser = parse_category)]
    categories: Vec<Category>,

    #[arg(long = "min-density", value_parser = clap::value_parser!(u8).range(1..=5))]
    min_density: Option<u8>,

    #[arg(long = "max-density", value_parser = clap::value_parser!(u8).range(1..=5))]
    max_density: Option<u8>,

    #[arg(long = "busy-at", value_parser = parse_time)]
    busy_at: Option<TimeOfDay>,
}

#[derive(Debug, ClapArgs)]
struct NearestArgs {
    #[command(flatten)]
    input: InputArgs,

    #[arg(long = "lat", allow_negative_numbers = true, value_parser = parse_latitude)]
    lat: f64,

    #[arg(long = "lng", allow_negative_numbers = true, value_parser = parse_longitude)]
    lng: f64,

    #[arg(
        short = 'n',
        long = "limit",
        default_value_t = 1,
        value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..)
    )]
    limit: usize,
}

#[derive(Debug, ClapArgs)]
struct CategoriesArgs {
    #[arg(short = 'i', long = "input")]
    input: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_target(false).init();
    let cli = Cli::parse();

    match cli.command {
        Command::Validate(args) => run_validate(args),
        Command::Sanitize(args) => run_sanitize(args),
        Command::Sample(args) => run_sample(args),
        Command::Search(args) => run_search(args),
        Command::Nearest(args) => run_nearest(args),
        Command::Categories(args) => run_categories(args),
    }
}

fn run_validate(args: ValidateArgs) -> anyhow::Result<()> {
    let resolved = resolve_input(&args.input)?;
    info!("validating {}", resolved.source_label);
    let _guards = ContextGuards::apply(&args.input);

    let runner = default_runner();
    let started_at = Instant::now();
    let outcome = validate_text(&resolved.text, &runner);
    let elapsed = started_at.elapsed();

    // Accepted documents also get their categories listed in the summary.
    let accepted = match outcome.document.as_ref() {
        Some(document) if outcome.is_valid() => {
            LocationDocument::try_from(&sanitize(document)).ok()
        }
        _ => None,
    };
    let location_count = outcome.document.as_ref().map_or(0, |document| document.len());
    let notices = outcome.notices;

    std::fs::create_dir_all(&args.output)
        .with_context(|| format!("create output dir {}", args.output.display()))?;

    let summary = ReportSummary::from_context(ReportSummaryContext {
        source: Some(resolved.source_label.clone()),
        validator_version: Some(env!("CARGO_PKG_VERSION").to_string()),
        validation_time_seconds: Some(elapsed.as_secs_f64()),
        notices: &notices,
        location_count,
        document: accepted.as_ref(),
    });

    if args.html {
        let html_context = HtmlReportContext::from_summary(&summary, &resolved.source_label);
        let html_path = args.output.join("report.html");
        write_html_report(&html_path, &notices, &summary, html_context)?;
        info!("html report written to {}", html_path.display());
    }
    let report = ValidationReport::from_container_with_summary(&notices, summary);
    let report_path = args.output.join("report.json");
    report.write_json_with_format(&report_path, args.pretty)?;
    info!("report written to {}", report_path.display());

    for message in notices.messages(NoticeSeverity::Warning) {
        warn!("{}", message);
    }
    let errors = notices.messages(NoticeSeverity::Error);
    if !errors.is_empty() {
        for message in &errors {
            eprintln!("error: {}", message);
        }
        bail!("validation failed with {} error(s)", errors.len());
    }
    println!("{} is valid ({} locations)", resolved.source_label, location_count);
    Ok(())
}

fn run_sanitize(args: SanitizeArgs) -> anyhow::Result<()> {
    let resolved = resolve_input(&args.input)?;
    let _guards = ContextGuards::apply(&args.input);

    let outcome = validate_text(&resolved.text, &default_runner());
    let errors = outcome.notices.messages(NoticeSeverity::Error);
    let document = match outcome.document {
        Some(document) if errors.is_empty() => document,
        _ => {
            for message in &errors {
                eprintln!("error: {}", message);
            }
            bail!("{} is not valid, nothing written", resolved.source_label);
        }
    };

    let sanitized = sanitize(&document).to_value();
    let json = serde_json::to_string_pretty(&sanitized).context("serialize sanitized document")?;
    std::fs::write(&args.output, json)
        .with_context(|| format!("write {}", args.output.display()))?;
    info!(
        "sanitized {} locations into {}",
        document.len(),
        args.output.display()
    );
    Ok(())
}

fn run_sample(args: SampleArgs) -> anyhow::Result<()> {
    let sample = generate_sample();
    match args.output {
        Some(path) => {
            std::fs::write(&path, sample).with_context(|| format!("write {}", path.display()))?;
            info!("sample written to {}", path.display());
        }
        None => println!("{}", sample),
    }
    Ok(())
}

fn run_search(args: SearchArgs) -> anyhow::Result<()> {
    let document = load_accepted(&args.input)?;
    let filter = LocationFilter {
        search: args.query,
        categories: args.categories,
        min_density: args.min_density,
        max_density: args.max_density,
        busy_at: args.busy_at,
    };
    let matches = filter.apply(&document);
    info!("{} of {} locations match", matches.len(), document.len());
    print_json(&matches)
}

fn run_nearest(args: NearestArgs) -> anyhow::Result<()> {
    let document = load_accepted(&args.input)?;
    let origin = LatLng::checked(args.lat, args.lng)?;
    if args.limit == 1 {
        return match nearest(&document, origin) {
            Some(location) => print_json(&location),
            None => bail!("document has no locations"),
        };
    }
    let ranked: Vec<_> = rank_by_distance(&document, origin)
        .into_iter()
        .take(args.limit)
        .collect();
    print_json(&ranked)
}

fn run_categories(args: CategoriesArgs) -> anyhow::Result<()> {
    let categories = match args.input {
        Some(path) => {
            let input = InputArgs {
                input: Some(path),
                url: None,
                no_region_check: false,
                max_features: None,
            };
            unique_categories(&load_accepted(&input)?)
        }
        None => Category::ALL.to_vec(),
    };
    for category in categories {
        println!("{}", category);
    }
    Ok(())
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value).context("serialize output")?;
    println!("{}", json);
    Ok(())
}

/// Loads a document through the full pipeline, failing on any error.
fn load_accepted(args: &InputArgs) -> anyhow::Result<LocationDocument> {
    let resolved = resolve_input(args)?;
    let _guards = ContextGuards::apply(args);
    match load_document(&resolved.text) {
        Ok(loaded) => Ok(loaded.document),
        Err(err) => {
            for message in err.messages() {
                eprintln!("error: {}", message);
            }
            Err(err).with_context(|| format!("load {}", resolved.source_label))
        }
    }
}

struct ContextGuards {
    _region: Option<pangkalan_core::RegionBoundsGuard>,
    _threshold: Option<pangkalan_core::FeatureCountThresholdGuard>,
}

impl ContextGuards {
    fn apply(args: &InputArgs) -> Self {
        Self {
            _region: args.no_region_check.then(|| set_region_bounds(None)),
            _threshold: args.max_features.map(set_feature_count_warning_threshold),
        }
    }
}

struct ResolvedInput {
    text: String,
    source_label: String,
}

fn resolve_input(args: &InputArgs) -> anyhow::Result<ResolvedInput> {
    match (&args.input, &args.url) {
        (Some(_), Some(_)) => {
            bail!("--input and --url cannot be provided at the same time");
        }
        (None, None) => {
            bail!("one of --input or --url must be provided");
        }
        (Some(path), None) => {
            let text = read_input_file(path)?;
            Ok(ResolvedInput {
                text,
                source_label: path.display().to_string(),
            })
        }
        (None, Some(url)) => {
            if url.trim().is_empty() {
                bail!("--url must not be empty");
            }
            let text = download_url(url)?;
            Ok(ResolvedInput {
                text,
                source_label: url.clone(),
            })
        }
    }
}

fn read_input_file(path: &Path) -> anyhow::Result<String> {
    if !is_geojson_file_name(&path.to_string_lossy()) {
        warn!(
            "{} does not end in .geojson or .json; reading it anyway",
            path.display()
        );
    }
    std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))
}

fn is_geojson_file_name(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.ends_with(".geojson") || lower.ends_with(".json")
}

fn download_url(url: &str) -> anyhow::Result<String> {
    let client = Client::builder()
        .user_agent(format!("pangkalan-validator/{}", env!("CARGO_PKG_VERSION")))
        .build()
        .context("build http client")?;
    let bytes = client
        .get(url)
        .send()
        .with_context(|| format!("download geojson from {}", url))?
        .error_for_status()
        .with_context(|| format!("download geojson from {}", url))?
        .bytes()
        .with_context(|| format!("read response body from {}", url))?;
    decode_utf8(bytes.to_vec()).with_context(|| format!("decode response body from {}", url))
}

fn decode_utf8(bytes: Vec<u8>) -> anyhow::Result<String> {
    String::from_utf8(bytes).context("body is not valid UTF-8")
}

fn parse_category(value: &str) -> Result<Category, String> {
    value.parse::<Category>().map_err(|_| {
        format!(
            "unknown category '{}'. Allowed categories: {}",
            value,
            Category::allowed_list()
        )
    })
}

fn parse_time(value: &str) -> Result<TimeOfDay, String> {
    TimeOfDay::parse(value).map_err(|err| err.to_string())
}

fn parse_latitude(value: &str) -> Result<f64, String> {
    let lat = value.parse::<f64>().map_err(|err| err.to_string())?;
    LatLng::checked(lat, 0.0)
        .map(|_| lat)
        .map_err(|err| err.to_string())
}

fn parse_longitude(value: &str) -> Result<f64, String> {
    let lng = value.parse::<f64>().map_err(|err| err.to_string())?;
    LatLng::checked(0.0, lng)
        .map(|_| lng)
        .map_err(|err| err.to_string())
}
