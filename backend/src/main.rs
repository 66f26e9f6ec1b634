//! csvtoprism CLI - Convert plate-reader exports to Prism CSV
//!
//! # Main Commands
//!
//! ```bash
//! csvtoprism convert plate.xlsx            # Write plate_Raw.csv + plate_Adjusted.csv
//! csvtoprism convert plate.csv --sort 3,1,2,...
//! csvtoprism serve                         # Start HTTP server (port 41586)
//! ```
//!
//! # Debug Commands
//!
//! ```bash
//! csvtoprism show plate.xlsx               # Print raw and adjusted tables
//! csvtoprism sheet plate.xlsx --sheet 1    # Flatten one sheet to CSV
//! csvtoprism adjust plate_Raw.csv          # Re-adjust a generated Prism CSV
//! ```

use clap::{Parser, Subcommand};
use csvtoprism::server::ServerConfig;
use csvtoprism::{
    adjust, control_mean, convert_file, csv_from_workbook, experiment_name, parse_sort_order,
    read_experiment_csv, read_experiment_file, write_csv, ConvertOptions, MalformedRowPolicy,
};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "csvtoprism")]
#[command(about = "Convert plate-reader exports to GraphPad Prism CSV", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a plate export into raw and adjusted Prism CSV files
    Convert {
        /// Input file (.xls/.xlsx/.xlsm/.ods workbook or CSV)
        input: PathBuf,

        /// Zero-based workbook sheet
        #[arg(short, long, default_value = "0")]
        sheet: usize,

        /// Comma-separated 1-based sample positions, e.g. 3,1,2,...
        #[arg(long)]
        sort: Option<String>,

        /// Output directory (default: current directory)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Skip malformed rows instead of aborting
        #[arg(long)]
        collect_malformed: bool,
    },

    /// Print the raw and adjusted experiment as tables
    Show {
        /// Input file
        input: PathBuf,

        /// Zero-based workbook sheet
        #[arg(short, long, default_value = "0")]
        sheet: usize,

        /// Comma-separated 1-based sample positions
        #[arg(long)]
        sort: Option<String>,
    },

    /// Flatten one workbook sheet to CSV
    Sheet {
        /// Input workbook
        input: PathBuf,

        /// Zero-based workbook sheet
        #[arg(short, long, default_value = "0")]
        sheet: usize,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Adjust a previously generated Prism CSV by its control
    Adjust {
        /// Prism CSV (4 rows x 32 columns)
        input: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Start HTTP server
    Serve {
        /// Port to listen on (default: CSVTOPRISM_PORT or 41586)
        #[arg(short, long)]
        port: Option<u16>,

        /// Directory for generated files (default: CSVTOPRISM_OUTPUT_DIR or .)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Convert {
            input,
            sheet,
            sort,
            output_dir,
            collect_malformed,
        } => cmd_convert(&input, sheet, sort.as_deref(), output_dir, collect_malformed),

        Commands::Show { input, sheet, sort } => cmd_show(&input, sheet, sort.as_deref()),

        Commands::Sheet {
            input,
            sheet,
            output,
        } => cmd_sheet(&input, sheet, output.as_deref()),

        Commands::Adjust { input, output } => cmd_adjust(&input, output.as_deref()),

        Commands::Serve { port, output_dir } => cmd_serve(port, output_dir).await,
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn sort_order(sort: Option<&str>) -> Result<Option<Vec<usize>>, Box<dyn std::error::Error>> {
    match sort {
        Some(s) => {
            let order = parse_sort_order(s).map_err(|e| format!("invalid sort order '{}': {}", s, e))?;
            Ok(Some(order))
        }
        None => Ok(None),
    }
}

fn cmd_convert(
    input: &Path,
    sheet: usize,
    sort: Option<&str>,
    output_dir: Option<PathBuf>,
    collect_malformed: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Processing: {}", input.display());

    let options = ConvertOptions {
        sheet,
        sort_order: sort_order(sort)?,
        malformed_rows: if collect_malformed {
            MalformedRowPolicy::Collect
        } else {
            MalformedRowPolicy::Abort
        },
        output_dir,
    };

    let result = convert_file(input, &options)?;

    let dir = options.output_dir.as_deref().unwrap_or_else(|| Path::new("."));
    let files = csvtoprism::write_outputs(&result.raw, &result.adjusted, dir)?;

    eprintln!("\n📊 {} samples, control mean {}", result.raw.len(), result.control_mean);
    if !result.report.malformed.is_empty() {
        eprintln!("   ⚠️  {} malformed row(s) skipped", result.report.malformed.len());
    }
    eprintln!("   Raw:      {}", files.raw.display());
    eprintln!("   Adjusted: {}", files.adjusted.display());
    eprintln!("\n✨ Done!");
    Ok(())
}

fn cmd_show(input: &Path, sheet: usize, sort: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let options = ConvertOptions {
        sheet,
        sort_order: sort_order(sort)?,
        ..Default::default()
    };

    let (raw, _) = read_experiment_file(input, &options)?;

    println!("{} (raw)", raw.name());
    println!("{}", raw);

    match adjust(&raw) {
        Ok(adjusted) => {
            println!("{} (adjusted)", adjusted.name());
            println!("{}", adjusted);
        }
        Err(e) => eprintln!("⚠️  Not adjusted: {}", e),
    }

    Ok(())
}

fn cmd_sheet(input: &Path, sheet: usize, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📗 Flattening sheet {} of {}", sheet, input.display());

    match output {
        Some(p) => {
            csv_from_workbook(input, sheet, BufWriter::new(File::create(p)?))?;
            eprintln!("💾 Output written to: {}", p.display());
        }
        None => {
            csv_from_workbook(input, sheet, io::stdout().lock())?;
        }
    }
    Ok(())
}

fn cmd_adjust(input: &Path, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("⚖️  Adjusting: {}", input.display());

    let raw = read_experiment_csv(experiment_name(input), File::open(input)?)?;
    let control = raw.control()?;
    eprintln!("   Control \"{}\" mean: {}", control.name, control_mean(control));

    let adjusted = adjust(&raw)?;

    match output {
        Some(p) => {
            write_csv(&adjusted, BufWriter::new(File::create(p)?))?;
            eprintln!("💾 Output written to: {}", p.display());
        }
        None => {
            let mut stdout = io::stdout().lock();
            write_csv(&adjusted, &mut stdout)?;
            stdout.flush()?;
        }
    }
    Ok(())
}

async fn cmd_serve(port: Option<u16>, output_dir: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = ServerConfig::from_env();
    if let Some(port) = port {
        config = config.with_port(port);
    }
    if let Some(dir) = output_dir {
        config = config.with_output_dir(dir);
    }

    csvtoprism::server::start_server(config).await
}
