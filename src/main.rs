//! tamefile - find what is filling your disk, without touching it.
//!
//! Usage:
//!   tame largest [PATH] -n 10          Largest files
//!   tame free [PATH] --target 5GB      Files to delete to free a target
//!   tame duplicates [PATH] -m content  Duplicate files (name, size, content)
//!   tame tree [PATH]                   Directory tree with sizes
//!   tame export [PATH]                 Export the scanned inventory to JSON
//!
//! Nothing is ever deleted or moved.

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{Context, Result, bail, eyre};

use tamefile_analyze::{
    DirectoryTree, DuplicateConfig, DuplicateFinder, DuplicateMethod, TreeFormat,
    directory_entries, format_size, format_tree, largest, plan_free_space_in,
};
use tamefile_scan::{Inventory, JwalkScanner, ScanConfig};

#[derive(Parser)]
#[command(
    name = "tamefile",
    version,
    about = "Non-destructive disk usage analyzer",
    long_about = "tamefile helps you understand where your disk space goes.\n\n\
                  It reports the largest files, suggests which files to remove \
                  to free a given amount of space, and finds duplicates. It \
                  never deletes anything."
)]
struct Cli {
    #[command(flatten)]
    scan: ScanOptions,

    #[command(subcommand)]
    command: Command,
}

/// Options shared by every command that scans.
#[derive(Args)]
struct ScanOptions {
    /// TOML file with scan settings (the PATH argument always wins for the root)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Skip hidden files and directories
    #[arg(long, global = true)]
    no_hidden: bool,

    /// Follow symbolic links
    #[arg(long, global = true)]
    follow_symlinks: bool,

    /// Glob pattern of entry names to skip (repeatable)
    #[arg(long = "ignore", global = true)]
    ignore: Vec<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Show the largest files
    Largest {
        /// Path to scan
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Number of files to show
        #[arg(short = 'n', long, default_value = "10")]
        top: usize,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Suggest files whose removal would free at least TARGET bytes
    Free {
        /// Path to scan
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Space to free (e.g., "500MB", "1.5G", "4096")
        #[arg(short, long, allow_hyphen_values = true)]
        target: String,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Find duplicate files
    Duplicates {
        /// Path to scan
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Comparison: name, size, or content
        #[arg(short, long, default_value = "content")]
        method: DuplicateMethod,

        /// Minimum file size to consider (e.g., "1KB", "1MB")
        #[arg(long, default_value = "0")]
        min_size: String,

        /// Maximum number of duplicate groups to show
        #[arg(short = 'n', long, default_value = "20")]
        top: usize,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Show the directory tree with sizes
    Tree {
        /// Path to scan
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Maximum depth to display
        #[arg(short, long, default_value = "3")]
        depth: u32,

        /// Show all entries (no depth limit on display)
        #[arg(short, long)]
        all: bool,

        /// Number of top entries to show per directory
        #[arg(short = 'n', long, default_value = "10")]
        top: usize,

        /// Output format (json emits a flat id/parent/value node table)
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Export the scanned inventory to JSON
    Export {
        /// Path to scan
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    match cli.command {
        Command::Largest { path, top, format } => {
            run_largest(&cli.scan, &path, top, format)?;
        }
        Command::Free {
            path,
            target,
            format,
        } => {
            run_free(&cli.scan, &path, &target, format)?;
        }
        Command::Duplicates {
            path,
            method,
            min_size,
            top,
            format,
        } => {
            run_duplicates(&cli.scan, &path, method, &min_size, top, format)?;
        }
        Command::Tree {
            path,
            depth,
            all,
            top,
            format,
        } => {
            run_tree(&cli.scan, &path, if all { None } else { Some(depth) }, top, format)?;
        }
        Command::Export { path, output } => {
            run_export(&cli.scan, &path, output)?;
        }
    }

    Ok(())
}

/// Build the scan configuration from the optional TOML file and CLI flags.
fn scan_config(options: &ScanOptions, path: &Path) -> Result<ScanConfig> {
    let mut config = match &options.config {
        Some(file) => {
            let text = std::fs::read_to_string(file)
                .with_context(|| format!("Cannot read config {}", file.display()))?;
            toml::from_str::<ScanConfig>(&text)
                .with_context(|| format!("Invalid config {}", file.display()))?
        }
        None => ScanConfig::default(),
    };

    config.root = path.to_path_buf();
    if options.no_hidden {
        config.include_hidden = false;
    }
    if options.follow_symlinks {
        config.follow_symlinks = true;
    }
    config.ignore_patterns.extend(options.ignore.iter().cloned());

    Ok(config)
}

/// Scan a path, reporting progress on stderr.
fn scan(options: &ScanOptions, path: &Path) -> Result<Inventory> {
    let config = scan_config(options, path)?;

    eprintln!("Scanning {}...", path.display());

    let inventory = JwalkScanner::new().scan(&config).context("Scan failed")?;
    if inventory.has_warnings() {
        eprintln!("{} warning(s) during scan", inventory.warnings.len());
    }
    Ok(inventory)
}

/// Show the largest files.
fn run_largest(options: &ScanOptions, path: &Path, top: usize, format: OutputFormat) -> Result<()> {
    let inventory = scan(options, path)?;
    let files = largest(&inventory.files, top);

    match format {
        OutputFormat::Text => {
            println!();
            println!("{}", "─".repeat(70));
            println!(
                " {} largest of {} files ({} total)",
                files.len(),
                inventory.total_files(),
                format_size(inventory.total_size())
            );
            println!("{}", "─".repeat(70));
            for file in &files {
                println!(" {:>12}  {}", format_size(file.size_bytes()), file.path().display());
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&files)?);
        }
    }

    Ok(())
}

/// Suggest files to free a target amount of space.
fn run_free(options: &ScanOptions, path: &Path, target: &str, format: OutputFormat) -> Result<()> {
    let target_bytes = parse_size(target)?;
    let inventory = scan(options, path)?;
    let plan = plan_free_space_in(&inventory, target_bytes);

    match format {
        OutputFormat::Text => {
            println!();
            println!("{}", "─".repeat(70));
            println!(" Free Space Plan (nothing is deleted)");
            println!("{}", "─".repeat(70));
            println!();

            if target_bytes <= 0 {
                println!(" Target is {target_bytes} bytes: nothing needs to be freed.");
                return Ok(());
            }

            println!(
                " Target: {}  Selected: {} file(s), {}",
                format_size(target_bytes.unsigned_abs()),
                plan.file_count(),
                format_size(plan.total_bytes)
            );
            if !plan.reached {
                println!(
                    " Target cannot be reached: all files together are {} short.",
                    format_size(plan.shortfall)
                );
            }
            println!();
            for file in &plan.files {
                println!(" {:>12}  {}", format_size(file.size_bytes()), file.path().display());
            }
            if !plan.is_reliable() {
                println!();
                println!(" Hardlinked files: their space is only freed once every link is removed.");
                for shared in &plan.shared {
                    println!("   {}", shared.path.display());
                    for link in &shared.other_links {
                        println!("     also linked at {}", link.display());
                    }
                    if shared.links_outside > 0 {
                        println!("     plus {} link(s) outside the scanned tree", shared.links_outside);
                    }
                }
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&plan)?);
        }
    }

    Ok(())
}

/// Run duplicate detection.
fn run_duplicates(
    options: &ScanOptions,
    path: &Path,
    method: DuplicateMethod,
    min_size: &str,
    top: usize,
    format: OutputFormat,
) -> Result<()> {
    let min_bytes = u64::try_from(parse_size(min_size)?)
        .map_err(|_| eyre!("Minimum size cannot be negative: {min_size}"))?;
    let inventory = scan(options, path)?;

    eprintln!("Finding duplicates by {method}...");

    let dup_config = DuplicateConfig::builder()
        .min_size(min_bytes)
        .max_groups(top)
        .build()
        .map_err(|e| eyre!("Invalid duplicate settings: {e}"))?;

    let report = DuplicateFinder::with_config(dup_config).find_duplicates(&inventory, method);

    match format {
        OutputFormat::Text => {
            println!();
            println!("{}", "─".repeat(70));
            println!(" Duplicate File Report (by {method})");
            println!("{}", "─".repeat(70));
            println!();

            if report.groups.is_empty() {
                println!(" No duplicate files found.");
            } else {
                println!(
                    " Found {} duplicate groups ({} files)",
                    report.group_count, report.files_with_duplicates
                );
                println!(
                    " Reclaimable space: {}",
                    format_size(report.total_wasted_space)
                );
                println!();

                for (i, group) in report.groups.iter().enumerate() {
                    println!(
                        " Group {} [{}] ({} files, {} reclaimable)",
                        i + 1,
                        group.key,
                        group.count(),
                        format_size(group.wasted_bytes)
                    );
                    for file in &group.files {
                        println!(
                            "   {:>10}  {}",
                            format_size(file.size_bytes()),
                            file.path().display()
                        );
                    }
                    println!();
                }
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}

/// Show the directory tree.
fn run_tree(
    options: &ScanOptions,
    path: &Path,
    max_depth: Option<u32>,
    top: usize,
    format: OutputFormat,
) -> Result<()> {
    let inventory = scan(options, path)?;

    match format {
        OutputFormat::Text => {
            let tree = DirectoryTree::build(&inventory);
            let tree_format = TreeFormat::builder()
                .max_depth(max_depth)
                .top(Some(top))
                .build()
                .map_err(|e| eyre!("Invalid tree settings: {e}"))?;

            println!();
            println!("{}", "─".repeat(60));
            println!(
                " {} - {}",
                inventory.root.display(),
                format_size(inventory.total_size())
            );
            println!(
                " {} files, {} directories",
                inventory.total_files(),
                inventory.total_dirs()
            );
            println!(" Scanned in {:.2}s", inventory.scan_duration.as_secs_f64());
            println!("{}", "─".repeat(60));
            println!();
            print!("{}", format_tree(&tree, &tree_format));
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&directory_entries(&inventory))?);
        }
    }

    Ok(())
}

/// Export scan results to JSON.
fn run_export(options: &ScanOptions, path: &Path, output: Option<PathBuf>) -> Result<()> {
    let inventory = scan(options, path)?;
    let json = serde_json::to_string_pretty(&inventory)?;

    match output {
        Some(output_path) => {
            std::fs::write(&output_path, json)
                .with_context(|| format!("Cannot write {}", output_path.display()))?;
            eprintln!("Exported to {}", output_path.display());
        }
        None => {
            println!("{json}");
        }
    }

    Ok(())
}

/// Parse a size string (e.g., "1KB", "10MB", "1.5G", "-100").
///
/// Units are binary (1KB = 1024 bytes). A leading minus is kept so that
/// non-positive targets can be expressed.
fn parse_size(s: &str) -> Result<i64> {
    let s = s.trim().to_uppercase();
    let (negative, s) = match s.strip_prefix('-') {
        Some(rest) => (true, rest.trim()),
        None => (false, s.as_str()),
    };

    let (digits, multiplier) = if let Some(num) = s.strip_suffix("GB").or_else(|| s.strip_suffix('G')) {
        (num, 1024.0 * 1024.0 * 1024.0)
    } else if let Some(num) = s.strip_suffix("MB").or_else(|| s.strip_suffix('M')) {
        (num, 1024.0 * 1024.0)
    } else if let Some(num) = s.strip_suffix("KB").or_else(|| s.strip_suffix('K')) {
        (num, 1024.0)
    } else if let Some(num) = s.strip_suffix('B') {
        (num, 1.0)
    } else {
        (s, 1.0)
    };

    let num: f64 = digits
        .trim()
        .parse()
        .with_context(|| format!("Invalid size: {s}"))?;
    if !num.is_finite() || num < 0.0 {
        bail!("Invalid size: {s}");
    }

    let bytes = (num * multiplier) as i64;
    Ok(if negative { -bytes } else { bytes })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_size_units() {
        assert_eq!(parse_size("4096").unwrap(), 4096);
        assert_eq!(parse_size("1KB").unwrap(), 1024);
        assert_eq!(parse_size("1.5k").unwrap(), 1536);
        assert_eq!(parse_size("10MB").unwrap(), 10 * 1024 * 1024);
        assert_eq!(parse_size("2G").unwrap(), 2 * 1024 * 1024 * 1024);
        assert_eq!(parse_size("12B").unwrap(), 12);
    }

    #[test]
    fn test_parse_size_negative_and_invalid() {
        assert_eq!(parse_size("-100").unwrap(), -100);
        assert_eq!(parse_size("-1KB").unwrap(), -1024);
        assert!(parse_size("lots").is_err());
        assert!(parse_size("").is_err());
    }

    #[test]
    fn test_scan_config_from_flags() {
        let options = ScanOptions {
            config: None,
            no_hidden: true,
            follow_symlinks: true,
            ignore: vec!["*.tmp".to_string()],
        };
        let config = scan_config(&options, Path::new("/data")).unwrap();
        assert_eq!(config.root, PathBuf::from("/data"));
        assert!(!config.include_hidden);
        assert!(config.follow_symlinks);
        assert_eq!(config.ignore_patterns, vec!["*.tmp".to_string()]);
    }

    #[test]
    fn test_scan_config_from_toml_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = dir.path().join("scan.toml");
        std::fs::write(&file, "max_depth = 2\nignore_patterns = [\"target\"]\n").unwrap();

        let options = ScanOptions {
            config: Some(file),
            no_hidden: false,
            follow_symlinks: false,
            ignore: vec!["*.log".to_string()],
        };
        let config = scan_config(&options, Path::new("/data")).unwrap();
        assert_eq!(config.root, PathBuf::from("/data"));
        assert_eq!(config.max_depth, Some(2));
        assert!(config.include_hidden);
        assert_eq!(config.ignore_patterns, vec!["target".to_string(), "*.log".to_string()]);
    }

    #[test]
    fn test_cli_parses_duplicate_method() {
        let cli = Cli::try_parse_from(["tame", "duplicates", "/tmp", "--method", "size"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Duplicates { method: DuplicateMethod::Size, .. }
        ));
        assert!(Cli::try_parse_from(["tame", "duplicates", "--method", "bogus"]).is_err());
    }

    #[test]
    fn test_cli_accepts_negative_target() {
        let cli = Cli::try_parse_from(["tame", "free", ".", "--target", "-5"]).unwrap();
        assert!(matches!(cli.command, Command::Free { ref target, .. } if target == "-5"));
    }
}
