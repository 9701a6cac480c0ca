use clap::Parser;
use plecfp::{
    get_plec_features, load_ligands, load_receptor, write_df_to_file, write_failure_report,
    BatchOptions, DataFrameFileType, Error, FailurePolicy, PlecSettings,
};
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace, warn};

#[derive(Parser, Debug, Clone)]
#[command(version, about)]
pub(crate) struct Args {
    /// Path to the (multi-)mol2 file holding the ligand poses
    #[arg(short, long)]
    ligands: PathBuf,

    /// Path to the receptor structure (mol2, PDB or mmCIF)
    #[arg(short, long)]
    receptor: PathBuf,

    /// Output file path
    #[arg(short, long)]
    output: PathBuf,

    /// Output file type
    #[arg(short = 't', long, default_value_t = DataFrameFileType::Csv)]
    output_format: DataFrameFileType,

    /// Number of threads to use for parallel processing (0 for all cores)
    #[arg(short = 'j', long = "num-threads", default_value_t = 20)]
    num_threads: usize,

    /// Length of the folded fingerprint
    #[arg(long, default_value_t = plecfp::plec::settings::DEFAULT_SIZE)]
    size: usize,

    /// Bond radius of the receptor atom environments
    #[arg(long = "depth-protein", default_value_t = plecfp::plec::settings::DEFAULT_DEPTH_PROTEIN)]
    depth_protein: usize,

    /// Bond radius of the ligand atom environments
    #[arg(long = "depth-ligand", default_value_t = plecfp::plec::settings::DEFAULT_DEPTH_LIGAND)]
    depth_ligand: usize,

    /// Maximum ligand-receptor heavy atom distance counted as a contact
    #[arg(short, long, default_value_t = plecfp::plec::settings::DEFAULT_DIST_CUTOFF)]
    dist_cutoff: f64,

    /// Set bits to 0/1 instead of counting how often they are hit
    #[arg(long = "no-count-bits", default_value_t = false)]
    no_count_bits: bool,

    /// Keep receptor water molecules in the contact search
    #[arg(long = "keep-water", default_value_t = false)]
    keep_water: bool,

    /// How to handle poses that fail to parse or fingerprint
    #[arg(long = "on-error", default_value_t = FailurePolicy::Fill)]
    on_error: FailurePolicy,

    /// Write the failed poses (index, name, error) to this CSV file
    #[arg(long)]
    failures: Option<PathBuf>,

    /// Hide the progress bar
    #[arg(short, long, default_value_t = false)]
    quiet: bool,
}

impl Args {
    fn settings(&self) -> PlecSettings {
        PlecSettings {
            size: self.size,
            depth_protein: self.depth_protein,
            depth_ligand: self.depth_ligand,
            distance_cutoff: self.dist_cutoff,
            count_bits: !self.no_count_bits,
            ignore_hoh: !self.keep_water,
        }
    }

    fn batch_options(&self) -> BatchOptions {
        BatchOptions {
            num_threads: self.num_threads,
            on_error: self.on_error,
            show_progress: !self.quiet,
        }
    }
}

pub(crate) fn run(args: &Args) -> Result<(), Error> {
    trace!("{args:?}");

    let settings = args.settings();
    settings.validate()?;

    // Everything is loaded before any worker starts
    let receptor = load_receptor(&args.receptor)?;
    info!(
        "Loaded receptor {} with {} atoms",
        args.receptor.display(),
        receptor.atom_count()
    );
    let poses = load_ligands(&args.ligands)?;
    info!(
        "Loaded {} ligand poses from {}",
        poses.len(),
        args.ligands.display()
    );
    if poses.is_empty() {
        warn!("No ligand poses found; the output will be empty");
    }

    let (mut df_plec, failures) =
        get_plec_features(poses, receptor, settings, &args.batch_options())?;
    debug!("Feature table\n{df_plec}");

    // A failure report is only written once the table is on disk
    write_df_to_file(&mut df_plec, Path::new(&args.output), args.output_format)?;
    info!(
        "Saved {} x {} fingerprints to {}",
        df_plec.height(),
        df_plec.width(),
        args.output.display()
    );

    if let Some(path) = &args.failures {
        write_failure_report(&failures, path)?;
        info!("Failed poses saved to {}", path.display());
    } else if !failures.is_empty() {
        warn!(
            "{} {} failed; pass --failures to save the details",
            failures.len(),
            match failures.len() {
                1 => "pose",
                _ => "poses",
            }
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;

    fn test_file(name: &str) -> String {
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("test-data")
            .join(name)
            .to_string_lossy()
            .into_owned()
    }

    fn parse(extra: &[&str]) -> Args {
        let ligands = test_file("broken.mol2");
        let receptor = test_file("receptor.mol2");
        let mut argv = vec!["plec", "-l", ligands.as_str(), "-r", receptor.as_str(), "-q"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn defaults_match_the_reference_parameters() {
        let args = parse(&["-o", "out.csv"]);
        assert_eq!(args.settings(), PlecSettings::default());
        assert_eq!(args.num_threads, 20);
        assert_eq!(args.on_error, FailurePolicy::Fill);
        assert_eq!(args.output_format, DataFrameFileType::Csv);
    }

    #[test]
    fn writes_table_and_failure_report() {
        let dir = TempDir::new("plecfp-cli").unwrap();
        let output = dir.path().join("plec.csv");
        let failures = dir.path().join("failures.csv");
        let args = parse(&[
            "-o",
            output.to_str().unwrap(),
            "--failures",
            failures.to_str().unwrap(),
            "-j",
            "2",
        ]);
        run(&args).unwrap();

        let table = std::fs::read_to_string(&output).unwrap();
        assert_eq!(table.lines().count(), 3);
        let report = std::fs::read_to_string(&failures).unwrap();
        assert_eq!(report.lines().count(), 2);
    }

    #[test]
    fn failed_table_write_leaves_no_report() {
        let dir = TempDir::new("plecfp-cli").unwrap();
        // A regular file cannot act as the output directory
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "x").unwrap();
        let output = blocker.join("plec.csv");
        let failures = dir.path().join("out/failures.csv");
        let args = parse(&[
            "-o",
            output.to_str().unwrap(),
            "--failures",
            failures.to_str().unwrap(),
        ]);

        assert!(matches!(run(&args), Err(Error::Io { .. })));
        assert!(!failures.exists());
    }

    #[test]
    fn abort_policy_fails_the_run() {
        let dir = TempDir::new("plecfp-cli").unwrap();
        let output = dir.path().join("plec.csv");
        let args = parse(&["-o", output.to_str().unwrap(), "--on-error", "abort"]);
        assert!(matches!(run(&args), Err(Error::PoseFailed { .. })));
        assert!(!output.exists());
    }

    #[test]
    fn invalid_size_is_rejected_before_loading() {
        let args = parse(&["-o", "unused.csv", "--size", "0"]);
        assert!(matches!(run(&args), Err(Error::InvalidSettings(_))));
    }
}
