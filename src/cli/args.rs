use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mri_batch")]
#[command(about = "Batch FreeSurfer reconstruction and hippocampal segmentation")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run recon-all and hippocampal segmentation for every subject
    Run(RunArgs),

    /// Report subjects whose recon-all left a recon-all.error log
    CheckFailures {
        /// Root directory of the subject tree
        directory: PathBuf,

        /// Append the failure lines to this file
        #[arg(short, long)]
        report: Option<PathBuf>,
    },

    /// List reconstructions without a hippocampal segmentation result
    CheckSegmentation {
        /// Root directory of the subject tree
        directory: PathBuf,

        /// Directory holding the reconstructions when --output was used for the run
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Root directory containing <subject>/<session>/anat/*.nii
    #[arg(env = "SUBJECTS_DIR")]
    pub directory: Option<PathBuf>,

    /// Only run hippocampal segmentation on existing reconstructions
    #[arg(long)]
    pub hc_only: bool,

    /// Number of subjects processed in parallel (default: available CPUs)
    #[arg(short, long, env = "CPU_CORES")]
    pub cores: Option<usize>,

    /// Write every reconstruction directly under this directory
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// recon-all executable, or a full template such as "recon-all -i {input} -subjid {subject} -sd {subjects_dir} -all"
    #[arg(long)]
    pub recon_cmd: Option<String>,

    /// segmentation executable, or a full template such as "segmentHA_T1.sh {subject} {subjects_dir}"
    #[arg(long)]
    pub segment_cmd: Option<String>,

    /// Per-stage timeout in hours (0 disables the timeout)
    #[arg(long, default_value = "48")]
    pub timeout_hours: u64,

    /// Re-run segmentation even when its result already exists
    #[arg(short, long)]
    pub force: bool,

    /// Identifier used for log file names (default: host name)
    #[arg(long, env = "CONTAINER_NAME")]
    pub run_id: Option<String>,

    /// Directory for the run log and JSON report (default: <DIRECTORY>/mri_logs)
    #[arg(long)]
    pub log_dir: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_defaults() {
        let cli = Cli::try_parse_from(["mri_batch", "run", "/data/bids"]).unwrap();
        let Commands::Run(args) = cli.command else {
            panic!("expected run subcommand");
        };

        assert_eq!(args.directory, Some(PathBuf::from("/data/bids")));
        assert!(!args.hc_only);
        assert!(!args.force);
        assert_eq!(args.timeout_hours, 48);
        assert!(args.output.is_none());
    }

    #[test]
    fn test_parse_run_options() {
        let cli = Cli::try_parse_from([
            "mri_batch",
            "run",
            "/data/bids",
            "--hc-only",
            "--cores",
            "4",
            "--output",
            "/data/out",
            "--timeout-hours",
            "0",
            "--run-id",
            "node-3",
            "--force",
        ])
        .unwrap();
        let Commands::Run(args) = cli.command else {
            panic!("expected run subcommand");
        };

        assert!(args.hc_only);
        assert!(args.force);
        assert_eq!(args.cores, Some(4));
        assert_eq!(args.output, Some(PathBuf::from("/data/out")));
        assert_eq!(args.timeout_hours, 0);
        assert_eq!(args.run_id.as_deref(), Some("node-3"));
    }

    #[test]
    fn test_parse_check_failures() {
        let cli =
            Cli::try_parse_from(["mri_batch", "check-failures", "/data/bids", "--report", "fails.txt"])
                .unwrap();

        match cli.command {
            Commands::CheckFailures { directory, report } => {
                assert_eq!(directory, PathBuf::from("/data/bids"));
                assert_eq!(report, Some(PathBuf::from("fails.txt")));
            }
            _ => panic!("expected check-failures subcommand"),
        }
    }
}
