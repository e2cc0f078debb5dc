use anyhow::Result;
use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use contigblast::assembler::{find_executable, Assembler, Megahit, Spades};
use contigblast::blast::{NcbiBlast, PollConfig, NCBI_BLAST_URL};
use contigblast::pipeline::{self, PipelineConfig, RESULTS_FILE};
use contigblast::report::ExtractMode;
use contigblast::subsample::{ReadSet, DEFAULT_MAX_LINES};

fn parse_positive(s: &str) -> Result<usize, String> {
    let val: usize = s.parse().map_err(|_| format!("Invalid number: {}", s))?;
    if val == 0 {
        Err("value must be greater than 0".to_string())
    } else {
        Ok(val)
    }
}

fn parse_seconds(s: &str) -> Result<u64, String> {
    parse_positive(s).map(|v| v as u64)
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum AssemblerKind {
    Spades,
    Megahit,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ExtractArg {
    Simple,
    Robust,
}

impl From<ExtractArg> for ExtractMode {
    fn from(arg: ExtractArg) -> Self {
        match arg {
            ExtractArg::Simple => ExtractMode::Simple,
            ExtractArg::Robust => ExtractMode::Robust,
        }
    }
}

#[derive(Parser)]
#[command(name = "contigblast")]
#[command(version)]
#[command(about = "Identify the organism behind a read set from its longest assembled contig")]
#[command(long_about = r#"
contigblast - species identification from a subset of sequencing reads

WORKFLOW:
  Reads → first N lines → SPAdes/MEGAHIT → longest contig → BLAST (nt) → top hit

INPUT:
  Single-end   contigblast reads.fastq         (or a base name: reads → reads.fastq, reads.fq[.gz])
  Paired-end   contigblast --paired sample     (sample_R1.fastq.gz + sample_R2.fastq.gz, or _1/_2)

OUTPUT FILES (in --outdir):
  subsampled[_1|_2].fastq   Read subset given to the assembler
  assembly/ | megahit/      Assembler output
  longest_contig.fasta      Longest contig (header + one sequence line)
  query_<N>.fasta           Truncated query (--truncate only)
  blast_report.txt          Raw BLAST text report
  results.tsv               Sample, Contig, Contig_Len, Query_Len, RID, Prediction

The predicted organism is printed on stdout.
"#)]
struct Args {
    /// Read file (single-end) or sample base name (paired-end)
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    #[arg(long, help_heading = "Input")]
    paired: bool,

    #[arg(long = "max-lines", value_name = "NUM", default_value_t = DEFAULT_MAX_LINES,
          value_parser = parse_positive, help_heading = "Input")]
    max_lines: usize,

    #[arg(short = 'o', long, value_name = "DIR", default_value = ".", help_heading = "Output")]
    outdir: PathBuf,

    #[arg(short = 'v', long, help_heading = "Output")]
    verbose: bool,

    #[arg(short = 'a', long, value_enum, default_value = "spades", help_heading = "Assembly")]
    assembler: AssemblerKind,

    #[arg(long = "assembler-bin", value_name = "FILE", help_heading = "Assembly")]
    assembler_bin: Option<PathBuf>,

    #[arg(short = 'g', long = "min-contig-len", value_name = "BP", default_value = "200", help_heading = "Assembly")]
    min_contig_len: usize,

    #[arg(short = 't', long, value_name = "NUM", default_value = "0", help_heading = "Assembly")]
    threads: usize,

    /// Submit only the first N bases of the longest contig
    #[arg(long, value_name = "N", num_args = 0..=1, default_missing_value = "1000",
          value_parser = parse_positive, help_heading = "BLAST")]
    truncate: Option<usize>,

    /// Entrez organism filter, e.g. "txid2[ORGN]"
    #[arg(long, value_name = "QUERY", help_heading = "BLAST")]
    organism: Option<String>,

    #[arg(short = 'e', long, value_name = "EMAIL", help_heading = "BLAST")]
    email: Option<String>,

    #[arg(long = "blast-url", value_name = "URL", default_value = NCBI_BLAST_URL, help_heading = "BLAST")]
    blast_url: String,

    #[arg(long = "poll-interval", value_name = "SECS", value_parser = parse_seconds, help_heading = "BLAST")]
    poll_interval: Option<u64>,

    #[arg(long, value_name = "SECS", value_parser = parse_seconds, help_heading = "BLAST")]
    timeout: Option<u64>,

    #[arg(long, value_enum, default_value = "robust", help_heading = "BLAST")]
    extract: ExtractArg,
}

impl Args {
    fn poll_config(&self) -> PollConfig {
        let base = if self.truncate.is_some() {
            PollConfig::TRUNCATED
        } else {
            PollConfig::FULL_LENGTH
        };
        PollConfig {
            interval: self.poll_interval.map(Duration::from_secs).unwrap_or(base.interval),
            timeout: self.timeout.map(Duration::from_secs).unwrap_or(base.timeout),
        }
    }

    fn build_assembler(&self, threads: usize) -> Result<Box<dyn Assembler>> {
        let default_bin = match self.assembler {
            AssemblerKind::Spades => "spades.py",
            AssemblerKind::Megahit => "megahit",
        };
        let executable = match &self.assembler_bin {
            Some(path) => path.clone(),
            None => find_executable(default_bin)?,
        };
        log::debug!("Found {}: {}", default_bin, executable.display());

        let assembler: Box<dyn Assembler> = match self.assembler {
            AssemblerKind::Spades => Box::new(Spades { executable, threads }),
            AssemblerKind::Megahit => Box::new(Megahit {
                executable,
                threads,
                min_contig_len: self.min_contig_len,
            }),
        };
        Ok(assembler)
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_target(false)
        .format_timestamp_secs()
        .init();
}

/// Sleeps for one poll interval behind a spinner. The spinner is cleared
/// before returning so log lines never land on top of it.
fn sleep_with_spinner(style: &ProgressStyle, message: String, interval: Duration, hidden: bool) -> ProgressBar {
    let spinner = if hidden {
        ProgressBar::hidden()
    } else {
        ProgressBar::new_spinner()
    };
    spinner.set_style(style.clone());
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(120));
    thread::sleep(interval);
    spinner.finish_and_clear();
    spinner
}

fn main() -> Result<()> {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) if !e.use_stderr() => {
            // --help / --version
            e.print()?;
            return Ok(());
        }
        Err(e) => {
            e.print()?;
            std::process::exit(1);
        }
    };
    init_logging(args.verbose);
    let start_time = Instant::now();

    let threads = if args.threads == 0 { num_cpus::get() } else { args.threads };

    let reads = ReadSet::resolve(&args.input, args.paired)?;
    let assembler = args.build_assembler(threads)?;
    let client = NcbiBlast {
        base_url: args.blast_url.clone(),
        email: args.email.clone(),
        ..NcbiBlast::default()
    };

    let config = PipelineConfig {
        reads,
        outdir: args.outdir.clone(),
        max_lines: args.max_lines,
        truncate: args.truncate,
        poll: args.poll_config(),
        extract_mode: args.extract.into(),
        organism: args.organism.clone(),
    };

    let style = ProgressStyle::default_spinner()
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "✓"])
        .template("{spinner:.blue} {msg}")?;
    let mut waited = Duration::ZERO;

    let outcome = pipeline::run(&config, assembler.as_ref(), &client, |interval| {
        let message = format!("Waiting for BLAST results ({}s)", waited.as_secs());
        sleep_with_spinner(&style, message, interval, args.verbose);
        waited += interval;
    });
    let outcome = outcome?;

    let results_path = config.outdir.join(RESULTS_FILE);
    pipeline::write_results(&outcome, &results_path)?;

    log::info!("Top hit: {}", outcome.species);
    log::info!("Results written to: {}", results_path.display());
    log::debug!("Total time: {:.1}s", start_time.elapsed().as_secs_f64());

    println!("{}", outcome.species);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_are_well_formed() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }

    #[test]
    fn test_missing_input_is_rejected() {
        assert!(Args::try_parse_from(["contigblast"]).is_err());
    }

    #[test]
    fn test_bare_truncate_defaults_to_1000() {
        let args = Args::try_parse_from(["contigblast", "--truncate", "--", "reads.fq"]).unwrap();
        assert_eq!(args.truncate, Some(1000));
        assert_eq!(args.poll_config(), PollConfig::TRUNCATED);
    }

    #[test]
    fn test_full_length_poll_defaults_and_overrides() {
        let args = Args::try_parse_from(["contigblast", "reads.fq"]).unwrap();
        assert_eq!(args.poll_config(), PollConfig::FULL_LENGTH);

        let args = Args::try_parse_from(["contigblast", "reads.fq", "--poll-interval", "7", "--timeout", "70"])
            .unwrap();
        assert_eq!(
            args.poll_config(),
            PollConfig { interval: Duration::from_secs(7), timeout: Duration::from_secs(70) }
        );
    }

    #[test]
    fn test_zero_truncate_rejected() {
        assert!(Args::try_parse_from(["contigblast", "reads.fq", "--truncate", "0"]).is_err());
    }

    #[test]
    fn test_spinner_is_cleared_after_each_sleep() {
        let style = ProgressStyle::default_spinner();
        for hidden in [true, false] {
            let spinner = sleep_with_spinner(&style, "Waiting".into(), Duration::from_millis(5), hidden);
            assert!(spinner.is_finished());
        }
    }
}
