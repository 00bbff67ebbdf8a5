use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use acoustic_units::analysis::cancel::CancellationToken;
use acoustic_units::analysis::AnalysisReport;
use acoustic_units::audio::wav::{read_wav, write_wav};
use acoustic_units::config::{AnalysisConfig, AppConfig, DetectionMode};
use acoustic_units::error::ErrorCode;
use acoustic_units::fixtures::{tone_bursts, ToneBurst};
use acoustic_units::{
    AnalysisError, Analyzer, CadenceScheduler, Cue, DecodedAudio, LiveFrameSampler,
    LiveSpectrumCapture,
};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "units-cli",
    about = "Acoustic unit segmentation and live spectrum replay"
)]
struct Cli {
    /// Log pipeline progress to stderr
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Segment a WAV file into units and print them as JSON
    Analyze {
        input: PathBuf,
        /// JSON configuration file (missing fields use defaults)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Override the minimum unit duration with a preset
        #[arg(long, value_enum)]
        mode: Option<ModeArg>,
        #[arg(long)]
        output: Option<PathBuf>,
        /// Print a per-unit table and detector summary instead of JSON
        #[arg(long)]
        summary: bool,
    },
    /// Replay a WAV file through the live path, one JSON cue per line
    Live {
        input: PathBuf,
        #[arg(long)]
        config: Option<PathBuf>,
        /// Rendering tick in milliseconds
        #[arg(long, default_value_t = 16)]
        tick_ms: u64,
        /// Run the offline analysis first and cue on unit starts
        #[arg(long)]
        units: bool,
    },
    /// Write a tone-burst WAV fixture
    Synth {
        output: PathBuf,
        #[arg(long, default_value_t = 500.0)]
        tone_hz: f64,
        #[arg(long, default_value_t = 2.0)]
        start: f64,
        #[arg(long, default_value_t = 2.5)]
        end: f64,
        #[arg(long, default_value_t = 10.0)]
        duration: f64,
        #[arg(long, default_value_t = 0.5)]
        amplitude: f32,
        #[arg(long, default_value_t = 44_100)]
        sample_rate: u32,
    },
}

#[derive(Debug, Copy, Clone, ValueEnum)]
enum ModeArg {
    Sensitive,
    Conservative,
}

impl From<ModeArg> for DetectionMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Sensitive => DetectionMode::Sensitive,
            ModeArg::Conservative => DetectionMode::Conservative,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            if let Some(analysis) = err.downcast_ref::<AnalysisError>() {
                eprintln!("Error (code {}): {err:?}", analysis.code());
            } else {
                eprintln!("Error: {err:?}");
            }
            ExitCode::from(1)
        }
    }
}

fn init_tracing(verbose: bool) {
    let level = if verbose {
        tracing::Level::INFO
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Commands::Analyze {
            input,
            config,
            mode,
            output,
            summary,
        } => run_analyze(&input, config.as_deref(), mode, output, summary),
        Commands::Live {
            input,
            config,
            tick_ms,
            units,
        } => run_live(&input, config.as_deref(), tick_ms, units),
        Commands::Synth {
            output,
            tone_hz,
            start,
            end,
            duration,
            amplitude,
            sample_rate,
        } => run_synth(
            &output,
            ToneBurst::new(start, end, tone_hz, amplitude),
            duration,
            sample_rate,
        ),
    }
}

fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    match path {
        Some(path) => AppConfig::try_load_from_file(path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(AppConfig::default()),
    }
}

fn analyze_file(input: &Path, config: &AnalysisConfig) -> Result<AnalysisReport> {
    let audio = read_wav(input)?;
    let analyzer = Analyzer::new(config)?;
    let report = analyzer
        .analyze_with_summary(&audio.as_buffer(), &CancellationToken::new())
        .with_context(|| format!("analyzing {}", input.display()))?;
    Ok(report)
}

fn run_analyze(
    input: &Path,
    config_path: Option<&Path>,
    mode: Option<ModeArg>,
    output_path: Option<PathBuf>,
    summary: bool,
) -> Result<ExitCode> {
    let mut config = load_config(config_path)?.analysis;
    if let Some(mode) = mode {
        config.min_unit_duration_s = DetectionMode::from(mode).min_unit_duration_s();
    }

    let report = analyze_file(input, &config)?;
    let text = if summary {
        render_summary(&report)
    } else {
        serde_json::to_string_pretty(&report.result)?
    };

    if let Some(path) = output_path {
        fs::write(&path, text).with_context(|| format!("writing {}", path.display()))?;
    } else {
        println!("{text}");
    }
    Ok(ExitCode::from(0))
}

fn render_summary(report: &AnalysisReport) -> String {
    let mut lines = Vec::new();
    if let Some(summary) = &report.summary {
        lines.push(format!(
            "slices={} noise_mean={} noise_std={:.2} threshold={} min_run={}",
            summary.slice_count,
            summary.noise_mean,
            summary.noise_std_dev,
            summary.threshold,
            summary.min_run_slices
        ));
    }
    lines.push(format!("{} unit(s)", report.result.units.len()));
    for (index, unit) in report.result.units.iter().enumerate() {
        lines.push(format!(
            "#{index:<3} {:>8.3}s - {:>8.3}s  {:>7.3}s  {:>7.1} Hz  {}",
            unit.start_time,
            unit.end_time,
            unit.duration,
            unit.dominant_frequency,
            unit.average_intensity
        ));
    }
    lines.join("\n")
}

fn run_live(
    input: &Path,
    config_path: Option<&Path>,
    tick_ms: u64,
    synchronize: bool,
) -> Result<ExitCode> {
    anyhow::ensure!(tick_ms > 0, "--tick-ms must be positive");
    let config = load_config(config_path)?;
    let audio = read_wav(input)?;

    let mut scheduler = CadenceScheduler::new(config.cadence.clone())?;
    if synchronize {
        let report = analyze_file(input, &config.analysis)?;
        scheduler.set_units(&report.result);
    }

    let mut capture = LiveSpectrumCapture::new(config.live.clone())?;
    let sampler = LiveFrameSampler::new(audio.sample_rate);
    for cue in replay(&audio, &mut capture, sampler, &mut scheduler, tick_ms) {
        println!("{}", serde_json::to_string(&cue)?);
    }
    Ok(ExitCode::from(0))
}

/// Step through `audio` at the tick rate, collecting every cue
fn replay(
    audio: &DecodedAudio,
    capture: &mut LiveSpectrumCapture,
    sampler: LiveFrameSampler,
    scheduler: &mut CadenceScheduler,
    tick_ms: u64,
) -> Vec<Cue> {
    let buffer = audio.as_buffer();
    let samples = buffer.first_channel();
    let rate = audio.sample_rate as f64;
    let tick_s = tick_ms as f64 / 1000.0;

    let mut cues = Vec::new();
    let mut tick = 1u64;
    loop {
        let time = tick as f64 * tick_s;
        let position = ((time * rate) as usize).min(samples.len());
        let bytes = capture.capture(&samples[..position]);
        let frame = sampler.sample(&bytes);
        while let Some(cue) = scheduler.poll(time, frame) {
            cues.push(cue);
        }
        if position >= samples.len() {
            break;
        }
        tick += 1;
    }
    cues
}

fn run_synth(output: &Path, burst: ToneBurst, duration: f64, sample_rate: u32) -> Result<ExitCode> {
    anyhow::ensure!(duration > 0.0, "--duration must be positive");
    anyhow::ensure!(sample_rate > 0, "--sample-rate must be positive");
    let samples = tone_bursts(sample_rate, duration, &[burst]);
    write_wav(output, &DecodedAudio::mono(samples, sample_rate))
        .with_context(|| format!("writing {}", output.display()))?;
    eprintln!(
        "Wrote {:.2}s tone burst fixture to {}",
        duration,
        output.display()
    );
    Ok(ExitCode::from(0))
}
