//! Offline delay-buffer benchmark: synthetic stream in, timed window reads
//! and seek churn out, JSON summary on stdout or to `--output`.

use std::path::PathBuf;
use std::time::Instant;

use serde::Serialize;
use timeshift_core::{DelayBuffer, DelayConfig, ReadOutcome};

#[derive(Debug)]
struct Args {
    /// Seconds of audio to stream through the buffer.
    seconds: u32,
    sample_rate: u32,
    window_secs: u32,
    margin_secs: u32,
    /// Write chunk length in samples (the simulated callback frame).
    chunk_len: usize,
    output: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
struct Summary {
    sample_rate: u32,
    window_secs: u32,
    margin_secs: u32,
    seconds_streamed: u32,
    chunk_len: usize,
    write_msamples_per_sec: f64,
    p50_window_read_us: f64,
    p95_window_read_us: f64,
    avg_window_read_us: f64,
    windows_played: usize,
    windows_silent: usize,
    re_anchors: u64,
    underruns: u64,
    clamped_seeks: u64,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = match parse_args() {
        Ok(a) => a,
        Err(e) => {
            eprintln!("benchmark: {e}");
            std::process::exit(1);
        }
    };
    if let Err(e) = run(args) {
        eprintln!("benchmark failed: {e}");
        std::process::exit(1);
    }
}

fn parse_args() -> Result<Args, String> {
    let mut args = Args {
        seconds: 600,
        sample_rate: 48_000,
        window_secs: 120,
        margin_secs: 2,
        chunk_len: 128,
        output: None,
    };

    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--seconds" => args.seconds = parse_value(&mut it, "--seconds")?,
            "--rate" => args.sample_rate = parse_value(&mut it, "--rate")?,
            "--window" => args.window_secs = parse_value(&mut it, "--window")?,
            "--margin" => args.margin_secs = parse_value(&mut it, "--margin")?,
            "--chunk" => args.chunk_len = parse_value(&mut it, "--chunk")?,
            "--output" => {
                let Some(v) = it.next() else {
                    return Err("missing value for --output".into());
                };
                args.output = Some(PathBuf::from(v));
            }
            "--help" | "-h" => {
                println!(
                    "Usage: cargo run -p timeshift-core --bin benchmark -- \\
  [--seconds <n>] [--rate <hz>] [--window <s>] [--margin <s>] \\
  [--chunk <samples>] [--output <file.json>]"
                );
                std::process::exit(0);
            }
            other => return Err(format!("unknown argument: {other}")),
        }
    }
    if args.chunk_len == 0 {
        return Err("--chunk must be positive".into());
    }
    Ok(args)
}

fn parse_value<T: std::str::FromStr>(
    it: &mut impl Iterator<Item = String>,
    flag: &str,
) -> Result<T, String> {
    let Some(v) = it.next() else {
        return Err(format!("missing value for {flag}"));
    };
    v.parse::<T>()
        .map_err(|_| format!("invalid value for {flag}: {v}"))
}

fn percentile(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let idx = ((sorted.len() - 1) as f64 * p.clamp(0.0, 1.0)).round() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

fn run(args: Args) -> Result<(), String> {
    let config = DelayConfig::new(args.sample_rate, args.window_secs, args.margin_secs);
    let mut buffer = DelayBuffer::new(config).map_err(|e| e.to_string())?;

    println!(
        "Streaming {} s at {} Hz through a {} s window (margin {} s, chunk {})",
        args.seconds, args.sample_rate, args.window_secs, args.margin_secs, args.chunk_len
    );

    // One second of a 440 Hz tone, written in callback-sized chunks.
    let second: Vec<f32> = (0..args.sample_rate)
        .map(|i| {
            let t = f64::from(i) / f64::from(args.sample_rate);
            (2.0 * std::f64::consts::PI * 440.0 * t).sin() as f32
        })
        .collect();

    let mut read_latencies_us: Vec<f64> = Vec::with_capacity(args.seconds as usize);
    let mut windows_played = 0usize;
    let mut windows_silent = 0usize;
    let mut write_time = std::time::Duration::ZERO;
    let mut scratch = vec![0f32; args.sample_rate as usize];

    for sec in 0..args.seconds {
        let started = Instant::now();
        for chunk in second.chunks(args.chunk_len) {
            buffer.write_chunk(chunk);
        }
        write_time += started.elapsed();

        let started = Instant::now();
        let outcome = buffer.read_frame_into(&mut scratch);
        read_latencies_us.push(started.elapsed().as_secs_f64() * 1e6);
        match outcome {
            ReadOutcome::Silence => windows_silent += 1,
            _ => windows_played += 1,
        }

        // Seek churn: rewind a bit every 10 s, catch back up every 30 s.
        if sec % 30 == 29 {
            buffer.seek_forward(5);
        } else if sec % 10 == 9 {
            buffer.seek_backward(3);
        }
    }

    let stats = buffer.stats();
    let total_written = u64::from(args.sample_rate) * u64::from(args.seconds);
    let summary = Summary {
        sample_rate: args.sample_rate,
        window_secs: args.window_secs,
        margin_secs: args.margin_secs,
        seconds_streamed: args.seconds,
        chunk_len: args.chunk_len,
        write_msamples_per_sec: total_written as f64 / write_time.as_secs_f64() / 1e6,
        p50_window_read_us: percentile(&read_latencies_us, 0.50),
        p95_window_read_us: percentile(&read_latencies_us, 0.95),
        avg_window_read_us: read_latencies_us.iter().sum::<f64>()
            / read_latencies_us.len().max(1) as f64,
        windows_played,
        windows_silent,
        re_anchors: stats.re_anchors,
        underruns: stats.underruns,
        clamped_seeks: stats.clamped_seeks,
    };

    println!(
        "Done. write={:.1} Msamples/s read p50={:.1} µs p95={:.1} µs re_anchors={}",
        summary.write_msamples_per_sec,
        summary.p50_window_read_us,
        summary.p95_window_read_us,
        summary.re_anchors
    );

    let json = serde_json::to_string_pretty(&summary).map_err(|e| e.to_string())?;
    if let Some(out) = args.output {
        if let Some(parent) = out.parent() {
            std::fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }
        std::fs::write(&out, json).map_err(|e| e.to_string())?;
        println!("Wrote benchmark report: {}", out.display());
    } else {
        println!("{json}");
    }
    Ok(())
}
