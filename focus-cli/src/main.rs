mod config;
mod frame_decoder;
mod logging;
mod telemetry;

use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{bail, eyre, Context, Result};
use ndarray::{Array2, Array3};

use config::{LogFormat, LogLevel, LogTarget, LoggingConfig};
use focus_core::config::{parse_resolution, SessionConfig, WorkerPoolConfig};
use focus_core::framer::PassthroughFramer;
use focus_core::header::{self, DEFAULT_FRAGMENT_SIZE, HEADER_LEN};
use focus_core::receiver::{green_channel, DecodeOutcome, Receiver};
use focus_core::transmitter::Transmitter;
use focus_core::WorkerPool;
use frame_decoder::describe_outcome;
use logging::{LogEvent, StructuredLogger};
use telemetry::TelemetryAggregator;

#[derive(Parser, Debug)]
#[command(author, version, about = "FOCUS screen-to-camera codec", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Cmd,

    /// How structured log events are rendered.
    #[arg(long, global = true, default_value = "pretty")]
    log_format: String,

    /// Where structured log events go.
    #[arg(long, global = true, default_value = "stderr")]
    log_target: String,

    /// Path used when `--log-target=file`.
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Encode a stdin payload to a PNG code.
    Simpletx {
        outfile: PathBuf,
        #[arg(long, default_value = "768x768")]
        shape: String,
    },
    /// Decode a single captured image.
    Simplerx {
        imgfile: PathBuf,
        #[arg(long, default_value_t = 32)]
        nsubchannels: usize,
        #[arg(long, default_value = "768x768")]
        shape: String,
    },
    /// Worker entry: read frames from stdin, write recovered fragment
    /// bytes to stdout.
    Receiver {
        #[arg(long, default_value_t = 16)]
        nsubchannels: usize,
        #[arg(long, default_value = "512x512")]
        shape: String,
        #[arg(long, default_value_t = 8)]
        cyclic_prefix: usize,
        #[arg(long, default_value_t = 0)]
        verbosity: u8,
    },
    /// Encode a stdin byte stream into a video file.
    Videotx {
        filename: PathBuf,
        #[arg(long)]
        nsubchannels: usize,
        #[arg(long, default_value_t = 15)]
        txrate: u32,
        #[arg(long = "video-fps", default_value_t = 30)]
        video_fps: u32,
    },
    /// Decode a video file to fragment bytes on stdout.
    Videorx {
        filename: PathBuf,
        #[arg(long)]
        nsubchannels: usize,
        #[arg(long, default_value_t = 6)]
        nprocesses: usize,
        #[arg(long = "nframes-per-process", default_value_t = 20)]
        nframes_per_process: usize,
    },
    /// Multi-rate transmitter: channels are refreshed on independent
    /// cadences instead of every frame.
    Multirate {
        infile: PathBuf,
        #[arg(long)]
        nsubchannels: usize,
        #[arg(long = "update-every")]
        update_every: String,
    },
    /// Benchmarking entry points.
    Benchmark {
        #[command(subcommand)]
        target: BenchmarkTarget,
    },
    /// Run the built-in smoke-test suite.
    Test,
    /// Pre-warm FFT plans and persist wisdom.
    FftInit,
}

#[derive(Subcommand, Debug)]
enum BenchmarkTarget {
    Fft,
    Receiver,
    Multiprocreceiver,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    let mut logger = StructuredLogger::new(build_logging_config(&cli)?)?;

    let result = match cli.command {
        Cmd::Simpletx { outfile, shape } => cmd_simpletx(&outfile, &shape, &mut logger),
        Cmd::Simplerx {
            imgfile,
            nsubchannels,
            shape,
        } => cmd_simplerx(&imgfile, nsubchannels, &shape, &mut logger),
        Cmd::Receiver {
            nsubchannels,
            shape,
            cyclic_prefix,
            verbosity,
        } => cmd_receiver(nsubchannels, &shape, cyclic_prefix, verbosity, &mut logger),
        Cmd::Videotx {
            filename,
            nsubchannels,
            txrate,
            video_fps,
        } => cmd_videotx(&filename, nsubchannels, txrate, video_fps, &mut logger),
        Cmd::Videorx {
            filename,
            nsubchannels,
            nprocesses,
            nframes_per_process,
        } => cmd_videorx(&filename, nsubchannels, nprocesses, nframes_per_process, &mut logger),
        Cmd::Multirate {
            infile,
            nsubchannels,
            update_every,
        } => cmd_multirate(&infile, nsubchannels, &update_every, &mut logger),
        Cmd::Benchmark { target } => cmd_benchmark(target, &mut logger),
        Cmd::Test => cmd_test(&mut logger),
        Cmd::FftInit => cmd_fft_init(&mut logger),
    };

    if let Err(err) = &result {
        logger.log(LogEvent::Error {
            message: err.to_string(),
            details: None,
        })?;
    }
    result
}

fn build_logging_config(cli: &Cli) -> Result<LoggingConfig> {
    let format = match cli.log_format.as_str() {
        "json" => LogFormat::Json,
        "logfmt" => LogFormat::Logfmt,
        "pretty" => LogFormat::Pretty,
        other => bail!("unknown --log-format {other:?}, expected json|logfmt|pretty"),
    };
    let target = match cli.log_target.as_str() {
        "stdout" => LogTarget::Stdout,
        "stderr" => LogTarget::Stderr,
        "file" => LogTarget::File,
        other => bail!("unknown --log-target {other:?}, expected stdout|stderr|file"),
    };
    Ok(LoggingConfig {
        target,
        file_path: cli.log_file.clone(),
        format,
        level: LogLevel::Info,
    })
}

// ---------------------------------------------------------------------
// simpletx / simplerx
// ---------------------------------------------------------------------

fn cmd_simpletx(outfile: &Path, shape: &str, logger: &mut StructuredLogger) -> Result<()> {
    let payload = read_stdin_all()?;
    let body_size = DEFAULT_FRAGMENT_SIZE - HEADER_LEN;
    let nfragments = header::required_fragment_count(payload.len(), body_size);
    let head = header::pack_header(nfragments as u16, payload.len() as u16);
    let fragments = header::fragment_payload(&payload, head, nfragments, DEFAULT_FRAGMENT_SIZE);
    let data: Vec<u8> = fragments.into_iter().flatten().collect();

    let config = SessionConfig {
        nsubchannels: nfragments,
        shape: parse_resolution(shape).map_err(|e| eyre!("{e}"))?,
        ..SessionConfig::default()
    };
    let framer = PassthroughFramer::new(config.shape_with_cp(), config.border);
    let tx = Transmitter::new(config, framer).map_err(|e| eyre!("{e}"))?;
    let frame = tx.encode(&data).map_err(|e| eyre!("{e}"))?;
    save_png(outfile, &frame)?;

    logger.log(LogEvent::Info {
        message: format!(
            "encoded {} bytes into {nfragments} fragments, wrote {}",
            payload.len(),
            outfile.display()
        ),
    })?;
    Ok(())
}

fn cmd_simplerx(imgfile: &Path, nsubchannels: usize, shape: &str, logger: &mut StructuredLogger) -> Result<()> {
    let config = SessionConfig {
        nsubchannels,
        shape: parse_resolution(shape).map_err(|e| eyre!("{e}"))?,
        ..SessionConfig::default()
    };
    let framer = PassthroughFramer::new(config.shape_with_cp(), config.border);
    let mut receiver = Receiver::new(config, framer, true).map_err(|e| eyre!("{e}"))?;

    let frame = load_frame(imgfile)?;
    let outcome = receiver.decode(&frame).map_err(|e| eyre!("{e}"))?;

    match outcome {
        DecodeOutcome::NotFound => {
            println!("Status: notfound");
            logger.log(LogEvent::FrameDecode(describe_outcome(0, &DecodeOutcome::NotFound)))?;
        }
        DecodeOutcome::Decoded { mut fragments, .. } => {
            let (nfrag, payload_len) = header::extract_header(&fragments);
            if nfrag == 0 {
                println!("Status: none-decoded");
                println!("Number of decoded fragments: 0");
                return Ok(());
            }
            fragments.truncate(nfrag as usize);
            let recovered = fragments.iter().filter(|f| f.is_some()).count();
            let payload = header::reassemble_payload(&fragments, HEADER_LEN, payload_len as usize);

            println!("Payload: <<<{}>>>", String::from_utf8_lossy(&payload));
            println!("Status: {}", decode_status(&fragments));
            println!("Number of decoded fragments: {recovered}");
        }
    }
    Ok(())
}

fn decode_status(fragments: &[Option<Vec<u8>>]) -> &'static str {
    let total = fragments.len();
    let ok = fragments.iter().filter(|f| f.is_some()).count();
    if ok == 0 {
        "none-decoded"
    } else if ok == total {
        "all-decoded"
    } else {
        "partially-decoded"
    }
}

// ---------------------------------------------------------------------
// receiver (standalone decode worker over stdin/stdout)
// ---------------------------------------------------------------------

fn cmd_receiver(
    nsubchannels: usize,
    shape: &str,
    cyclic_prefix: usize,
    verbosity: u8,
    logger: &mut StructuredLogger,
) -> Result<()> {
    let config = SessionConfig {
        nsubchannels,
        shape: parse_resolution(shape).map_err(|e| eyre!("{e}"))?,
        cyclic_prefix,
        ..SessionConfig::default()
    };
    let framer = PassthroughFramer::new(config.shape_with_cp(), config.border);
    let mut receiver = Receiver::new(config, framer, false).map_err(|e| eyre!("{e}"))?;
    let shape_with_cp = receiver.shape_with_cp();
    let frame_bytes = shape_with_cp.0 * shape_with_cp.1;

    let stdin = io::stdin();
    let mut reader = stdin.lock();
    let stdout = io::stdout();
    let mut writer = stdout.lock();

    let mut buf = vec![0u8; frame_bytes];
    let mut frame_index = 0usize;
    loop {
        if !read_exact_or_eof(&mut reader, &mut buf)? {
            break;
        }
        let frame = Array2::from_shape_vec(shape_with_cp, buf.clone())
            .map_err(|e| eyre!("malformed frame buffer: {e}"))?;
        let outcome = receiver.decode(&frame).map_err(|e| eyre!("{e}"))?;

        for fragment in outcome.fragments().iter().flatten() {
            writer.write_all(fragment)?;
        }
        if verbosity > 0 {
            logger.log(LogEvent::FrameDecode(describe_outcome(frame_index, &outcome)))?;
        }
        frame_index += 1;
    }
    writer.flush()?;
    Ok(())
}

// ---------------------------------------------------------------------
// videotx / videorx (ffmpeg subprocess on either side of the codec)
// ---------------------------------------------------------------------

fn cmd_videotx(
    filename: &Path,
    nsubchannels: usize,
    txrate: u32,
    video_fps: u32,
    logger: &mut StructuredLogger,
) -> Result<()> {
    let config = SessionConfig {
        nsubchannels,
        ..SessionConfig::default()
    };
    let per_channel = config.data_bytes_per_subchannel();
    let framer = PassthroughFramer::new(config.shape_with_cp(), config.border);
    let tx = Transmitter::new(config, framer).map_err(|e| eyre!("{e}"))?;

    let txrate_str = txrate.to_string();
    let fps_str = video_fps.to_string();
    let mut child = Command::new("ffmpeg")
        .args([
            "-loglevel",
            "fatal",
            "-framerate",
            &txrate_str,
            "-f",
            "image2pipe",
            "-vcodec",
            "png",
            "-i",
            "-",
            "-pix_fmt",
            "yuv420p",
            "-r",
            &fps_str,
            "-c:v",
            "libx264",
            "-crf",
            "1",
            "-y",
        ])
        .arg(filename)
        .stdin(Stdio::piped())
        .spawn()
        .wrap_err("failed to launch ffmpeg; is it on PATH?")?;

    let mut ffmpeg_stdin = child
        .stdin
        .take()
        .ok_or_else(|| eyre!("ffmpeg stdin unavailable"))?;

    let stdin = io::stdin();
    let mut reader = stdin.lock();
    let chunk_size = nsubchannels * per_channel;
    let mut nframes = 0usize;

    while let Some(chunk) = read_fragment_chunk(&mut reader, chunk_size)? {
        let frame = tx.encode(&chunk).map_err(|e| eyre!("{e}"))?;
        let png = encode_png_bytes(&frame)?;
        ffmpeg_stdin.write_all(&png)?;
        nframes += 1;
    }
    drop(ffmpeg_stdin);

    let status = child.wait()?;
    if !status.success() {
        bail!("ffmpeg exited with {status}");
    }

    logger.log(LogEvent::Info {
        message: format!("encoded {nframes} frames to {}", filename.display()),
    })?;
    Ok(())
}

/// Reads one fragment-sized chunk from `reader`. A short final chunk is
/// cyclically tiled up to `chunk_size`, mirroring the padding a trailing
/// partial payload gets in `simpletxrx`-style fragmenting. Returns `None`
/// once the stream is exhausted before any bytes are read.
fn read_fragment_chunk(reader: &mut impl Read, chunk_size: usize) -> Result<Option<Vec<u8>>> {
    let mut buf = vec![0u8; chunk_size];
    let mut filled = 0;
    while filled < chunk_size {
        let n = reader.read(&mut buf[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    if filled == 0 {
        return Ok(None);
    }
    if filled < chunk_size {
        let source = buf[..filled].to_vec();
        for (i, slot) in buf.iter_mut().enumerate().skip(filled) {
            *slot = source[i % source.len()];
        }
    }
    Ok(Some(buf))
}

fn cmd_videorx(
    filename: &Path,
    nsubchannels: usize,
    nprocesses: usize,
    nframes_per_process: usize,
    logger: &mut StructuredLogger,
) -> Result<()> {
    let config = SessionConfig {
        nsubchannels,
        ..SessionConfig::default()
    };
    let shape_with_cp = config.shape_with_cp();
    let border_pixels = (shape_with_cp.0.min(shape_with_cp.1) as f64 * config.border) as usize;
    let frame_dims = (shape_with_cp.0 + 2 * border_pixels, shape_with_cp.1 + 2 * border_pixels);
    let bytes_per_frame = frame_dims.0 * frame_dims.1;
    let yuv_frame_size = bytes_per_frame * 3 / 2;

    let mut child = Command::new("ffmpeg")
        .args(["-loglevel", "fatal", "-i"])
        .arg(filename)
        .args(["-f", "rawvideo", "-pix_fmt", "yuv420p", "-"])
        .stdout(Stdio::piped())
        .spawn()
        .wrap_err("failed to launch ffmpeg; is it on PATH?")?;

    let mut ffmpeg_stdout = child
        .stdout
        .take()
        .ok_or_else(|| eyre!("ffmpeg stdout unavailable"))?;

    let mut frames = Vec::new();
    let mut yuv_buf = vec![0u8; yuv_frame_size];
    loop {
        if !read_exact_or_eof(&mut ffmpeg_stdout, &mut yuv_buf)? {
            break;
        }
        let y_plane = yuv_buf[..bytes_per_frame].to_vec();
        let frame =
            Array2::from_shape_vec(frame_dims, y_plane).map_err(|e| eyre!("malformed video frame: {e}"))?;
        frames.push(frame);
    }

    let status = child.wait()?;
    if !status.success() {
        bail!("ffmpeg exited with {status}");
    }
    logger.log(LogEvent::Info {
        message: format!("decoded {} frames from {}", frames.len(), filename.display()),
    })?;

    let pool_config = WorkerPoolConfig {
        nworkers: nprocesses,
        nframes_per_worker: nframes_per_process,
    };
    let cfg_for_workers = config.clone();
    let pool = WorkerPool::new(&pool_config, move || {
        let framer = PassthroughFramer::new(cfg_for_workers.shape_with_cp(), cfg_for_workers.border);
        Receiver::new(cfg_for_workers.clone(), framer, false).expect("videorx receiver config is valid")
    });

    let stdout = io::stdout();
    let mut writer = stdout.lock();
    let mut telemetry = TelemetryAggregator::new(1.0);
    let mut frame_index = 0usize;
    let mut io_err: Option<io::Error> = None;

    let dispatch_result = pool.decode_many(frames, |results| {
        for result in results {
            match result {
                Ok(outcome) => {
                    for fragment in outcome.fragments().iter().flatten() {
                        if let Err(e) = writer.write_all(fragment) {
                            io_err.get_or_insert(e);
                        }
                    }
                    telemetry.record(&outcome);
                    let _ = logger.log(LogEvent::FrameDecode(describe_outcome(frame_index, &outcome)));
                }
                Err(err) => {
                    let _ = logger.log(LogEvent::Error {
                        message: "worker decode failed".to_string(),
                        details: Some(err.to_string()),
                    });
                }
            }
            frame_index += 1;
        }
    });
    pool.shutdown();
    dispatch_result.map_err(|e| eyre!("{e}"))?;
    if let Some(e) = io_err {
        return Err(e.into());
    }

    writer.flush()?;
    logger.log(LogEvent::Statistics(telemetry.statistics()))?;
    Ok(())
}

// ---------------------------------------------------------------------
// multirate
// ---------------------------------------------------------------------

fn cmd_multirate(infile: &Path, nsubchannels: usize, update_every: &str, logger: &mut StructuredLogger) -> Result<()> {
    let rates = parse_update_every(update_every, nsubchannels)?;

    let mut reader =
        std::fs::File::open(infile).wrap_err_with(|| format!("failed to open {}", infile.display()))?;
    let stdout = io::stdout();
    let mut writer = stdout.lock();

    let mut fragments = vec![vec![0u8; DEFAULT_FRAGMENT_SIZE]; nsubchannels];
    let mut frame_no = 0usize;
    let mut nframes = 0usize;

    loop {
        let mut done = false;
        for (i, rate) in rates.iter().enumerate() {
            if frame_no == 0 || frame_no % rate == 0 {
                let mut buf = vec![0u8; DEFAULT_FRAGMENT_SIZE];
                if !read_full_or_none(&mut reader, &mut buf)? {
                    done = true;
                    break;
                }
                fragments[i] = buf;
            }
        }
        frame_no += 1;
        for fragment in &fragments {
            writer.write_all(fragment)?;
        }
        nframes += 1;
        if done {
            break;
        }
    }
    writer.flush()?;

    logger.log(LogEvent::Info {
        message: format!("wrote {nframes} multi-rate frames across {nsubchannels} subchannels"),
    })?;
    Ok(())
}

/// Parses `--update-every` as a comma-separated list of positive update
/// cadences. The original tool parses this option with Python's `eval`,
/// which would let a caller run arbitrary code through a CLI flag; this
/// port deliberately narrows it to the one shape the tool actually needs.
fn parse_update_every(raw: &str, nsubchannels: usize) -> Result<Vec<usize>> {
    let rates: Vec<usize> = raw
        .split(',')
        .map(|s| {
            s.trim()
                .parse::<usize>()
                .map_err(|_| eyre!("invalid --update-every entry {s:?}"))
        })
        .collect::<Result<_>>()?;
    if rates.len() != nsubchannels {
        bail!("--update-every must list exactly {nsubchannels} rates, got {}", rates.len());
    }
    if rates.iter().any(|&r| r == 0) {
        bail!("--update-every rates must be positive");
    }
    Ok(rates)
}

// ---------------------------------------------------------------------
// benchmark
// ---------------------------------------------------------------------

fn cmd_benchmark(target: BenchmarkTarget, logger: &mut StructuredLogger) -> Result<()> {
    match target {
        BenchmarkTarget::Fft => benchmark_fft(logger),
        BenchmarkTarget::Receiver => benchmark_receiver(logger),
        BenchmarkTarget::Multiprocreceiver => benchmark_multiprocreceiver(logger),
    }
}

fn benchmark_fft(logger: &mut StructuredLogger) -> Result<()> {
    use focus_core::fft::{irfft2, rfft2};

    let shape = (512, 512);
    let frame = Array2::<f32>::from_shape_fn(shape, |(i, j)| ((i * 7 + j * 3) % 251) as f32);

    let iterations = 10u64;
    let bar = indicatif::ProgressBar::new(iterations);
    let start = std::time::Instant::now();
    for _ in 0..iterations {
        let spectrum = rfft2(&frame);
        let _ = irfft2(&spectrum, shape.1);
        bar.inc(1);
    }
    bar.finish_and_clear();
    let elapsed = start.elapsed().as_secs_f64();

    logger.log(LogEvent::Info {
        message: format!(
            "fft benchmark: {iterations} round trips at {shape:?} in {elapsed:.3}s ({:.2} ms/iter)",
            elapsed * 1000.0 / iterations as f64
        ),
    })?;
    Ok(())
}

fn benchmark_receiver(logger: &mut StructuredLogger) -> Result<()> {
    let config = SessionConfig {
        nsubchannels: 16,
        ..SessionConfig::default()
    };
    let per_channel = config.data_bytes_per_subchannel();
    let data = vec![0xABu8; config.nsubchannels * per_channel];

    let tx_framer = PassthroughFramer::new(config.shape_with_cp(), config.border);
    let tx = Transmitter::new(config.clone(), tx_framer).map_err(|e| eyre!("{e}"))?;
    let frame = tx.encode(&data).map_err(|e| eyre!("{e}"))?;

    let rx_framer = PassthroughFramer::new(config.shape_with_cp(), config.border);
    let mut receiver = Receiver::new(config, rx_framer, false).map_err(|e| eyre!("{e}"))?;

    let iterations = 10u64;
    let bar = indicatif::ProgressBar::new(iterations);
    let start = std::time::Instant::now();
    for _ in 0..iterations {
        receiver.decode(&frame).map_err(|e| eyre!("{e}"))?;
        bar.inc(1);
    }
    bar.finish_and_clear();
    let elapsed = start.elapsed().as_secs_f64();

    logger.log(LogEvent::Info {
        message: format!(
            "receiver benchmark: {iterations} decodes in {elapsed:.3}s ({:.2} ms/iter)",
            elapsed * 1000.0 / iterations as f64
        ),
    })?;
    Ok(())
}

fn benchmark_multiprocreceiver(logger: &mut StructuredLogger) -> Result<()> {
    let config = SessionConfig {
        nsubchannels: 16,
        ..SessionConfig::default()
    };
    let per_channel = config.data_bytes_per_subchannel();
    let data = vec![0xCDu8; config.nsubchannels * per_channel];

    let tx_framer = PassthroughFramer::new(config.shape_with_cp(), config.border);
    let tx = Transmitter::new(config.clone(), tx_framer).map_err(|e| eyre!("{e}"))?;
    let frame = tx.encode(&data).map_err(|e| eyre!("{e}"))?;

    let nframes = 200u64;
    let frames: Vec<Array2<u8>> = (0..nframes).map(|_| frame.clone()).collect();

    let pool_config = WorkerPoolConfig::default();
    let nworkers = pool_config.nworkers;
    let cfg = config.clone();
    let pool = WorkerPool::new(&pool_config, move || {
        let framer = PassthroughFramer::new(cfg.shape_with_cp(), cfg.border);
        Receiver::new(cfg.clone(), framer, false).expect("benchmark receiver config is valid")
    });

    let bar = indicatif::ProgressBar::new(nframes);
    let start = std::time::Instant::now();
    pool.decode_many(frames, |results| bar.inc(results.len() as u64))
        .map_err(|e| eyre!("{e}"))?;
    pool.shutdown();
    bar.finish_and_clear();
    let elapsed = start.elapsed().as_secs_f64();

    logger.log(LogEvent::Info {
        message: format!("multiprocreceiver benchmark: {nframes} frames across {nworkers} workers in {elapsed:.3}s"),
    })?;
    Ok(())
}

// ---------------------------------------------------------------------
// test
// ---------------------------------------------------------------------

fn cmd_test(logger: &mut StructuredLogger) -> Result<()> {
    let checks: [(&str, fn() -> bool); 5] = [
        ("mask_is_self_inverse", check_mask_self_inverse),
        ("qpsk_round_trip", check_qpsk_round_trip),
        ("header_round_trip", check_header_round_trip),
        ("cyclic_prefix_round_trip", check_cyclic_prefix_round_trip),
        ("tx_rx_round_trip", check_tx_rx_round_trip),
    ];

    let mut passed = 0;
    for (name, check) in &checks {
        let ok = check();
        logger.log(LogEvent::Info {
            message: format!("{name}: {}", if ok { "ok" } else { "FAILED" }),
        })?;
        if ok {
            passed += 1;
        }
    }

    println!("Succeeded: {passed}/{}", checks.len());
    if passed != checks.len() {
        std::process::exit(1);
    }
    Ok(())
}

fn check_mask_self_inverse() -> bool {
    let original = vec![1u8, 2, 3, 4, 5, 250, 255, 0];
    let mut data = original.clone();
    focus_core::link::mask_fragment(&mut data, 3);
    focus_core::link::mask_fragment(&mut data, 3);
    data == original
}

fn check_qpsk_round_trip() -> bool {
    let qpsk = focus_core::modulation::Qpsk::new();
    let data: Vec<u8> = (0..=255u8).collect();
    let symbols = qpsk.modulate(&data, true);
    qpsk.demodulate(&symbols).map(|d| d == data).unwrap_or(false)
}

fn check_header_round_trip() -> bool {
    header::pack_header(3, 260) == [0x00, 0x03, 0x01, 0x04]
}

fn check_cyclic_prefix_round_trip() -> bool {
    let img = Array2::<u8>::from_shape_fn((64, 64), |(i, j)| ((i * 13 + j * 7) % 256) as u8);
    let with_cp = focus_core::physical::add_cyclic_prefix(&img, 8);
    let stripped = focus_core::physical::strip_cyclic_prefix(&with_cp, 8);
    stripped == img
}

fn check_tx_rx_round_trip() -> bool {
    let config = SessionConfig {
        nsubchannels: 4,
        nelements_per_subchannel: 64,
        parity_len: 4,
        shape: (64, 64),
        border: 0.1,
        cyclic_prefix: 4,
    };
    let per_channel = config.data_bytes_per_subchannel();
    let data = vec![0x42u8; config.nsubchannels * per_channel];

    let tx_framer = PassthroughFramer::new(config.shape_with_cp(), config.border);
    let Ok(tx) = Transmitter::new(config.clone(), tx_framer) else {
        return false;
    };
    let Ok(frame) = tx.encode(&data) else {
        return false;
    };

    let rx_framer = PassthroughFramer::new(config.shape_with_cp(), config.border);
    let Ok(mut receiver) = Receiver::new(config, rx_framer, false) else {
        return false;
    };
    let Ok(outcome) = receiver.decode(&frame) else {
        return false;
    };

    match outcome {
        DecodeOutcome::Decoded { fragments, .. } => fragments.iter().all(|f| f.is_some()),
        DecodeOutcome::NotFound => false,
    }
}

// ---------------------------------------------------------------------
// fft_init
// ---------------------------------------------------------------------

fn cmd_fft_init(logger: &mut StructuredLogger) -> Result<()> {
    let path = focus_core::fft::wisdom_filename();
    if path.exists() {
        std::fs::remove_file(&path)?;
    }
    let shapes = [(512, 512), (768, 768), (1024, 1024)];
    focus_core::fft::save_wisdom(&shapes)?;

    logger.log(LogEvent::Info {
        message: format!("warmed FFT plans for {} shapes, wrote {}", shapes.len(), path.display()),
    })?;
    Ok(())
}

// ---------------------------------------------------------------------
// shared I/O helpers
// ---------------------------------------------------------------------

fn read_stdin_all() -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    io::stdin().lock().read_to_end(&mut buf)?;
    Ok(buf)
}

/// Fills `buf` completely, returning `false` only on a clean end-of-stream
/// at a frame boundary. A stream that ends partway through a frame is
/// treated as a protocol error rather than silent truncation.
fn read_exact_or_eof(reader: &mut impl Read, buf: &mut [u8]) -> Result<bool> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..])?;
        if n == 0 {
            if filled == 0 {
                return Ok(false);
            }
            bail!("stream ended mid-frame: got {filled} of {} bytes", buf.len());
        }
        filled += n;
    }
    Ok(true)
}

/// Fills `buf` completely, returning `false` on any short read (including
/// zero bytes) rather than erroring. Used by `multirate`, which treats a
/// partial per-channel read as the normal end of its input stream.
fn read_full_or_none(reader: &mut impl Read, buf: &mut [u8]) -> Result<bool> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled == buf.len())
}

fn save_png(path: &Path, frame: &Array2<u8>) -> Result<()> {
    let bytes = encode_png_bytes(frame)?;
    std::fs::write(path, bytes).wrap_err_with(|| format!("failed to write {}", path.display()))
}

fn encode_png_bytes(frame: &Array2<u8>) -> Result<Vec<u8>> {
    let (height, width) = (frame.shape()[0], frame.shape()[1]);
    let raw = frame.as_standard_layout().to_owned().into_raw_vec();
    let img = image::GrayImage::from_raw(width as u32, height as u32, raw)
        .ok_or_else(|| eyre!("frame dimensions do not match its pixel buffer"))?;
    let mut bytes = Vec::new();
    img.write_to(&mut io::Cursor::new(&mut bytes), image::ImageFormat::Png)?;
    Ok(bytes)
}

/// Loads a captured frame and reduces it to grayscale by keeping the
/// green channel, matching a typical Bayer-pattern camera's strongest
/// channel (see `focus_core::receiver::green_channel`).
fn load_frame(path: &Path) -> Result<Array2<u8>> {
    let img = image::open(path)
        .wrap_err_with(|| format!("failed to open {}", path.display()))?
        .into_rgb8();
    let (width, height) = img.dimensions();
    let mut rgb = Array3::<u8>::zeros((height as usize, width as usize, 3));
    for (x, y, pixel) in img.enumerate_pixels() {
        rgb[[y as usize, x as usize, 0]] = pixel[0];
        rgb[[y as usize, x as usize, 1]] = pixel[1];
        rgb[[y as usize, x as usize, 2]] = pixel[2];
    }
    Ok(green_channel(&rgb))
}
