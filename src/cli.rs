// Command line front end

use std::path::PathBuf;

use crate::analysis::{analyze_file, FileReport};
use crate::config::Config;
use crate::theory::pitch::parse_pitch_class;
use crate::theory::{find_chords, scales_containing, ChordCatalog, PitchClassSet, TheoryError};

pub const USAGE: &str = "\
Usage: chordscope [--config <path>] <command>

Commands:
  chords <note>...         Chords and scales in a set of notes (names like C, F#, Bb or MIDI numbers)
  key <w0> ... <w11>       Key of a 12-bin pitch-class histogram, C first
  file <path.mid> [--json] Chords and keys per bar of a MIDI file
  live                     Follow a MIDI input port (needs the 'live' feature)
";

/// Scales listed for a note set
const MAX_SCALES_SHOWN: usize = 12;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Chords(Vec<String>),
    Key(Vec<String>),
    File { path: PathBuf, json: bool },
    Live,
    Help,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub config_path: Option<PathBuf>,
    pub command: Command,
}

pub fn parse_args(args: &[String]) -> anyhow::Result<Invocation> {
    let mut config_path = None;
    let mut rest: Vec<String> = Vec::new();

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => {
                let path = iter
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--config needs a path"))?;
                config_path = Some(PathBuf::from(path));
            }
            "-h" | "--help" => {
                return Ok(Invocation {
                    config_path,
                    command: Command::Help,
                })
            }
            _ => rest.push(arg.clone()),
        }
    }

    let Some((name, operands)) = rest.split_first() else {
        return Ok(Invocation {
            config_path,
            command: Command::Help,
        });
    };

    let command = match name.as_str() {
        "chords" if !operands.is_empty() => Command::Chords(operands.to_vec()),
        "key" if operands.len() == 12 => Command::Key(operands.to_vec()),
        "key" => anyhow::bail!("key needs exactly 12 weights, got {}", operands.len()),
        "file" => {
            let json = operands.iter().any(|o| o == "--json");
            let path = operands
                .iter()
                .find(|o| !o.starts_with("--"))
                .ok_or_else(|| anyhow::anyhow!("file needs a path"))?;
            Command::File {
                path: PathBuf::from(path),
                json,
            }
        }
        "live" => Command::Live,
        "help" => Command::Help,
        other => anyhow::bail!("Unknown command '{}'\n\n{}", other, USAGE),
    };

    Ok(Invocation {
        config_path,
        command,
    })
}

pub fn execute(command: Command, config: &Config) -> anyhow::Result<()> {
    match command {
        Command::Chords(notes) => print_chords(&notes, config),
        Command::Key(weights) => print_key(&weights, config),
        Command::File { path, json } => {
            let report = analyze_file(&path, config)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", render_report(&report));
            }
            Ok(())
        }
        Command::Live => run_live(config),
        Command::Help => {
            print!("{}", USAGE);
            Ok(())
        }
    }
}

/// Mask of a list of note names or MIDI numbers.
pub fn parse_notes(notes: &[String]) -> anyhow::Result<PitchClassSet> {
    notes.iter().try_fold(PitchClassSet::EMPTY, |mask, note| {
        parse_pitch_class(note)
            .map(|pc| mask.with(pc))
            .ok_or_else(|| anyhow::anyhow!("Not a note: '{}'", note))
    })
}

/// Twelve non-negative weights, C first.
pub fn parse_histogram(weights: &[String]) -> anyhow::Result<[f64; 12]> {
    if weights.len() != 12 {
        anyhow::bail!("Expected 12 weights, got {}", weights.len());
    }
    let mut histogram = [0.0; 12];
    for (bin, text) in histogram.iter_mut().zip(weights) {
        *bin = text
            .parse()
            .map_err(|e| anyhow::anyhow!("Bad weight '{}': {}", text, e))?;
    }
    Ok(histogram)
}

fn print_chords(notes: &[String], config: &Config) -> anyhow::Result<()> {
    let mask = parse_notes(notes)?;
    println!("Notes: {} ({:#05x})", mask, mask.bits());

    let chords = find_chords(mask, config.analysis.root_hint, &ChordCatalog::standard())?;
    if chords.is_empty() {
        println!("No chords");
    }
    for chord in &chords {
        println!("  {}  intervals {:?}", chord, chord.intervals);
    }

    let scales = scales_containing(mask, &ChordCatalog::scales());
    if !scales.is_empty() {
        println!("Scales containing these notes ({}):", scales.len());
        for scale in scales.iter().take(MAX_SCALES_SHOWN) {
            println!("  {} {}", scale.root, scale.name);
        }
    }
    Ok(())
}

fn print_key(weights: &[String], config: &Config) -> anyhow::Result<()> {
    let histogram = parse_histogram(weights)?;
    let correlator = config.key.correlator();

    let scores = match correlator.scores(&histogram) {
        Ok(scores) => scores,
        Err(TheoryError::DegenerateHistogram) => {
            println!("No key: the histogram has no variance");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    let best = scores.best();
    println!(
        "Key: {} (score {:.3}, clarity {:.3}, {} profiles)",
        best,
        best.score,
        scores.clarity(),
        config.key.profile.label()
    );
    for candidate in scores.top(5) {
        println!("  {:<10} {:>8.3}", candidate.to_string(), candidate.score);
    }
    Ok(())
}

/// Plain text rendering of a file report
pub fn render_report(report: &FileReport) -> String {
    let mut out = String::new();
    let key_name = |key: &Option<crate::analysis::KeyReport>| {
        key.as_ref()
            .map(|k| k.name.clone())
            .unwrap_or_else(|| "-".to_string())
    };

    out.push_str(&format!(
        "Duration {:.1}s, key {}\n",
        report.duration_seconds,
        key_name(&report.overall_key)
    ));

    for track in &report.tracks {
        if track.info.note_count == 0 {
            continue;
        }
        out.push_str(&format!(
            "  Track {:2}: {:?} ({} notes) {:?} key {}\n",
            track.info.index,
            track.info.name,
            track.info.note_count,
            track.info.onset_histogram,
            key_name(&track.key)
        ));
    }

    for segment in &report.segments {
        let chords: Vec<String> = segment.chords.iter().map(|c| c.to_string()).collect();
        out.push_str(&format!(
            "{:4} {:7.2}s  {:<12} {}\n",
            segment.index + 1,
            segment.start_seconds,
            key_name(&segment.key),
            if chords.is_empty() {
                "-".to_string()
            } else {
                chords.join(", ")
            }
        ));
    }
    out
}

#[cfg(feature = "live")]
fn run_live(config: &Config) -> anyhow::Result<()> {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use crate::tracking::midi_input::{list_input_ports, LiveMidiInput};
    use crate::tracking::{HarmonyMonitor, SharedNoteState};

    for (index, name) in list_input_ports()?.iter().enumerate() {
        println!("  [{}] {}", index, name);
    }

    let state = SharedNoteState::new();
    let mut input = LiveMidiInput::connect(
        state.clone(),
        config.live.port_name.as_deref(),
        config.live.port_index,
    )?;
    println!("Listening on '{}', press Enter to stop", input.port_name());

    let mut monitor = HarmonyMonitor::new(
        state,
        ChordCatalog::standard(),
        config.key.correlator(),
        &config.live,
        config.analysis.root_hint,
    )?;

    let stop = Arc::new(AtomicBool::new(false));
    let stop_on_enter = stop.clone();
    std::thread::Builder::new()
        .name("chordscope-stdin".into())
        .spawn(move || {
            let mut line = String::new();
            let _ = std::io::stdin().read_line(&mut line);
            stop_on_enter.store(true, Ordering::SeqCst);
        })?;

    monitor.run(&stop, |change| {
        let chords: Vec<String> = change.chords.iter().map(|c| c.to_string()).collect();
        let key = change
            .key
            .map(|k| k.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{}  {:<24} key {:<10} {}",
            change.at.format("%H:%M:%S%.3f"),
            change.mask.to_string(),
            key,
            chords.join(", ")
        );
    });

    input.close();
    for (at, key) in monitor.history().entries() {
        println!("{}  {}", at.to_rfc3339(), key);
    }
    Ok(())
}

#[cfg(not(feature = "live"))]
fn run_live(_config: &Config) -> anyhow::Result<()> {
    anyhow::bail!("chordscope was built without the 'live' feature")
}
