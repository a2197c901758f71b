// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::error::Error;
use std::path::{Path, PathBuf};
use std::thread;

use clap::{crate_version, Parser, Subcommand};
use keybed::audio::{self, Output};
use keybed::config::PianoConfig;
use keybed::demo::{sweep_from_config, sweep_source};
use keybed::events::TimedEvent;
use keybed::midi::{midi_source, MidiSequence, NoteMapping};
use keybed::piano::Piano;
use keybed::program::ProgramStore;
use keybed::transport::LineSource;
use keybed::util::duration_minutes_seconds;

const SYSTEMD_SERVICE: &str = r#"
[Unit]
Description=keybed sample piano

[Service]
Type=simple
Restart=on-failure
EnvironmentFile=-/etc/default/keybed
ExecStart=/usr/local/bin/keybed play "$KEYBED_CONFIG"

[Install]
WantedBy=multi-user.target
Alias=keybed.service
"#;

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "A polyphonic sample piano."
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lists the available audio output devices.
    Devices {},
    /// Plays the keyboard attached to the configured port.
    Play {
        /// The path to the piano config.
        config_path: String,
        /// Overrides the configured port. `-` reads stdin.
        #[arg(short, long)]
        port: Option<String>,
    },
    /// Plays a standard MIDI file through the piano.
    Midi {
        /// The path to the piano config.
        config_path: String,
        /// The MIDI file to play.
        midi_file: String,
    },
    /// Strikes every key in turn.
    Demo {
        /// The path to the piano config.
        config_path: String,
    },
    /// Renders the demo sweep or a MIDI file to a WAV file instead of a device.
    Render {
        /// The path to the piano config.
        config_path: String,
        /// The WAV file to write.
        output: String,
        /// Renders this MIDI file instead of the demo sweep.
        #[arg(short, long)]
        midi_file: Option<String>,
    },
    /// Shows or sets the program the piano starts with.
    Program {
        /// The path to the piano config.
        config_path: String,
        /// The program to select.
        program: Option<u8>,
    },
    /// Prints a systemd service definition to stdout.
    Systemd {},
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Devices {} => {
            let devices = audio::list_devices()?;

            if devices.is_empty() {
                println!("No devices found.");
                return Ok(());
            }

            println!("Devices:");
            for device in devices {
                println!("- {}", device);
            }
        }
        Commands::Play { config_path, port } => {
            let config = PianoConfig::deserialize(Path::new(&config_path))?;
            let (mut piano, renderer) = Piano::build(&config)?;
            let _output = Output::start(config.audio(), renderer)?;
            piano.ready()?;

            let port = port.as_deref().unwrap_or(config.transport().port());
            let mut source = LineSource::open(
                port,
                piano.keymap().clone(),
                config.transport().receive_timeout()?,
            )?;
            piano.run(&mut source);
            thread::sleep(piano.release_tail());
        }
        Commands::Midi {
            config_path,
            midi_file,
        } => {
            let config = PianoConfig::deserialize(Path::new(&config_path))?;
            let (mut piano, renderer) = Piano::build(&config)?;
            let mapping = NoteMapping::from_config(config.midi(), piano.note_count());
            let sequence = MidiSequence::from_file(&PathBuf::from(&midi_file), mapping)?;
            println!(
                "Playing {} ({})",
                midi_file,
                duration_minutes_seconds(sequence.duration())
            );

            let _output = Output::start(config.audio(), renderer)?;
            piano.run(&mut midi_source(sequence));
            thread::sleep(piano.release_tail());
        }
        Commands::Demo { config_path } => {
            let config = PianoConfig::deserialize(Path::new(&config_path))?;
            let (mut piano, renderer) = Piano::build(&config)?;
            let mut source = sweep_source(config.demo(), piano.note_count())?;

            let _output = Output::start(config.audio(), renderer)?;
            piano.ready()?;
            piano.run(&mut source);
            thread::sleep(piano.release_tail());
        }
        Commands::Render {
            config_path,
            output,
            midi_file,
        } => {
            let config = PianoConfig::deserialize(Path::new(&config_path))?;
            let (mut piano, mut renderer) = Piano::build(&config)?;
            let schedule: Vec<TimedEvent> = match midi_file {
                Some(midi_file) => {
                    let mapping = NoteMapping::from_config(config.midi(), piano.note_count());
                    MidiSequence::from_file(&PathBuf::from(midi_file), mapping)?.into_events()
                }
                None => sweep_from_config(config.demo(), piano.note_count())?,
            };

            let sample_rate = piano.sample_rate();
            let tail = piano.release_tail();
            let stats = audio::render_to_wav(
                &PathBuf::from(&output),
                &mut renderer,
                piano.dispatcher_mut(),
                &schedule,
                sample_rate,
                config.audio().channels(),
                tail,
            )?;
            println!(
                "Wrote {} frames ({} events, {} dropped) to {}",
                stats.frames, stats.events, stats.dropped, output
            );
        }
        Commands::Program {
            config_path,
            program,
        } => {
            let config = PianoConfig::deserialize(Path::new(&config_path))?;
            let samples = config.samples();
            let Some(program_file) = samples.program_file() else {
                return Err("no program file is configured".into());
            };
            let store = ProgramStore::new(Some(config.resolve(program_file)));

            match program {
                Some(program) => {
                    if usize::from(program) >= samples.programs().len() {
                        return Err(format!(
                            "program {} does not exist ({} configured)",
                            program,
                            samples.programs().len()
                        )
                        .into());
                    }
                    store.save(program)?;
                    println!("Selected program {}", program);
                }
                None => {
                    let program = store.load();
                    let dir = samples
                        .programs()
                        .get(usize::from(program))
                        .map(String::as_str)
                        .unwrap_or("none");
                    println!("Program {} ({})", program, dir);
                }
            }
        }
        Commands::Systemd {} => {
            println!("{}", SYSTEMD_SERVICE);
        }
    };

    Ok(())
}
