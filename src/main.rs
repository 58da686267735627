use std::env;
use std::fs;
use std::process;

use tracing_subscriber::EnvFilter;

const USAGE: &str = "Usage: pianodj <input.mid> [output.json]
       pianodj --melody-prompt <input.mid> [bpm] [instrument]

bpm defaults to the tempo declared in the file.";

fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pianodj=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_midi(input_path: &str) -> pianodj::ImportedMidi {
    let bytes = match fs::read(input_path) {
        Ok(content) => content,
        Err(e) => {
            eprintln!("Error reading file '{}': {}", input_path, e);
            process::exit(1);
        }
    };

    match pianodj::import_midi_by_program(&bytes) {
        Ok(imported) => imported,
        Err(e) => {
            eprintln!("Import error: {}", e);
            process::exit(1);
        }
    }
}

fn main() {
    init_logging();
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("{}", USAGE);
        process::exit(1);
    }

    if args[1] == "--melody-prompt" {
        if args.len() < 3 {
            eprintln!("{}", USAGE);
            process::exit(1);
        }
        let imported = read_midi(&args[2]);
        let bpm = match args.get(3).map(|s| s.parse::<u32>()) {
            None => imported.tempo_bpm,
            Some(Ok(bpm)) => bpm,
            Some(Err(_)) => {
                eprintln!("Invalid BPM '{}'", args[3]);
                process::exit(1);
            }
        };
        let instrument = args.get(4).map(String::as_str).unwrap_or("piano");

        match pianodj::melody_prompt(&imported.notes, bpm, instrument) {
            Some(prompt) => println!("{}", prompt),
            None => {
                eprintln!("No notes found in '{}'", args[2]);
                process::exit(1);
            }
        }
        return;
    }

    let input_path = &args[1];
    let output_path: Option<&String> = args.get(2);
    let notes = read_midi(input_path).notes;

    let json = match serde_json::to_string_pretty(&notes) {
        Ok(json) => json,
        Err(e) => {
            eprintln!("Serialization error: {}", e);
            process::exit(1);
        }
    };

    match output_path {
        Some(path) => {
            if let Err(e) = fs::write(path, &json) {
                eprintln!("Error writing to '{}': {}", path, e);
                process::exit(1);
            }
            eprintln!("Wrote {} note events to {}", notes.len(), path);
        }
        None => {
            println!("{}", json);
        }
    }
}
