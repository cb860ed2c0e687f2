/// Play - terminal front end for a scenario, with file-backed saves.
///
/// Usage: play <scenario.json> [--saves <dir>] [--config <file>] [--gallery <file>]
///
/// Commands:
///   <enter>, n        - advance the current scene
///   1..9              - pick a choice
///   save <slot>       - save to a slot
///   load <slot>       - load from a slot
///   delete <slot>     - clear a slot
///   slots             - list save slots
///   vars              - show variables and flags
///   log               - show the transcript
///   title             - return to the title screen
///   help              - list commands
///   quit              - exit

use std::cell::RefCell;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing_subscriber::EnvFilter;
use vn_engine::core::config::SessionConfig;
use vn_engine::core::gallery::{Gallery, GalleryCatalog};
use vn_engine::core::persistence::FileStorage;
use vn_engine::core::session::GameSession;
use vn_engine::schema::node::GameNode;
use vn_engine::schema::scenario::Scenario;

type SharedGallery = Rc<RefCell<Gallery<FileStorage>>>;

fn main() {
    init_tracing();
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        print_usage();
        return;
    }

    let scenario_path = PathBuf::from(&args[1]);
    let mut saves_dir = PathBuf::from("saves");
    let mut config_path = None;
    let mut gallery_path = None;

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--saves" if i + 1 < args.len() => {
                i += 1;
                saves_dir = PathBuf::from(&args[i]);
            }
            "--config" if i + 1 < args.len() => {
                i += 1;
                config_path = Some(PathBuf::from(&args[i]));
            }
            "--gallery" if i + 1 < args.len() => {
                i += 1;
                gallery_path = Some(PathBuf::from(&args[i]));
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let config = match config_path {
        Some(ref path) => match SessionConfig::load_from_ron(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("ERROR: Failed to load config: {}", e);
                std::process::exit(1);
            }
        },
        None => SessionConfig::default(),
    };

    let storage = FileStorage::new(&saves_dir);
    let gallery = gallery_path
        .as_deref()
        .map(|path| open_gallery(path, storage.clone(), &config));

    let mut builder = GameSession::builder()
        .config(config)
        .storage(storage);
    if let Some(ref gallery) = gallery {
        builder = builder.observer(Box::new(gallery.clone()));
    }
    let mut session = match builder.build() {
        Ok(session) => session,
        Err(e) => {
            eprintln!("ERROR: Failed to build session: {}", e);
            std::process::exit(1);
        }
    };

    let scenario = match Scenario::load_from_json(&scenario_path) {
        Ok(scenario) => scenario,
        Err(e) => {
            eprintln!("ERROR: Failed to load scenario: {}", e);
            std::process::exit(1);
        }
    };
    let title = scenario.meta.title.clone();
    if let Err(e) = session.load_scenario(scenario) {
        eprintln!("ERROR: {}", e);
        std::process::exit(1);
    }

    println!("=== {} ===", if title.is_empty() { "Untitled" } else { &title });
    println!("Saves: {}", saves_dir.display());
    println!("Type 'help' for commands.\n");

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        if !session.is_playing() {
            if !title_screen(&mut session, &gallery) {
                break;
            }
            continue;
        }

        print!("> ");
        stdout.flush().ok();

        let mut line = String::new();
        if stdin.lock().read_line(&mut line).is_err() || line.is_empty() {
            break;
        }
        let parts: Vec<&str> = line.split_whitespace().collect();
        let cmd = parts.first().copied().unwrap_or("n").to_lowercase();

        match cmd.as_str() {
            "quit" | "exit" | "q" => break,
            "help" | "h" | "?" => print_help(),
            "n" | "next" => {
                if !session.advance_scene() {
                    println!("(nothing to advance)");
                }
                show_current(&session);
            }
            "save" => match slot_arg(&parts) {
                Some(slot) if session.save_to_slot(slot) => println!("Saved to slot {}.", slot),
                Some(slot) => println!("Could not save to slot {}.", slot),
                None => println!("Usage: save <slot>"),
            },
            "load" => match slot_arg(&parts) {
                Some(slot) if session.load_from_slot(slot) => show_current(&session),
                Some(slot) => println!("Could not load slot {}.", slot),
                None => println!("Usage: load <slot>"),
            },
            "delete" => match slot_arg(&parts) {
                Some(slot) if session.delete_slot(slot) => println!("Slot {} cleared.", slot),
                Some(slot) => println!("Could not clear slot {}.", slot),
                None => println!("Usage: delete <slot>"),
            },
            "slots" => print_slots(&session),
            "vars" => print_vars(&session),
            "log" => {
                for entry in session.log() {
                    print_line(&entry.speaker, &entry.text);
                }
            }
            "title" => session.return_to_title(),
            other => match other.parse::<usize>() {
                Ok(n) if n >= 1 => {
                    if session.select_choice_at(n - 1) {
                        show_current(&session);
                    } else {
                        println!("No choice {} here.", n);
                    }
                }
                _ => println!("Unknown command: {}. Type 'help'.", other),
            },
        }
    }

    println!("Goodbye.");
}

/// Returns `false` when the player quits from the title screen.
fn title_screen(session: &mut GameSession<FileStorage>, gallery: &Option<SharedGallery>) -> bool {
    println!("\n--- Title ---");
    println!("  new        start a new game");
    if session.has_save() {
        println!("  continue   resume the autosave");
    }
    println!("  load <n>   load a slot");
    if let Some(gallery) = gallery {
        let gallery = gallery.borrow();
        let endings = gallery.ending_progress();
        println!(
            "  (gallery {}%, endings {}/{})",
            gallery.progress(),
            endings.unlocked,
            endings.total
        );
    }
    println!("  quit");
    print!("title> ");
    io::stdout().flush().ok();

    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line).is_err() || line.is_empty() {
        return false;
    }
    let parts: Vec<&str> = line.split_whitespace().collect();
    match parts.first().copied().unwrap_or("") {
        "new" => {
            if session.start_new_game() {
                show_current(session);
            } else {
                println!("Could not start the scenario.");
            }
        }
        "continue" => {
            if session.continue_game() {
                show_current(session);
            } else {
                println!("No autosave to continue.");
            }
        }
        "load" => match slot_arg(&parts) {
            Some(slot) if session.load_from_slot(slot) => show_current(session),
            _ => println!("Could not load that slot."),
        },
        "slots" => print_slots(session),
        "quit" | "exit" | "q" => return false,
        _ => {}
    }
    true
}

fn show_current(session: &GameSession<FileStorage>) {
    if let Some(ending) = session.ending() {
        println!("\n*** ENDING {}: {} ***", ending.id, ending.title);
        println!("{}\n", ending.text);
        println!("(type 'title' to return)");
        return;
    }

    let chapter = session.chapter_label();
    match session.current_node() {
        Some(GameNode::Scene(scene)) => {
            if !chapter.is_empty() {
                print!("[{}] ", chapter);
            }
            print_line(&scene.speaker, &scene.text);
        }
        Some(GameNode::Choice(node)) => {
            if let Some(prompt) = &node.prompt {
                println!("{}", prompt);
            }
            for (i, choice) in session.available_choices().iter().enumerate() {
                println!("  {}. {}", i + 1, choice.text);
            }
        }
        Some(other) => println!("(resting on {} node '{}')", other.kind(), other.id()),
        None => println!("(no current node)"),
    }
}

fn print_line(speaker: &str, text: &str) {
    if speaker.is_empty() {
        println!("{}", text);
    } else {
        println!("{}: {}", speaker, text);
    }
}

fn print_slots(session: &GameSession<FileStorage>) {
    for slot in 0..session.saves().slot_count() {
        match session.slot_info(slot) {
            Some(info) => {
                let when = chrono::DateTime::<chrono::Utc>::from_timestamp_millis(info.timestamp)
                    .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|| "?".to_string());
                println!("  [{}] {} {} ({})", slot, when, info.chapter_label, info.node_id);
            }
            None => println!("  [{}] empty", slot),
        }
    }
}

fn print_vars(session: &GameSession<FileStorage>) {
    let Some(state) = session.state() else {
        return;
    };
    for (key, value) in state.variables.iter() {
        println!("  {:<11} {}", key.name(), value);
    }
    let flags = state.flags.keys();
    if !flags.is_empty() {
        println!("  flags: {}", flags.join(", "));
    }
}

fn slot_arg(parts: &[&str]) -> Option<usize> {
    parts.get(1).and_then(|raw| raw.parse().ok())
}

fn open_gallery(path: &Path, storage: FileStorage, config: &SessionConfig) -> SharedGallery {
    let catalog = match GalleryCatalog::load_from_ron(path) {
        Ok(catalog) => catalog,
        Err(e) => {
            eprintln!("ERROR: Failed to load gallery catalogue: {}", e);
            std::process::exit(1);
        }
    };
    Rc::new(RefCell::new(Gallery::open(
        catalog,
        storage,
        config.gallery_key(),
        config.endings_key(),
    )))
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

fn print_usage() {
    println!("Usage: play <scenario.json> [--saves <dir>] [--config <file>] [--gallery <file>]");
}

fn print_help() {
    println!("Commands:");
    println!("  <enter>, n     advance the current scene");
    println!("  1..9           pick a choice");
    println!("  save <slot>    save to a slot");
    println!("  load <slot>    load from a slot");
    println!("  delete <slot>  clear a slot");
    println!("  slots          list save slots");
    println!("  vars           show variables and flags");
    println!("  log            show the transcript");
    println!("  title          return to the title screen");
    println!("  quit           exit");
}
