/// Preview: interactive shell for stepping through a walkthrough script.
///
/// Usage: preview --script <path> [--config <path>]
///
/// Commands:
///   begin            leave the entry gate
///   next / back      advance or retreat
///   skip             finish typing the current slide
///   jump <n>         go to the first step of section n
///   wait <ms>        let virtual time pass
///   view             print the current frame
///   fact             draw a fact (on a fact-offering slide)
///   volume <v>       narration volume, 0.0 to 1.0
///   rate <r>         narration playback rate
///   pause on|off     global narration pause
///   help             list commands
///   quit             exit

use std::io::{self, BufRead, Write};

use walkthrough_engine::core::audio::{KeystrokeCounter, SimulatedTrack};
use walkthrough_engine::core::player::{Outcome, Presentation, PresentationEvent, SlideView};
use walkthrough_engine::core::scheduler::Clock;

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        print_usage();
        return;
    }

    let mut script_path = None;
    let mut config_path = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--script" if i + 1 < args.len() => {
                i += 1;
                script_path = Some(args[i].clone());
            }
            "--config" if i + 1 < args.len() => {
                i += 1;
                config_path = Some(args[i].clone());
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let Some(script_path) = script_path else {
        eprintln!("ERROR: --script is required");
        print_usage();
        std::process::exit(1);
    };

    let clock = Clock::new();
    let track = SimulatedTrack::new(clock.clone());
    let keys = KeystrokeCounter::new();

    let mut builder = Presentation::builder()
        .script_path(&script_path)
        .clock(clock)
        .narration(track.clone())
        .keystroke(keys.clone());
    if let Some(ref path) = config_path {
        builder = builder.config_path(path);
    }

    let mut presentation = match builder.build() {
        Ok(p) => p,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            std::process::exit(1);
        }
    };

    println!(
        "Loaded {} slides in {} sections",
        presentation.script().len(),
        presentation.script().last_section()
    );
    println!("Type 'help' for commands.\n");
    print_events(&mut presentation);
    print_view(&presentation.view());

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("preview> ");
        stdout.flush().ok();

        let mut line = String::new();
        if stdin.lock().read_line(&mut line).is_err() || line.is_empty() {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        let cmd = parts[0].to_lowercase();

        let result = match cmd.as_str() {
            "quit" | "exit" | "q" => {
                println!("Goodbye.");
                break;
            }
            "help" | "h" | "?" => {
                print_help();
                continue;
            }
            "begin" => presentation.begin(),
            "next" | "n" => presentation.advance(),
            "back" | "b" => presentation.retreat(),
            "skip" | "s" => presentation.skip_to_end(),
            "jump" | "j" => {
                let Some(n) = parts.get(1).and_then(|s| s.parse::<u32>().ok()) else {
                    println!("Usage: jump <section>");
                    continue;
                };
                presentation.jump_to_section(n)
            }
            "wait" | "w" => {
                let Some(ms) = parts.get(1).and_then(|s| s.parse::<u64>().ok()) else {
                    println!("Usage: wait <ms>");
                    continue;
                };
                presentation.advance_time(ms).map(|_| Outcome::NoOp)
            }
            "view" | "v" => {
                print_view(&presentation.view());
                continue;
            }
            "fact" | "f" => {
                match presentation.next_fact() {
                    Some(fact) => println!("Fact: {}", fact),
                    None => println!("No fact on offer here."),
                }
                continue;
            }
            "volume" => {
                match parts.get(1).and_then(|s| s.parse::<f32>().ok()) {
                    Some(v) => {
                        presentation.set_volume(v);
                        println!("Narration volume: {:.2}", track.volume());
                    }
                    None => println!("Usage: volume <0.0-1.0>"),
                }
                continue;
            }
            "rate" => {
                match parts.get(1).and_then(|s| s.parse::<f32>().ok()) {
                    Some(r) => {
                        presentation.set_playback_rate(r);
                        println!("Playback rate: {:.2}", track.rate());
                    }
                    None => println!("Usage: rate <r>"),
                }
                continue;
            }
            "pause" => {
                match parts.get(1).copied() {
                    Some("on") => presentation.set_audio_paused(true),
                    Some("off") => presentation.set_audio_paused(false),
                    _ => {
                        println!("Usage: pause on|off");
                        continue;
                    }
                }
                print_events(&mut presentation);
                continue;
            }
            _ => {
                println!("Unknown command: '{}'. Type 'help' for available commands.", cmd);
                continue;
            }
        };

        match result {
            Ok(Outcome::Moved { from, to }) => match from {
                Some(from) => println!("Moved {} -> {}", from, to),
                None => println!("Started at {}", to),
            },
            Ok(Outcome::Skipped) => println!("Typing skipped."),
            Ok(Outcome::NoOp) => {}
            Err(e) => println!("ERROR: {}", e),
        }
        print_events(&mut presentation);
        print_view(&presentation.view());
        println!(
            "[t={}ms keystrokes={} next timer={}]",
            presentation.now_ms(),
            keys.count(),
            presentation
                .next_deadline()
                .map_or_else(|| "none".to_string(), |t| format!("{}ms", t))
        );
    }
}

fn print_usage() {
    println!("Preview: interactive shell for stepping through a walkthrough script.");
    println!();
    println!("Usage: preview --script <path> [--config <path>]");
    println!();
    println!("  --script <path>  Path to a script RON file");
    println!("  --config <path>  Path to a player config RON file (optional)");
}

fn print_help() {
    println!("Commands:");
    println!("  begin          Leave the entry gate");
    println!("  next | back    Advance or retreat");
    println!("  skip           Finish typing the current slide");
    println!("  jump <n>       Go to the first step of section n");
    println!("  wait <ms>      Let virtual time pass");
    println!("  view           Print the current frame");
    println!("  fact           Draw a fact (on a fact-offering slide)");
    println!("  volume <v>     Narration volume, 0.0 to 1.0");
    println!("  rate <r>       Narration playback rate");
    println!("  pause on|off   Global narration pause");
    println!("  help           Show this help");
    println!("  quit           Exit");
}

fn print_events(presentation: &mut Presentation) {
    for event in presentation.drain_events() {
        match event {
            // One line per character is too chatty for the shell.
            PresentationEvent::Revealed { .. } => {}
            other => println!("[Event] {:?}", other),
        }
    }
}

fn print_view(view: &SlideView) {
    let Some(at) = view.coordinate else {
        println!("\n(pre-start: type 'begin')\n");
        return;
    };
    println!();
    println!(
        "--- {} [{}/{}] {} ---",
        at,
        view.progress.section,
        view.progress.total_sections,
        view.section_title.as_deref().unwrap_or("")
    );
    let cursor = if view.cursor_visible { "|" } else { " " };
    println!("{}{}", view.text, cursor);
    println!(
        "({}/{} chars, {:?}{})",
        view.revealed,
        view.total,
        view.phase,
        if view.audio_playing { ", narrating" } else { "" }
    );
    if let Some(ref media) = view.media {
        let state = if view.media_visible { "shown" } else { "hidden" };
        println!("Media: {} ({})", media.path, state);
    }
    if let Some(ref link) = view.link {
        println!("Link: {} {}", link.label.as_deref().unwrap_or(""), link.url);
    }
    if let Some(ref cta) = view.cta {
        for link in &cta.links {
            println!("CTA: {} {}", link.label.as_deref().unwrap_or(""), link.url);
        }
    }
    if let Some(ref fact) = view.fact {
        println!("Fact: {}", fact);
    }
    let back = if view.back_disabled { "-" } else { "<" };
    let forward = if view.forward_disabled { "-" } else { ">" };
    println!("[{} {}]\n", back, forward);
}
