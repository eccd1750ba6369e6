/// Walkthrough example: plays the shipped script on a simulated clock.
///
/// A visitor passes the entry gate, lets the intro type itself out (with
/// narration windows), skips through the work history, jumps to the
/// closing section and asks for a couple of facts.
///
/// Run with: cargo run --example walkthrough

use walkthrough_engine::core::audio::{KeystrokeCounter, SimulatedTrack};
use walkthrough_engine::core::player::{Presentation, PresentationEvent};
use walkthrough_engine::core::scheduler::Clock;
use walkthrough_engine::core::typing::Phase;

fn main() {
    env_logger::init();

    let clock = Clock::new();
    let track = SimulatedTrack::new(clock.clone());
    let keys = KeystrokeCounter::new();

    let mut presentation = Presentation::builder()
        .script_path("script_data/walkthrough/script.ron")
        .config_path("script_data/walkthrough/config.ron")
        .clock(clock)
        .narration(track.clone())
        .keystroke(keys.clone())
        .build()
        .expect("Failed to build presentation");

    println!("=== Walkthrough ===\n");

    // --- Entry gate ---
    presentation.begin().expect("Failed to begin");

    // --- Let section 1 play by itself ---
    while presentation.current().map(|c| c.section) == Some(1) {
        let Some(deadline) = presentation.next_deadline() else {
            break;
        };
        presentation.run_until(deadline).expect("Timer failed");
        print_completed(&mut presentation);
    }

    // --- Click through section 2, skipping the typing ---
    println!("\n--- Clicking through ---\n");
    while presentation.current().map(|c| c.section) == Some(2) {
        presentation.click().expect("Click failed");
        print_completed(&mut presentation);
    }

    // --- Jump to the closing section ---
    println!("\n--- Jumping to section 5 ---\n");
    presentation.jump_to_section(5).expect("Jump failed");
    while !(presentation.forward_disabled() && presentation.phase() == Phase::Complete) {
        presentation.advance_time(100).expect("Timer failed");
        print_completed(&mut presentation);
    }

    let view = presentation.view();
    if let Some(cta) = view.cta {
        for link in cta.links {
            println!(
                "  [{}] {}",
                link.label.as_deref().unwrap_or("link"),
                link.url
            );
        }
    }

    println!("\n--- Tell me something unexpected ---\n");
    for _ in 0..2 {
        if let Some(fact) = presentation.next_fact() {
            println!("  {}", fact);
        }
    }

    println!(
        "\n=== Done at {:.1}s, {} keystrokes, narration {} ===",
        presentation.now_ms() as f64 / 1000.0,
        keys.count(),
        if track.is_playing() { "playing" } else { "stopped" }
    );
}

/// Print slides as they finish typing, plus narration notices.
fn print_completed(presentation: &mut Presentation) {
    for event in presentation.drain_events() {
        match event {
            PresentationEvent::TypingComplete { at, .. } => {
                let text = presentation
                    .script()
                    .lookup(at)
                    .map(|s| s.text.as_str())
                    .unwrap_or("");
                if !text.is_empty() {
                    println!("{} {}", at, text);
                }
            }
            PresentationEvent::AudioStarted { start_sec, .. } => {
                println!("    (narration from {:.1}s)", start_sec);
            }
            PresentationEvent::AudioStopped { reason, .. } => {
                println!("    (narration stopped: {:?})", reason);
            }
            _ => {}
        }
    }
}
