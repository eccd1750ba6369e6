/// Script Linter: validates a walkthrough script and flags suspicious slides.
///
/// Usage: script_linter <script.ron> [<script.ron> ...]

use std::path::Path;
use std::process;

use walkthrough_engine::schema::coordinate::Coordinate;
use walkthrough_engine::schema::script::ScriptTable;

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        println!("Usage: script_linter <script.ron> [<script.ron> ...]");
        process::exit(0);
    }

    let mut total_errors = 0;
    let mut total_warnings = 0;

    for path in &args[1..] {
        let (errors, warnings) = lint_file(Path::new(path));
        total_errors += errors;
        total_warnings += warnings;
    }

    println!(
        "\nSummary: {} errors, {} warnings",
        total_errors, total_warnings
    );

    if total_errors == 0 {
        process::exit(0);
    } else {
        process::exit(1);
    }
}

/// Lint one file, printing its report. Returns (errors, warnings).
fn lint_file(path: &Path) -> (usize, usize) {
    println!("\n=== Script Lint Report: {} ===\n", path.display());

    let input = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            println!("ERROR: cannot read {}: {}", path.display(), e);
            return (1, 0);
        }
    };

    let errors = match ScriptTable::lint_ron(&input) {
        Ok(errors) => errors,
        Err(e) => {
            println!("ERROR: {}", e);
            return (1, 0);
        }
    };

    for error in &errors {
        println!("ERROR: {}", error);
    }
    if !errors.is_empty() {
        return (errors.len(), 0);
    }

    let script = match ScriptTable::parse_ron(&input) {
        Ok(script) => script,
        Err(e) => {
            println!("ERROR: {}", e);
            return (1, 0);
        }
    };

    let warnings = lint_script(&script);
    for warning in &warnings {
        println!("WARNING: {}", warning);
    }
    if warnings.is_empty() {
        println!(
            "All checks passed! ({} slides in {} sections)",
            script.len(),
            script.last_section()
        );
    }
    (0, warnings.len())
}

fn lint_script(script: &ScriptTable) -> Vec<String> {
    let mut warnings = Vec::new();

    // Sections nobody transitions into, except section 1 and fallback entries.
    let mut entered = vec![script.first_section()];
    for slide in script.slides() {
        if let Some(target) = slide.explicit_target() {
            entered.push(target.section);
        } else if !slide.is_final && slide.step == script.max_steps(slide.section).unwrap_or(0) {
            entered.push(slide.section + 1);
        }
    }
    for section in script.sections() {
        if !entered.contains(&section.id) {
            warnings.push(format!(
                "section {} ('{}') is only reachable by jumping",
                section.id, section.title
            ));
        }
    }

    for slide in script.slides() {
        let at = slide.coordinate();
        if slide.text.is_empty() && !slide.is_bridge() {
            warnings.push(format!("slide {} has no text and is not a bridge step", at));
        }
        if slide.cta.is_some() && !slide.is_final {
            warnings.push(format!("slide {} has a call to action but is not final", at));
        }
        if slide.text.is_empty() && slide.audio_window.is_some() {
            warnings.push(format!("slide {} arms narration but shows no text", at));
        }
        if slide.post_complete_delay_ms > 0 && slide.explicit_target().is_none() {
            warnings.push(format!(
                "slide {} sets post_complete_delay_ms without an explicit next target",
                at
            ));
        }
    }

    let last = Coordinate::new(
        script.last_section(),
        script.max_steps(script.last_section()).unwrap_or(1),
    );
    if script.lookup(last).is_some_and(|s| !s.is_final) {
        warnings.push(format!("last slide {} is not marked final", last));
    }

    warnings
}
