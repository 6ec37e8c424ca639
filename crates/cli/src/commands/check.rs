//! `issuewright check`: parse a script and list what it registers.

use issuewright_rules::{Entry, Script};
use std::path::Path;

pub async fn run(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read script {}: {e}", path.display()))?;

    match Script::parse(&text, None) {
        Ok(script) => {
            print!("{}", describe(&script));
            Ok(())
        }
        Err(e) => {
            eprintln!("{}: {e}", path.display());
            std::process::exit(1);
        }
    }
}

/// One line per entry, in registration order.
fn describe(script: &Script) -> String {
    let rules = script.rules().count();
    let includes = script.includes().count();
    let mut out = format!("{rules} rule(s), {includes} include(s)\n");
    for entry in script.entries() {
        let line = match entry {
            Entry::Rule(rule) => format!("  line {:>3}  {rule}\n", rule.line),
            Entry::Include(include) => format!("  line {:>3}  {include}\n", include.line),
        };
        out.push_str(&line);
    }
    out
}
