use super::{LanguageProfile, INPUT_FILE};

/// Quote one argument for bash. Plain words are left alone.
pub fn shell_escape(arg: &str) -> String {
    if arg.is_empty() {
        return "''".to_string();
    }
    let plain = arg
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "_-./=:+,@%".contains(c));
    if plain {
        return arg.to_string();
    }
    format!("'{}'", arg.replace('\'', "'\\''"))
}

fn shell_join(args: &[String]) -> String {
    args.iter()
        .map(|arg| shell_escape(arg))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Render the launcher script for a profile.
///
/// Build steps are chained with `&&` so a failed compilation stops the
/// script, and only the final program sees the request's stdin.
pub fn render_launcher(profile: &LanguageProfile) -> String {
    let mut steps: Vec<String> = profile.build.iter().map(|step| shell_join(step)).collect();
    steps.push(format!("exec {} < {}", shell_join(&profile.run), INPUT_FILE));
    format!("#!/bin/bash\n{}\n", steps.join(" && "))
}
