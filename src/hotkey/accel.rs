//! Accelerator translation
//!
//! Converts the human-readable hotkey notation used by the control panel
//! ("Ctrl + Shift + K") into the canonical accelerator grammar the OS layer
//! understands ("CmdOrCtrl+Shift+K"). Translation is pure and idempotent:
//! the bulk re-registration pass re-translates strings that are already
//! canonical, and they must come out unchanged.

/// Translate a user-facing hotkey string into a canonical accelerator.
///
/// Returns `None` for empty/blank input (no binding possible). The result is
/// not validated; an illegal combination is caught at registration time.
pub fn translate(input: &str) -> Option<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }

    let canonical = trimmed
        .split('+')
        .map(canonical_token)
        .collect::<Vec<_>>()
        .join("+");

    Some(canonical)
}

/// Canonicalize a single `+`-separated token.
///
/// Token-wise matching (rather than substring replacement) is what keeps the
/// transform idempotent: "CmdOrCtrl" contains "Ctrl" but is not the token
/// "Ctrl", so a second pass leaves it alone.
fn canonical_token(token: &str) -> String {
    let compact: String = token.chars().filter(|c| !c.is_whitespace()).collect();
    match compact.to_ascii_lowercase().as_str() {
        // Primary modifier: Ctrl everywhere except macOS, where the OS layer
        // resolves CmdOrCtrl to Command
        "ctrl" | "control" => "CmdOrCtrl".to_string(),
        // OS/meta key maps to the Super token in the accelerator grammar
        "meta" | "win" | "windows" => "Super".to_string(),
        _ => compact,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_input_yields_none() {
        assert_eq!(translate(""), None);
        assert_eq!(translate("   "), None);
    }

    #[test]
    fn test_control_becomes_primary_modifier() {
        assert_eq!(
            translate("Ctrl + Shift + K").as_deref(),
            Some("CmdOrCtrl+Shift+K")
        );
        assert_eq!(translate("Control+Q").as_deref(), Some("CmdOrCtrl+Q"));
    }

    #[test]
    fn test_meta_becomes_super() {
        assert_eq!(translate("Meta + Space").as_deref(), Some("Super+Space"));
        assert_eq!(translate("Win + D").as_deref(), Some("Super+D"));
    }

    #[test]
    fn test_separators_collapse_and_whitespace_strips() {
        assert_eq!(translate("Alt + Page Down").as_deref(), Some("Alt+PageDown"));
        assert_eq!(translate(" Shift+F5 ").as_deref(), Some("Shift+F5"));
    }

    #[test]
    fn test_idempotent_on_canonical_input() {
        for input in ["Ctrl + Shift + K", "Meta + B", "Alt + Space", "CmdOrCtrl+P"] {
            let once = translate(input).unwrap();
            let twice = translate(&once).unwrap();
            assert_eq!(once, twice, "not a fixed point for {input:?}");
        }
    }

    #[test]
    fn test_unknown_tokens_pass_through() {
        assert_eq!(
            translate("Cmd + Shift + 7").as_deref(),
            Some("Cmd+Shift+7")
        );
    }
}
