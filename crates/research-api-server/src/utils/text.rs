use once_cell::sync::Lazy;
use regex::Regex;

const MAX_FAULT_CHARS: usize = 300;

static SECRET_QUERY_PARAM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)([?&](?:key|api_key|apikey|token|access_token|cx)=)[^&\s)]+")
        .expect("secret query param regex")
});

static BEARER_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(bearer\s+)[A-Za-z0-9._~+/\-]+=*").expect("bearer token regex"));

static API_KEY_LITERAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bsk-[A-Za-z0-9_\-]{8,}").expect("api key literal regex"));

/// Cut `text` to at most `max_chars` characters, ending on the last full sentence when one exists.
pub fn truncate_to_sentences(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let truncated: String = text.chars().take(max_chars).collect();
    match truncated.rfind('.') {
        Some(last_period) if last_period > 0 => truncated[..=last_period].to_string(),
        _ => truncated,
    }
}

/// "a", "a and b", "a, b and c"
pub fn join_with_and(items: &[String]) -> String {
    match items {
        [] => String::new(),
        [only] => only.clone(),
        [head @ .., last] => format!("{} and {}", head.join(", "), last),
    }
}

/// Render an error chain for display to callers without leaking credentials.
pub fn sanitize_fault(err: &anyhow::Error) -> String {
    let raw = format!("{:#}", err);
    let redacted = SECRET_QUERY_PARAM.replace_all(&raw, "${1}[REDACTED]");
    let redacted = BEARER_TOKEN.replace_all(&redacted, "${1}[REDACTED]");
    let redacted = API_KEY_LITERAL.replace_all(&redacted, "[REDACTED]");

    let collapsed = redacted.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() > MAX_FAULT_CHARS {
        let mut cut: String = collapsed.chars().take(MAX_FAULT_CHARS).collect();
        cut.push('…');
        cut
    } else {
        collapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_keeps_short_text() {
        assert_eq!(truncate_to_sentences("Short one.", 100), "Short one.");
    }

    #[test]
    fn test_truncate_ends_on_sentence() {
        let text = "First sentence. Second sentence is longer than the limit";
        assert_eq!(truncate_to_sentences(text, 30), "First sentence.");
    }

    #[test]
    fn test_truncate_without_period_hard_cuts() {
        assert_eq!(truncate_to_sentences("abcdefghij", 4), "abcd");
    }

    #[test]
    fn test_truncate_is_char_boundary_safe() {
        let text = "Ünïcödé täxt wïth nö përïöd ät äll";
        assert_eq!(truncate_to_sentences(text, 5).chars().count(), 5);
    }

    #[test]
    fn test_join_with_and() {
        let items = |v: &[&str]| v.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        assert_eq!(join_with_and(&items(&[])), "");
        assert_eq!(join_with_and(&items(&["hate"])), "hate");
        assert_eq!(join_with_and(&items(&["hate", "violence"])), "hate and violence");
        assert_eq!(
            join_with_and(&items(&["hate", "violence", "self-harm"])),
            "hate, violence and self-harm"
        );
    }

    #[test]
    fn test_sanitize_redacts_credentials() {
        let err = anyhow::anyhow!(
            "error sending request for url (https://www.googleapis.com/customsearch/v1?q=x&key=AIzaSECRET&cx=engine1)"
        )
        .context("Search failed");
        let text = sanitize_fault(&err);
        assert!(text.starts_with("Search failed: "));
        assert!(text.contains("error sending request for url"));
        assert!(!text.contains("AIzaSECRET"));
        assert!(!text.contains("engine1"));
        assert!(text.contains("key=[REDACTED]"));
    }

    #[test]
    fn test_sanitize_redacts_bearer_and_caps_length() {
        let err = anyhow::anyhow!("Authorization: Bearer sk-abcdefghijklmnop\n\n{}", "x".repeat(1000));
        let text = sanitize_fault(&err);
        assert!(!text.contains("sk-abcdefghijklmnop"));
        assert!(!text.contains('\n'));
        assert_eq!(text.chars().count(), MAX_FAULT_CHARS + 1);
    }
}
