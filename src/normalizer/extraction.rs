//! Loose parsing of advisor extraction replies
//!
//! The reply is free-form text. It is split on a delimiter and each piece
//! is trimmed and lower-cased. Anything that does not parse simply yields
//! fewer candidates; parsing never fails.

/// Default delimiter; the extraction prompt asks for `*` bullets
pub const DEFAULT_DELIMITER: char = '*';

/// Replies meaning "nothing found"
const EMPTY_MARKERS: [&str; 5] = ["none", "null", "none null", "n/a", "no symptoms"];

/// Split an extraction reply into candidate symptom phrases
pub fn parse_candidates(response: &str, delimiter: char) -> Vec<String> {
    response
        .split(delimiter)
        .map(|piece| piece.trim().to_lowercase())
        .filter(|piece| !piece.is_empty())
        .filter(|piece| !is_empty_marker(piece))
        .collect()
}

fn is_empty_marker(piece: &str) -> bool {
    let bare = piece.trim_matches(|c: char| !c.is_alphanumeric() && c != '/' && c != ' ');
    EMPTY_MARKERS.contains(&bare)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bullet_reply() {
        let reply = "* Itching\n* Joint Pain\n*   skin rash  ";
        assert_eq!(
            parse_candidates(reply, '*'),
            vec!["itching", "joint pain", "skin rash"]
        );
    }

    #[test]
    fn test_preamble_is_kept_as_candidate() {
        let reply = "Symptoms found:\n* cough\n* chills";
        let parsed = parse_candidates(reply, '*');
        assert_eq!(parsed.len(), 3);
        assert_eq!(parsed[0], "symptoms found:");
    }

    #[test]
    fn test_none_and_null_replies() {
        assert!(parse_candidates("none", '*').is_empty());
        assert!(parse_candidates("None.", '*').is_empty());
        assert!(parse_candidates("  NULL ", '*').is_empty());
        assert!(parse_candidates("none null", '*').is_empty());
    }

    #[test]
    fn test_empty_and_garbage_replies() {
        assert!(parse_candidates("", '*').is_empty());
        assert!(parse_candidates("***", '*').is_empty());
        assert_eq!(parse_candidates("{\"oops\": true}", '*').len(), 1);
    }

    #[test]
    fn test_custom_delimiter() {
        assert_eq!(
            parse_candidates("cough, chills ,fatigue", ','),
            vec!["cough", "chills", "fatigue"]
        );
    }
}
