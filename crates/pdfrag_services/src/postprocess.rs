use pdfrag_domain::ReasoningMarkers;

/// Turns raw model output into the answer shown to the user.
///
/// HTML entities and literal `\uXXXX` escapes are decoded first. When the
/// output carries both reasoning markers, everything up to and including the
/// last closing marker is dropped.
pub fn clean_response(raw: &str, markers: &ReasoningMarkers) -> String {
    let decoded = html_escape::decode_html_entities(raw);
    let decoded = decode_unicode_escapes(&decoded);

    let visible = if decoded.contains(&markers.open) {
        match decoded.rsplit_once(&markers.close) {
            Some((_, answer)) => answer,
            None => decoded.as_str(),
        }
    } else {
        decoded.as_str()
    };

    visible.trim().to_string()
}

/// Decodes `\uXXXX` sequences, pairing UTF-16 surrogates. Sequences that do
/// not form a valid scalar value are kept verbatim.
fn decode_unicode_escapes(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(pos) = rest.find("\\u") {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        match parse_escape(tail) {
            Some((ch, consumed)) => {
                out.push(ch);
                rest = &tail[consumed..];
            }
            None => {
                out.push_str("\\u");
                rest = &tail[2..];
            }
        }
    }

    out.push_str(rest);
    out
}

/// Parses one escape (or a surrogate pair) at the start of `s`, returning the
/// character and the number of bytes consumed.
fn parse_escape(s: &str) -> Option<(char, usize)> {
    let high = hex_unit(s)?;

    if (0xD800..0xDC00).contains(&high) {
        let low = hex_unit(s.get(6..)?)?;
        if !(0xDC00..0xE000).contains(&low) {
            return None;
        }
        let code = 0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00);
        return char::from_u32(code).map(|ch| (ch, 12));
    }

    char::from_u32(high).map(|ch| (ch, 6))
}

fn hex_unit(s: &str) -> Option<u32> {
    let digits = s.strip_prefix("\\u")?.get(..4)?;
    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    u32::from_str_radix(digits, 16).ok()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn clean(raw: &str) -> String {
        clean_response(raw, &ReasoningMarkers::default())
    }

    #[test]
    fn strips_reasoning_block() {
        let actual = clean("<think>reasoning...</think>Final answer.");
        let expected = "Final answer.";
        assert_eq!(actual, expected);
    }

    #[test]
    fn keeps_text_after_last_closing_marker() {
        let actual = clean("<think>a</think>draft<think>b</think>\n  Final.  ");
        let expected = "Final.";
        assert_eq!(actual, expected);
    }

    #[test]
    fn unterminated_reasoning_is_left_alone() {
        let actual = clean("<think>still thinking");
        let expected = "<think>still thinking";
        assert_eq!(actual, expected);
    }

    #[test]
    fn closing_marker_without_opening_is_left_alone() {
        let actual = clean("plain</think>answer");
        let expected = "plain</think>answer";
        assert_eq!(actual, expected);
    }

    #[test]
    fn decodes_html_entities() {
        let actual = clean("Tom &amp; Jerry &lt;3 &#39;cheese&#39;");
        let expected = "Tom & Jerry <3 'cheese'";
        assert_eq!(actual, expected);
    }

    #[test]
    fn escaped_markers_are_stripped_after_decoding() {
        let actual = clean("&lt;think&gt;hidden&lt;/think&gt;Shown");
        let expected = "Shown";
        assert_eq!(actual, expected);
    }

    #[test]
    fn decodes_unicode_escapes_and_surrogate_pairs() {
        let actual = clean(r"caf\u00e9 \ud83d\ude00");
        let expected = "café 😀";
        assert_eq!(actual, expected);
    }

    #[test]
    fn malformed_unicode_escapes_are_kept() {
        let actual = clean(r"path\users \uZZZZ \ud83d");
        let expected = r"path\users \uZZZZ \ud83d";
        assert_eq!(actual, expected);
    }

    #[test]
    fn custom_markers_are_honoured() {
        let markers = ReasoningMarkers::default().open("[[").close("]]");
        let actual = clean_response("[[scratch]] done", &markers);
        let expected = "done";
        assert_eq!(actual, expected);
    }
}
