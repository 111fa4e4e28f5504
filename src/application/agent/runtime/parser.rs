use super::{DirectiveError, ParsedDirective};

pub(crate) const TOOL_CALL_OPEN: &str = "<tool_call>";
pub(crate) const TOOL_CALL_CLOSE: &str = "</tool_call>";

/// Single forward scan for the first `<tool_call>…</tool_call>` pair.
///
/// `Ok(None)` means no pair was found (an unterminated opening marker
/// counts as no pair). Text after the closing marker is ignored for
/// dispatch; the stored message keeps it. A pair whose payload does not
/// decode is a [`DirectiveError`], never silently treated as absence.
pub(crate) fn parse_directive(
    raw_text: &str,
) -> Result<Option<ParsedDirective>, DirectiveError> {
    let Some(open) = raw_text.find(TOOL_CALL_OPEN) else {
        return Ok(None);
    };
    let payload_start = open + TOOL_CALL_OPEN.len();
    let Some(close) = raw_text[payload_start..].find(TOOL_CALL_CLOSE) else {
        return Ok(None);
    };
    let payload = raw_text[payload_start..payload_start + close].trim();
    let directive = serde_json::from_str::<ParsedDirective>(payload)?;
    Ok(Some(directive))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn plain_text_has_no_directive() {
        assert!(parse_directive("the balance is 1.5 ETH").unwrap().is_none());
    }

    #[test]
    fn unterminated_marker_counts_as_absent() {
        assert!(
            parse_directive("<tool_call>{\"name\":\"calculate\"}")
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn extracts_first_pair_and_ignores_trailing_text() {
        let text = concat!(
            "thinking...\n",
            "<tool_call>{\"name\":\"calculate\",\"arguments\":{\"expression\":\"1+1\"}}</tool_call>",
            " trailing prose ",
            "<tool_call>{\"name\":\"average\",\"arguments\":{}}</tool_call>",
        );
        let directive = parse_directive(text).unwrap().unwrap();
        assert_eq!(directive.name.as_deref(), Some("calculate"));
        assert_eq!(
            directive.arguments.unwrap().get("expression"),
            Some(&json!("1+1"))
        );
    }

    #[test]
    fn malformed_payload_is_a_decode_error_not_absence() {
        let result = parse_directive("<tool_call>{broken json</tool_call>");
        assert!(matches!(result, Err(DirectiveError::Decode(_))));
    }

    #[test]
    fn key_order_is_irrelevant() {
        let a = parse_directive(
            "<tool_call>{\"name\":\"t\",\"arguments\":{\"x\":1,\"y\":2}}</tool_call>",
        )
        .unwrap()
        .unwrap();
        let b = parse_directive(
            "<tool_call>{\"arguments\":{\"y\":2,\"x\":1},\"name\":\"t\"}</tool_call>",
        )
        .unwrap()
        .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn null_or_absent_arguments_decode_to_none() {
        let null_args = parse_directive(
            "<tool_call>{\"name\":\"t\",\"arguments\":null}</tool_call>",
        )
        .unwrap()
        .unwrap();
        assert!(null_args.arguments.is_none());

        let absent = parse_directive("<tool_call>{\"name\":\"t\"}</tool_call>")
            .unwrap()
            .unwrap();
        assert!(absent.arguments.is_none());
    }

    #[test]
    fn non_object_payload_is_a_decode_error() {
        assert!(parse_directive("<tool_call>[1, 2]</tool_call>").is_err());
        assert!(parse_directive("<tool_call>\"call me\"</tool_call>").is_err());
    }
}
