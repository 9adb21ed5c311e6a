//! Splitting a joint reply into per-speaker blocks.

/// One speaker's part of a joint reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchLine {
    pub speaker: String,
    pub text: String,
}

fn header(line: &str) -> Option<&str> {
    line.strip_prefix('【')?.strip_suffix('】').map(str::trim)
}

/// Parses `【Name】` blocks out of a joint reply.
///
/// A header line opens a block and the non-empty lines after it, trimmed,
/// form its text. Text before the first header and blocks with no text are
/// dropped. Blocks keep the order they appear in.
pub fn parse_batch_reply(reply: &str) -> Vec<BatchLine> {
    let mut blocks = Vec::new();
    let mut current: Option<(String, Vec<&str>)> = None;

    for line in reply.lines().map(str::trim) {
        if let Some(name) = header(line) {
            if let Some(block) = current.take() {
                blocks.extend(close(block));
            }
            current = Some((name.to_string(), Vec::new()));
        } else if !line.is_empty() {
            if let Some((_, lines)) = current.as_mut() {
                lines.push(line);
            }
        }
    }
    if let Some(block) = current {
        blocks.extend(close(block));
    }

    blocks
}

fn close((speaker, lines): (String, Vec<&str>)) -> Option<BatchLine> {
    if speaker.is_empty() || lines.is_empty() {
        return None;
    }
    Some(BatchLine {
        speaker,
        text: lines.join("\n"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(reply: &str) -> Vec<(String, String)> {
        parse_batch_reply(reply)
            .into_iter()
            .map(|b| (b.speaker, b.text))
            .collect()
    }

    #[test]
    fn test_blocks_in_reply_order() {
        let reply = "【Mika】\nI made carbonara last night!\n\n【 Kentaro 】\nToo much cream is bad for you.\nJust saying.\n";
        assert_eq!(
            pairs(reply),
            vec![
                ("Mika".to_string(), "I made carbonara last night!".to_string()),
                (
                    "Kentaro".to_string(),
                    "Too much cream is bad for you.\nJust saying.".to_string()
                ),
            ]
        );
    }

    #[test]
    fn test_preamble_and_silent_speakers_are_dropped() {
        let reply = "Sure, here is the chat:\n【Rina】\n\n【Shota】\n  hmm, maybe  \n【】\nnobody\n";
        assert_eq!(
            pairs(reply),
            vec![("Shota".to_string(), "hmm, maybe".to_string())]
        );
    }

    #[test]
    fn test_no_headers_yields_nothing() {
        assert!(parse_batch_reply("Just a plain answer.").is_empty());
        assert!(parse_batch_reply("").is_empty());
    }

    #[test]
    fn test_inline_brackets_are_text() {
        let reply = "【Ann】\nI told 【Boris】 already.";
        assert_eq!(
            pairs(reply),
            vec![("Ann".to_string(), "I told 【Boris】 already.".to_string())]
        );
    }
}
