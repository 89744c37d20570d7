use regex::Regex;

/// Byte offset just past the bracket that closes the one at `open`.
///
/// Quoted strings ('…', "…", `…`) and comments are skipped so brackets inside
/// them do not count. Returns `None` when `open` is not `{` or `[`, or when the
/// block never closes.
pub fn block_end(text: &str, open: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let (open_ch, close_ch) = match bytes.get(open)? {
        b'{' => (b'{', b'}'),
        b'[' => (b'[', b']'),
        _ => return None,
    };

    let mut depth = 0usize;
    let mut i = open;
    while i < bytes.len() {
        match bytes[i] {
            b'\'' | b'"' | b'`' => {
                i = string_end(bytes, i);
                continue;
            }
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                i = bytes[i..]
                    .iter()
                    .position(|&b| b == b'\n')
                    .map_or(bytes.len(), |p| i + p);
                continue;
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i = text[i + 2..].find("*/").map_or(bytes.len(), |p| i + 2 + p + 2);
                continue;
            }
            c if c == open_ch => depth += 1,
            c if c == close_ch => {
                depth -= 1;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// Offset just past the string starting at `start`. A stray quote that never
/// closes on its line ends at the newline instead of eating the rest of the file.
fn string_end(bytes: &[u8], start: usize) -> usize {
    let quote = bytes[start];
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'\n' if quote != b'`' => return i,
            c if c == quote => return i + 1,
            _ => i += 1,
        }
    }
    bytes.len()
}

/// Locate a labelled block such as `provisions: [ … ]`.
///
/// `label` must end by matching the opening bracket. Returns the bracket
/// offset and, if the block is balanced, the offset just past its close.
pub fn find_block(text: &str, label: &Regex) -> Option<(usize, Option<usize>)> {
    let m = label.find(text)?;
    let open = m.end().checked_sub(1)?;
    Some((open, block_end(text, open)))
}

/// Byte offset `chars` characters after `from`, clamped to the end of `text`.
pub fn advance_chars(text: &str, from: usize, chars: usize) -> usize {
    text[from..]
        .char_indices()
        .nth(chars)
        .map_or(text.len(), |(i, _)| from + i)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_objects() {
        let text = "{ a: { b: 1 }, c: [ { d: 2 } ] } tail";
        assert_eq!(block_end(text, 0), Some(32));
        assert_eq!(&text[..32], "{ a: { b: 1 }, c: [ { d: 2 } ] }");
        assert_eq!(block_end(text, 18), Some(30));
    }

    #[test]
    fn brackets_in_strings_and_comments_ignored() {
        let text = "{ a: 'has } brace', b: \"and { more\", // stray }\n c: 'it\\'s' } x";
        let end = block_end(text, 0).unwrap();
        assert!(text[..end].ends_with("'it\\'s' }"));
    }

    #[test]
    fn unbalanced_returns_none() {
        assert_eq!(block_end("{ a: { b: 1 }", 0), None);
        assert_eq!(block_end("no bracket", 0), None);
    }

    #[test]
    fn unterminated_quote_stops_at_line_end() {
        let text = "{ a: 'oops,\n b: 1 }";
        assert_eq!(block_end(text, 0), Some(text.len()));
    }

    #[test]
    fn find_labelled_block() {
        let re = Regex::new(r"\bprovisions\s*:\s*\[").unwrap();
        let text = "name: 'x', provisions: [ { id: 'a' } ], tail: 1";
        let (open, end) = find_block(text, &re).unwrap();
        assert_eq!(&text[open..end.unwrap()], "[ { id: 'a' } ]");
    }

    #[test]
    fn advance_counts_chars_not_bytes() {
        let text = "§§§abc";
        assert_eq!(advance_chars(text, 0, 3), "§§§".len());
        assert_eq!(advance_chars(text, 0, 100), text.len());
    }
}
