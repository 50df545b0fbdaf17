//! Greedy word wrap for chat bubbles.

/// Characters per bubble line.
pub const BUBBLE_WRAP_WIDTH: usize = 24;

/// Wraps `text` into lines of at most `width` characters.
///
/// Words are packed greedily. A word longer than `width` is split into
/// `width - 1` character pieces, each followed by `-`; the last piece holds
/// the remainder and can share its line with following words.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let width = width.max(2);
    let mut lines = Vec::new();
    let mut line = String::new();
    let mut line_len = 0;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();

        if word_len > width {
            if line_len > 0 {
                lines.push(std::mem::take(&mut line));
            }
            let chars: Vec<char> = word.chars().collect();
            let mut pieces = chars.chunks(width - 1).peekable();
            while let Some(piece) = pieces.next() {
                let piece: String = piece.iter().collect();
                if pieces.peek().is_some() {
                    lines.push(format!("{piece}-"));
                } else {
                    line_len = piece.chars().count();
                    line = piece;
                }
            }
            continue;
        }

        if line_len == 0 {
            line.push_str(word);
            line_len = word_len;
        } else if line_len + 1 + word_len <= width {
            line.push(' ');
            line.push_str(word);
            line_len += 1 + word_len;
        } else {
            lines.push(std::mem::replace(&mut line, word.to_string()));
            line_len = word_len;
        }
    }

    if line_len > 0 {
        lines.push(line);
    }
    lines
}
