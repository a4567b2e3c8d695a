#[derive(Clone, Copy, PartialEq, Eq)]
pub(super) enum State {
    Normal,
    /// `'...'` with backslash escapes and doubled quotes
    SingleQuoted,
    DoubleQuoted,
    Backtick,
    LineComment,
    BlockComment,
}

/// `-- ` (MySQL wants whitespace after the dashes) or `#`.
pub(super) fn is_line_comment_start(bytes: &[u8], idx: usize) -> bool {
    match bytes.get(idx) {
        Some(b'#') => true,
        Some(b'-') => {
            bytes.get(idx + 1) == Some(&b'-')
                && bytes
                    .get(idx + 2)
                    .is_none_or(|b| b.is_ascii_whitespace())
        }
        _ => false,
    }
}

pub(super) fn is_block_comment_start(bytes: &[u8], idx: usize) -> bool {
    bytes.get(idx) == Some(&b'/') && bytes.get(idx + 1) == Some(&b'*')
}

pub(super) fn is_block_comment_end(bytes: &[u8], idx: usize) -> bool {
    bytes.get(idx) == Some(&b'*') && bytes.get(idx + 1) == Some(&b'/')
}

/// Advance the state machine by one byte. Returns how many extra bytes were consumed.
pub(super) fn step(state: &mut State, bytes: &[u8], idx: usize) -> usize {
    let b = bytes[idx];
    match *state {
        State::Normal => match b {
            b'\'' => *state = State::SingleQuoted,
            b'"' => *state = State::DoubleQuoted,
            b'`' => *state = State::Backtick,
            _ if is_line_comment_start(bytes, idx) => *state = State::LineComment,
            _ if is_block_comment_start(bytes, idx) => {
                *state = State::BlockComment;
                return 1;
            }
            _ => {}
        },
        State::SingleQuoted | State::DoubleQuoted => {
            let quote = if *state == State::SingleQuoted {
                b'\''
            } else {
                b'"'
            };
            if b == b'\\' {
                return usize::from(idx + 1 < bytes.len());
            }
            if b == quote {
                if bytes.get(idx + 1) == Some(&quote) {
                    return 1;
                }
                *state = State::Normal;
            }
        }
        State::Backtick => {
            if b == b'`' {
                if bytes.get(idx + 1) == Some(&b'`') {
                    return 1;
                }
                *state = State::Normal;
            }
        }
        State::LineComment => {
            if b == b'\n' {
                *state = State::Normal;
            }
        }
        State::BlockComment => {
            if is_block_comment_end(bytes, idx) {
                *state = State::Normal;
                return 1;
            }
        }
    }
    0
}
