// ANSI escape sequence scanning.

const ESC: u8 = 0x1b;
const BEL: u8 = 0x07;

/// Length in bytes of the escape sequence starting at `pos`, if one does.
///
/// Recognises CSI (`ESC [ … final`) and the string sequences OSC
/// (`ESC ] …`) and APC (`ESC _ …`), which end at BEL or ST (`ESC \`).
pub fn ansi_code_len(s: &str, pos: usize) -> Option<usize> {
    let bytes = s.as_bytes();
    if bytes.get(pos) != Some(&ESC) {
        return None;
    }

    let body = pos + 2;
    match bytes.get(pos + 1)? {
        b'[' => {
            // Parameter bytes, then intermediate bytes, then one final byte.
            let params = body + count_while(&bytes[body..], |b| (0x30..=0x3F).contains(&b));
            let inter = params + count_while(&bytes[params..], |b| (0x20..=0x2F).contains(&b));
            match bytes.get(inter) {
                Some(b) if (0x40..=0x7E).contains(b) => Some(inter + 1 - pos),
                _ => None,
            }
        }
        b']' | b'_' => {
            let mut i = body;
            while i < bytes.len() {
                match bytes[i] {
                    BEL => return Some(i + 1 - pos),
                    ESC if bytes.get(i + 1) == Some(&b'\\') => return Some(i + 2 - pos),
                    _ => i += 1,
                }
            }
            None
        }
        _ => None,
    }
}

fn count_while(bytes: &[u8], pred: impl Fn(u8) -> bool) -> usize {
    bytes.iter().take_while(|&&b| pred(b)).count()
}

/// The visible text of `s`, with every recognised escape sequence removed.
pub fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut i = 0;
    while let Some(ch) = s[i..].chars().next() {
        if let Some(len) = ansi_code_len(s, i) {
            i += len;
            continue;
        }
        out.push(ch);
        i += ch.len_utf8();
    }
    out
}
