//! Text helpers for programs that talk ASCII over their input and output.

/// Output of an ASCII-speaking program: the printable text, plus the first value
/// outside the ASCII range if the program reported one (usually its answer).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsciiOutput {
    pub text: String,
    pub value: Option<i64>,
}

/// Encodes each line as its bytes followed by a newline.
pub fn encode_lines<S: AsRef<str>>(lines: &[S]) -> Vec<i64> {
    lines
        .iter()
        .flat_map(|line| line.as_ref().bytes().chain(std::iter::once(b'\n')))
        .map(i64::from)
        .collect()
}

pub fn decode_output(values: &[i64]) -> AsciiOutput {
    let mut text = String::new();
    let mut value = None;

    for &v in values {
        match u8::try_from(v) {
            Ok(byte) if byte.is_ascii() => text.push(char::from(byte)),
            _ => {
                value.get_or_insert(v);
            }
        }
    }

    AsciiOutput { text, value }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Machine;

    #[test]
    fn encodes_lines_with_newlines() {
        assert_eq!(
            encode_lines(&["NOT A J", "WALK"]),
            vec![78, 79, 84, 32, 65, 32, 74, 10, 87, 65, 76, 75, 10]
        );
        assert!(encode_lines::<&str>(&[]).is_empty());
    }

    #[test]
    fn separates_text_from_the_answer() {
        let out = decode_output(&[79, 75, 10, 19_357_290]);
        assert_eq!(out.text, "OK\n");
        assert_eq!(out.value, Some(19_357_290));

        let out = decode_output(&[72, 105]);
        assert_eq!(out.text, "Hi");
        assert_eq!(out.value, None);
    }

    #[test]
    fn echoes_through_a_machine() {
        // Echoes input until it reads a newline, then reports 1000.
        let mut vm =
            Machine::new("3,30,4,30,1008,30,10,31,1006,31,0,104,1000,99").unwrap();
        let out = decode_output(&vm.run(&encode_lines(&["hey"])).unwrap());
        assert_eq!(out.text, "hey\n");
        assert_eq!(out.value, Some(1000));
        assert!(vm.halted());
    }
}
