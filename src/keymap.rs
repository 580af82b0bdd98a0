/// Alternate layout: the right hand rests on the letter keys as a numpad
const ALTERNATE_KEYS: [(char, char); 10] = [
    ('i', '7'),
    ('o', '8'),
    ('p', '9'),
    ('j', '0'),
    ('k', '4'),
    ('l', '5'),
    (';', '6'),
    ('m', '1'),
    (',', '2'),
    ('.', '3'),
];

pub fn map_alternate(c: char) -> Option<char> {
    let lower = c.to_ascii_lowercase();
    ALTERNATE_KEYS
        .iter()
        .find(|(key, _)| *key == lower)
        .map(|(_, digit)| *digit)
}

/// Text typed for the current problem
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnswerInput {
    value: String,
}

impl AnswerInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a digit, a leading minus, or an alternate-layout key.
    /// Returns false when the key is not part of an answer.
    pub fn push(&mut self, c: char) -> bool {
        let c = if c.is_ascii_digit() {
            c
        } else if c == '-' && self.value.is_empty() {
            c
        } else if let Some(digit) = map_alternate(c) {
            digit
        } else {
            return false;
        };
        self.value.push(c);
        true
    }

    pub fn backspace(&mut self) {
        self.value.pop();
    }

    pub fn clear(&mut self) {
        self.value.clear();
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    /// Empty or non-numeric text is not an answer
    pub fn parse(&self) -> Option<i64> {
        parse_answer(&self.value)
    }
}

pub fn parse_answer(text: &str) -> Option<i64> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    text.parse().ok()
}
