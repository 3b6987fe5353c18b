use crate::analysis::token::Token;
use unicode_segmentation::UnicodeSegmentation;

/// Characters removed from every word before it becomes a token.
pub const PUNCTUATION: &[char] = &[
    '.', ',', ';', ':', '!', '?', '(', ')', '[', ']', '{', '}', '"', '\'',
];

pub const MIN_TOKEN_LENGTH: usize = 3;

pub trait Tokenizer: Send + Sync {
    fn tokenize(&self, text: &str) -> Vec<Token>;

    fn name(&self) -> &str;

    fn clone_box(&self) -> Box<dyn Tokenizer>;
}

/// Header field tokenizer: Unicode word split, punctuation strip,
/// lowercase, minimum-length filter.
#[derive(Debug, Clone)]
pub struct FieldTokenizer {
    pub min_token_length: usize,
    pub punctuation: &'static [char],
}

impl Default for FieldTokenizer {
    fn default() -> Self {
        FieldTokenizer {
            min_token_length: MIN_TOKEN_LENGTH,
            punctuation: PUNCTUATION,
        }
    }
}

impl FieldTokenizer {
    // unicode_words keeps "a.b" and "don't" whole, so split those again
    fn pieces<'a>(&self, offset: usize, word: &'a str) -> Vec<(usize, &'a str)> {
        let mut pieces = Vec::new();
        let mut start = 0;
        for (i, c) in word.char_indices() {
            if self.punctuation.contains(&c) {
                if i > start {
                    pieces.push((offset + start, &word[start..i]));
                }
                start = i + c.len_utf8();
            }
        }
        if start < word.len() {
            pieces.push((offset + start, &word[start..]));
        }
        pieces
    }
}

impl Tokenizer for FieldTokenizer {
    fn tokenize(&self, text: &str) -> Vec<Token> {
        let mut tokens = Vec::new();
        let mut position = 0u32;

        for (offset, word) in text.unicode_word_indices() {
            for (piece_offset, piece) in self.pieces(offset, word) {
                if piece.chars().count() < self.min_token_length {
                    continue;
                }
                tokens.push(Token::new(piece.to_lowercase(), position, piece_offset));
                position += 1;
            }
        }

        tokens
    }

    fn name(&self) -> &str {
        "field"
    }

    fn clone_box(&self) -> Box<dyn Tokenizer> {
        Box::new(self.clone())
    }
}

/// Tokenize with the default field tokenizer, returning token text only.
pub fn tokenize(text: &str) -> Vec<String> {
    FieldTokenizer::default()
        .tokenize(text)
        .into_iter()
        .map(|token| token.text)
        .collect()
}

/// Lowercase and collapse whitespace runs; used for phrase matching and cache keys.
pub fn normalize_phrase(text: &str) -> String {
    text.split_whitespace()
        .map(|word| word.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}
