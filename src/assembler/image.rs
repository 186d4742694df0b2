use crate::vm::Word;

/// Assembled words and their little-endian byte form
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BinaryImage {
    words: Vec<Word>,
}

impl BinaryImage {
    pub fn from_words(words: Vec<Word>) -> Self {
        BinaryImage { words }
    }

    /// Rebuild words from byte pairs, low byte first. A trailing odd byte
    /// becomes the low byte of a final word.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let words = bytes
            .chunks(2)
            .map(|pair| {
                let low = Word::from(pair[0]);
                let high = pair.get(1).copied().map(Word::from).unwrap_or(0);
                low | (high << 8)
            })
            .collect();
        BinaryImage { words }
    }

    pub fn words(&self) -> &[Word] {
        &self.words
    }

    /// Size in words
    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.words
            .iter()
            .flat_map(|word| word.to_le_bytes())
            .collect()
    }
}
