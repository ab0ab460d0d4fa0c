//! Obfuscated managed post ids
//!
//! Download URLs may name a managed package by an opaque id instead of its
//! slug. The id is the post id written in a salted, shuffled base-62
//! alphabet, so it can be decoded without any lookup table but cannot be
//! enumerated without the salt.

const ALPHABET: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ1234567890";

#[derive(Debug, Clone)]
pub struct HashId {
    salt: Vec<char>,
    alphabet: Vec<char>,
}

impl HashId {
    pub fn new(salt: &str) -> Self {
        let salt: Vec<char> = salt.chars().collect();
        let mut alphabet: Vec<char> = ALPHABET.chars().collect();
        shuffle(&mut alphabet, &salt);
        Self { salt, alphabet }
    }

    pub fn encode(&self, id: u64) -> String {
        let len = self.alphabet.len() as u64;
        let lottery = self.alphabet[(id % len) as usize];
        let alphabet = self.round_alphabet(lottery);

        let mut digits = Vec::new();
        let mut rest = id;
        loop {
            digits.push(alphabet[(rest % len) as usize]);
            rest /= len;
            if rest == 0 {
                break;
            }
        }
        digits.reverse();

        let mut encoded = String::with_capacity(digits.len() + 1);
        encoded.push(lottery);
        encoded.extend(digits);
        encoded
    }

    /// Decode a value produced by [`HashId::encode`] with the same salt.
    ///
    /// Anything else decodes to `None`, including values that happen to use
    /// only alphabet characters.
    pub fn decode(&self, value: &str) -> Option<u64> {
        let mut chars = value.chars();
        let lottery = chars.next()?;
        if !self.alphabet.contains(&lottery) {
            return None;
        }
        let alphabet = self.round_alphabet(lottery);
        let len = alphabet.len() as u64;

        let mut id: u64 = 0;
        let mut any = false;
        for c in chars {
            let digit = alphabet.iter().position(|a| *a == c)? as u64;
            id = id.checked_mul(len)?.checked_add(digit)?;
            any = true;
        }

        // Only canonical encodings are accepted
        (any && self.encode(id) == value).then_some(id)
    }

    fn round_alphabet(&self, lottery: char) -> Vec<char> {
        let mut salt = Vec::with_capacity(self.salt.len() + 1);
        salt.push(lottery);
        salt.extend_from_slice(&self.salt);

        let mut alphabet = self.alphabet.clone();
        shuffle(&mut alphabet, &salt);
        alphabet
    }
}

/// Deterministic salt-driven permutation.
fn shuffle(alphabet: &mut [char], salt: &[char]) {
    if salt.is_empty() || alphabet.len() < 2 {
        return;
    }

    let mut v = 0;
    let mut p = 0;
    for i in (1..alphabet.len()).rev() {
        v %= salt.len();
        let n = salt[v] as usize;
        p += n;
        let j = (n + v + p) % i;
        alphabet.swap(i, j);
        v += 1;
    }
}
