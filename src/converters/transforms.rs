use data_encoding::{BASE64, HEXLOWER_PERMISSIVE};

use crate::errors::KestrelError;

pub fn base64_encode(text: &str) -> Result<String, KestrelError> {
    Ok(BASE64.encode(text.as_bytes()))
}

pub fn base64_decode(text: &str) -> Result<String, KestrelError> {
    let stripped: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = BASE64
        .decode(stripped.as_bytes())
        .map_err(|e| KestrelError::ConverterFailure(format!("invalid base64 input: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| KestrelError::ConverterFailure(format!("base64 decoded to invalid UTF-8: {}", e)))
}

pub fn rot13(text: &str) -> Result<String, KestrelError> {
    Ok(text
        .chars()
        .map(|c| match c {
            'a'..='z' => (((c as u8 - b'a' + 13) % 26) + b'a') as char,
            'A'..='Z' => (((c as u8 - b'A' + 13) % 26) + b'A') as char,
            other => other,
        })
        .collect())
}

pub fn hex_encode(text: &str) -> Result<String, KestrelError> {
    Ok(HEXLOWER_PERMISSIVE.encode(text.as_bytes()))
}

pub fn hex_decode(text: &str) -> Result<String, KestrelError> {
    let cleaned: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = HEXLOWER_PERMISSIVE
        .decode(cleaned.as_bytes())
        .map_err(|e| KestrelError::ConverterFailure(format!("invalid hex input: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| KestrelError::ConverterFailure(format!("hex decoded to invalid UTF-8: {}", e)))
}

pub fn leetspeak(text: &str) -> Result<String, KestrelError> {
    Ok(text
        .chars()
        .map(|c| match c.to_ascii_lowercase() {
            'a' => '4',
            'e' => '3',
            'i' => '1',
            'o' => '0',
            's' => '5',
            't' => '7',
            _ => c,
        })
        .collect())
}

/// Interleave zero-width spaces between characters to break naive keyword
/// filters.
pub fn zero_width_insert(text: &str) -> Result<String, KestrelError> {
    const ZWSP: char = '\u{200b}';
    let mut out = String::with_capacity(text.len() * 2);
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        out.push(c);
        if chars.peek().is_some() && !c.is_whitespace() {
            out.push(ZWSP);
        }
    }
    Ok(out)
}

pub fn unicode_escape(text: &str) -> Result<String, KestrelError> {
    Ok(text.chars().map(|c| format!("\\u{{{:04x}}}", c as u32)).collect())
}

pub fn json_string_escape(text: &str) -> Result<String, KestrelError> {
    serde_json::to_string(text).map_err(|e| KestrelError::ConverterFailure(format!("json escape failed: {}", e)))
}

pub fn reverse_words(text: &str) -> Result<String, KestrelError> {
    Ok(text.split_whitespace().rev().collect::<Vec<_>>().join(" "))
}

pub fn pig_latin(text: &str) -> Result<String, KestrelError> {
    const VOWELS: &[char] = &['a', 'e', 'i', 'o', 'u', 'A', 'E', 'I', 'O', 'U'];
    Ok(text
        .split_whitespace()
        .map(|word| {
            let first = word.chars().next();
            match first {
                Some(c) if VOWELS.contains(&c) => format!("{}-way", word),
                Some(c) => {
                    let rest: String = word.chars().skip(1).collect();
                    format!("{}-{}ay", rest, c)
                }
                None => word.to_string(),
            }
        })
        .collect::<Vec<_>>()
        .join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base64_round_trips() {
        let encoded = base64_encode("hack").unwrap();
        assert_eq!(encoded, "aGFjaw==");
        assert_eq!(base64_decode(&encoded).unwrap(), "hack");
    }

    #[test]
    fn base64_decode_rejects_invalid_chars() {
        assert!(base64_decode("not valid!!").is_err());
    }

    #[test]
    fn rot13_is_involutive() {
        let text = "Attack Plan";
        assert_eq!(rot13(&rot13(text).unwrap()).unwrap(), text);
    }

    #[test]
    fn hex_round_trips() {
        let encoded = hex_encode("hi").unwrap();
        assert_eq!(hex_decode(&encoded).unwrap(), "hi");
    }

    #[test]
    fn leetspeak_substitutes_known_letters() {
        assert_eq!(leetspeak("elite").unwrap(), "3l173");
    }
}
