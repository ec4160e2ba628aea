use crate::errors::KestrelError;
use super::transforms;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConverterCategory {
    Encoding,
    Obfuscation,
    Escape,
    Linguistic,
    Selective,
}

pub struct ConverterDef {
    pub name: &'static str,
    pub category: ConverterCategory,
    pub transform: fn(&str) -> Result<String, KestrelError>,
}

static CONVERTERS: &[ConverterDef] = &[
    ConverterDef { name: "base64_encode", category: ConverterCategory::Encoding, transform: transforms::base64_encode },
    ConverterDef { name: "base64_decode", category: ConverterCategory::Encoding, transform: transforms::base64_decode },
    ConverterDef { name: "hex_encode", category: ConverterCategory::Encoding, transform: transforms::hex_encode },
    ConverterDef { name: "hex_decode", category: ConverterCategory::Encoding, transform: transforms::hex_decode },
    ConverterDef { name: "rot13", category: ConverterCategory::Obfuscation, transform: transforms::rot13 },
    ConverterDef { name: "leetspeak", category: ConverterCategory::Obfuscation, transform: transforms::leetspeak },
    ConverterDef { name: "zero_width_insert", category: ConverterCategory::Obfuscation, transform: transforms::zero_width_insert },
    ConverterDef { name: "unicode_escape", category: ConverterCategory::Escape, transform: transforms::unicode_escape },
    ConverterDef { name: "json_string_escape", category: ConverterCategory::Escape, transform: transforms::json_string_escape },
    ConverterDef { name: "reverse_words", category: ConverterCategory::Linguistic, transform: transforms::reverse_words },
    ConverterDef { name: "pig_latin", category: ConverterCategory::Linguistic, transform: transforms::pig_latin },
];

pub fn get(name: &str) -> Option<&'static ConverterDef> {
    CONVERTERS.iter().find(|c| c.name == name)
}

pub fn list() -> &'static [ConverterDef] {
    CONVERTERS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_finds_registered_converter() {
        assert!(get("base64_encode").is_some());
    }

    #[test]
    fn get_returns_none_for_unknown_name() {
        assert!(get("not_a_real_converter").is_none());
    }

    #[test]
    fn list_is_nonempty() {
        assert!(!list().is_empty());
    }
}
