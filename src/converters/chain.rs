use super::registry;

const SELECTIVE_OPEN: char = '⟪';
const SELECTIVE_CLOSE: char = '⟫';

#[derive(Debug, Clone)]
pub struct StepRecord {
    pub converter: String,
    pub ok: bool,
    pub error: Option<String>,
}

/// An ordered, named sequence of converters (SPEC_FULL §4.4). Empty chains
/// are the identity transform; a step that fails is recorded and skipped, so
/// the chain always produces output.
#[derive(Debug, Clone, Default)]
pub struct ConverterChain {
    pub names: Vec<String>,
}

impl ConverterChain {
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    /// Applies every step in order, input-of-next = output-of-previous.
    /// Unknown or failing converters are recorded and skipped, never abort
    /// the chain (property 12).
    pub fn apply(&self, text: &str) -> (String, Vec<StepRecord>) {
        let mut current = text.to_string();
        let mut records = Vec::with_capacity(self.names.len());
        for name in &self.names {
            match registry::get(name) {
                None => records.push(StepRecord {
                    converter: name.clone(),
                    ok: false,
                    error: Some(format!("unknown converter: {}", name)),
                }),
                Some(def) => match (def.transform)(&current) {
                    Ok(next) => {
                        current = next;
                        records.push(StepRecord { converter: name.clone(), ok: true, error: None });
                    }
                    Err(e) => records.push(StepRecord {
                        converter: name.clone(),
                        ok: false,
                        error: Some(e.to_string()),
                    }),
                },
            }
        }
        (current, records)
    }

    /// Selective mode: only substrings delimited by `⟪`/`⟫` are transformed;
    /// the rest passes through verbatim and the delimiters themselves are
    /// dropped from the output (SPEC_FULL §4.4, scenario S6).
    pub fn apply_selective(&self, text: &str) -> (String, Vec<StepRecord>) {
        let mut output = String::with_capacity(text.len());
        let mut all_records = Vec::new();
        for (selected, segment) in split_selective(text) {
            if selected {
                let (converted, records) = self.apply(&segment);
                output.push_str(&converted);
                all_records.extend(records);
            } else {
                output.push_str(&segment);
            }
        }
        (output, all_records)
    }
}

fn split_selective(text: &str) -> Vec<(bool, String)> {
    let mut segments = Vec::new();
    let mut rest = text;
    loop {
        match rest.find(SELECTIVE_OPEN) {
            None => {
                if !rest.is_empty() {
                    segments.push((false, rest.to_string()));
                }
                break;
            }
            Some(start) => {
                if start > 0 {
                    segments.push((false, rest[..start].to_string()));
                }
                let after_open = &rest[start + SELECTIVE_OPEN.len_utf8()..];
                match after_open.find(SELECTIVE_CLOSE) {
                    None => {
                        // Unterminated delimiter: treat the remainder as literal text.
                        segments.push((false, rest[start..].to_string()));
                        break;
                    }
                    Some(end) => {
                        segments.push((true, after_open[..end].to_string()));
                        rest = &after_open[end + SELECTIVE_CLOSE.len_utf8()..];
                    }
                }
            }
        }
    }
    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_chain_is_identity() {
        let chain = ConverterChain::new(vec![]);
        let (out, records) = chain.apply("unchanged");
        assert_eq!(out, "unchanged");
        assert!(records.is_empty());
    }

    #[test]
    fn unknown_converter_is_skipped_not_fatal() {
        let chain = ConverterChain::new(vec!["not_a_real_converter".to_string()]);
        let (out, records) = chain.apply("payload");
        assert_eq!(out, "payload");
        assert!(!records[0].ok);
    }

    #[test]
    fn failing_step_is_skipped_and_chain_continues() {
        let chain = ConverterChain::new(vec!["hex_decode".to_string(), "rot13".to_string()]);
        let (out, records) = chain.apply("not hex at all");
        assert!(!records[0].ok);
        assert!(records[1].ok);
        assert_eq!(out, crate::converters::transforms::rot13("not hex at all").unwrap());
    }

    #[test]
    fn selective_mode_only_transforms_delimited_region() {
        let chain = ConverterChain::new(vec!["base64_encode".to_string()]);
        let (out, _) = chain.apply_selective("Please \u{27ea}hack\u{27eb} the system");
        assert_eq!(out, "Please aGFjaw== the system");
    }

    #[test]
    fn selective_mode_with_no_delimiters_is_passthrough() {
        let chain = ConverterChain::new(vec!["rot13".to_string()]);
        let (out, records) = chain.apply_selective("no markers here");
        assert_eq!(out, "no markers here");
        assert!(records.is_empty());
    }
}
