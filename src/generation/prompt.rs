/// Augment a concept prompt with the fixed kiosk qualifiers.
///
/// Pure function of `(concept_prompt, aspect_ratio)`; the qualifiers pin
/// resolution, framing and identity so concept authors only describe style.
pub fn build_prompt(concept_prompt: &str, aspect_ratio: &str) -> String {
    format!(
        "{concept_prompt}. Render a high-resolution photographic image in a {aspect_ratio} \
         aspect ratio with balanced, natural lighting. Preserve the subject's identity, \
         facial features and pose. Do not add any text, captions or watermarks."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_deterministic() {
        assert_eq!(
            build_prompt("cyberpunk portrait", "9:16"),
            build_prompt("cyberpunk portrait", "9:16")
        );
    }

    #[test]
    fn carries_concept_aspect_and_qualifiers() {
        let prompt = build_prompt("cyberpunk portrait", "9:16");
        assert!(prompt.starts_with("cyberpunk portrait"));
        assert!(prompt.contains("9:16"));
        assert!(prompt.contains("identity"));
        assert!(prompt.contains("watermark"));

        let landscape = build_prompt("cyberpunk portrait", "16:9");
        assert!(landscape.contains("16:9"));
        assert_ne!(prompt, landscape);
    }
}
