use std::borrow::Cow;

/// Known Turkish edit instructions and the English prompt sent instead.
/// Keys are stored trimmed and lower-cased.
const PHRASES: &[(&str, &str)] = &[
    ("arka planı plaj yap", "Change the background to a sunny beach"),
    ("arka planı kaldır", "Remove the background"),
    ("arka planı bulanıklaştır", "Blur the background"),
    ("arka planı beyaz yap", "Make the background plain white"),
    ("arka planı orman yap", "Change the background to a lush forest"),
    ("arka planı şehir yap", "Change the background to a city skyline"),
    ("arka planı uzay yap", "Change the background to outer space"),
    ("gökyüzünü gün batımı yap", "Turn the sky into a sunset"),
    ("nesneyi kaldır", "Remove the selected object"),
    ("kişiyi kaldır", "Remove the person"),
    ("siyah beyaz yap", "Make the image black and white"),
    ("karlı yap", "Make the scene snowy"),
    ("gece yap", "Make it night time"),
];

/// Rewrite a known local-language instruction into its English prompt
///
/// Matching ignores case and surrounding whitespace. Anything not in the
/// table is returned exactly as given.
pub fn translate_instruction(instruction: &str) -> Cow<'_, str> {
    let key = normalize(instruction);
    match PHRASES.iter().find(|(phrase, _)| *phrase == key) {
        Some((_, english)) => {
            tracing::debug!("Translated instruction {:?} -> {:?}", instruction, english);
            Cow::Borrowed(*english)
        }
        None => Cow::Borrowed(instruction),
    }
}

fn normalize(instruction: &str) -> String {
    // Turkish casing: İ -> i, I -> ı
    instruction
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .replace('İ', "i")
        .replace('I', "ı")
        .to_lowercase()
}
