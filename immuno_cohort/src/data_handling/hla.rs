use std::sync::OnceLock;

use regex::Regex;

fn allele_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        // Longer loci first so "DRB1" is never read as "DRA" plus digits.
        Regex::new(
            r"^(?:HLA-?)?(DRB[1-9]|DQA1|DQB1|DPA1|DPB1|DRA|A|B|C|E|F|G)\*?([0-9][0-9:]*)[A-Z]?$",
        )
        .expect("static allele regex")
    })
}

/// Canonicalizes an HLA allele name to `HLA-<locus>*<family>:<allele>`.
///
/// Accepts the usual spellings (`A*02:01`, `HLA-A0201`, `hla-a*02:01:01:02`,
/// `B5701`) and drops anything past the second field. Returns `None` when the
/// token is not recognisable as an allele.
pub fn normalize_hla_allele_name(raw: &str) -> Option<String> {
    let upper = raw.trim().to_uppercase();
    let caps = allele_pattern().captures(&upper)?;
    let locus = &caps[1];
    let digits = &caps[2];

    let (family, allele) = if digits.contains(':') {
        let mut fields = digits.split(':');
        let family = fields.next()?;
        let allele = fields.next()?;
        (family.to_string(), allele.to_string())
    } else {
        match digits.len() {
            0..=3 => return None,
            5 => (digits[..2].to_string(), digits[2..].to_string()),
            _ => (digits[..2].to_string(), digits[2..4].to_string()),
        }
    };

    let valid_field = |f: &str| (2..=3).contains(&f.len()) && f.chars().all(|c| c.is_ascii_digit());
    if !valid_field(&family) || !valid_field(&allele) {
        return None;
    }
    Some(format!("HLA-{locus}*{family}:{allele}"))
}

/// Splits `.hla` file contents on newlines and commas. Blank tokens are dropped;
/// every other token is returned trimmed, in file order.
pub fn split_allele_tokens(contents: &str) -> impl Iterator<Item = &str> {
    contents
        .split('\n')
        .flat_map(|line| line.split(','))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}
