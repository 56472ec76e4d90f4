//! Semantic taggers: obligation level, canonical statement, references,
//! topical category, evidence query and section breadcrumbs

use aho_corasick::AhoCorasick;
use regex::Regex;
use specsieve_core::{Block, NormativeStrength};
use std::sync::LazyLock;

use crate::normalize::{extract_criteria, format_value};

static MUST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(shall|must)\b").expect("valid must regex"));

static SHOULD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bshould\b").expect("valid should regex"));

static MAY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bmay\b").expect("valid may regex"));

static OBLIGATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(shall|must|should|will)\b").expect("valid obligation regex")
});

static INLINE_VERIFICATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Verification method:\s*(.*?)\.").expect("valid verification regex")
});

static REFERENCE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)\bIEC\s+\d+(?:-\d+)*(?::\d{4})?\b",
        r"(?i)\bISO\s+\d+(?:-\d+)*(?::\d{4})?\b",
        r"(?i)\bDIN\s+\d+(?:-\d+)*\b",
        r"(?i)\bUL\s+\d+(?:-\d+)*\b",
        r"(?i)\bCSA\s+[A-Z]+-\d+(?:-\d+)*\b",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("valid reference regex"))
    .collect()
});

static WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\w+\b").expect("valid word regex"));

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

/// Categories in precedence order with their trigger phrases
const CATEGORIES: &[(&str, &[&str])] = &[
    (
        "environmental",
        &[
            "ip54", "ip55", "ip56", "enclosure protection", "ingress protection", "humidity",
            "altitude", "environmental", "climate", "weather", "corrosion", "coating", "sealing",
            "ingress", "operating temperature", "ambient temperature", "storage temperature",
        ],
    ),
    (
        "electrical",
        &[
            "voltage", "current", "power", "electrical", "insulation", "conductor", "winding",
            "stator", "rotor", "terminal", "connection", "earthing", "grounding", "isolation",
            "dielectric", "breakdown", "surge", "overvoltage",
        ],
    ),
    (
        "mechanical",
        &[
            "vibration", "mechanical", "shaft", "bearing", "housing", "mounting", "coupling",
            "alignment", "balancing", "deflection", "forces", "torque", "speed", "rpm",
            "rotation", "clearance", "tolerance", "dimension",
        ],
    ),
    (
        "control",
        &[
            "encoder", "sensor monitoring", "control system", "feedback", "signal",
            "instrumentation", "measurement", "alarm", "trip", "pt100", "thermocouple",
            "pressure sensor", "flow sensor",
        ],
    ),
    (
        "safety",
        &[
            "safety", "emergency", "stop", "shutdown", "interlock", "guard", "barrier", "hazard",
            "risk", "fail-safe", "redundancy",
        ],
    ),
];

struct CategoryMatcher {
    automaton: AhoCorasick,
    /// Category rank of each pattern
    ranks: Vec<usize>,
}

static CATEGORY_MATCHER: LazyLock<CategoryMatcher> = LazyLock::new(|| {
    let mut patterns = Vec::new();
    let mut ranks = Vec::new();
    for (rank, (_, keywords)) in CATEGORIES.iter().enumerate() {
        for keyword in *keywords {
            patterns.push(*keyword);
            ranks.push(rank);
        }
    }
    let automaton = AhoCorasick::builder()
        .ascii_case_insensitive(true)
        .build(&patterns)
        .expect("valid category keyword automaton");
    CategoryMatcher { automaton, ranks }
});

const STOPWORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
    "shall", "must", "should", "may", "will", "be", "is", "are", "was", "were", "have", "has",
    "had", "do", "does", "did",
];

const SALIENT_TOKENS: &[&str] = &["ip54", "ip55", "ip56", "kv", "rpm", "hz", "degc"];

const DOMAIN_STEMS: &[&str] = &[
    "protection", "enclosure", "voltage", "current", "vibration", "bearing", "stator", "rotor",
    "winding",
];

const MAX_QUERY_LEN: usize = 120;

/// Obligation level from keyword presence
pub fn normative_strength(text: &str) -> Option<NormativeStrength> {
    if MUST.is_match(text) {
        Some(NormativeStrength::Must)
    } else if SHOULD.is_match(text) {
        Some(NormativeStrength::Should)
    } else if MAY.is_match(text) {
        Some(NormativeStrength::May)
    } else {
        None
    }
}

/// `shall`, `must`, `should` or `will` as a whole word
pub fn has_obligation_keyword(text: &str) -> bool {
    OBLIGATION.is_match(text)
}

/// Subject-prefixed obligation sentence
///
/// Text already starting with the subject or with "The", or already
/// containing `shall`/`must`, is returned as is.
pub fn canonicalize(subject: &str, raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return format!("The {subject} shall comply with unspecified requirements.");
    }

    let subject_lower = subject.to_lowercase();
    let raw_lower = raw.to_lowercase();
    let already_canonical = raw_lower.starts_with(&format!("the {subject_lower}"))
        || raw_lower.starts_with(&format!("{subject_lower} "))
        || raw_lower.starts_with("the ")
        || raw_lower.contains(" shall ")
        || raw_lower.contains(" must ");
    if already_canonical {
        return raw.to_string();
    }

    let mut chars = raw.chars();
    let first: String = chars.next().map(|c| c.to_lowercase().collect()).unwrap_or_default();
    format!("The {subject} shall {first}{}", chars.as_str())
}

/// Standards citations (IEC, ISO, DIN, UL, CSA), first occurrence order
pub fn collect_references(text: &str) -> Vec<String> {
    let mut references: Vec<String> = Vec::new();
    for pattern in REFERENCE_PATTERNS.iter() {
        for m in pattern.find_iter(text) {
            if !references.iter().any(|r| r == m.as_str()) {
                references.push(m.as_str().to_string());
            }
        }
    }
    references
}

/// Topical category by keyword, first matching category in precedence order
pub fn guess_category(section_path: &[String], text: &str) -> Option<String> {
    let mut combined = section_path.join(" ");
    if !combined.is_empty() {
        combined.push(' ');
    }
    combined.push_str(text);

    let matcher = &*CATEGORY_MATCHER;
    matcher
        .automaton
        .find_overlapping_iter(&combined)
        .map(|m| matcher.ranks[m.pattern().as_usize()])
        .min()
        .map(|rank| CATEGORIES[rank].0.to_string())
}

/// Short search query for evidence lookup
pub fn make_evidence_query(subject: &str, canonical: &str, references: &[String]) -> String {
    if canonical.trim().is_empty() {
        return format!("{subject} requirement");
    }

    let subject_lower = subject.to_lowercase();
    let lowered = canonical.to_lowercase();
    let mut scored: Vec<(u32, &str)> = WORD
        .find_iter(&lowered)
        .map(|m| m.as_str())
        .filter(|token| token.chars().count() > 2 && !STOPWORDS.contains(token))
        .map(|token| (token_score(token, &subject_lower), token))
        .collect();
    scored.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(b.1)));
    let selected: Vec<&str> = scored.iter().take(6).map(|(_, token)| *token).collect();

    let numeric: Vec<String> = extract_criteria(canonical)
        .iter()
        .take(2)
        .map(|c| {
            let comparator = c.comparator.map(|cmp| cmp.symbol()).unwrap_or("=");
            let value = c.value.map(format_value).unwrap_or_default();
            format!("{comparator} {value} {}", c.unit.as_deref().unwrap_or(""))
                .trim()
                .to_string()
        })
        .collect();

    let mut parts: Vec<&str> = vec![subject];
    parts.extend(selected.iter().take(4));
    parts.extend(numeric.iter().map(String::as_str));
    parts.extend(references.iter().take(2).map(String::as_str));

    let query = WHITESPACE.replace_all(&parts.join(" "), " ").trim().to_string();
    if query.chars().count() <= MAX_QUERY_LEN {
        return query;
    }

    let mut safe: Vec<&str> = vec![subject];
    safe.extend(selected.iter().take(3));
    if let Some(first) = references.first() {
        safe.push(first);
    }
    safe.join(" ")
}

fn token_score(token: &str, subject_lower: &str) -> u32 {
    let mut score = 1;
    if token.starts_with(|c: char| c.is_ascii_digit()) || SALIENT_TOKENS.contains(&token) {
        score += 3;
    }
    if DOMAIN_STEMS.iter().any(|stem| token.contains(stem)) {
        score += 2;
    }
    if token.contains(subject_lower) || subject_lower.contains(token) {
        score += 2;
    }
    score
}

/// Strip an inline `Verification method: X.` clause
///
/// Returns the text before the clause and the method, or the text
/// unchanged when there is none.
pub fn split_inline_verification(text: &str) -> (String, Option<String>) {
    match INLINE_VERIFICATION.captures(text) {
        Some(caps) => {
            let start = caps.get(0).map_or(text.len(), |m| m.start());
            let method = caps.get(1).map(|m| m.as_str().trim().to_string());
            (text[..start].trim().to_string(), method)
        }
        None => (text.to_string(), None),
    }
}

/// Heading stack giving the breadcrumb in force at each block
#[derive(Debug, Clone, Default)]
pub struct SectionTracker {
    stack: Vec<(u32, String)>,
}

impl SectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a block; headings update the stack
    pub fn update(&mut self, block: &Block) -> Vec<String> {
        if let Block::Heading { level, text } = block {
            let text = text.trim();
            if !text.is_empty() {
                while self.stack.last().is_some_and(|(l, _)| l >= level) {
                    self.stack.pop();
                }
                self.stack.push((*level, text.to_string()));
            }
        }
        self.path()
    }

    pub fn path(&self) -> Vec<String> {
        self.stack.iter().map(|(_, text)| text.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normative_strength() {
        assert_eq!(normative_strength("The generator SHALL run"), Some(NormativeStrength::Must));
        assert_eq!(normative_strength("Second req, must be good."), Some(NormativeStrength::Must));
        assert_eq!(normative_strength("It should be blue"), Some(NormativeStrength::Should));
        assert_eq!(normative_strength("Supplier may deviate"), Some(NormativeStrength::May));
        assert_eq!(normative_strength("First req."), None);
        assert_eq!(normative_strength("Mayor of town"), None);
    }

    #[test]
    fn test_canonicalize() {
        assert_eq!(canonicalize("generator", "Be quiet."), "The generator shall be quiet.");
        assert_eq!(canonicalize("generator", "The stator is wound."), "The stator is wound.");
        assert_eq!(canonicalize("generator", "generator runs"), "generator runs");
        assert_eq!(canonicalize("generator", "Coolers must be red"), "Coolers must be red");
        assert_eq!(
            canonicalize("generator", "  "),
            "The generator shall comply with unspecified requirements."
        );
    }

    #[test]
    fn test_canonicalize_is_idempotent() {
        for raw in ["Be quiet.", "", "Émettre 5 V", "x"] {
            let once = canonicalize("supplier", raw);
            assert_eq!(canonicalize("supplier", &once), once);
        }
    }

    #[test]
    fn test_collect_references() {
        let refs = collect_references("Per IEC 60034-1:2017 and iso 8528-5, IEC 60034-1:2017, CSA C22-2 and UL 1004");
        assert_eq!(refs, vec!["IEC 60034-1:2017", "iso 8528-5", "UL 1004"]);
        let refs = collect_references("CSA C-22 applies");
        assert_eq!(refs, vec!["CSA C-22"]);
    }

    #[test]
    fn test_guess_category_precedence() {
        assert_eq!(guess_category(&[], "Bearing vibration").as_deref(), Some("mechanical"));
        // environmental wins over electrical
        assert_eq!(
            guess_category(&[], "Stator winding with IP55 enclosure").as_deref(),
            Some("environmental")
        );
        assert_eq!(
            guess_category(&["Safety".to_string()], "Provide an emergency stop").as_deref(),
            Some("safety")
        );
        assert_eq!(guess_category(&[], "Paint it blue"), None);
    }

    #[test]
    fn test_evidence_query() {
        let query = make_evidence_query(
            "generator",
            "The generator shall limit bearing vibration to 1.8 mm/s",
            &["ISO 10816-3".to_string()],
        );
        assert!(query.starts_with("generator "));
        assert!(query.contains("vibration"));
        assert!(query.contains("= 1.8 mm_per_s"));
        assert!(query.ends_with("ISO 10816-3"));

        assert_eq!(make_evidence_query("supplier", " ", &[]), "supplier requirement");
    }

    #[test]
    fn test_evidence_query_length_cap() {
        let word = "extraordinarilyextraordinarily";
        let long = format!("{} 1.0 V 2.0 V", [word; 6].join(" "));
        let refs = vec!["IEC 60034-1".to_string(), "ISO 8528-5".to_string()];
        let query = make_evidence_query("generator", &long, &refs);
        assert_eq!(query, format!("generator {word} {word} {word} IEC 60034-1"));
    }

    #[test]
    fn test_split_inline_verification() {
        let (body, method) = split_inline_verification("Paint all parts. Verification method: Inspection. Extra");
        assert_eq!(body, "Paint all parts.");
        assert_eq!(method.as_deref(), Some("Inspection"));

        let (body, method) = split_inline_verification("No clause here");
        assert_eq!(body, "No clause here");
        assert_eq!(method, None);
    }

    #[test]
    fn test_section_tracker() {
        let mut tracker = SectionTracker::new();
        tracker.update(&Block::heading(1, "Electrical"));
        assert_eq!(tracker.update(&Block::heading(2, "Insulation")), vec!["Electrical", "Insulation"]);
        assert_eq!(tracker.update(&Block::heading(2, "Cooling")), vec!["Electrical", "Cooling"]);
        assert_eq!(tracker.update(&Block::heading(2, "  ")), vec!["Electrical", "Cooling"]);
        assert_eq!(tracker.update(&Block::paragraph("x")), vec!["Electrical", "Cooling"]);
        assert_eq!(tracker.update(&Block::heading(1, "Mechanical")), vec!["Mechanical"]);
    }
}
