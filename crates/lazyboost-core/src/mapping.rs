//! Vocabulary mapping from Shopify listings onto Etsy listing fields.
//!
//! Everything here is a pure lookup over static tables or an ordered rule
//! list. Shipping profile and shop section ids belong to the LazyBoost shop
//! on Etsy; taxonomy ids come from Etsy's seller taxonomy.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::MappingError;

/// Product type that gets its own shipping profile and never auto-renews.
pub const BOWS: &str = "bows";

/// Listings priced strictly below this use the standard shipping profile.
pub const PRICE_TIER_THRESHOLD: f64 = 35.0;

pub const SHIPPING_PROFILE_BOWS: u64 = 191_473_617_021;
pub const SHIPPING_PROFILE_STANDARD: u64 = 191_473_501_388;
pub const SHIPPING_PROFILE_PREMIUM: u64 = 191_473_589_044;

/// Etsy caps a listing at 13 materials and 13 tags.
pub const MAX_MATERIALS: usize = 13;
pub const MAX_TAGS: usize = 13;
/// Etsy rejects tags longer than this.
pub const MAX_TAG_LEN: usize = 20;

/// Shopify product type → Etsy seller taxonomy id.
const TAXONOMY: &[(&str, u64)] = &[
    ("bandanas", 1_147),
    ("bows", 1_148),
    ("bow ties", 1_148),
    ("collars", 1_150),
    ("leashes", 1_153),
    ("harnesses", 1_152),
    ("scrunchies", 183),
    ("blankets", 1_911),
    ("toys", 1_161),
];

fn normalize_type(product_type: &str) -> String {
    product_type.trim().to_lowercase()
}

/// Etsy taxonomy id for a Shopify product type. Unknown types are a
/// mapping error for that listing.
pub fn taxonomy_id(product_type: &str) -> Result<u64, MappingError> {
    let key = normalize_type(product_type);
    TAXONOMY
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, id)| *id)
        .ok_or_else(|| MappingError::UnknownProductType(product_type.to_string()))
}

pub fn is_bows(product_type: &str) -> bool {
    normalize_type(product_type) == BOWS
}

/// Bows always ship on their own profile; everything else is tiered by
/// price.
pub fn shipping_profile_id(product_type: &str, price: f64) -> u64 {
    if is_bows(product_type) {
        SHIPPING_PROFILE_BOWS
    } else if price < PRICE_TIER_THRESHOLD {
        SHIPPING_PROFILE_STANDARD
    } else {
        SHIPPING_PROFILE_PREMIUM
    }
}

/// Bows are restocked by hand and never auto-renew.
pub fn should_auto_renew(product_type: &str) -> bool {
    !is_bows(product_type)
}

/// Sections of the Etsy shop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShopSection {
    Bows,
    Halloween,
    Fall,
    Spring,
    Patriotic,
    Summer,
    MothersDay,
    Holiday,
    Pets,
    General,
}

impl ShopSection {
    pub fn id(self) -> u64 {
        match self {
            ShopSection::Bows => 42_118_203,
            ShopSection::Halloween => 42_118_211,
            ShopSection::Fall => 42_118_219,
            ShopSection::Spring => 42_118_227,
            ShopSection::Patriotic => 42_118_235,
            ShopSection::Summer => 42_118_243,
            ShopSection::MothersDay => 42_118_251,
            ShopSection::Holiday => 42_118_259,
            ShopSection::Pets => 42_118_267,
            ShopSection::General => 42_118_275,
        }
    }
}

/// One step of the section cascade: any keyword found in any tag selects
/// `section`.
#[derive(Debug, Clone, Copy)]
pub struct SectionRule {
    pub keywords: &'static [&'static str],
    pub section: ShopSection,
}

impl SectionRule {
    /// Case-insensitive substring match against every tag.
    pub fn matches(&self, tags: &[String]) -> bool {
        tags.iter().any(|tag| {
            let tag = tag.to_lowercase();
            self.keywords.iter().any(|k| tag.contains(k))
        })
    }
}

/// Evaluated top to bottom; the first matching rule wins.
pub const SECTION_RULES: &[SectionRule] = &[
    SectionRule {
        keywords: &["bow"],
        section: ShopSection::Bows,
    },
    SectionRule {
        keywords: &["halloween"],
        section: ShopSection::Halloween,
    },
    SectionRule {
        keywords: &["fall"],
        section: ShopSection::Fall,
    },
    SectionRule {
        keywords: &["spring"],
        section: ShopSection::Spring,
    },
    SectionRule {
        keywords: &["patriotic", "4th of july", "usa", "america"],
        section: ShopSection::Patriotic,
    },
    SectionRule {
        keywords: &["summer"],
        section: ShopSection::Summer,
    },
    SectionRule {
        keywords: &["mother"],
        section: ShopSection::MothersDay,
    },
    SectionRule {
        keywords: &["christmas", "holiday", "winter"],
        section: ShopSection::Holiday,
    },
    SectionRule {
        keywords: &["dog", "cat", "pet", "puppy", "kitten"],
        section: ShopSection::Pets,
    },
];

pub fn shop_section(tags: &[String]) -> ShopSection {
    SECTION_RULES
        .iter()
        .find(|rule| rule.matches(tags))
        .map_or(ShopSection::General, |rule| rule.section)
}

pub fn shop_section_id(tags: &[String]) -> u64 {
    shop_section(tags).id()
}

static MADE_WITH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bis made (?:with|on)\b").expect("materials pattern is valid")
});

static FRAGMENT_SPLIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i),|\band\b").expect("fragment pattern is valid"));

/// Best-effort materials list from a product description.
///
/// Looks for the first sentence saying the item "is made with" or "is made
/// on" and splits what follows on commas and "and". The output is a
/// suggestion; odd phrasing produces odd materials.
pub fn extract_materials(description: &str) -> Vec<String> {
    let Some(sentence) = description
        .split(['.', '!', '?', '\n'])
        .find(|s| MADE_WITH.is_match(s))
    else {
        return Vec::new();
    };
    let Some(found) = MADE_WITH.find(sentence) else {
        return Vec::new();
    };

    let mut seen = BTreeSet::new();
    FRAGMENT_SPLIT
        .split(&sentence[found.end()..])
        .map(|fragment| title_case(fragment.trim()))
        .filter(|m| !m.is_empty())
        .filter(|m| seen.insert(m.to_lowercase()))
        .take(MAX_MATERIALS)
        .collect()
}

/// Shopify tags that Etsy will accept, in their original order.
pub fn etsy_tags(tags: &[String]) -> Vec<String> {
    tags.iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty() && t.chars().count() <= MAX_TAG_LEN)
        .map(str::to_string)
        .take(MAX_TAGS)
        .collect()
}

fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}
