use serde::{Deserialize, Serialize};

use super::domain::{LineItem, PricingRule};

/// Which selection tier produced a rule match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "tier")]
pub enum MatchTier {
    ServiceCode,
    Keywords { score: usize },
    Fallback,
}

/// Rule selected for a line item, borrowed from the caller's rule list.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RuleMatch<'a> {
    pub rule: &'a PricingRule,
    pub index: usize,
    pub tier: MatchTier,
}

/// Select the single best rule for `item`.
///
/// Tiers run in order and the first tier with a result wins outright:
/// 1. case-insensitive service code equality, first rule in input order;
/// 2. keyword score, highest strictly-greater score, so ties keep the earlier rule;
/// 3. the first rule carrying any price term.
pub fn match_rule<'a>(item: &LineItem, rules: &'a [PricingRule]) -> Option<RuleMatch<'a>> {
    by_service_code(item, rules)
        .or_else(|| by_keywords(item, rules))
        .or_else(|| by_fallback(rules))
}

fn by_service_code<'a>(item: &LineItem, rules: &'a [PricingRule]) -> Option<RuleMatch<'a>> {
    let service_code = item
        .service_code
        .as_deref()
        .unwrap_or_default()
        .to_lowercase();

    rules.iter().enumerate().find_map(|(index, rule)| {
        let rule_code = rule.service_code.as_deref().unwrap_or_default().to_lowercase();
        (!rule_code.is_empty() && rule_code == service_code).then_some(RuleMatch {
            rule,
            index,
            tier: MatchTier::ServiceCode,
        })
    })
}

fn by_keywords<'a>(item: &LineItem, rules: &'a [PricingRule]) -> Option<RuleMatch<'a>> {
    let description = item.description.to_lowercase();
    let mut best: Option<RuleMatch<'a>> = None;
    let mut best_score = 0;

    for (index, rule) in rules.iter().enumerate() {
        let Some(score) = keyword_score(&description, rule) else {
            continue;
        };
        if score > best_score {
            best_score = score;
            best = Some(RuleMatch {
                rule,
                index,
                tier: MatchTier::Keywords { score },
            });
        }
    }

    best
}

fn by_fallback(rules: &[PricingRule]) -> Option<RuleMatch<'_>> {
    rules
        .iter()
        .enumerate()
        .find(|(_, rule)| rule.has_price_terms())
        .map(|(index, rule)| RuleMatch {
            rule,
            index,
            tier: MatchTier::Fallback,
        })
}

/// Keyword score of `rule` against an already case-folded description.
///
/// Each keyword found as a substring is worth 10 plus its character length. Returns `None`
/// when the rule has no usable keywords or none of them match.
pub fn keyword_score(description: &str, rule: &PricingRule) -> Option<usize> {
    let keywords: Vec<String> = rule
        .keywords
        .iter()
        .map(|keyword| keyword.trim().to_lowercase())
        .filter(|keyword| !keyword.is_empty())
        .collect();

    let matched: Vec<&String> = keywords
        .iter()
        .filter(|keyword| description.contains(keyword.as_str()))
        .collect();

    if matched.is_empty() {
        return None;
    }

    let length: usize = matched.iter().map(|keyword| keyword.chars().count()).sum();
    Some(matched.len() * 10 + length)
}
