//! Model catalog and the allow/deny filter language
//!
//! A filter is a comma-separated token list: `all` selects every enabled
//! catalog entry, `-id` removes an entry, `+id` adds one, and a bare `id`
//! adds it unless `all` is present. Output always follows catalog order.

use std::collections::HashSet;

use crate::types::ModelDescriptor;

/// Literal selecting every enabled catalog entry
const ALL: &str = "all";

/// Resolve `filter` against `catalog`
///
/// Unknown IDs are ignored; the result is a duplicate-free subsequence of
/// the catalog. An empty filter yields every enabled entry.
pub fn resolve(filter: &str, catalog: &[ModelDescriptor]) -> Vec<String> {
    let tokens: Vec<&str> = filter.split(',').map(str::trim).filter(|t| !t.is_empty()).collect();

    if tokens.is_empty() {
        return in_catalog_order(catalog, |model| model.enabled);
    }

    let known: HashSet<&str> = catalog.iter().map(|m| m.id.as_str()).collect();
    let has_all = tokens.contains(&ALL);

    let mut selected: HashSet<&str> = if has_all {
        catalog.iter().filter(|m| m.enabled).map(|m| m.id.as_str()).collect()
    } else {
        HashSet::new()
    };

    for token in tokens {
        if token == ALL {
            continue;
        }

        if let Some(id) = token.strip_prefix('-') {
            selected.remove(id.trim());
        } else if let Some(id) = token.strip_prefix('+') {
            let id = id.trim();
            if known.contains(id) {
                selected.insert(id);
            }
        } else if !has_all && known.contains(token) {
            selected.insert(token);
        }
    }

    in_catalog_order(catalog, |model| selected.contains(model.id.as_str()))
}

/// Render a resolved list as a filter that resolves to exactly that list
pub fn resolve_to_string(ids: &[String]) -> String {
    std::iter::once("-all".to_owned())
        .chain(ids.iter().map(|id| format!("+{id}")))
        .collect::<Vec<_>>()
        .join(",")
}

fn in_catalog_order(catalog: &[ModelDescriptor], keep: impl Fn(&ModelDescriptor) -> bool) -> Vec<String> {
    let mut seen = HashSet::new();

    catalog
        .iter()
        .filter(|model| keep(model))
        .filter(|model| seen.insert(model.id.as_str()))
        .map(|model| model.id.clone())
        .collect()
}

/// Cross-region inference profiles served through the Converse API
const BEDROCK_MODELS: &[(&str, &str)] = &[
    // Amazon Nova
    ("us.amazon.nova-premier-v1:0", "Nova Premier (US)"),
    ("us.amazon.nova-pro-v1:0", "Nova Pro (US)"),
    ("us.amazon.nova-lite-v1:0", "Nova Lite (US)"),
    ("us.amazon.nova-micro-v1:0", "Nova Micro (US)"),
    ("eu.amazon.nova-pro-v1:0", "Nova Pro (EU)"),
    ("eu.amazon.nova-lite-v1:0", "Nova Lite (EU)"),
    ("eu.amazon.nova-micro-v1:0", "Nova Micro (EU)"),
    ("apac.amazon.nova-pro-v1:0", "Nova Pro (APAC)"),
    ("apac.amazon.nova-lite-v1:0", "Nova Lite (APAC)"),
    ("apac.amazon.nova-micro-v1:0", "Nova Micro (APAC)"),
    // Anthropic Claude
    ("us.anthropic.claude-3-7-sonnet-20250219-v1:0", "Claude 3.7 Sonnet (US)"),
    ("eu.anthropic.claude-3-7-sonnet-20250219-v1:0", "Claude 3.7 Sonnet (EU)"),
    ("apac.anthropic.claude-3-7-sonnet-20250219-v1:0", "Claude 3.7 Sonnet (APAC)"),
    ("us.anthropic.claude-3-5-sonnet-20241022-v2:0", "Claude 3.5 Sonnet v2 (US)"),
    ("apac.anthropic.claude-3-5-sonnet-20241022-v2:0", "Claude 3.5 Sonnet v2 (APAC)"),
    ("us.anthropic.claude-3-5-sonnet-20240620-v1:0", "Claude 3.5 Sonnet 0620 (US)"),
    ("apac.anthropic.claude-3-5-sonnet-20240620-v1:0", "Claude 3.5 Sonnet 0620 (APAC)"),
    ("us.anthropic.claude-3-haiku-20240307-v1:0", "Claude 3 Haiku (US)"),
    ("eu.anthropic.claude-3-haiku-20240307-v1:0", "Claude 3 Haiku (EU)"),
    ("apac.anthropic.claude-3-haiku-20240307-v1:0", "Claude 3 Haiku (APAC)"),
    ("us.anthropic.claude-3-sonnet-20240229-v1:0", "Claude 3 Sonnet (US)"),
    ("eu.anthropic.claude-3-sonnet-20240229-v1:0", "Claude 3 Sonnet (EU)"),
    ("apac.anthropic.claude-3-sonnet-20240229-v1:0", "Claude 3 Sonnet (APAC)"),
    ("us.anthropic.claude-3-opus-20240229-v1:0", "Claude 3 Opus (US)"),
    ("us.anthropic.claude-opus-4-20250514-v1:0", "Claude 4 Opus (US)"),
    ("us.anthropic.claude-sonnet-4-20250514-v1:0", "Claude 4 Sonnet (US)"),
    ("eu.anthropic.claude-sonnet-4-20250514-v1:0", "Claude 4 Sonnet (EU)"),
    ("apac.anthropic.claude-sonnet-4-20250514-v1:0", "Claude 4 Sonnet (APAC)"),
    ("us-gov.anthropic.claude-3-5-sonnet-20240620-v1:0", "Claude 3.5 Sonnet (US-Gov)"),
    ("us-gov.anthropic.claude-3-haiku-20240307-v1:0", "Claude 3 Haiku (US-Gov)"),
    // Meta Llama
    ("us.meta.llama3-1-8b-instruct-v1:0", "Llama 3.1 8B Instruct (US)"),
    ("us.meta.llama3-1-70b-instruct-v1:0", "Llama 3.1 70B Instruct (US)"),
    ("us.meta.llama3-1-405b-instruct-v1:0", "Llama 3.1 405B Instruct (US)"),
    ("us.meta.llama3-2-11b-instruct-v1:0", "Llama 3.2 11B Instruct (US)"),
    ("us.meta.llama3-2-1b-instruct-v1:0", "Llama 3.2 1B Instruct (US)"),
    ("eu.meta.llama3-2-1b-instruct-v1:0", "Llama 3.2 1B Instruct (EU)"),
    ("us.meta.llama3-2-3b-instruct-v1:0", "Llama 3.2 3B Instruct (US)"),
    ("eu.meta.llama3-2-3b-instruct-v1:0", "Llama 3.2 3B Instruct (EU)"),
    ("us.meta.llama3-2-90b-instruct-v1:0", "Llama 3.2 90B Instruct (US)"),
    ("us.meta.llama3-3-70b-instruct-v1:0", "Llama 3.3 70B Instruct (US)"),
    ("us.meta.llama4-maverick-17b-instruct-v1:0", "Llama 4 Maverick 17B Instruct (US)"),
    ("us.meta.llama4-scout-17b-instruct-v1:0", "Llama 4 Scout 17B Instruct (US)"),
    // DeepSeek
    ("us.deepseek.r1-v1:0", "DeepSeek R1 (US)"),
    // Mistral
    ("us.mistral.pixtral-large-2502-v1:0", "Pixtral Large 2502 (US)"),
    ("eu.mistral.pixtral-large-2502-v1:0", "Pixtral Large 2502 (EU)"),
];

/// Default Bedrock chat catalog, all entries enabled
pub fn bedrock_catalog() -> Vec<ModelDescriptor> {
    BEDROCK_MODELS
        .iter()
        .map(|(id, name)| ModelDescriptor {
            id: (*id).to_owned(),
            enabled: true,
            display_name: Some((*name).to_owned()),
        })
        .collect()
}
