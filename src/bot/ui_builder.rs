//! UI Builder module for formatting bot messages

use std::sync::Arc;

use teloxide::utils::html::escape;

use crate::config::SearchConfig;
use crate::localization::{t_args_lang, t_lang, LocalizationManager};
use crate::tours::Tour;

/// Maximum title length on an offer card
pub const MAX_TITLE_CHARS: usize = 50;

const ELLIPSIS: char = '…';

/// Render one tour as an HTML offer card
pub fn format_tour_message(
    tour: &Tour,
    localization: &Arc<LocalizationManager>,
    language_code: Option<&str>,
) -> String {
    let direct = if tour.flight_is_direct {
        t_lang(localization, "tour-direct", language_code)
    } else {
        t_lang(localization, "tour-transfers", language_code)
    };

    let mut lines = vec![
        format!("🏨 {}", escape(&shorten(&tour.title, MAX_TITLE_CHARS))),
        format!(
            "📅 {}: {}",
            t_lang(localization, "tour-departure", language_code),
            escape(&tour.departure_date)
        ),
        format!(
            "🌙 {}: {}",
            t_lang(localization, "tour-nights", language_code),
            tour.nights
        ),
        format!(
            "💰 {}: {} {}",
            t_lang(localization, "tour-price", language_code),
            format_price(tour.price),
            escape(&tour.currency)
        ),
        format!("✈️ {}", direct),
    ];
    if let Some(url) = tour.url.as_deref().filter(|u| !u.is_empty()) {
        lines.push(format!(
            "🔗 {}: {}",
            t_lang(localization, "tour-link", language_code),
            escape(url)
        ));
    }

    lines.join("\n")
}

/// Group thousands with spaces: `61234` -> `61 234`
pub fn format_price(price: u64) -> String {
    let digits = price.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(' ');
        }
        grouped.push(ch);
    }
    grouped
}

/// Collapse whitespace and cut at a word boundary so the result, ellipsis
/// included, fits in `width` characters
pub fn shorten(text: &str, width: usize) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    let collapsed = words.join(" ");
    if collapsed.chars().count() <= width {
        return collapsed;
    }
    if width == 0 {
        return String::new();
    }

    let mut result = String::new();
    for word in &words {
        let sep = if result.is_empty() { 0 } else { 1 };
        if result.chars().count() + sep + word.chars().count() + 1 > width {
            break;
        }
        if sep == 1 {
            result.push(' ');
        }
        result.push_str(word);
    }

    if result.is_empty() {
        // Single overlong word
        result = collapsed.chars().take(width - 1).collect();
    }
    result.push(ELLIPSIS);
    result
}

/// Greeting shown for `/start` and `/help`
pub fn welcome_message(
    config: &SearchConfig,
    localization: &Arc<LocalizationManager>,
    language_code: Option<&str>,
) -> String {
    let flights = if config.direct_only {
        t_lang(localization, "filter-direct-only", language_code)
    } else {
        t_lang(localization, "filter-any-flights", language_code)
    };
    let min = config.min_nights.to_string();
    let max = config.max_nights.to_string();
    let from = config.date_from.format("%d.%m.%Y").to_string();
    let to = config.date_to.format("%d.%m.%Y").to_string();

    [
        t_lang(localization, "welcome-title", language_code),
        t_args_lang(
            localization,
            "welcome-description",
            &[
                ("origin", config.origin.as_str()),
                ("destination", config.destination.as_str()),
            ],
            language_code,
        ),
        t_args_lang(
            localization,
            "welcome-filter",
            &[
                ("min", min.as_str()),
                ("max", max.as_str()),
                ("flights", flights.as_str()),
                ("from", from.as_str()),
                ("to", to.as_str()),
            ],
            language_code,
        ),
        t_lang(localization, "welcome-usage", language_code),
    ]
    .join("\n\n")
}

/// "Please wait" message sent before the provider call
pub fn wait_message(
    config: &SearchConfig,
    localization: &Arc<LocalizationManager>,
    language_code: Option<&str>,
) -> String {
    let from = config.date_from.format("%d.%m.%Y").to_string();
    let to = config.date_to.format("%d.%m.%Y").to_string();
    t_args_lang(
        localization,
        "search-wait",
        &[
            ("origin", config.origin.as_str()),
            ("destination", config.destination.as_str()),
            ("from", from.as_str()),
            ("to", to.as_str()),
        ],
        language_code,
    )
}

/// Error report with the escaped error detail
pub fn search_error_message(
    error: &impl std::fmt::Display,
    localization: &Arc<LocalizationManager>,
    language_code: Option<&str>,
) -> String {
    let detail = escape(&error.to_string());
    t_args_lang(
        localization,
        "search-error",
        &[("error", detail.as_str())],
        language_code,
    )
}

/// Message for a search that found nothing matching the filter
pub fn empty_results_message(
    config: &SearchConfig,
    localization: &Arc<LocalizationManager>,
    language_code: Option<&str>,
) -> String {
    let key = if config.direct_only {
        "search-empty-direct"
    } else {
        "search-empty"
    };
    let min = config.min_nights.to_string();
    let max = config.max_nights.to_string();
    t_args_lang(
        localization,
        key,
        &[
            ("origin", config.origin.as_str()),
            ("destination", config.destination.as_str()),
            ("min", min.as_str()),
            ("max", max.as_str()),
        ],
        language_code,
    )
}

/// Summary sent when more tours were found than shown
pub fn truncated_results_message(
    shown: usize,
    total: usize,
    localization: &Arc<LocalizationManager>,
    language_code: Option<&str>,
) -> String {
    let shown = shown.to_string();
    let total = total.to_string();
    t_args_lang(
        localization,
        "search-truncated",
        &[("shown", shown.as_str()), ("total", total.as_str())],
        language_code,
    )
}
