// src/utils/html.rs

/// Clean teacher-entered HTML with ammonia.
///
/// Safe formatting tags (<b>, <p>, <sub>) survive so questions can carry
/// simple markup; scripts, iframes and event-handler attributes are dropped.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}
