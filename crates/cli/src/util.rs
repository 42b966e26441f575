use std::time::Duration;

/// Format an elapsed duration as `HH:MM:SS.cc` (hundredths, truncated).
pub(crate) fn format_elapsed(elapsed: Duration) -> String {
    let total = elapsed.as_secs();
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    let hundredths = elapsed.subsec_millis() / 10;
    format!("{hours:02}:{minutes:02}:{seconds:02}.{hundredths:02}")
}

/// `1=3, 4=1` for a count map, `-` when empty.
pub(crate) fn format_counts<K: std::fmt::Display>(
    counts: &std::collections::BTreeMap<K, usize>,
) -> String {
    if counts.is_empty() {
        return "-".into();
    }
    counts
        .iter()
        .map(|(k, n)| format!("{k}={n}"))
        .collect::<Vec<_>>()
        .join(", ")
}
