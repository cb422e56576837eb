//! The user-facing configuration file and its include banner.
//!
//! The user file belongs to the operator. The supervisor only guarantees that
//! it starts with a banner including the overlay; everything after the banner
//! is treated as free-form custom options.

use nodekeeper_config::OVERLAY_FILE_NAME;

/// Banner that makes the node load the overlay.
pub(crate) fn banner() -> String {
    format!(
        "# Load additional configuration file, relative to the data directory.\n\
         includeconf={OVERLAY_FILE_NAME}\n"
    )
}

/// Returns `existing` with the banner prepended, or `None` when its first
/// two lines already are the banner.
pub(crate) fn with_banner(existing: &str) -> Option<String> {
    if has_banner(existing) {
        return None;
    }
    let banner = banner();
    if existing.is_empty() {
        return Some(banner);
    }
    Some(format!("{banner}\n{existing}"))
}

/// Whether the file opens with the banner, whatever its line endings.
fn has_banner(content: &str) -> bool {
    let banner = banner();
    let mut lines = content.lines().map(|line| line.trim_end_matches('\r'));
    banner.lines().all(|expected| lines.next() == Some(expected))
}

/// Extracts the custom options that follow the banner.
pub(crate) fn custom_options(content: &str) -> String {
    let after = if has_banner(content) {
        let skipped = banner().lines().count();
        content
            .split_inclusive('\n')
            .skip(skipped)
            .collect::<String>()
    } else {
        content.to_owned()
    };
    let after = after
        .strip_prefix("\r\n")
        .or_else(|| after.strip_prefix('\n'))
        .unwrap_or(&after);
    after.trim_end().to_owned()
}

/// Composes a user file holding the banner followed by `custom`.
pub(crate) fn compose(custom: &str) -> String {
    let normalised = custom.replace("\r\n", "\n");
    let trimmed = normalised.trim_end();
    let banner = banner();
    if trimmed.is_empty() {
        banner
    } else {
        format!("{banner}\n{trimmed}\n")
    }
}
