/// Check if a sender is allowed to interact with the bot.
///
/// An empty allowlist means everyone is allowed (open policy).
/// Entries are matched case-insensitively against the sender ID, and also
/// against its bare user part (`15551234567` for
/// `15551234567:3@s.whatsapp.net`). Supports exact match and glob-style `*`
/// wildcards.
pub fn is_allowed(sender_id: &str, allowlist: &[String]) -> bool {
    if allowlist.is_empty() {
        return true;
    }
    let sender_lower = sender_id.to_lowercase();
    let user_part = bare_user(&sender_lower);
    allowlist.iter().any(|pattern| {
        let pat = pattern.trim().trim_start_matches('+').to_lowercase();
        if pat.is_empty() {
            return false;
        }
        if pat.contains('*') {
            glob_match(&pat, &sender_lower) || glob_match(&pat, user_part)
        } else {
            pat == sender_lower || pat == user_part
        }
    })
}

/// Strip the server, device and agent suffixes from an address.
fn bare_user(address: &str) -> &str {
    let user = address.split('@').next().unwrap_or(address);
    let user = user.split(':').next().unwrap_or(user);
    user.split('.').next().unwrap_or(user)
}

/// Simple glob matching supporting `*` as a wildcard for any sequence of chars.
fn glob_match(pattern: &str, text: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();
    if parts.len() == 1 {
        return pattern == text;
    }

    let mut pos = 0;
    for (i, part) in parts.iter().enumerate() {
        if part.is_empty() {
            continue;
        }
        match text[pos..].find(part) {
            Some(idx) => {
                // First segment must match at start
                if i == 0 && idx != 0 {
                    return false;
                }
                pos += idx + part.len();
            },
            None => return false,
        }
    }
    // Last segment must match at end (unless pattern ends with *)
    if !parts.last().unwrap_or(&"").is_empty() {
        pos == text.len()
    } else {
        true
    }
}
