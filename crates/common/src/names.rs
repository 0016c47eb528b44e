//! IRC target names.

/// Whether `target` names a multi-user channel rather than a nickname.
#[must_use]
pub fn is_channel_name(target: &str) -> bool {
    target.starts_with(['#', '&', '+', '!'])
}

/// Case-folded form of a channel name under RFC 1459 casemapping, where
/// `[]\~` are the upper-case forms of `{}|^`.
///
/// Servers compare channel names this way and echo them back in their own
/// stored spelling, so two names refer to the same channel exactly when
/// their keys are equal.
#[must_use]
pub fn channel_key(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '[' => '{',
            ']' => '}',
            '\\' => '|',
            '~' => '^',
            c => c.to_ascii_lowercase(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    #[rstest]
    #[case("#chan", true)]
    #[case("&local", true)]
    #[case("+modeless", true)]
    #[case("!12345safe", true)]
    #[case("alice", false)]
    #[case("", false)]
    fn channel_name_prefixes(#[case] target: &str, #[case] expected: bool) {
        assert_eq!(is_channel_name(target), expected);
    }

    #[rstest]
    #[case("#Ops", "#ops")]
    #[case("#OPS[1]", "#ops{1}")]
    #[case("#a\\b~", "#a|b^")]
    #[case("#déjà", "#déjà")]
    fn keys_fold_rfc1459_case(#[case] name: &str, #[case] key: &str) {
        assert_eq!(channel_key(name), key);
    }
}
