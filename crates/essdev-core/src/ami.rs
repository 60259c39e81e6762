/// Known OS identifiers and the AMI name pattern each one resolves to.
const AMI_PATTERNS: &[(&str, &str)] = &[
    ("rhel9", "RHEL-9.5.0_HVM-*"),
    ("rhel10", "RHEL-10.1.0_HVM-*"),
];

/// Resolve an OS identifier to an AMI name pattern.
///
/// Unknown identifiers pass through unchanged so new images can be named
/// directly. An absent or empty identifier resolves to `None`, stored as
/// `null` in the payload.
pub fn resolve_ami(os: Option<&str>) -> Option<String> {
    let os = os.filter(|s| !s.is_empty())?;
    let pattern = AMI_PATTERNS
        .iter()
        .find(|(name, _)| *name == os)
        .map_or(os, |(_, pattern)| *pattern);
    Some(pattern.to_string())
}
