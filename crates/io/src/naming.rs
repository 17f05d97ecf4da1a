use confronto_recon::OfficeLabel;

/// Characters no common filesystem accepts in a file name.
const UNSAFE_CHARS: &[char] = &['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

/// `confronto_<office-or-multi>_ra_mna.xlsx`
pub fn report_file_name(label: &OfficeLabel) -> String {
    format!("confronto_{}_ra_mna.xlsx", safe_component(label.as_str()))
}

/// Strip unsafe characters and collapse whitespace runs to `_`.
/// Falls back to `multi` when nothing is left.
pub fn safe_component(raw: &str) -> String {
    let stripped: String = raw.chars().filter(|c| !UNSAFE_CHARS.contains(c)).collect();
    let joined = stripped.split_whitespace().collect::<Vec<_>>().join("_");
    if joined.is_empty() {
        OfficeLabel::Multi.as_str().to_string()
    } else {
        joined
    }
}
