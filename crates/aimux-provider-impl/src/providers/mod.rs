pub mod gemini;
pub mod openai_compat;

fn build_url(base_url: Option<&str>, default_base: &str, path: &str) -> String {
    let base = base_url
        .map(str::trim)
        .filter(|base| !base.is_empty())
        .unwrap_or(default_base)
        .trim_end_matches('/');
    format!("{base}/{}", path.trim_start_matches('/'))
}
