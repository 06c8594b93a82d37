pub const TEMPLATE_EXTENSION: &str = "html";

/// Removes traversal sequences and converts dot notation to a path.
///
/// `..` and NUL are deleted before dots become slashes, so `admin.dashboard`
/// becomes `admin/dashboard` and `../../etc/passwd` becomes `//etc/passwd`
/// with the leading slashes stripped.
pub fn sanitize_name(name: &str) -> String {
    let cleaned = name.replace("..", "").replace('\0', "").replace('.', "/");
    cleaned
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

fn with_extension(path: &str) -> String {
    format!("{path}.{TEMPLATE_EXTENSION}")
}

/// Candidate paths for a theme template, relative to the theme directory,
/// in lookup order.
pub fn theme_candidates(name: &str) -> Vec<String> {
    let name = sanitize_name(name);
    if name.is_empty() {
        return Vec::new();
    }
    vec![
        with_extension(&format!("pages/{name}")),
        with_extension(&format!("partials/{name}")),
        with_extension(&name),
    ]
}

/// Candidate path for an admin template, relative to the admin views
/// directory.
pub fn admin_candidates(name: &str) -> Vec<String> {
    let name = sanitize_name(name);
    if name.is_empty() {
        return Vec::new();
    }
    vec![with_extension(&name)]
}

pub fn partial_path(name: &str) -> Option<String> {
    let name = sanitize_name(name);
    (!name.is_empty()).then(|| with_extension(&format!("partials/{name}")))
}

pub fn layout_path(layout: &str) -> Option<String> {
    let layout = sanitize_name(layout);
    (!layout.is_empty()).then(|| with_extension(&format!("layouts/{layout}")))
}
