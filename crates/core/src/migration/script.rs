use super::MigrationError;

const UP_MARKER: &str = "-- migrate:up";
const DOWN_MARKER: &str = "-- migrate:down";

/// The up and down SQL of a single migration file.
///
/// ```text
/// -- migrate:up
/// CREATE TABLE posts (...);
///
/// -- migrate:down
/// DROP TABLE IF EXISTS posts;
/// ```
///
/// A file without markers is treated as an up script with no down script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationScript {
    pub name: String,
    pub up: String,
    pub down: Option<String>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Section {
    Preamble,
    Up,
    Down,
}

fn marker(line: &str) -> Option<Section> {
    let line = line.trim();
    if line.eq_ignore_ascii_case(UP_MARKER) {
        Some(Section::Up)
    } else if line.eq_ignore_ascii_case(DOWN_MARKER) {
        Some(Section::Down)
    } else {
        None
    }
}

impl MigrationScript {
    pub fn parse(name: impl Into<String>, source: &str) -> Result<Self, MigrationError> {
        let name = name.into();
        let invalid = |reason: &str| MigrationError::InvalidScript {
            name: name.clone(),
            reason: reason.to_string(),
        };

        if !source.lines().any(|l| marker(l).is_some()) {
            let up = source.trim();
            if up.is_empty() {
                return Err(invalid("script is empty"));
            }
            return Ok(Self {
                name,
                up: up.to_string(),
                down: None,
            });
        }

        let mut section = Section::Preamble;
        let mut seen_up = false;
        let mut seen_down = false;
        let mut up = String::new();
        let mut down = String::new();

        for line in source.lines() {
            match marker(line) {
                Some(Section::Up) => {
                    if seen_up {
                        return Err(invalid("duplicate up marker"));
                    }
                    if seen_down {
                        return Err(invalid("up section must come before down section"));
                    }
                    seen_up = true;
                    section = Section::Up;
                }
                Some(Section::Down) => {
                    if seen_down {
                        return Err(invalid("duplicate down marker"));
                    }
                    seen_down = true;
                    section = Section::Down;
                }
                _ => match section {
                    Section::Preamble => {
                        if !line.trim().is_empty() && !line.trim_start().starts_with("--") {
                            return Err(invalid("statements before the up marker"));
                        }
                    }
                    Section::Up => {
                        up.push_str(line);
                        up.push('\n');
                    }
                    Section::Down => {
                        down.push_str(line);
                        down.push('\n');
                    }
                },
            }
        }

        if !seen_up {
            return Err(invalid("missing up marker"));
        }

        let up = up.trim();
        if up.is_empty() {
            return Err(invalid("up section is empty"));
        }

        let down = down.trim();
        Ok(Self {
            name,
            up: up.to_string(),
            down: (!down.is_empty()).then(|| down.to_string()),
        })
    }
}
