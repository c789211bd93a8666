//! Comment narrative
//!
//! Joins classifier comments into the single paragraph printed on the report.

/// Text used when there is nothing to report
pub const NO_FINDINGS: &str = "No significant abnormalities detected.";

/// Join comments as an English list: "A", "A and B", "A, B, and C"
pub fn join_comments<S: AsRef<str>>(comments: &[S]) -> String {
    match comments {
        [] => NO_FINDINGS.to_string(),
        [only] => only.as_ref().to_string(),
        [first, second] => format!("{} and {}", first.as_ref(), second.as_ref()),
        [rest @ .., last] => {
            let head: Vec<&str> = rest.iter().map(|c| c.as_ref()).collect();
            format!("{}, and {}", head.join(", "), last.as_ref())
        }
    }
}

/// Joined comments as a sentence: first letter capitalised, one closing period
pub fn to_paragraph<S: AsRef<str>>(comments: &[S]) -> String {
    let joined = join_comments(comments);
    let joined = joined.trim();

    let mut chars = joined.chars();
    let mut paragraph = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
        None => return String::new(),
    };

    if !paragraph.ends_with('.') {
        paragraph.push('.');
    }
    paragraph
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_comments() {
        let none: [&str; 0] = [];
        assert_eq!(join_comments(&none), "No significant abnormalities detected.");
        assert_eq!(join_comments(&["A"]), "A");
        assert_eq!(join_comments(&["A", "B"]), "A and B");
        assert_eq!(join_comments(&["A", "B", "C"]), "A, B, and C");
        assert_eq!(join_comments(&["A", "B", "C", "D", "E"]), "A, B, C, D, and E");
    }

    #[test]
    fn test_to_paragraph() {
        assert_eq!(
            to_paragraph(&["the patient is obese", "the patient has a fever"]),
            "The patient is obese and the patient has a fever."
        );
        let none: [String; 0] = [];
        assert_eq!(to_paragraph(&none), NO_FINDINGS);
    }
}
