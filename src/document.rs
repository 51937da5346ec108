//! Plain-text document rendering for shopping list downloads.
//!
//! The aggregation layer hands over an ordered list of labelled values and
//! gets back the bytes of a downloadable document. Layout concerns stay here
//! so the query code never touches formatting.

/// One printable line: label plus an already-formatted value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentLine {
    pub label: String,
    pub value: String,
}

/// Render numbered "1. label: value" lines under a title.
///
/// An empty line list still yields a valid document containing only the
/// header, so an empty shopping cart downloads cleanly.
pub fn render(title: &str, lines: &[DocumentLine]) -> Vec<u8> {
    let mut out = String::new();
    out.push_str(title);
    out.push('\n');
    out.push_str(&"=".repeat(title.chars().count()));
    out.push('\n');

    for (i, line) in lines.iter().enumerate() {
        out.push_str(&format!("{}. {}: {}\n", i + 1, line.label, line.value));
    }

    out.into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_numbers_lines_from_one() {
        let lines = vec![
            DocumentLine {
                label: "flour".to_string(),
                value: "500 g".to_string(),
            },
            DocumentLine {
                label: "milk".to_string(),
                value: "200 ml".to_string(),
            },
        ];

        let text = String::from_utf8(render("Shopping list", &lines)).unwrap();
        assert!(text.contains("1. flour: 500 g\n"));
        assert!(text.contains("2. milk: 200 ml\n"));
    }

    #[test]
    fn test_render_empty_list_is_header_only() {
        let text = String::from_utf8(render("Shopping list", &[])).unwrap();
        assert_eq!(text, "Shopping list\n=============\n");
    }

    #[test]
    fn test_render_preserves_input_order() {
        let lines = vec![
            DocumentLine {
                label: "b".to_string(),
                value: "2".to_string(),
            },
            DocumentLine {
                label: "a".to_string(),
                value: "1".to_string(),
            },
        ];

        let text = String::from_utf8(render("t", &lines)).unwrap();
        let b_pos = text.find("1. b").unwrap();
        let a_pos = text.find("2. a").unwrap();
        assert!(b_pos < a_pos);
    }
}
