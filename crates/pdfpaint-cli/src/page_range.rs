/// Parse a 1-based page selection like `"1,3-5"` into sorted, deduplicated
/// 0-based page indices.
///
/// # Errors
///
/// Page 0, pages past `page_count`, reversed ranges, and anything that is
/// not a number are rejected with a message for the user.
pub fn parse_page_range(input: &str, page_count: usize) -> Result<Vec<usize>, String> {
    let mut pages = Vec::new();
    for part in input.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (first, last) = match part.split_once('-') {
            Some((start, end)) => (page_number(start, page_count)?, page_number(end, page_count)?),
            None => {
                let page = page_number(part, page_count)?;
                (page, page)
            }
        };
        if first > last {
            return Err(format!("range '{part}' runs backwards"));
        }
        pages.extend(first - 1..last);
    }
    if pages.is_empty() {
        return Err(format!("no pages selected by '{input}'"));
    }
    pages.sort_unstable();
    pages.dedup();
    Ok(pages)
}

fn page_number(text: &str, page_count: usize) -> Result<usize, String> {
    let text = text.trim();
    let page: usize = text
        .parse()
        .map_err(|_| format!("invalid page number: '{text}'"))?;
    match page {
        0 => Err("page 0 is invalid (pages start at 1)".to_string()),
        p if p > page_count => Err(format!(
            "page {p} exceeds document page count ({page_count})"
        )),
        p => Ok(p),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_pages_and_ranges() {
        assert_eq!(parse_page_range("3", 5).unwrap(), vec![2]);
        assert_eq!(parse_page_range("2-4", 5).unwrap(), vec![1, 2, 3]);
        assert_eq!(
            parse_page_range("1-3,7,10-12", 12).unwrap(),
            vec![0, 1, 2, 6, 9, 10, 11]
        );
    }

    #[test]
    fn overlapping_selections_are_merged() {
        assert_eq!(parse_page_range("4,1-2,2", 5).unwrap(), vec![0, 1, 3]);
    }

    #[test]
    fn whitespace_tolerance() {
        assert_eq!(parse_page_range(" 1 , 3 - 5 ", 5).unwrap(), vec![0, 2, 3, 4]);
    }

    #[test]
    fn rejects_bad_selections() {
        assert!(parse_page_range("0", 5).unwrap_err().contains("invalid"));
        assert!(parse_page_range("6", 5).unwrap_err().contains("exceeds"));
        assert!(parse_page_range("2-9", 5).unwrap_err().contains("exceeds"));
        assert!(parse_page_range("4-2", 5).unwrap_err().contains("backwards"));
        assert!(parse_page_range("x", 5).unwrap_err().contains("invalid page number"));
        assert!(parse_page_range(",", 5).unwrap_err().contains("no pages"));
    }
}
