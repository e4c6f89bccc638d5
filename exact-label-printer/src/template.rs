use chrono::NaiveDateTime;

/// Expand `{barcode}`, `{date}` (dd/mm), `{time}` (HH:MM) and `{datetime}`
/// in a text line. Unknown placeholders are left as written.
pub fn expand(template: &str, barcode: &str, now: &NaiveDateTime) -> String {
    let mut out = String::with_capacity(template.len() + barcode.len());
    let mut rest = template;
    // single pass: substituted values are never scanned again
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let tail = &rest[open..];
        let Some(close) = tail.find('}') else {
            rest = tail;
            break;
        };
        match &tail[1..close] {
            "barcode" => out.push_str(barcode),
            "datetime" => out.push_str(&now.format("%Y-%m-%d %H:%M:%S").to_string()),
            "date" => out.push_str(&now.format("%d/%m").to_string()),
            "time" => out.push_str(&now.format("%H:%M").to_string()),
            _ => {
                out.push('{');
                rest = &tail[1..];
                continue;
            }
        }
        rest = &tail[close + 1..];
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn noon() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 7, 1)
            .unwrap()
            .and_hms_opt(12, 5, 9)
            .unwrap()
    }

    #[test]
    fn expands_all_placeholders() {
        let line = expand("{date} {time} - {barcode}", "508020005", &noon());
        assert_eq!(line, "01/07 12:05 - 508020005");
        assert_eq!(expand("{datetime}", "", &noon()), "2025-07-01 12:05:09");
    }

    #[test]
    fn leaves_plain_and_unknown_text_alone() {
        assert_eq!(expand("Ward 8", "x", &noon()), "Ward 8");
        assert_eq!(expand("{ward}", "x", &noon()), "{ward}");
        assert_eq!(expand("{{barcode}}", "42", &noon()), "{42}");
        assert_eq!(expand("open {barcode", "42", &noon()), "open {barcode");
    }

    #[test]
    fn barcode_value_is_not_expanded_again() {
        assert_eq!(expand("{barcode} {time}", "{date}", &noon()), "{date} 12:05");
    }
}
