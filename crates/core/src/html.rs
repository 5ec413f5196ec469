//! Telegram HTML helpers.

/// Wrap a message body in a `<pre>` block, escaping HTML.
pub fn preformatted(body: &str) -> String {
    let mut out = String::with_capacity(body.len() + 11);
    out.push_str("<pre>");
    for c in body.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            c => out.push(c),
        }
    }
    out.push_str("</pre>");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_preformatted_escapes_html() {
        assert_eq!(preformatted("a < b & c > d"), "<pre>a &lt; b &amp; c &gt; d</pre>");
        assert_eq!(preformatted(""), "<pre></pre>");
    }
}
