/// Slug used when a link has no usable trailing path segment.
pub const FALLBACK_SLUG: &str = "article";

/// URL utilities
pub mod url {
    use super::FALLBACK_SLUG;
    use url::Url;

    /// Derives the document slug from a source link.
    ///
    /// Takes the final path segment, drops its extension and a leading `NN-` ordering
    /// prefix, e.g. `.../4/08-man-aangehouden.html` becomes `man-aangehouden`.
    pub fn derive_slug(link: &str) -> String {
        let parsed = match Url::parse(link) {
            Ok(parsed) => parsed,
            Err(_) => return FALLBACK_SLUG.to_string(),
        };

        let segment = parsed
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .unwrap_or("");

        // Only a trailing `.<alphanumerics>` counts as an extension: `st.-jansklooster` stays whole.
        let stem = match segment.rfind('.') {
            Some(dot)
                if dot + 1 < segment.len()
                    && segment[dot + 1..].bytes().all(|b| b.is_ascii_alphanumeric()) =>
            {
                &segment[..dot]
            }
            _ => segment,
        };

        let digits = stem.bytes().take_while(u8::is_ascii_digit).count();
        let slug = if digits > 0 && stem[digits..].starts_with('-') {
            &stem[digits + 1..]
        } else {
            stem
        };

        if slug.is_empty() || slug.chars().all(|c| c == '.') {
            FALLBACK_SLUG.to_string()
        } else {
            slug.to_string()
        }
    }

    /// Extract domain from URL
    pub fn extract_domain(url_str: &str) -> Option<String> {
        Url::parse(url_str)
            .ok()
            .and_then(|url| url.domain().map(|d| d.to_string()))
    }
}

/// Text processing utilities
pub mod text {
    /// First `max_chars` characters, never splitting a code point.
    pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
        match text.char_indices().nth(max_chars) {
            Some((idx, _)) => &text[..idx],
            None => text,
        }
    }

    /// Truncate to `max_chars`, appending an ellipsis when something was cut.
    pub fn excerpt(text: &str, max_chars: usize) -> String {
        let cut = truncate_chars(text, max_chars);
        if cut.len() < text.len() {
            format!("{}...", cut.trim_end())
        } else {
            cut.to_string()
        }
    }
}

/// HTML helpers
pub mod html {
    /// Escapes text for use in element content and quoted attribute values.
    pub fn escape(text: &str) -> String {
        let mut escaped = String::with_capacity(text.len());
        for c in text.chars() {
            match c {
                '&' => escaped.push_str("&amp;"),
                '<' => escaped.push_str("&lt;"),
                '>' => escaped.push_str("&gt;"),
                '"' => escaped.push_str("&quot;"),
                '\'' => escaped.push_str("&#39;"),
                _ => escaped.push(c),
            }
        }
        escaped
    }

    /// Extract plain text from an HTML fragment, collapsing whitespace.
    pub fn extract_text(html: &str) -> String {
        let stripped = html
            .chars()
            .fold((String::new(), false), |(mut text, in_tag), c| match c {
                '<' => (text, true),
                '>' => {
                    text.push(' ');
                    (text, false)
                }
                _ if !in_tag => {
                    text.push(c);
                    (text, in_tag)
                }
                _ => (text, in_tag),
            })
            .0;

        decode_entities(&stripped)
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn decode_entities(text: &str) -> String {
        let mut decoded = String::with_capacity(text.len());
        let mut rest = text;

        while let Some(amp) = rest.find('&') {
            decoded.push_str(&rest[..amp]);
            let tail = &rest[amp..];
            let entity = tail
                .find(';')
                .filter(|&end| end <= 10)
                .and_then(|end| decode_entity(&tail[1..end]).map(|c| (c, end)));

            match entity {
                Some((c, end)) => {
                    decoded.push(c);
                    rest = &tail[end + 1..];
                }
                None => {
                    decoded.push('&');
                    rest = &tail[1..];
                }
            }
        }

        decoded.push_str(rest);
        decoded
    }

    /// `name` is the text between `&` and `;`, e.g. `amp`, `#233` or `#xE9`.
    fn decode_entity(name: &str) -> Option<char> {
        if let Some(number) = name.strip_prefix('#') {
            let code = match number.strip_prefix('x').or_else(|| number.strip_prefix('X')) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None if number.bytes().all(|b| b.is_ascii_digit()) => number.parse().ok()?,
                None => return None,
            };
            return char::from_u32(code);
        }

        let c = match name {
            "amp" => '&',
            "lt" => '<',
            "gt" => '>',
            "quot" => '"',
            "apos" => '\'',
            "nbsp" => ' ',
            "euro" => '\u{20AC}',
            "copy" => '\u{A9}',
            "eacute" => '\u{E9}',
            "egrave" => '\u{E8}',
            "euml" => '\u{EB}',
            "iuml" => '\u{EF}',
            "ouml" => '\u{F6}',
            "uuml" => '\u{FC}',
            "ndash" => '\u{2013}',
            "mdash" => '\u{2014}',
            "hellip" => '\u{2026}',
            "lsquo" => '\u{2018}',
            "rsquo" => '\u{2019}',
            "ldquo" => '\u{201C}',
            "rdquo" => '\u{201D}',
            _ => return None,
        };
        Some(c)
    }
}
