//! Output formats for rendered citations.

use crate::error::DriverError;
use std::str::FromStr;

/// The output format rendered text is produced in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Plain text; formatting attributes are dropped.
    #[default]
    Plain,
    /// HTML with escaping and `<i>`/`<b>` tags.
    Html,
}

impl FromStr for OutputFormat {
    type Err = DriverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "plain" => Ok(OutputFormat::Plain),
            "html" => Ok(OutputFormat::Html),
            other => Err(DriverError::UnknownOutputFormat(other.to_string())),
        }
    }
}

impl OutputFormat {
    /// Escape literal text for this format.
    pub fn escape(&self, text: &str) -> String {
        match self {
            OutputFormat::Plain => text.to_string(),
            OutputFormat::Html => {
                let mut out = String::with_capacity(text.len());
                for c in text.chars() {
                    match c {
                        '&' => out.push_str("&amp;"),
                        '<' => out.push_str("&lt;"),
                        '>' => out.push_str("&gt;"),
                        _ => out.push(c),
                    }
                }
                out
            }
        }
    }

    /// Wrap already-escaped text in italics.
    pub fn italic(&self, text: String) -> String {
        match self {
            OutputFormat::Plain => text,
            OutputFormat::Html => format!("<i>{}</i>", text),
        }
    }

    /// Wrap already-escaped text in bold.
    pub fn bold(&self, text: String) -> String {
        match self {
            OutputFormat::Plain => text,
            OutputFormat::Html => format!("<b>{}</b>", text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!("plain".parse::<OutputFormat>().unwrap(), OutputFormat::Plain);
        assert_eq!("html".parse::<OutputFormat>().unwrap(), OutputFormat::Html);
        assert!(matches!(
            "rtf".parse::<OutputFormat>(),
            Err(DriverError::UnknownOutputFormat(_))
        ));
    }

    #[test]
    fn test_html_escaping() {
        assert_eq!(
            OutputFormat::Html.escape("Smith & Jones <eds>"),
            "Smith &amp; Jones &lt;eds&gt;"
        );
        assert_eq!(OutputFormat::Plain.escape("a & b"), "a & b");
    }

    #[test]
    fn test_italic() {
        assert_eq!(
            OutputFormat::Html.italic("title".to_string()),
            "<i>title</i>"
        );
        assert_eq!(OutputFormat::Plain.italic("title".to_string()), "title");
    }
}
