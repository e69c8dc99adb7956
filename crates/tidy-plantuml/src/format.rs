//! Output formats understood by the `PlantUML` server.

use std::fmt;

/// Output format segment of a render URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Source text as reconstructed by the server.
    Uml,
    /// Raster image.
    Png,
    /// Vector image (default, carries error text in-band as markup).
    #[default]
    Svg,
}

impl OutputFormat {
    /// Parse format from its URL segment name.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "uml" => Some(Self::Uml),
            "png" => Some(Self::Png),
            "svg" => Some(Self::Svg),
            _ => None,
        }
    }

    /// Return format as its URL segment.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Uml => "uml",
            Self::Png => "png",
            Self::Svg => "svg",
        }
    }

    /// File extension for artifacts rendered in this format.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Uml => "puml",
            Self::Png => "png",
            Self::Svg => "svg",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_parse() {
        assert_eq!(OutputFormat::parse("uml"), Some(OutputFormat::Uml));
        assert_eq!(OutputFormat::parse("png"), Some(OutputFormat::Png));
        assert_eq!(OutputFormat::parse("svg"), Some(OutputFormat::Svg));
        assert_eq!(OutputFormat::parse("SVG"), None);
        assert_eq!(OutputFormat::parse("pdf"), None);
    }

    #[test]
    fn test_output_format_default_is_svg() {
        assert_eq!(OutputFormat::default(), OutputFormat::Svg);
    }

    #[test]
    fn test_output_format_as_str_round_trips_parse() {
        for format in [OutputFormat::Uml, OutputFormat::Png, OutputFormat::Svg] {
            assert_eq!(OutputFormat::parse(format.as_str()), Some(format));
        }
    }

    #[test]
    fn test_output_format_extension() {
        assert_eq!(OutputFormat::Uml.extension(), "puml");
        assert_eq!(OutputFormat::Png.extension(), "png");
        assert_eq!(OutputFormat::Svg.to_string(), "svg");
    }
}
